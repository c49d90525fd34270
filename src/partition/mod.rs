//! Resampling schemes producing train/test folds.
//!
//! Every scheme draws from its own `StdRng` seeded by the caller, so the
//! same seed, scheme and row count always give the same folds.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::datasets::Dataset;
use crate::error::{Result, SelectionError};
use crate::Float;


/// A resampling scheme.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scheme {
    /// A single split with `round(prop * N)` training rows.
    Holdout { prop: f64 },
    /// `times` independent holdout splits.
    MonteCarlo { prop: f64, times: usize },
    /// `times` draws of `N` rows with replacement; the test set holds the
    /// rows never drawn.
    Bootstrap { times: usize },
    /// `v` mutually exclusive groups, each used once as the test set,
    /// repeated `repeats` times with fresh permutations.
    VFold { v: usize, repeats: usize },
}

/// One train/test split, as row indices into the partitioned dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    id: String,
    train: Vec<usize>,
    test: Vec<usize>,
}

impl Fold {
    pub fn new(id: String, train: Vec<usize>, test: Vec<usize>) -> Fold {
        Fold { id, train, test }
    }

    /// Label of the fold, e.g. `Fold03` or `Repeat2/Fold01`.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn train_indices(&self) -> &[usize] {
        &self.train
    }

    pub fn test_indices(&self) -> &[usize] {
        &self.test
    }

    /// Training rows of `dataset`.
    pub fn train<F: Float>(&self, dataset: &Dataset<F>) -> Dataset<F> {
        dataset.select_rows(&self.train)
    }

    /// Test rows of `dataset`.
    pub fn test<F: Float>(&self, dataset: &Dataset<F>) -> Dataset<F> {
        dataset.select_rows(&self.test)
    }
}

impl Scheme {
    /// Checks the scheme parameters against a dataset of `n_rows` rows.
    pub fn validate(&self, n_rows: usize) -> Result<()> {
        match *self {
            Scheme::Holdout { prop } => check_prop(prop, n_rows),
            Scheme::MonteCarlo { prop, times } => {
                check_positive("times", times)?;
                check_prop(prop, n_rows)
            }
            Scheme::Bootstrap { times } => {
                check_positive("times", times)?;
                if n_rows < 2 {
                    return Err(SelectionError::InvalidParameter(format!(
                        "bootstrap needs at least 2 rows, got {}",
                        n_rows
                    )));
                }
                Ok(())
            }
            Scheme::VFold { v, repeats } => {
                check_positive("repeats", repeats)?;
                if v < 2 || v > n_rows {
                    return Err(SelectionError::InvalidParameter(format!(
                        "v must lie in [2, {}], got {}",
                        n_rows, v
                    )));
                }
                Ok(())
            }
        }
    }

    /// Number of folds the scheme produces.
    pub fn n_folds(&self) -> usize {
        match *self {
            Scheme::Holdout { .. } => 1,
            Scheme::MonteCarlo { times, .. } | Scheme::Bootstrap { times } => times,
            Scheme::VFold { v, repeats } => v * repeats,
        }
    }

    /// Splits `n_rows` row indices into folds.
    pub fn split(&self, n_rows: usize, seed: u64) -> Result<Vec<Fold>> {
        self.validate(n_rows)?;
        let mut rng = StdRng::seed_from_u64(seed);

        let folds = match *self {
            Scheme::Holdout { prop } => {
                vec![monte_carlo_split("Resample1".to_string(), n_rows, prop, &mut rng)]
            }
            Scheme::MonteCarlo { prop, times } => (0..times)
                .map(|r| {
                    let id = format!("Resample{:0w$}", r + 1, w = width(times));
                    monte_carlo_split(id, n_rows, prop, &mut rng)
                })
                .collect(),
            Scheme::Bootstrap { times } => (0..times)
                .map(|r| {
                    let id = format!("Bootstrap{:0w$}", r + 1, w = width(times));
                    bootstrap_split(id, n_rows, &mut rng)
                })
                .collect(),
            Scheme::VFold { v, repeats } => {
                let mut folds = Vec::with_capacity(v * repeats);
                for r in 0..repeats {
                    let prefix = if repeats > 1 {
                        format!("Repeat{}/", r + 1)
                    } else {
                        String::new()
                    };
                    folds.extend(vfold_split(&prefix, n_rows, v, &mut rng));
                }
                folds
            }
        };

        tracing::debug!(scheme = ?self, n_rows, n_folds = folds.len(), seed, "partitioned rows");
        Ok(folds)
    }
}

/// Partitions `dataset` under `scheme`, see [`Scheme::split`].
pub fn partition<F: Float>(dataset: &Dataset<F>, scheme: &Scheme, seed: u64) -> Result<Vec<Fold>> {
    scheme.split(dataset.n_rows(), seed)
}

fn width(count: usize) -> usize {
    count.to_string().len()
}

fn check_positive(name: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(SelectionError::InvalidParameter(format!(
            "{} must be at least 1",
            name
        )));
    }
    Ok(())
}

fn check_prop(prop: f64, n_rows: usize) -> Result<()> {
    if !(prop > 0. && prop < 1.) {
        return Err(SelectionError::InvalidParameter(format!(
            "prop must lie in (0, 1), got {}",
            prop
        )));
    }
    let n_train = n_train(prop, n_rows);
    if n_train == 0 || n_train >= n_rows {
        return Err(SelectionError::InvalidParameter(format!(
            "prop {} leaves {} of {} rows for training",
            prop, n_train, n_rows
        )));
    }
    Ok(())
}

fn n_train(prop: f64, n_rows: usize) -> usize {
    (prop * n_rows as f64).round() as usize
}

fn monte_carlo_split(id: String, n_rows: usize, prop: f64, rng: &mut StdRng) -> Fold {
    let mut indices: Vec<usize> = (0..n_rows).collect();
    indices.shuffle(rng);
    let (train, test) = indices.split_at(n_train(prop, n_rows));
    let mut train = train.to_vec();
    let mut test = test.to_vec();
    train.sort_unstable();
    test.sort_unstable();
    Fold::new(id, train, test)
}

fn bootstrap_split(id: String, n_rows: usize, rng: &mut StdRng) -> Fold {
    loop {
        let train: Vec<usize> = (0..n_rows).map(|_| rng.gen_range(0..n_rows)).collect();
        let mut drawn = vec![false; n_rows];
        for &i in train.iter() {
            drawn[i] = true;
        }
        let test: Vec<usize> = (0..n_rows).filter(|&i| !drawn[i]).collect();
        // every row drawn at least once leaves nothing to assess on
        if !test.is_empty() {
            return Fold::new(id, train, test);
        }
    }
}

fn vfold_split(prefix: &str, n_rows: usize, v: usize, rng: &mut StdRng) -> Vec<Fold> {
    let mut indices: Vec<usize> = (0..n_rows).collect();
    indices.shuffle(rng);

    let fold_size = n_rows / v;
    let remainder = n_rows % v;

    let mut folds = Vec::with_capacity(v);
    let mut start = 0;
    for i in 0..v {
        // the first `remainder` groups take one extra row
        let size = if i < remainder { fold_size + 1 } else { fold_size };
        let end = start + size;

        let mut test = indices[start..end].to_vec();
        let mut train = Vec::with_capacity(n_rows - size);
        train.extend_from_slice(&indices[..start]);
        train.extend_from_slice(&indices[end..]);
        test.sort_unstable();
        train.sort_unstable();

        folds.push(Fold::new(
            format!("{}Fold{:0w$}", prefix, i + 1, w = width(v)),
            train,
            test,
        ));
        start = end;
    }
    folds
}
