use ndarray::Array1;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::hyperparams::{SelectorParams, SelectorValidParams};
use super::{Candidate, CandidateResult, Outcome, Selection};
use crate::datasets::Dataset;
use crate::error::{Result, SelectionError};
use crate::estimators::{Engine, ParamGuard};
use crate::helpers::seeds::derive_seed;
use crate::helpers::stats::{mean, sample_variance};
use crate::metrics::{score, Metric, Score};
use crate::partition::Fold;
use crate::Float;

/// The model selector
///
/// Entry point of a selection run, see [`SelectorParams`] for the available
/// settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelSelector;

impl ModelSelector {
    /// This method instantiates the selection hyperparameters with their
    /// default values.
    pub fn params<F: Float>() -> SelectorParams<F> {
        SelectorParams::new()
    }
}

impl<F: Float> SelectorParams<F> {
    /// Checks the parameters and runs [`SelectorValidParams::select`].
    pub fn select(
        &self,
        candidates: &[Candidate<F>],
        dataset: &Dataset<F>,
        folds: &[Fold],
    ) -> Result<Selection<F>> {
        self.check_ref()?.select(candidates, dataset, folds)
    }

    /// Checks the parameters and runs [`SelectorValidParams::select_by_loo`].
    pub fn select_by_loo(
        &self,
        candidates: &[Candidate<F>],
        dataset: &Dataset<F>,
    ) -> Result<Selection<F>> {
        self.0.select_by_loo(candidates, dataset)
    }
}

impl<F: Float> SelectorValidParams<F> {
    /// This method fits every candidate on the training side of every fold,
    /// scores it on the test side, aggregates per-fold scores into a mean and
    /// a standard error and applies the one standard error rule.
    ///
    /// Fails with [`SelectionError::InsufficientFolds`] below two folds, and
    /// with [`SelectionError::InvalidParameter`] when a fold has no test row
    /// or refers to a row outside `dataset`.
    /// Errors raised while fitting or scoring a candidate are recorded on
    /// that candidate only.
    pub fn select(
        &self,
        candidates: &[Candidate<F>],
        dataset: &Dataset<F>,
        folds: &[Fold],
    ) -> Result<Selection<F>> {
        if folds.len() < 2 {
            return Err(SelectionError::InsufficientFolds(folds.len()));
        }
        check_candidates(candidates)?;
        check_folds(folds, dataset.n_rows())?;

        let schema = dataset.schema();
        let invalid: Vec<Option<SelectionError>> = candidates
            .iter()
            .map(|c| c.formula().validate(&schema).err())
            .collect();

        let units: Vec<(usize, usize)> = (0..candidates.len())
            .filter(|&c| invalid[c].is_none())
            .flat_map(|c| (0..folds.len()).map(move |f| (c, f)))
            .collect();

        let evaluate = |&(c, f): &(usize, usize)| {
            self.evaluate_unit(c, &candidates[c], f, &folds[f], dataset)
        };
        let scores: Vec<Result<Score<F>>> = if self.parallel {
            run_units(&units, evaluate)
        } else {
            units.iter().map(evaluate).collect()
        };

        let mut scores = scores.into_iter();
        let results = candidates
            .iter()
            .enumerate()
            .map(|(c, candidate)| {
                let outcome = match &invalid[c] {
                    Some(error) => Outcome::Failed {
                        fold: None,
                        error: error.clone(),
                    },
                    None => {
                        let fold_results: Vec<Result<Score<F>>> =
                            scores.by_ref().take(folds.len()).collect();
                        aggregate(fold_results, folds)
                    }
                };
                candidate_result(c, candidate, outcome)
            })
            .collect();

        Ok(self.finish(self.metric, results))
    }

    /// This method fits every candidate once on the whole `dataset` with the
    /// Bayesian engine and compares them by their PSIS-LOO expected log
    /// predictive density. The summed density plays the role of the mean and
    /// its standard error the role of the standard error, so no folds are
    /// needed. The configured metric is ignored.
    pub fn select_by_loo(&self, candidates: &[Candidate<F>], dataset: &Dataset<F>) -> Result<Selection<F>> {
        if !self.engine.is_stochastic() {
            return Err(SelectionError::InvalidParameter(
                "leave-one-out selection needs the Bayesian engine".into(),
            ));
        }
        check_candidates(candidates)?;

        let indices: Vec<usize> = (0..candidates.len()).collect();
        let evaluate = |&c: &usize| {
            let engine = self.engine.reseeded(derive_seed(self.seed, c, 0));
            engine
                .fit(candidates[c].formula(), dataset)
                .and_then(|model| score(&model, dataset, Metric::ElpdLoo))
        };
        let scores: Vec<Result<Score<F>>> = if self.parallel {
            run_units(&indices, evaluate)
        } else {
            indices.iter().map(evaluate).collect()
        };

        let results = candidates
            .iter()
            .zip(scores)
            .enumerate()
            .map(|(c, (candidate, score))| {
                let outcome = match score {
                    Ok(score) => match score.std_err() {
                        Some(std_err) => Outcome::Evaluated {
                            mean: score.value(),
                            std_err,
                            fold_scores: vec![score],
                        },
                        None => Outcome::Failed {
                            fold: None,
                            error: SelectionError::MetricUndefined {
                                metric: Metric::ElpdLoo.name(),
                                reason: "the standard error needs at least 2 points".into(),
                            },
                        },
                    },
                    Err(error) => Outcome::Failed { fold: None, error },
                };
                candidate_result(c, candidate, outcome)
            })
            .collect();

        Ok(self.finish(Metric::ElpdLoo, results))
    }

    fn evaluate_unit(
        &self,
        candidate_index: usize,
        candidate: &Candidate<F>,
        fold_index: usize,
        fold: &Fold,
        dataset: &Dataset<F>,
    ) -> Result<Score<F>> {
        let engine: Engine<F> = self
            .engine
            .reseeded(derive_seed(self.seed, candidate_index, fold_index));
        let train = fold.train(dataset);
        let test = fold.test(dataset);

        let model = engine.fit(candidate.formula(), &train)?;
        let fold_score = score(&model, &test, self.metric)?;
        tracing::debug!(
            candidate = candidate.name(),
            fold = fold.id(),
            metric = self.metric.name(),
            value = %fold_score.value(),
            "scored candidate on fold"
        );
        Ok(fold_score)
    }

    fn finish(&self, metric: Metric, results: Vec<CandidateResult<F>>) -> Selection<F> {
        let selection = Selection::from_results(metric, results);
        for failed in selection.failed() {
            if let Some(error) = failed.error() {
                tracing::warn!(
                    candidate = failed.name(),
                    kind = error.kind(),
                    error = %error,
                    "candidate excluded from ranking"
                );
            }
        }
        match selection.chosen() {
            Some(chosen) => tracing::info!(
                metric = metric.name(),
                candidate = chosen.name(),
                mean = %chosen.mean().unwrap_or(F::nan()),
                std_err = %chosen.std_err().unwrap_or(F::nan()),
                "selected candidate by the one standard error rule"
            ),
            None => tracing::warn!(metric = metric.name(), "every candidate failed"),
        }
        selection
    }
}

fn check_candidates<F: Float>(candidates: &[Candidate<F>]) -> Result<()> {
    if candidates.is_empty() {
        return Err(SelectionError::InvalidParameter(
            "at least one candidate is required".into(),
        ));
    }
    if let Some(c) = candidates.iter().find(|c| !c.complexity().is_finite()) {
        return Err(SelectionError::InvalidParameter(format!(
            "candidate `{}` has a non-finite complexity",
            c.name()
        )));
    }
    Ok(())
}

fn check_folds(folds: &[Fold], n_rows: usize) -> Result<()> {
    for fold in folds.iter() {
        if fold.test_indices().is_empty() {
            return Err(SelectionError::InvalidParameter(format!(
                "fold `{}` has an empty test set",
                fold.id()
            )));
        }
        let out_of_range = fold
            .train_indices()
            .iter()
            .chain(fold.test_indices().iter())
            .find(|&&i| i >= n_rows);
        if let Some(i) = out_of_range {
            return Err(SelectionError::InvalidParameter(format!(
                "fold `{}` refers to row {} of a dataset with {} rows",
                fold.id(),
                i,
                n_rows
            )));
        }
    }
    Ok(())
}

fn candidate_result<F: Float>(index: usize, candidate: &Candidate<F>, outcome: Outcome<F>) -> CandidateResult<F> {
    CandidateResult {
        index,
        candidate: candidate.clone(),
        outcome,
    }
}

/// Reduces the per-fold results of one candidate. The first failing fold, in
/// fold order, marks the whole candidate as failed.
fn aggregate<F: Float>(fold_results: Vec<Result<Score<F>>>, folds: &[Fold]) -> Outcome<F> {
    let mut fold_scores = Vec::with_capacity(fold_results.len());
    for (fold, result) in folds.iter().zip(fold_results) {
        match result {
            Ok(score) => fold_scores.push(score),
            Err(error) => {
                return Outcome::Failed {
                    fold: Some(fold.id().to_string()),
                    error,
                }
            }
        }
    }

    let values: Array1<F> = fold_scores.iter().map(|s| s.value()).collect();
    let n = F::cast(values.len());
    Outcome::Evaluated {
        mean: mean(values.view()),
        std_err: (sample_variance(values.view()) / n).sqrt(),
        fold_scores,
    }
}

#[cfg(feature = "parallel")]
fn run_units<U, T, E>(units: &[U], evaluate: E) -> Vec<T>
where
    U: Sync,
    T: Send,
    E: Fn(&U) -> T + Sync + Send,
{
    units.par_iter().map(evaluate).collect()
}

#[cfg(not(feature = "parallel"))]
fn run_units<U, T, E>(units: &[U], evaluate: E) -> Vec<T>
where
    E: Fn(&U) -> T,
{
    units.iter().map(evaluate).collect()
}
