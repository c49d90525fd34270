#[cfg(test)]
mod tests;

/// This module implements the dense linear algebra needed by the fitting
/// engines. Design matrices are small (tens of columns), so the normal
/// equations are solved through a Cholesky factorization instead of calling
/// into a BLAS/LAPACK backend.
pub mod linalg {
    use crate::error::{Result, SelectionError};
    use crate::Float;
    use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

    /// This function computes the lower triangular factor `L` of a symmetric
    /// positive definite matrix such that `A = L L^T`. A pivot smaller than a
    /// tolerance relative to the largest diagonal entry is reported as a
    /// rank-deficient matrix.
    pub fn cholesky_factorization<F: Float>(A: ArrayView2<F>) -> Result<Array2<F>> {
        let n = A.nrows();
        let max_diag = A.diag().fold(F::zero(), |acc, &a| acc.max(a.abs()));
        let rel_tol = F::cast(1e-10).max(F::epsilon() * F::cast(10 * n.max(1)));
        factorize(A, max_diag * rel_tol)
    }

    /// Same factorization, only requiring every pivot to be strictly
    /// positive. Meant for matrices that are positive definite by
    /// construction, such as a ridge-regularized `X^T X + lambda I`, whose
    /// smallest eigenvalue can sit far below a tolerance relative to the
    /// diagonal.
    pub fn cholesky_positive_definite<F: Float>(A: ArrayView2<F>) -> Result<Array2<F>> {
        factorize(A, F::zero())
    }

    fn factorize<F: Float>(A: ArrayView2<F>, tol: F) -> Result<Array2<F>> {
        let n = A.nrows();
        let mut L = Array2::<F>::zeros((n, n));
        for j in 0..n {
            let mut pivot = A[[j, j]];
            for k in 0..j {
                pivot -= L[[j, k]] * L[[j, k]];
            }
            if !(pivot > tol) {
                return Err(SelectionError::SingularDesign {
                    rank_hint: j,
                    n_columns: n,
                });
            }
            let ljj = pivot.sqrt();
            L[[j, j]] = ljj;

            for i in (j + 1)..n {
                let mut s = A[[i, j]];
                for k in 0..j {
                    s -= L[[i, k]] * L[[j, k]];
                }
                L[[i, j]] = s / ljj;
            }
        }
        Ok(L)
    }

    /// Solves `L x = b` for a lower triangular `L`.
    pub fn forward_substitution<F: Float>(L: ArrayView2<F>, b: ArrayView1<F>) -> Array1<F> {
        let n = b.len();
        let mut x = Array1::<F>::zeros(n);
        for i in 0..n {
            let mut s = b[i];
            for k in 0..i {
                s -= L[[i, k]] * x[k];
            }
            x[i] = s / L[[i, i]];
        }
        x
    }

    /// Solves `L^T x = b` for a lower triangular `L`, without forming the
    /// transpose.
    pub fn backward_substitution<F: Float>(L: ArrayView2<F>, b: ArrayView1<F>) -> Array1<F> {
        let n = b.len();
        let mut x = Array1::<F>::zeros(n);
        for i in (0..n).rev() {
            let mut s = b[i];
            for k in (i + 1)..n {
                s -= L[[k, i]] * x[k];
            }
            x[i] = s / L[[i, i]];
        }
        x
    }

    /// Solves `A x = b` given the Cholesky factor `L` of `A`.
    pub fn cholesky_solve<F: Float>(L: ArrayView2<F>, b: ArrayView1<F>) -> Array1<F> {
        let z = forward_substitution(L, b);
        backward_substitution(L, z.view())
    }
}

/// This module contains the reductions shared by the scorer and the selector.
pub mod stats {
    use crate::Float;
    use ndarray::{ArrayBase, ArrayView1, Data, Ix1};
    use ndarray_stats::QuantileExt;
    use std::cmp::Ordering;

    /// This is a helper method that sorts the indices of an array based on some
    /// `compare` closure. It is used to locate the upper tail of the importance
    /// ratios before Pareto smoothing.
    /// Reference: `https://github.com/rust-ndarray/ndarray/issues/1145`
    pub fn argsort_by<S, C>(arr: &ArrayBase<S, Ix1>, mut compare: C) -> Vec<usize>
    where
        S: Data,
        C: FnMut(&S::Elem, &S::Elem) -> Ordering,
    {
        let mut indices: Vec<usize> = (0..arr.len()).collect();
        indices.sort_unstable_by(move |&i, &j| compare(&arr[i], &arr[j]));
        indices
    }

    /// Numerically stable `log(sum(exp(x)))`. Returns `-inf` on an empty
    /// input.
    pub fn log_sum_exp<F: Float>(x: ArrayView1<F>) -> F {
        let max = match x.max() {
            Ok(&m) => m,
            Err(_) => return F::neg_infinity(),
        };
        if !max.is_finite() {
            return max;
        }
        max + x.iter().map(|&v| (v - max).exp()).sum::<F>().ln()
    }

    /// Arithmetic mean, `NaN` on an empty input.
    pub fn mean<F: Float>(x: ArrayView1<F>) -> F {
        if x.is_empty() {
            return F::nan();
        }
        x.sum() / F::cast(x.len())
    }

    /// Sample variance with `n - 1` degrees of freedom, `NaN` below two
    /// values.
    pub fn sample_variance<F: Float>(x: ArrayView1<F>) -> F {
        let n = x.len();
        if n < 2 {
            return F::nan();
        }
        let m = mean(x);
        x.iter().map(|&v| (v - m) * (v - m)).sum::<F>() / F::cast(n - 1)
    }

    /// Median of the values, `NaN` on an empty input.
    pub fn median<F: Float>(x: ArrayView1<F>) -> F {
        let mut sorted: Vec<F> = x.to_vec();
        if sorted.is_empty() {
            return F::nan();
        }
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / F::cast(2.)
        } else {
            sorted[mid]
        }
    }
}

/// Seed derivation for independent fit-and-score units.
pub mod seeds {
    /// SplitMix64 finalizer.
    fn mix(mut z: u64) -> u64 {
        z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// This function derives the seed of the unit `(candidate, fold)` from a
    /// base seed. The result depends only on its three inputs, so units can
    /// run in any order, or concurrently, and still reproduce.
    pub fn derive_seed(base: u64, candidate: usize, fold: usize) -> u64 {
        mix(mix(mix(base) ^ candidate as u64) ^ fold as u64)
    }
}

/// This module contains helpers functions to efficiently write tests.
pub mod test_helpers {
    use crate::datasets::{Column, Dataset};
    use crate::Float;
    use approx::AbsDiffEq;
    use ndarray::prelude::*;
    use ndarray::{Array1, Array2, ArrayView1};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    pub fn assert_array_all_close<F>(x: ArrayView1<F>, y: ArrayView1<F>, delta: F)
    where
        F: Float + AbsDiffEq<Epsilon = F>,
    {
        assert_eq!(x.len(), y.len());
        for i in 0..x.len() {
            if x[i].abs_diff_ne(&y[i], delta) {
                panic!("x: {}, y: {} ; with precision level {}", x[i], y[i], delta);
            }
        }
    }

    pub fn fill_random_vector(capacity: usize, seed: u64) -> Vec<f64> {
        let mut r = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0., 1.).unwrap();

        let mut data_x: Vec<f64> = Vec::with_capacity(capacity);
        for _ in 0..data_x.capacity() {
            data_x.push(normal.sample(&mut r));
        }
        data_x
    }

    pub fn generate_random_data(n_samples: usize, n_features: usize) -> (Array2<f64>, Array1<f64>) {
        let data_x = fill_random_vector(n_samples * n_features, 42);
        let data_w = fill_random_vector(n_features, 43);
        let data_e = fill_random_vector(n_samples, 44);
        let X = Array2::from_shape_vec((n_samples, n_features).f(), data_x).unwrap();
        let true_w = Array1::from_shape_vec(n_features, data_w).unwrap();
        let noise = Array1::from_shape_vec(n_samples, data_e).unwrap() * 0.5;
        let y = X.dot(&true_w) + noise;

        (X, y)
    }

    /// Random dataset with numeric predictors `x0, x1, ...` and a response
    /// `y` linear in them.
    pub fn generate_random_dataset(n_samples: usize, n_features: usize) -> Dataset<f64> {
        let (X, y) = generate_random_data(n_samples, n_features);
        let mut columns: Vec<(String, Column<f64>)> = X
            .columns()
            .into_iter()
            .enumerate()
            .map(|(j, col)| (format!("x{}", j), Column::numeric(col.iter().copied())))
            .collect();
        columns.push(("y".to_string(), Column::Numeric(y)));
        Dataset::new(columns).unwrap()
    }

    /// Dataset with predictors `x0, x1, x2` where the response
    /// `y = 1 + 2 x0 - x1 + 0.3 e` ignores `x2`.
    pub fn generate_selection_dataset(n_samples: usize) -> Dataset<f64> {
        let x0 = Array1::from(fill_random_vector(n_samples, 7));
        let x1 = Array1::from(fill_random_vector(n_samples, 8));
        let x2 = Array1::from(fill_random_vector(n_samples, 9));
        let e = Array1::from(fill_random_vector(n_samples, 10));
        let y = &x0 * 2. - &x1 + e * 0.3 + 1.;
        Dataset::new(vec![
            ("x0".to_string(), Column::Numeric(x0)),
            ("x1".to_string(), Column::Numeric(x1)),
            ("x2".to_string(), Column::Numeric(x2)),
            ("y".to_string(), Column::Numeric(y)),
        ])
        .unwrap()
    }
}
