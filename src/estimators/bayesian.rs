use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Gamma, StandardNormal};

use super::hyperparams::{BayesianParams, BayesianValidParams};
use super::traits::{Fit, FittedModel};
use super::{check_design, DesignData};
use crate::datasets::Dataset;
use crate::error::{Result, SelectionError};
use crate::formula::FormulaSpec;
use crate::helpers::linalg::{backward_substitution, cholesky_positive_definite, cholesky_solve};
use crate::helpers::seeds::derive_seed;
use crate::helpers::stats::median;
use crate::Float;

/// Stream index reserved for posterior predictive noise.
const PREDICTIVE_STREAM: usize = 1;

/// A Bayesian linear regression model
///
/// Holds independent draws from the exact Normal–Inverse-Gamma posterior.
/// Point predictions are posterior medians of the linear predictor; the
/// predictive distribution adds Gaussian noise with each draw's scale.
#[derive(Debug, Clone, PartialEq)]
pub struct BayesianModel<F: Float> {
    formula: FormulaSpec<F>,
    template: Dataset<F>,
    column_names: Vec<String>,
    coefficient_draws: Array2<F>,
    sigma_draws: Array1<F>,
    seed: u64,
}

impl<F: Float> BayesianModel<F> {
    /// This method instantiates the hyperparameters of the posterior sampler
    /// with their default values.
    pub fn params() -> BayesianParams<F> {
        BayesianParams::new()
    }

    /// Posterior draws of the coefficients, shaped `(n_draws, n_coefficients)`.
    pub fn coefficient_draws(&self) -> ArrayView2<F> {
        self.coefficient_draws.view()
    }

    /// Posterior draws of the residual standard deviation.
    pub fn sigma_draws(&self) -> ArrayView1<F> {
        self.sigma_draws.view()
    }

    /// Posterior median of each coefficient.
    pub fn coefficient_medians(&self) -> Array1<F> {
        self.coefficient_draws.map_axis(Axis(0), median)
    }

    pub fn coefficient_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn n_draws(&self) -> usize {
        self.sigma_draws.len()
    }

    /// Linear predictor of each draw, shaped `(n_draws, n_rows)`.
    fn linear_predictor(&self, dataset: &Dataset<F>) -> Result<Array2<F>> {
        let X = check_design(&self.formula, dataset, &self.column_names)?;
        Ok(self.coefficient_draws.dot(&X.t()))
    }
}

impl<F: Float> Fit<F> for BayesianValidParams<F> {
    type Object = BayesianModel<F>;

    fn fit(&self, formula: &FormulaSpec<F>, dataset: &Dataset<F>) -> Result<Self::Object> {
        let DesignData { X, y, column_names } = DesignData::build(formula, dataset)?;
        let (n_samples, n_columns) = X.dim();

        // posterior precision of the coefficients, in units of sigma^2
        let mut A = X.t().dot(&X);
        for j in 0..n_columns {
            A[[j, j]] += self.prior_precision();
        }
        let Xty = X.t().dot(&y);
        let L = cholesky_positive_definite(A.view())?;
        let beta_n = cholesky_solve(L.view(), Xty.view());

        let shape_n = self.prior_shape() + F::cast(n_samples) / F::cast(2.);
        let quad = y.dot(&y) - beta_n.dot(&Xty);
        let rate_n = self.prior_rate() + (quad / F::cast(2.)).max(F::zero());

        let precision = Gamma::new(
            shape_n.to_f64().unwrap_or(f64::NAN),
            1. / rate_n.to_f64().unwrap_or(f64::NAN),
        )
        .map_err(|e| SelectionError::InvalidParameter(format!("noise posterior: {}", e)))?;

        let mut rng = StdRng::seed_from_u64(self.seed());
        let n_draws = self.n_draws();
        let mut coefficient_draws = Array2::<F>::zeros((n_draws, n_columns));
        let mut sigma_draws = Array1::<F>::zeros(n_draws);

        for s in 0..n_draws {
            let tau: f64 = precision.sample(&mut rng);
            let sigma = F::cast(tau.recip().sqrt());
            let z = Array1::from_iter((0..n_columns).map(|_| {
                let v: f64 = StandardNormal.sample(&mut rng);
                F::cast(v)
            }));
            // u ~ N(0, A^-1) since L^T u = z
            let u = backward_substitution(L.view(), z.view());
            coefficient_draws
                .row_mut(s)
                .assign(&(&beta_n + &(u * sigma)));
            sigma_draws[s] = sigma;
        }

        tracing::debug!(
            formula = %formula,
            n_samples,
            n_columns,
            n_draws,
            seed = self.seed(),
            "sampled Bayesian linear regression posterior"
        );

        Ok(BayesianModel {
            formula: formula.clone(),
            template: dataset.select_rows(&[]),
            column_names,
            coefficient_draws,
            sigma_draws,
            seed: self.seed(),
        })
    }
}

impl<F: Float> FittedModel<F> for BayesianModel<F> {
    fn formula(&self) -> &FormulaSpec<F> {
        &self.formula
    }

    fn template(&self) -> &Dataset<F> {
        &self.template
    }

    fn n_parameters(&self) -> usize {
        self.column_names.len()
    }

    fn predict(&self, dataset: &Dataset<F>) -> Result<Array1<F>> {
        let eta = self.linear_predictor(dataset)?;
        Ok(eta.map_axis(Axis(0), median))
    }

    /// Posterior predictive draws. The noise stream is derived from the
    /// sampler seed, so repeated calls return identical draws.
    fn predict_distribution(&self, dataset: &Dataset<F>) -> Result<Array2<F>> {
        let mut draws = self.linear_predictor(dataset)?;
        let mut rng = StdRng::seed_from_u64(derive_seed(self.seed, PREDICTIVE_STREAM, 0));
        for (mut row, &sigma) in draws.rows_mut().into_iter().zip(self.sigma_draws.iter()) {
            for eta in row.iter_mut() {
                let z: f64 = StandardNormal.sample(&mut rng);
                *eta += sigma * F::cast(z);
            }
        }
        Ok(draws)
    }

    fn log_likelihood(&self, dataset: &Dataset<F>) -> Result<Array2<F>> {
        let y = self.formula.response_values(dataset)?;
        let mut ll = self.linear_predictor(dataset)?;
        let half_log_2pi = F::cast(0.5 * (2. * std::f64::consts::PI).ln());
        for (mut row, &sigma) in ll.rows_mut().into_iter().zip(self.sigma_draws.iter()) {
            let log_sigma = sigma.ln();
            for (value, &yi) in row.iter_mut().zip(y.iter()) {
                let z = (yi - *value) / sigma;
                *value = -half_log_2pi - log_sigma - F::cast(0.5) * z * z;
            }
        }
        Ok(ll)
    }
}
