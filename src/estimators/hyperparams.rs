use super::param_guard::ParamGuard;
use crate::error::{Result, SelectionError};
use crate::Float;

/// A verified hyperparameter set ready for the fitting of a Bayesian linear
/// regression model
#[derive(Debug, Clone, PartialEq)]
pub struct BayesianValidParams<F> {
    n_draws: usize,
    prior_precision: F,
    prior_shape: F,
    prior_rate: F,
    seed: u64,
}

impl<F: Float> BayesianValidParams<F> {
    pub fn n_draws(&self) -> usize {
        self.n_draws
    }

    pub fn prior_precision(&self) -> F {
        self.prior_precision
    }

    pub fn prior_shape(&self) -> F {
        self.prior_shape
    }

    pub fn prior_rate(&self) -> F {
        self.prior_rate
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Copy of these parameters drawing from another random stream.
    pub fn with_seed(&self, seed: u64) -> Self {
        Self {
            seed,
            ..self.clone()
        }
    }
}

/// A hyper-parameter set during construction
///
/// Configures the conjugate Gaussian linear model:
/// ```ignore
/// y | beta, sigma2 ~ N(X beta, sigma2 I)
/// beta | sigma2    ~ N(0, sigma2 / prior_precision I)
/// sigma2           ~ InvGamma(prior_shape, prior_rate)
/// ```
/// The posterior is sampled exactly, `n_draws` independent draws.
#[derive(Debug, Clone, PartialEq)]
pub struct BayesianParams<F>(BayesianValidParams<F>);

impl<F: Float> Default for BayesianParams<F> {
    fn default() -> Self {
        Self::new()
    }
}

/// Configure and fit a Bayesian linear regression model
impl<F: Float> BayesianParams<F> {
    /// Create default Bayesian linear regression hyper parameters
    pub fn new() -> BayesianParams<F> {
        Self(BayesianValidParams {
            n_draws: 4000,
            prior_precision: F::cast(1e-4),
            prior_shape: F::cast(1e-3),
            prior_rate: F::cast(1e-3),
            seed: 0,
        })
    }

    /// Set the number of posterior draws.
    ///
    /// Defaults to `4000` if not set.
    pub fn n_draws(mut self, n_draws: usize) -> Self {
        self.0.n_draws = n_draws;
        self
    }

    /// Set the precision of the Gaussian prior on the coefficients, relative
    /// to the noise variance. A higher value shrinks the coefficients toward
    /// zero.
    /// Defaults to `1e-4` if not set.
    pub fn prior_precision(mut self, prior_precision: F) -> Self {
        self.0.prior_precision = prior_precision;
        self
    }

    /// Set the shape of the inverse-gamma prior on the noise variance.
    ///
    /// Defaults to `1e-3` if not set.
    pub fn prior_shape(mut self, prior_shape: F) -> Self {
        self.0.prior_shape = prior_shape;
        self
    }

    /// Set the rate of the inverse-gamma prior on the noise variance.
    ///
    /// Defaults to `1e-3` if not set.
    pub fn prior_rate(mut self, prior_rate: F) -> Self {
        self.0.prior_rate = prior_rate;
        self
    }

    /// Set the seed of the posterior sampler.
    ///
    /// Defaults to `0` if not set.
    pub fn seed(mut self, seed: u64) -> Self {
        self.0.seed = seed;
        self
    }
}

impl<F: Float> ParamGuard for BayesianParams<F> {
    type Checked = BayesianValidParams<F>;
    type Error = SelectionError;

    /// Validate the hyper parameters
    fn check_ref(&self) -> Result<&Self::Checked> {
        if self.0.n_draws < 10 {
            Err(SelectionError::InvalidParameter(format!(
                "n_draws must be at least 10, got {}",
                self.0.n_draws
            )))
        } else if !(self.0.prior_precision > F::zero()) {
            Err(SelectionError::InvalidParameter(format!(
                "prior_precision must be positive, got {}",
                self.0.prior_precision
            )))
        } else if !(self.0.prior_shape > F::zero()) || !(self.0.prior_rate > F::zero()) {
            Err(SelectionError::InvalidParameter(format!(
                "inverse-gamma prior needs positive shape and rate, got ({}, {})",
                self.0.prior_shape, self.0.prior_rate
            )))
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}
