use crate::error::{Result, SelectionError};
use crate::estimators::{Engine, ParamGuard};
use crate::metrics::Metric;
use crate::Float;

/// A verified hyperparameter set ready to run a model selection
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorValidParams<F> {
    pub(super) metric: Metric,
    pub(super) engine: Engine<F>,
    pub(super) seed: u64,
    pub(super) parallel: bool,
}

impl<F: Float> SelectorValidParams<F> {
    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn engine(&self) -> &Engine<F> {
        &self.engine
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn parallel(&self) -> bool {
        self.parallel
    }
}

/// A hyper-parameter set during construction
///
/// Configures how candidates are fitted, scored and compared across folds.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorParams<F>(pub(super) SelectorValidParams<F>);

impl<F: Float> Default for SelectorParams<F> {
    fn default() -> Self {
        Self::new()
    }
}

/// Configure a model selection run
impl<F: Float> SelectorParams<F> {
    /// Create default model selection hyper parameters
    pub fn new() -> SelectorParams<F> {
        Self(SelectorValidParams {
            metric: Metric::Rmse,
            engine: Engine::Ols,
            seed: 0,
            parallel: true,
        })
    }

    /// Set the metric candidates are scored with on every fold.
    ///
    /// Defaults to [`Metric::Rmse`] if not set.
    pub fn metric(mut self, metric: Metric) -> Self {
        self.0.metric = metric;
        self
    }

    /// Set the fitting engine.
    ///
    /// Defaults to [`Engine::Ols`] if not set.
    pub fn engine(mut self, engine: Engine<F>) -> Self {
        self.0.engine = engine;
        self
    }

    /// Set the base seed from which the seed of every (candidate, fold) unit
    /// is derived.
    /// Defaults to `0` if not set.
    pub fn seed(mut self, seed: u64) -> Self {
        self.0.seed = seed;
        self
    }

    /// Evaluates the (candidate, fold) units on the rayon thread pool. Has no
    /// effect without the `parallel` feature.
    /// Defaults to `true` if not set.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.0.parallel = parallel;
        self
    }
}

impl<F: Float> ParamGuard for SelectorParams<F> {
    type Checked = SelectorValidParams<F>;
    type Error = SelectionError;

    /// Validate the hyper parameters
    fn check_ref(&self) -> Result<&Self::Checked> {
        if self.0.metric == Metric::ElpdLoo {
            Err(SelectionError::InvalidParameter(
                "elpd_loo scores the fitting data itself, use `select_by_loo` instead of folds"
                    .into(),
            ))
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}
