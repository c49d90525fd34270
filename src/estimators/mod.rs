use ndarray::{Array1, Array2};

use crate::datasets::Dataset;
use crate::error::{Result, SelectionError};
use crate::formula::FormulaSpec;
use crate::Float;


pub mod bayesian;
pub mod hyperparams;
pub mod ols;
pub mod param_guard;
pub mod traits;

pub use bayesian::BayesianModel;
pub use hyperparams::{BayesianParams, BayesianValidParams};
pub use ols::{OlsModel, OrdinaryLeastSquares};
pub use param_guard::ParamGuard;
pub use traits::{Fit, FittedModel};

/// Fitting engine
///
/// Selects the algorithm family a [`FormulaSpec`] is fitted with. Engines are
/// plain values so that a selection run can hand the same engine to every
/// (candidate, fold) unit.
#[derive(Debug, Clone, PartialEq)]
pub enum Engine<F> {
    /// Ordinary least squares, deterministic.
    Ols,
    /// Posterior sampling of the conjugate Gaussian linear model.
    Bayesian(BayesianValidParams<F>),
}

impl<F: Float> Default for Engine<F> {
    fn default() -> Self {
        Engine::Ols
    }
}

impl<F: Float> Engine<F> {
    /// Builds a Bayesian engine from unchecked hyperparameters.
    pub fn bayesian(params: BayesianParams<F>) -> Result<Engine<F>> {
        Ok(Engine::Bayesian(params.check()?))
    }

    pub fn is_stochastic(&self) -> bool {
        matches!(self, Engine::Bayesian(_))
    }

    /// Copy of the engine drawing from the random stream `seed`. The least
    /// squares engine has no randomness and is returned unchanged.
    pub fn reseeded(&self, seed: u64) -> Engine<F> {
        match self {
            Engine::Ols => Engine::Ols,
            Engine::Bayesian(params) => Engine::Bayesian(params.with_seed(seed)),
        }
    }

    /// Fits `formula` on `dataset` and returns the model behind the
    /// engine-independent [`FittedModel`] capability.
    pub fn fit(
        &self,
        formula: &FormulaSpec<F>,
        dataset: &Dataset<F>,
    ) -> Result<Box<dyn FittedModel<F>>> {
        Ok(match self {
            Engine::Ols => Box::new(OrdinaryLeastSquares.fit(formula, dataset)?),
            Engine::Bayesian(params) => Box::new(params.fit(formula, dataset)?),
        })
    }
}

/// Fits `formula` to `training` with `engine`.
pub fn fit<F: Float>(
    formula: &FormulaSpec<F>,
    training: &Dataset<F>,
    engine: &Engine<F>,
) -> Result<Box<dyn FittedModel<F>>> {
    engine.fit(formula, training)
}

/// Design matrix, response and column names of a training set.
pub(crate) struct DesignData<F> {
    pub X: Array2<F>,
    pub y: Array1<F>,
    pub column_names: Vec<String>,
}

impl<F: Float> DesignData<F> {
    pub(crate) fn build(formula: &FormulaSpec<F>, dataset: &Dataset<F>) -> Result<DesignData<F>> {
        formula.validate(&dataset.schema())?;
        if dataset.is_empty() {
            return Err(SelectionError::InvalidParameter(
                "cannot fit a model on an empty training set".into(),
            ));
        }
        let y = formula.response_values(dataset)?;
        if let Some(v) = y.iter().find(|v| !v.is_finite()) {
            return Err(SelectionError::InvalidParameter(format!(
                "response `{}` contains the non-finite value {}",
                formula.response(),
                v
            )));
        }
        Ok(DesignData {
            X: formula.design_matrix(dataset)?,
            y,
            column_names: formula.column_names(dataset)?,
        })
    }
}

/// Builds the design matrix of `dataset` and checks that its columns match
/// the ones the model was trained on.
pub(crate) fn check_design<F: Float>(
    formula: &FormulaSpec<F>,
    dataset: &Dataset<F>,
    expected: &[String],
) -> Result<Array2<F>> {
    let names = formula.column_names(dataset)?;
    if names != expected {
        return Err(SelectionError::SchemaMismatch(format!(
            "design columns {:?} differ from the training columns {:?}",
            names, expected
        )));
    }
    formula.design_matrix(dataset)
}
