use ndarray::{Array1, Array2};
use std::fmt::Debug;

use crate::datasets::{Dataset, Record};
use crate::error::{Result, SelectionError};
use crate::formula::{single_record_dataset, FormulaSpec};
use crate::Float;

/// Fit trait
///
/// The fittable trait allows an estimator to be fitted to a dataset under a
/// given functional form. More formally, the engine estimates coefficients
/// (or a posterior over coefficients) for the design matrix that the
/// [`FormulaSpec`] builds from the dataset. Fitting never mutates the dataset.
pub trait Fit<F: Float> {
    type Object: FittedModel<F>;

    fn fit(&self, formula: &FormulaSpec<F>, dataset: &Dataset<F>) -> Result<Self::Object>;
}

/// FittedModel trait
///
/// The capability shared by every fitting engine. Callers only go through
/// this trait and never branch on the engine that produced the model.
/// Optional capabilities (predictive draws, pointwise log-likelihood) fail
/// with [`SelectionError::MetricUndefined`] when the engine does not provide
/// them.
pub trait FittedModel<F: Float>: Debug + Send + Sync {
    /// The functional form the model was fitted with.
    fn formula(&self) -> &FormulaSpec<F>;

    /// Zero-row dataset carrying the training schema and categorical levels.
    fn template(&self) -> &Dataset<F>;

    /// Number of estimated regression coefficients.
    fn n_parameters(&self) -> usize;

    /// Point prediction of the response for every row of `dataset`.
    fn predict(&self, dataset: &Dataset<F>) -> Result<Array1<F>>;

    /// Point prediction for a single record.
    fn predict_record(&self, record: &Record<F>) -> Result<F> {
        let dataset = single_record_dataset(record, self.template())?;
        Ok(self.predict(&dataset)?[0])
    }

    /// Draws from the predictive distribution, shaped `(n_draws, n_rows)`.
    fn predict_distribution(&self, _dataset: &Dataset<F>) -> Result<Array2<F>> {
        Err(SelectionError::MetricUndefined {
            metric: "predictive distribution",
            reason: "the fitting engine does not produce posterior draws".into(),
        })
    }

    /// Pointwise log-likelihood of the observed responses, shaped
    /// `(n_draws, n_rows)`.
    fn log_likelihood(&self, _dataset: &Dataset<F>) -> Result<Array2<F>> {
        Err(SelectionError::MetricUndefined {
            metric: "log-likelihood",
            reason: "the fitting engine does not produce posterior draws".into(),
        })
    }
}

impl<F: Float, M: FittedModel<F> + ?Sized> FittedModel<F> for Box<M> {
    fn formula(&self) -> &FormulaSpec<F> {
        (**self).formula()
    }

    fn template(&self) -> &Dataset<F> {
        (**self).template()
    }

    fn n_parameters(&self) -> usize {
        (**self).n_parameters()
    }

    fn predict(&self, dataset: &Dataset<F>) -> Result<Array1<F>> {
        (**self).predict(dataset)
    }

    fn predict_record(&self, record: &Record<F>) -> Result<F> {
        (**self).predict_record(record)
    }

    fn predict_distribution(&self, dataset: &Dataset<F>) -> Result<Array2<F>> {
        (**self).predict_distribution(dataset)
    }

    fn log_likelihood(&self, dataset: &Dataset<F>) -> Result<Array2<F>> {
        (**self).log_likelihood(dataset)
    }
}
