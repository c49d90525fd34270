use ndarray::{Array1, ArrayView1};

use super::traits::{Fit, FittedModel};
use super::{check_design, DesignData};
use crate::datasets::Dataset;
use crate::error::{Result, SelectionError};
use crate::formula::FormulaSpec;
use crate::helpers::linalg::{cholesky_factorization, cholesky_solve};
use crate::Float;

/// The ordinary least squares engine
///
/// Closed-form and deterministic: solves the normal equations
/// `X^T X w = X^T y` through a Cholesky factorization. A rank-deficient
/// design matrix yields [`SelectionError::SingularDesign`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrdinaryLeastSquares;

/// A linear model fitted by ordinary least squares.
#[derive(Debug, Clone, PartialEq)]
pub struct OlsModel<F: Float> {
    formula: FormulaSpec<F>,
    template: Dataset<F>,
    column_names: Vec<String>,
    coefficients: Array1<F>,
    sigma: F,
    r_squared: F,
}

impl<F: Float> OlsModel<F> {
    /// This method returns the (parameter-free) least squares engine.
    pub fn params() -> OrdinaryLeastSquares {
        OrdinaryLeastSquares
    }

    /// This method is a getter for the coefficients vector.
    pub fn coefficients(&self) -> ArrayView1<F> {
        self.coefficients.view()
    }

    /// Names of the coefficients, in the order of [`OlsModel::coefficients`].
    pub fn coefficient_names(&self) -> &[String] {
        &self.column_names
    }

    /// Residual standard error, `NaN` when the fit has no residual degrees
    /// of freedom.
    pub fn sigma(&self) -> F {
        self.sigma
    }

    /// Coefficient of determination on the training data.
    pub fn r_squared(&self) -> F {
        self.r_squared
    }
}

impl<F: Float> Fit<F> for OrdinaryLeastSquares {
    type Object = OlsModel<F>;

    fn fit(&self, formula: &FormulaSpec<F>, dataset: &Dataset<F>) -> Result<Self::Object> {
        let DesignData { X, y, column_names } = DesignData::build(formula, dataset)?;
        let (n_samples, n_columns) = X.dim();
        if n_samples < n_columns {
            return Err(SelectionError::SingularDesign {
                rank_hint: n_samples,
                n_columns,
            });
        }

        let XtX = X.t().dot(&X);
        let Xty = X.t().dot(&y);
        let L = cholesky_factorization(XtX.view())?;
        let coefficients = cholesky_solve(L.view(), Xty.view());

        let residuals = &y - &X.dot(&coefficients);
        let rss = residuals.dot(&residuals);
        let df = n_samples - n_columns;
        let sigma = if df > 0 {
            (rss / F::cast(df)).sqrt()
        } else {
            F::nan()
        };
        let y_mean = y.sum() / F::cast(n_samples.max(1));
        let tss = y.fold(F::zero(), |acc, &v| acc + (v - y_mean) * (v - y_mean));
        let r_squared = F::one() - rss / tss;

        tracing::debug!(
            formula = %formula,
            n_samples,
            n_columns,
            sigma = %sigma,
            "fitted ordinary least squares"
        );

        Ok(OlsModel {
            formula: formula.clone(),
            template: dataset.select_rows(&[]),
            column_names,
            coefficients,
            sigma,
            r_squared,
        })
    }
}

impl<F: Float> FittedModel<F> for OlsModel<F> {
    fn formula(&self) -> &FormulaSpec<F> {
        &self.formula
    }

    fn template(&self) -> &Dataset<F> {
        &self.template
    }

    fn n_parameters(&self) -> usize {
        self.coefficients.len()
    }

    fn predict(&self, dataset: &Dataset<F>) -> Result<Array1<F>> {
        let X = check_design(&self.formula, dataset, &self.column_names)?;
        Ok(X.dot(&self.coefficients))
    }
}
