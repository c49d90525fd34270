use ndarray::{Array1, ArrayView1, ArrayView2, Axis};

use crate::datasets::Dataset;
use crate::error::{Result, SelectionError};
use crate::estimators::FittedModel;
use crate::helpers::stats::{log_sum_exp, mean, sample_variance};
use crate::Float;

mod compare;
pub mod psis;

#[cfg(test)]
mod tests;

pub use compare::{compare_loo, LooComparison};

/// Whether a metric improves downward (errors) or upward (densities, R²).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Minimize,
    Maximize,
}

impl Direction {
    /// Returns `true` if `a` is strictly better than `b`.
    pub fn is_better<F: Float>(&self, a: F, b: F) -> bool {
        match self {
            Direction::Minimize => a < b,
            Direction::Maximize => a > b,
        }
    }
}

/// Scoring metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Root-mean-squared error.
    Rmse,
    /// Mean absolute error. Less sensitive than RMSE to heavy-tailed
    /// residuals.
    Mae,
    /// Squared correlation between actual and predicted responses.
    Rsq,
    /// Log pointwise predictive density of a held-out test set.
    Elpd,
    /// Pareto-smoothed importance sampling leave-one-out estimate of the
    /// expected log predictive density, computed on the data the model was
    /// fitted to.
    ElpdLoo,
}

impl Metric {
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Rmse => "rmse",
            Metric::Mae => "mae",
            Metric::Rsq => "rsq",
            Metric::Elpd => "elpd",
            Metric::ElpdLoo => "elpd_loo",
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Metric::Rmse | Metric::Mae => Direction::Minimize,
            Metric::Rsq | Metric::Elpd | Metric::ElpdLoo => Direction::Maximize,
        }
    }

    /// Returns `true` if the metric needs pointwise log-likelihood draws.
    pub fn is_density(&self) -> bool {
        matches!(self, Metric::Elpd | Metric::ElpdLoo)
    }
}

/// Reliability class of a Pareto shape estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ParetoKCategory {
    /// `k <= 0.5`
    Good,
    /// `0.5 < k <= 0.7`
    Ok,
    /// `0.7 < k <= 1`
    Bad,
    /// `k > 1`, or the tail could not be fitted
    VeryBad,
}

impl ParetoKCategory {
    pub fn from_k<F: Float>(k: F) -> ParetoKCategory {
        if k <= F::cast(0.5) {
            ParetoKCategory::Good
        } else if k <= F::cast(0.7) {
            ParetoKCategory::Ok
        } else if k <= F::one() {
            ParetoKCategory::Bad
        } else {
            ParetoKCategory::VeryBad
        }
    }
}

/// A test point whose importance-sampling estimate is unreliable.
#[derive(Debug, Clone, PartialEq)]
pub struct ParetoWarning<F> {
    pub index: usize,
    pub k: F,
    pub category: ParetoKCategory,
}

/// Diagnostics of a PSIS-LOO estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct LooDiagnostics<F> {
    pareto_k: Array1<F>,
    p_loo: F,
    warnings: Vec<ParetoWarning<F>>,
}

impl<F: Float> LooDiagnostics<F> {
    /// Pareto shape estimate of every test point.
    pub fn pareto_k(&self) -> ArrayView1<F> {
        self.pareto_k.view()
    }

    /// Effective number of parameters, `lpd - elpd_loo`.
    pub fn p_loo(&self) -> F {
        self.p_loo
    }

    /// Points with `k > 0.5`.
    pub fn warnings(&self) -> &[ParetoWarning<F>] {
        &self.warnings
    }

    pub fn count(&self, category: ParetoKCategory) -> usize {
        self.pareto_k
            .iter()
            .filter(|&&k| ParetoKCategory::from_k(k) == category)
            .count()
    }
}

/// The outcome of scoring a fitted model on a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Score<F> {
    metric: Metric,
    value: F,
    pointwise: Option<Array1<F>>,
    std_err: Option<F>,
    diagnostics: Option<LooDiagnostics<F>>,
}

impl<F: Float> Score<F> {
    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn value(&self) -> F {
        self.value
    }

    /// Per-point contributions, for density metrics.
    pub fn pointwise(&self) -> Option<ArrayView1<F>> {
        self.pointwise.as_ref().map(|p| p.view())
    }

    /// Standard error of the summed density, `sqrt(n * var(pointwise))`.
    pub fn std_err(&self) -> Option<F> {
        self.std_err
    }

    pub fn diagnostics(&self) -> Option<&LooDiagnostics<F>> {
        self.diagnostics.as_ref()
    }

    /// Pareto warnings, empty for metrics without importance sampling.
    pub fn warnings(&self) -> &[ParetoWarning<F>] {
        self.diagnostics
            .as_ref()
            .map(|d| d.warnings())
            .unwrap_or(&[])
    }
}

/// Root-mean-squared error `sqrt(mean((actual - predicted)^2))`.
pub fn rmse<F: Float>(actual: ArrayView1<F>, predicted: ArrayView1<F>) -> Result<F> {
    check_pairs(Metric::Rmse, actual, predicted)?;
    let mse = mean((&actual - &predicted).mapv(|r| r * r).view());
    Ok(mse.sqrt())
}

/// Mean absolute error `mean(|actual - predicted|)`.
pub fn mae<F: Float>(actual: ArrayView1<F>, predicted: ArrayView1<F>) -> Result<F> {
    check_pairs(Metric::Mae, actual, predicted)?;
    Ok(mean((&actual - &predicted).mapv(|r| r.abs()).view()))
}

/// Squared Pearson correlation between actual and predicted values.
pub fn rsq<F: Float>(actual: ArrayView1<F>, predicted: ArrayView1<F>) -> Result<F> {
    check_pairs(Metric::Rsq, actual, predicted)?;
    let (ma, mp) = (mean(actual), mean(predicted));
    let mut sap = F::zero();
    let mut saa = F::zero();
    let mut spp = F::zero();
    for (&a, &p) in actual.iter().zip(predicted.iter()) {
        sap += (a - ma) * (p - mp);
        saa += (a - ma) * (a - ma);
        spp += (p - mp) * (p - mp);
    }
    if saa == F::zero() || spp == F::zero() {
        return Err(undefined(Metric::Rsq, "zero variance in actual or predicted values"));
    }
    Ok(sap * sap / (saa * spp))
}

fn check_pairs<F: Float>(metric: Metric, actual: ArrayView1<F>, predicted: ArrayView1<F>) -> Result<()> {
    if actual.len() != predicted.len() {
        return Err(SelectionError::InvalidParameter(format!(
            "{} actual values for {} predictions",
            actual.len(),
            predicted.len()
        )));
    }
    if actual.is_empty() {
        return Err(undefined(metric, "empty test set"));
    }
    Ok(())
}

fn undefined(metric: Metric, reason: &str) -> SelectionError {
    SelectionError::MetricUndefined {
        metric: metric.name(),
        reason: reason.to_string(),
    }
}

/// Scores `model` on `test` with `metric`.
///
/// Deterministic metrics are pure functions of the model and the data. For
/// [`Metric::ElpdLoo`], `test` must be the dataset the model was fitted to;
/// every point whose Pareto shape exceeds `0.5` is reported in the score's
/// warnings and logged.
pub fn score<F, M>(model: &M, test: &Dataset<F>, metric: Metric) -> Result<Score<F>>
where
    F: Float,
    M: FittedModel<F> + ?Sized,
{
    if test.is_empty() {
        return Err(undefined(metric, "empty test set"));
    }

    let score = match metric {
        Metric::Rmse | Metric::Mae | Metric::Rsq => {
            let actual = model.formula().response_values(test)?;
            let predicted = model.predict(test)?;
            let value = match metric {
                Metric::Rmse => rmse(actual.view(), predicted.view())?,
                Metric::Mae => mae(actual.view(), predicted.view())?,
                _ => rsq(actual.view(), predicted.view())?,
            };
            Score {
                metric,
                value,
                pointwise: None,
                std_err: None,
                diagnostics: None,
            }
        }
        Metric::Elpd | Metric::ElpdLoo => {
            let log_lik = model.log_likelihood(test).map_err(|e| match e {
                SelectionError::MetricUndefined { reason, .. } => undefined(metric, &reason),
                other => other,
            })?;
            density_score(metric, log_lik.view())?
        }
    };

    if !score.value.is_finite() {
        return Err(undefined(metric, "the score is not finite"));
    }
    Ok(score)
}

/// Log pointwise predictive density of each column of `log_lik`
/// (`n_draws x n_points`).
pub fn lpd_pointwise<F: Float>(log_lik: ArrayView2<F>) -> Array1<F> {
    let log_s = F::cast(log_lik.nrows()).ln();
    log_lik.map_axis(Axis(0), |column| log_sum_exp(column) - log_s)
}

fn density_score<F: Float>(metric: Metric, log_lik: ArrayView2<F>) -> Result<Score<F>> {
    if log_lik.nrows() == 0 {
        return Err(undefined(metric, "no posterior draws"));
    }
    let lpd = lpd_pointwise(log_lik);

    let (pointwise, diagnostics) = match metric {
        Metric::ElpdLoo => {
            let (elpd, pareto_k) = psis::psis_loo(log_lik);
            let p_loo = lpd.sum() - elpd.sum();
            let warnings = pareto_warnings(pareto_k.view());
            (
                elpd,
                Some(LooDiagnostics {
                    pareto_k,
                    p_loo,
                    warnings,
                }),
            )
        }
        _ => (lpd, None),
    };

    let n = pointwise.len();
    let se = (F::cast(n) * sample_variance(pointwise.view())).sqrt();
    Ok(Score {
        metric,
        value: pointwise.sum(),
        std_err: if se.is_finite() { Some(se) } else { None },
        pointwise: Some(pointwise),
        diagnostics,
    })
}

fn pareto_warnings<F: Float>(pareto_k: ArrayView1<F>) -> Vec<ParetoWarning<F>> {
    let warnings: Vec<ParetoWarning<F>> = pareto_k
        .iter()
        .enumerate()
        .filter_map(|(index, &k)| match ParetoKCategory::from_k(k) {
            ParetoKCategory::Good => None,
            category => Some(ParetoWarning { index, k, category }),
        })
        .collect();

    for w in warnings.iter().filter(|w| w.category > ParetoKCategory::Ok) {
        tracing::warn!(
            index = w.index,
            k = %w.k,
            "Pareto k above 0.7, the leave-one-out estimate for this point is unreliable"
        );
    }
    let ok = warnings
        .iter()
        .filter(|w| w.category == ParetoKCategory::Ok)
        .count();
    if ok > 0 {
        tracing::warn!(n_points = ok, "Pareto k between 0.5 and 0.7 for some points");
    }
    warnings
}
