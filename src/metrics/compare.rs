use ndarray::Array1;

use super::{Metric, Score};
use crate::error::{Result, SelectionError};
use crate::helpers::stats::sample_variance;
use crate::Float;

/// One row of a leave-one-out model comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct LooComparison<F> {
    pub name: String,
    pub elpd: F,
    pub std_err: Option<F>,
    /// Difference to the best model, zero for the best and negative otherwise.
    pub elpd_diff: F,
    /// Standard error of the paired pointwise differences.
    pub se_diff: F,
}

/// This function ranks density scores computed on the same points, best
/// first, and reports each model's difference to the best one. The standard
/// error of a difference uses the paired pointwise values, which is much
/// tighter than combining the two marginal standard errors.
pub fn compare_loo<F: Float>(scores: &[(&str, &Score<F>)]) -> Result<Vec<LooComparison<F>>> {
    let mut pointwise = Vec::with_capacity(scores.len());
    for (name, score) in scores.iter() {
        let values = match (score.metric(), score.pointwise()) {
            (Metric::Elpd, Some(p)) | (Metric::ElpdLoo, Some(p)) => p,
            _ => {
                return Err(SelectionError::MetricUndefined {
                    metric: score.metric().name(),
                    reason: format!("`{}` has no pointwise predictive densities", name),
                })
            }
        };
        pointwise.push(values);
    }

    let best = match scores
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| {
            a.1.value()
                .partial_cmp(&b.1.value())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
    {
        Some(best) => best,
        None => return Ok(Vec::new()),
    };

    let n_points = pointwise[best].len();
    let mut rows = Vec::with_capacity(scores.len());
    for (i, (name, score)) in scores.iter().enumerate() {
        if pointwise[i].len() != n_points {
            return Err(SelectionError::InvalidParameter(format!(
                "`{}` was scored on {} points, expected {}",
                name,
                pointwise[i].len(),
                n_points
            )));
        }
        let diff: Array1<F> = &pointwise[i] - &pointwise[best];
        let se_diff = if i == best {
            F::zero()
        } else {
            (F::cast(n_points) * sample_variance(diff.view())).sqrt()
        };
        rows.push(LooComparison {
            name: name.to_string(),
            elpd: score.value(),
            std_err: score.std_err(),
            elpd_diff: diff.sum(),
            se_diff,
        });
    }

    rows.sort_by(|a, b| {
        b.elpd
            .partial_cmp(&a.elpd)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(rows)
}
