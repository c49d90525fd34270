//! Pareto-smoothed importance sampling.
//!
//! Leave-one-out predictive densities are estimated from draws of a model
//! fitted on all points, reweighting each draw by `1 / p(y_i | draw)`. The
//! largest raw weights are replaced by quantiles of a generalized Pareto
//! distribution fitted to the upper tail; the fitted shape `k` measures how
//! reliable the estimate is.
//!
//! Reference: Vehtari, Simpson, Gelman, Yao and Gabry, "Pareto Smoothed
//! Importance Sampling", `https://arxiv.org/abs/1507.02646`

use ndarray::{Array1, ArrayView1, ArrayView2, Axis};

use crate::helpers::stats::{argsort_by, log_sum_exp};
use crate::Float;

/// Tail fits on fewer draws are not attempted.
const MIN_TAIL_LENGTH: usize = 5;

/// This function computes the PSIS-LOO pointwise expected log predictive
/// density and the Pareto shape estimate of every column of `log_lik`
/// (`n_draws x n_points`).
pub fn psis_loo<F: Float>(log_lik: ArrayView2<F>) -> (Array1<F>, Array1<F>) {
    let n_points = log_lik.ncols();
    let mut elpd = Array1::<F>::zeros(n_points);
    let mut pareto_k = Array1::<F>::zeros(n_points);

    for (i, ll_i) in log_lik.axis_iter(Axis(1)).enumerate() {
        let log_ratios = ll_i.mapv(|v| -v);
        let (lw, k) = psis_smooth(log_ratios.view());
        let lw = &lw - log_sum_exp(lw.view());
        elpd[i] = log_sum_exp((&lw + &ll_i).view());
        pareto_k[i] = k;
    }
    (elpd, pareto_k)
}

/// Tail length used for `n_draws` draws.
pub fn tail_length(n_draws: usize) -> usize {
    let s = n_draws as f64;
    (0.2 * s).min(3. * s.sqrt()).ceil() as usize
}

/// This function smooths the log importance ratios of one point. It returns
/// the (unnormalized) smoothed log weights and the Pareto shape estimate,
/// infinite when the tail could not be fitted.
pub fn psis_smooth<F: Float>(log_ratios: ArrayView1<F>) -> (Array1<F>, F) {
    let n_draws = log_ratios.len();
    let max_ratio = log_ratios.fold(F::neg_infinity(), |acc, &v| acc.max(v));
    let mut lw = log_ratios.mapv(|v| v - max_ratio);
    let mut khat = F::infinity();

    let tail_len = tail_length(n_draws);
    if tail_len >= MIN_TAIL_LENGTH && tail_len < n_draws {
        let order = argsort_by(&lw, |a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let tail_ids = &order[n_draws - tail_len..];
        let lw_tail: Vec<F> = tail_ids.iter().map(|&s| lw[s]).collect();
        let cutoff = lw[order[n_draws - tail_len - 1]];

        let spread = lw_tail[tail_len - 1] - lw_tail[0];
        if spread.abs() > F::epsilon() / F::cast(100.) {
            let exp_cutoff = cutoff.exp();
            let x: Vec<F> = lw_tail.iter().map(|&v| v.exp() - exp_cutoff).collect();
            let (k, sigma) = gpd_fit(&x);
            if k.is_finite() && sigma.is_finite() && sigma > F::zero() {
                for (j, &s) in tail_ids.iter().enumerate() {
                    let p = (F::cast(j) + F::cast(0.5)) / F::cast(tail_len);
                    lw[s] = (gpd_quantile(p, k, sigma) + exp_cutoff).ln();
                }
            }
            khat = k;
        }
    }

    // truncate at the largest raw weight
    lw.mapv_inplace(|v| v.min(F::zero()) + max_ratio);
    (lw, khat)
}

/// Quantile function of the generalized Pareto distribution with location 0.
pub fn gpd_quantile<F: Float>(p: F, k: F, sigma: F) -> F {
    if k == F::zero() {
        -sigma * (-p).ln_1p()
    } else {
        sigma * (-k * (-p).ln_1p()).exp_m1() / k
    }
}

/// This function estimates the shape `k` and scale `sigma` of a generalized
/// Pareto distribution from ascending, non-negative exceedances, with the
/// empirical Bayes estimator of Zhang and Stephens (2009). The shape is then
/// shrunk toward `0.5` by a weakly informative prior worth 10 observations.
pub fn gpd_fit<F: Float>(x: &[F]) -> (F, F) {
    let n = x.len();
    if n == 0 {
        return (F::infinity(), F::nan());
    }
    let prior = F::cast(3.);
    let m = 30 + (n as f64).sqrt().floor() as usize;
    let quartile = ((n as f64) / 4. + 0.5).floor().max(1.) as usize - 1;
    let xstar = x[quartile];
    let x_max = x[n - 1];

    let theta = Array1::from_iter((1..=m).map(|j| {
        let jj = F::cast(j) - F::cast(0.5);
        F::one() / x_max + (F::one() - (F::cast(m) / jj).sqrt()) / prior / xstar
    }));
    let l_theta = theta.mapv(|t| {
        let l = F::cast(n) * profile_log_lik(t, x);
        if l.is_nan() {
            F::neg_infinity()
        } else {
            l
        }
    });
    let norm = log_sum_exp(l_theta.view());
    let theta_hat = theta
        .iter()
        .zip(l_theta.iter())
        .map(|(&t, &l)| t * (l - norm).exp())
        .sum::<F>();

    let k = x.iter().map(|&v| (-theta_hat * v).ln_1p()).sum::<F>() / F::cast(n);
    let sigma = -k / theta_hat;
    let k = (k * F::cast(n) + F::cast(10. * 0.5)) / (F::cast(n) + F::cast(10.));

    if k.is_nan() {
        (F::infinity(), sigma)
    } else {
        (k, sigma)
    }
}

/// Profile log-likelihood of the generalized Pareto distribution per
/// observation, as a function of `theta = -k / sigma`.
fn profile_log_lik<F: Float>(theta: F, x: &[F]) -> F {
    let a = -theta;
    let k = x.iter().map(|&v| (a * v).ln_1p()).sum::<F>() / F::cast(x.len());
    (a / k).ln() - k - F::one()
}
