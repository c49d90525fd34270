use ndarray::{array, Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::pareto_warnings;
use super::psis::*;
use crate::error::SelectionError;
use crate::estimators::{BayesianParams, Engine};
use crate::formula::FormulaSpec;
use crate::helpers::test_helpers::*;
use crate::metrics::*;

fn bayesian_engine(n_draws: usize) -> Engine<f64> {
    Engine::bayesian(BayesianParams::new().n_draws(n_draws).seed(5)).unwrap()
}

#[test]
fn test_rmse_mae() {
    let actual = array![1., 2., 3., 4.];
    let predicted = array![1., 1., 5., 4.];
    let rmse_value = rmse(actual.view(), predicted.view()).unwrap();
    let mae_value = mae(actual.view(), predicted.view()).unwrap();

    assert!((rmse_value - 1.25f64.sqrt()).abs() < 1e-12);
    assert!((mae_value - 0.75).abs() < 1e-12);
    assert!(rmse_value >= mae_value);
}

#[test]
fn test_rmse_equals_mae_for_constant_residuals() {
    let actual = array![1., 2., 3.];
    let predicted = array![3., 0., 5.];
    assert_eq!(rmse(actual.view(), predicted.view()).unwrap(), 2.);
    assert_eq!(mae(actual.view(), predicted.view()).unwrap(), 2.);
}

#[test]
fn test_rsq() {
    let actual = array![1., 2., 3., 4.];
    let shifted = array![3., 5., 7., 9.];
    assert!((rsq::<f64>(actual.view(), shifted.view()).unwrap() - 1.).abs() < 1e-12);

    let constant = array![2., 2., 2., 2.];
    assert!(matches!(
        rsq(actual.view(), constant.view()),
        Err(SelectionError::MetricUndefined { metric: "rsq", .. })
    ));
}

#[test]
fn test_metric_input_checks() {
    let empty = Array1::<f64>::zeros(0);
    assert!(matches!(
        rmse(empty.view(), empty.view()),
        Err(SelectionError::MetricUndefined { .. })
    ));
    assert!(matches!(
        mae(array![1., 2.].view(), array![1.].view()),
        Err(SelectionError::InvalidParameter(_))
    ));
}

#[test]
fn test_metric_directions() {
    assert_eq!(Metric::Rmse.direction(), Direction::Minimize);
    assert_eq!(Metric::Mae.direction(), Direction::Minimize);
    assert_eq!(Metric::Rsq.direction(), Direction::Maximize);
    assert_eq!(Metric::Elpd.direction(), Direction::Maximize);
    assert!(Direction::Minimize.is_better(0.1, 0.2));
    assert!(Direction::Maximize.is_better(-1., -2.));
    assert!(!Direction::Maximize.is_better(1., 1.));
}

#[test]
fn test_score_is_deterministic() {
    let dataset = generate_random_dataset(60, 3);
    let formula = FormulaSpec::new("y").fields(&["x0", "x1", "x2"]);
    let train = dataset.select_rows(&(0..40).collect::<Vec<_>>());
    let test = dataset.select_rows(&(40..60).collect::<Vec<_>>());

    let model = Engine::Ols.fit(&formula, &train).unwrap();
    let first = score(&model, &test, Metric::Rmse).unwrap();
    let second = score(&model, &test, Metric::Rmse).unwrap();
    assert_eq!(first, second);
    assert!(first.value() >= score(&model, &test, Metric::Mae).unwrap().value());
    assert!(first.value() >= 0.);
    assert!(first.pointwise().is_none());

    let model = bayesian_engine(200).fit(&formula, &train).unwrap();
    let first = score(&model, &test, Metric::Elpd).unwrap();
    let second = score(&model, &test, Metric::Elpd).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_elpd_requires_draws() {
    let dataset = generate_random_dataset(30, 2);
    let formula = FormulaSpec::new("y").fields(&["x0", "x1"]);
    let model = Engine::Ols.fit(&formula, &dataset).unwrap();
    match score(&model, &dataset, Metric::Elpd) {
        Err(SelectionError::MetricUndefined { metric, .. }) => assert_eq!(metric, "elpd"),
        other => panic!("expected an undefined metric, got {:?}", other),
    }
}

#[test]
fn test_score_empty_test_set() {
    let dataset = generate_random_dataset(30, 2);
    let formula = FormulaSpec::new("y").fields(&["x0"]);
    let model = Engine::Ols.fit(&formula, &dataset).unwrap();
    assert!(matches!(
        score(&model, &dataset.select_rows(&[]), Metric::Rmse),
        Err(SelectionError::MetricUndefined { .. })
    ));
}

#[test]
fn test_holdout_elpd() {
    let dataset = generate_random_dataset(80, 2);
    let formula = FormulaSpec::new("y").fields(&["x0", "x1"]);
    let train = dataset.select_rows(&(0..60).collect::<Vec<_>>());
    let test = dataset.select_rows(&(60..80).collect::<Vec<_>>());
    let model = bayesian_engine(500).fit(&formula, &train).unwrap();

    let elpd = score(&model, &test, Metric::Elpd).unwrap();
    let pointwise = elpd.pointwise().unwrap();
    assert_eq!(pointwise.len(), 20);
    assert!((pointwise.sum() - elpd.value()).abs() < 1e-9);
    assert!(elpd.std_err().unwrap() > 0.);
    assert!(elpd.diagnostics().is_none());
}

#[test]
fn test_elpd_loo() {
    let dataset = generate_random_dataset(100, 3);
    let formula = FormulaSpec::new("y").fields(&["x0", "x1", "x2"]);
    let model = bayesian_engine(2000).fit(&formula, &dataset).unwrap();

    let loo = score(&model, &dataset, Metric::ElpdLoo).unwrap();
    let in_sample = score(&model, &dataset, Metric::Elpd).unwrap();
    let diagnostics = loo.diagnostics().unwrap();

    assert_eq!(diagnostics.pareto_k().len(), 100);
    assert!(diagnostics.pareto_k().iter().all(|k| k.is_finite()));
    // four coefficients and the noise scale
    assert!(diagnostics.p_loo() > 0. && diagnostics.p_loo() < 15.);
    assert!(loo.value() < in_sample.value());
    let reliable = diagnostics.count(ParetoKCategory::Good) + diagnostics.count(ParetoKCategory::Ok);
    assert!(reliable >= 95);
    assert_eq!(loo.warnings().len(), 100 - diagnostics.count(ParetoKCategory::Good));
}

#[test]
fn test_pareto_k_categories() {
    assert_eq!(ParetoKCategory::from_k(0.2), ParetoKCategory::Good);
    assert_eq!(ParetoKCategory::from_k(0.5), ParetoKCategory::Good);
    assert_eq!(ParetoKCategory::from_k(0.6), ParetoKCategory::Ok);
    assert_eq!(ParetoKCategory::from_k(0.9), ParetoKCategory::Bad);
    assert_eq!(ParetoKCategory::from_k(1.3), ParetoKCategory::VeryBad);
    assert_eq!(ParetoKCategory::from_k(f64::INFINITY), ParetoKCategory::VeryBad);
}

#[test]
fn test_pareto_warnings() {
    let k = array![0.1, 0.6, 0.8, 1.2, 0.3];
    let warnings = pareto_warnings(k.view());
    let flagged: Vec<(usize, ParetoKCategory)> =
        warnings.iter().map(|w| (w.index, w.category)).collect();
    assert_eq!(
        flagged,
        vec![
            (1, ParetoKCategory::Ok),
            (2, ParetoKCategory::Bad),
            (3, ParetoKCategory::VeryBad)
        ]
    );
}

#[test]
fn test_tail_length() {
    assert_eq!(tail_length(4000), 190);
    assert_eq!(tail_length(100), 20);
    assert_eq!(tail_length(10), 2);
}

#[test]
fn test_psis_identical_draws() {
    // every draw agrees, so the importance weights are flat
    let log_lik = Array2::from_shape_fn((100, 3), |(_, i)| -(i as f64) - 1.);
    let (elpd, k) = psis_loo(log_lik.view());
    assert_array_all_close(elpd.view(), array![-1., -2., -3.].view(), 1e-12);
    assert!(k.iter().all(|k| k.is_infinite()));
}

#[test]
fn test_gpd_quantile() {
    // k = 0 is the exponential distribution
    assert!((gpd_quantile::<f64>(0.5, 0., 2.) - 2. * 2f64.ln()).abs() < 1e-12);
    // k = 1, sigma = 1: F^-1(p) = p / (1 - p)
    assert!((gpd_quantile::<f64>(0.75, 1., 1.) - 3.).abs() < 1e-12);
}

#[test]
fn test_gpd_fit_recovers_shape() {
    let (k, sigma) = (0.5f64, 1f64);
    let mut rng = StdRng::seed_from_u64(0);
    let mut x: Vec<f64> = (0..2000)
        .map(|_| {
            let u: f64 = rng.gen();
            sigma * ((1. - u).powf(-k) - 1.) / k
        })
        .collect();
    x.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let (k_hat, sigma_hat) = gpd_fit(&x);
    assert!((k_hat - k).abs() < 0.15);
    assert!((sigma_hat - sigma).abs() < 0.2);
}

#[test]
fn test_compare_loo() {
    let dataset = generate_selection_dataset(120);
    let full = FormulaSpec::new("y").fields(&["x0", "x1"]);
    let null = FormulaSpec::new("y");
    let engine = bayesian_engine(1000);

    let full_model = engine.fit(&full, &dataset).unwrap();
    let null_model = engine.fit(&null, &dataset).unwrap();
    let full_loo = score(&full_model, &dataset, Metric::ElpdLoo).unwrap();
    let null_loo = score(&null_model, &dataset, Metric::ElpdLoo).unwrap();

    let rows = compare_loo(&[("null", &null_loo), ("full", &full_loo)]).unwrap();
    assert_eq!(rows[0].name, "full");
    assert_eq!(rows[0].elpd_diff, 0.);
    assert_eq!(rows[0].se_diff, 0.);
    assert_eq!(rows[1].name, "null");
    assert!(rows[1].elpd_diff < 0.);
    assert!(rows[1].se_diff > 0.);
    assert!(-rows[1].elpd_diff > 2. * rows[1].se_diff);
}

#[test]
fn test_compare_loo_needs_densities() {
    let dataset = generate_random_dataset(30, 2);
    let formula = FormulaSpec::new("y").fields(&["x0"]);
    let model = Engine::Ols.fit(&formula, &dataset).unwrap();
    let rmse_score = score(&model, &dataset, Metric::Rmse).unwrap();
    assert!(matches!(
        compare_loo(&[("ols", &rmse_score)]),
        Err(SelectionError::MetricUndefined { .. })
    ));
}
