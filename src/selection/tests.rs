use ndarray::Array1;

use crate::datasets::{Column, Dataset};
use crate::error::SelectionError;
use crate::estimators::{BayesianParams, Engine, FittedModel, ParamGuard};
use crate::formula::{FormulaSpec, Term};
use crate::helpers::test_helpers::*;
use crate::metrics::{Direction, Metric};
use crate::partition::{Fold, Scheme};
use crate::selection::*;

fn summaries(means: &[f64], std_errs: &[f64], complexities: &[f64]) -> Vec<Summary<f64>> {
    means
        .iter()
        .zip(std_errs.iter())
        .zip(complexities.iter())
        .map(|((&mean, &std_err), &complexity)| Summary {
            mean,
            std_err,
            complexity,
        })
        .collect()
}

/// Candidates of increasing size on `generate_selection_dataset`.
fn nested_candidates() -> Vec<Candidate<f64>> {
    vec![
        Candidate::new("null", FormulaSpec::new("y"), 1.),
        Candidate::new("x0", FormulaSpec::new("y").fields(&["x0"]), 2.),
        Candidate::new("x0 + x1", FormulaSpec::new("y").fields(&["x0", "x1"]), 3.),
        Candidate::new("x0 + x1 + x2", FormulaSpec::new("y").fields(&["x0", "x1", "x2"]), 4.),
    ]
}

#[test]
fn test_one_standard_error_picks_simplest_within_band() {
    let s = summaries(&[0.30, 0.131, 0.132], &[0.002, 0.002, 0.002], &[1., 10., 5.]);
    assert_eq!(one_standard_error(&s, Direction::Minimize), Some(2));
}

#[test]
fn test_one_standard_error_rmse_scenario() {
    // the best mean has a tight standard error, nothing else is close enough
    let s = summaries(
        &[0.260, 0.187, 0.144, 0.136, 0.132],
        &[0.002, 0.002, 0.001, 0.001, 0.001],
        &[2., 9., 12., 15., 19.],
    );
    assert_eq!(one_standard_error(&s, Direction::Minimize), Some(4));
}

#[test]
fn test_one_standard_error_elpd_scenario() {
    let s = summaries(
        &[-3931., 13713., 27673., 30636., 32267.],
        &[190., 188., 219., 227., 246.],
        &[2., 9., 12., 15., 19.],
    );
    assert_eq!(one_standard_error(&s, Direction::Maximize), Some(4));
}

#[test]
fn test_one_standard_error_ties() {
    // equal best means: the first one is the reference
    let s = summaries(&[1., 1., 3.], &[0., 0., 0.], &[5., 5., 1.]);
    assert_eq!(one_standard_error(&s, Direction::Minimize), Some(0));
    // equal complexities within the band: the first one wins
    let s = summaries(&[1.05, 1., 1.02], &[0.1, 0.1, 0.1], &[2., 3., 2.]);
    assert_eq!(one_standard_error(&s, Direction::Minimize), Some(0));
    assert_eq!(one_standard_error::<f64>(&[], Direction::Minimize), None);
}

#[test]
fn test_select_chooses_the_true_form() {
    let dataset = generate_selection_dataset(200);
    let folds = Scheme::VFold { v: 5, repeats: 1 }.split(dataset.n_rows(), 3).unwrap();
    let selection = ModelSelector::params()
        .seed(1)
        .select(&nested_candidates(), &dataset, &folds)
        .unwrap();

    assert_eq!(selection.metric(), Metric::Rmse);
    assert_eq!(selection.ranked().len(), 4);
    assert!(selection.failed().is_empty());
    assert_eq!(selection.chosen().unwrap().name(), "x0 + x1");

    let best = selection.best().unwrap().name();
    assert!(best == "x0 + x1" || best == "x0 + x1 + x2");
    assert_eq!(selection.ranked()[3].name(), "null");

    let means: Vec<f64> = selection.evaluated().iter().map(|r| r.mean().unwrap()).collect();
    assert!(means.windows(2).all(|w| w[0] <= w[1]));
    for result in selection.evaluated() {
        assert_eq!(result.fold_scores().len(), 5);
        assert!(result.std_err().unwrap() > 0.);
    }
}

#[test]
fn test_select_insufficient_folds() {
    let dataset = generate_selection_dataset(30);
    let folds = Scheme::Holdout { prop: 0.8 }.split(dataset.n_rows(), 0).unwrap();
    let res = ModelSelector::params().select(&nested_candidates(), &dataset, &folds);
    assert_eq!(res.unwrap_err(), SelectionError::InsufficientFolds(1));

    let res = ModelSelector::params().select(&nested_candidates(), &dataset, &[]);
    assert_eq!(res.unwrap_err(), SelectionError::InsufficientFolds(0));
}

#[test]
fn test_select_rejects_folds_outside_dataset() {
    // folds built for 20 rows, dataset only has 10
    let dataset = generate_selection_dataset(10);
    let folds = Scheme::VFold { v: 2, repeats: 1 }.split(20, 0).unwrap();
    let res = ModelSelector::params().select(&nested_candidates(), &dataset, &folds);
    assert!(matches!(res, Err(SelectionError::InvalidParameter(_))));

    let folds = vec![
        Fold::new("Fold1".to_string(), (0..5).collect(), (5..10).collect()),
        Fold::new("Fold2".to_string(), (5..10).collect(), vec![]),
    ];
    let res = ModelSelector::params().select(&nested_candidates(), &dataset, &folds);
    assert!(matches!(res, Err(SelectionError::InvalidParameter(_))));
}

#[test]
fn test_select_invalid_candidates() {
    let dataset = generate_selection_dataset(30);
    let folds = Scheme::VFold { v: 3, repeats: 1 }.split(dataset.n_rows(), 0).unwrap();
    assert!(matches!(
        ModelSelector::params().select(&[], &dataset, &folds),
        Err(SelectionError::InvalidParameter(_))
    ));

    let candidates = vec![Candidate::new("nan", FormulaSpec::new("y"), f64::NAN)];
    assert!(matches!(
        ModelSelector::params().select(&candidates, &dataset, &folds),
        Err(SelectionError::InvalidParameter(_))
    ));
}

#[test]
fn test_failed_candidate_is_isolated() {
    // `z` is zero outside the test rows of the second fold, so that fold
    // trains on a constant zero column
    let base = generate_selection_dataset(30);
    let z: Array1<f64> = (0..30)
        .map(|i| if (10..20).contains(&i) { i as f64 } else { 0. })
        .collect();
    let mut columns: Vec<(String, Column<f64>)> = base
        .field_names()
        .iter()
        .map(|name| (name.clone(), base.column(name).unwrap().clone()))
        .collect();
    columns.push(("z".to_string(), Column::Numeric(z)));
    let dataset = Dataset::new(columns).unwrap();

    let folds: Vec<Fold> = (0..3)
        .map(|f| {
            let test: Vec<usize> = (10 * f..10 * (f + 1)).collect();
            let train: Vec<usize> = (0..30).filter(|i| !test.contains(i)).collect();
            Fold::new(format!("Fold{}", f + 1), train, test)
        })
        .collect();

    let mut candidates = nested_candidates();
    let with_z = FormulaSpec::new("y").fields(&["x0", "z"]);
    candidates.insert(2, Candidate::new("x0 + z", with_z, 3.));
    candidates.push(Candidate::new("w", FormulaSpec::new("y").fields(&["w"]), 2.));

    let selection = ModelSelector::params()
        .parallel(false)
        .select(&candidates, &dataset, &folds)
        .unwrap();

    assert_eq!(selection.evaluated().len(), 4);
    assert_eq!(selection.failed().len(), 2);

    let singular = &selection.failed()[0];
    assert_eq!(singular.index(), 2);
    assert_eq!(singular.error().unwrap().kind(), "SingularDesignError");
    match singular.outcome() {
        Outcome::Failed { fold, .. } => assert_eq!(fold.as_deref(), Some("Fold2")),
        Outcome::Evaluated { .. } => panic!("x0 + z should have failed"),
    }

    let unknown = &selection.failed()[1];
    assert_eq!(unknown.index(), 5);
    assert_eq!(unknown.error(), Some(&SelectionError::UnknownField("w".to_string())));
    match unknown.outcome() {
        Outcome::Failed { fold, .. } => assert!(fold.is_none()),
        Outcome::Evaluated { .. } => panic!("w should have failed"),
    }

    for result in selection.evaluated() {
        assert_eq!(result.fold_scores().len(), 3);
    }
    let chosen = selection.chosen().unwrap();
    assert!(!chosen.is_failed());
}

#[test]
fn test_every_candidate_failing() {
    let dataset = generate_selection_dataset(20);
    let folds = Scheme::VFold { v: 2, repeats: 1 }.split(dataset.n_rows(), 0).unwrap();
    let candidates = vec![Candidate::new("w", FormulaSpec::new("y").fields(&["w"]), 2.)];
    let selection = ModelSelector::params().select(&candidates, &dataset, &folds).unwrap();

    assert!(selection.best().is_none());
    assert!(selection.chosen().is_none());
    assert!(selection.refit(&dataset, &Engine::Ols).is_err());
}

#[test]
fn test_select_is_reproducible_in_parallel() {
    let dataset = generate_selection_dataset(60);
    let folds = Scheme::VFold { v: 3, repeats: 1 }.split(dataset.n_rows(), 8).unwrap();
    let engine = Engine::bayesian(BayesianParams::new().n_draws(100)).unwrap();
    let params = ModelSelector::params()
        .metric(Metric::Elpd)
        .engine(engine)
        .seed(21);

    let candidates = nested_candidates();
    let parallel = params
        .clone()
        .parallel(true)
        .select(&candidates, &dataset, &folds)
        .unwrap();
    let sequential = params
        .parallel(false)
        .select(&candidates, &dataset, &folds)
        .unwrap();
    assert_eq!(parallel, sequential);
    assert_eq!(parallel.metric(), Metric::Elpd);

    // larger densities are better
    let means: Vec<f64> = parallel.evaluated().iter().map(|r| r.mean().unwrap()).collect();
    assert!(means.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn test_refit_chosen() {
    let dataset = generate_selection_dataset(100);
    let folds = Scheme::VFold { v: 4, repeats: 1 }.split(dataset.n_rows(), 0).unwrap();
    let selection = ModelSelector::params()
        .select(&nested_candidates(), &dataset, &folds)
        .unwrap();
    let model = selection.refit(&dataset, &Engine::Ols).unwrap();
    assert_eq!(model.formula(), selection.chosen().unwrap().candidate().formula());
    assert_eq!(model.predict(&dataset).unwrap().len(), 100);
}

#[test]
fn test_elpd_loo_metric_rejected_with_folds() {
    let params = ModelSelector::params::<f64>().metric(Metric::ElpdLoo);
    assert!(matches!(params.check_ref(), Err(SelectionError::InvalidParameter(_))));
}

#[test]
fn test_select_by_loo_needs_draws() {
    let dataset = generate_selection_dataset(30);
    assert!(matches!(
        ModelSelector::params().select_by_loo(&nested_candidates(), &dataset),
        Err(SelectionError::InvalidParameter(_))
    ));
}

#[test]
fn test_select_by_loo() {
    let dataset = generate_selection_dataset(120);
    let engine = Engine::bayesian(BayesianParams::new().n_draws(1000)).unwrap();
    let mut candidates = nested_candidates();
    candidates.push(Candidate::new(
        "x0 + log(x1)",
        FormulaSpec::new("y").term(Term::field("x0")).term(Term::log("x1")),
        3.,
    ));

    let selection = ModelSelector::params()
        .engine(engine)
        .seed(4)
        .select_by_loo(&candidates, &dataset)
        .unwrap();

    assert_eq!(selection.metric(), Metric::ElpdLoo);
    assert_eq!(selection.chosen().unwrap().name(), "x0 + x1");
    // x1 takes negative values
    assert_eq!(selection.failed().len(), 1);
    assert_eq!(selection.failed()[0].name(), "x0 + log(x1)");
    for result in selection.evaluated() {
        let fold_scores = result.fold_scores();
        assert_eq!(fold_scores.len(), 1);
        assert!(fold_scores[0].diagnostics().is_some());
    }
}
