use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use resample_select::estimators::{BayesianParams, Engine};
use resample_select::formula::FormulaSpec;
use resample_select::helpers::test_helpers::generate_selection_dataset;
use resample_select::metrics::Metric;
use resample_select::partition::Scheme;
use resample_select::selection::{Candidate, ModelSelector};

fn candidates() -> Vec<Candidate<f64>> {
    vec![
        Candidate::new("null", FormulaSpec::new("y"), 1.),
        Candidate::new("x0", FormulaSpec::new("y").fields(&["x0"]), 2.),
        Candidate::new("x0 + x1", FormulaSpec::new("y").fields(&["x0", "x1"]), 3.),
        Candidate::new("x0 + x1 + x2", FormulaSpec::new("y").fields(&["x0", "x1", "x2"]), 4.),
    ]
}

fn bench_vfold_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("vfold_selection");
    group.sample_size(10);

    for n_samples in [100, 1000] {
        for parallel in [false, true] {
            let dataset = generate_selection_dataset(n_samples);
            let folds = Scheme::VFold { v: 10, repeats: 1 }
                .split(n_samples, 0)
                .unwrap();
            let selector = ModelSelector::params().parallel(parallel);
            let config_string = format!("{}, parallel={}", n_samples, parallel);

            group.bench_with_input(
                BenchmarkId::new("ols", config_string),
                &n_samples,
                |b, _| b.iter(|| selector.select(&candidates(), &dataset, &folds).unwrap()),
            );
        }
    }

    group.finish();
}

fn bench_bayesian_elpd(c: &mut Criterion) {
    let mut group = c.benchmark_group("bayesian_elpd");
    group.sample_size(10);

    for n_draws in [500, 4000] {
        let dataset = generate_selection_dataset(200);
        let folds = Scheme::VFold { v: 5, repeats: 1 }.split(200, 0).unwrap();
        let engine = Engine::bayesian(BayesianParams::new().n_draws(n_draws)).unwrap();
        let selector = ModelSelector::params().metric(Metric::Elpd).engine(engine);

        group.bench_with_input(BenchmarkId::new("vfold", n_draws), &n_draws, |b, _| {
            b.iter(|| selector.select(&candidates(), &dataset, &folds).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_vfold_selection, bench_bayesian_elpd);
criterion_main!(benches);
