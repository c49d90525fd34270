extern crate resample_select;

use resample_select::{
    estimators::{BayesianParams, Engine},
    formula::FormulaSpec,
    helpers::test_helpers::generate_selection_dataset,
    metrics::{compare_loo, score, Metric, ParetoKCategory},
    Result,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let dataset = generate_selection_dataset(150);
    let engine = Engine::bayesian(BayesianParams::new().n_draws(4000).seed(3))?;

    let formulas = vec![
        ("null", FormulaSpec::new("y")),
        ("x0", FormulaSpec::new("y").fields(&["x0"])),
        ("x0 + x1", FormulaSpec::new("y").fields(&["x0", "x1"])),
        ("x0 + x1 + x2", FormulaSpec::new("y").fields(&["x0", "x1", "x2"])),
    ];

    let mut scores = Vec::with_capacity(formulas.len());
    for (name, formula) in formulas.iter() {
        let model = engine.fit(formula, &dataset)?;
        let loo = score(&model, &dataset, Metric::ElpdLoo)?;
        if let Some(diagnostics) = loo.diagnostics() {
            println!(
                "{:<14} p_loo = {:>6.2}, k > 0.7 on {} point(s)",
                name,
                diagnostics.p_loo(),
                diagnostics.count(ParetoKCategory::Bad) + diagnostics.count(ParetoKCategory::VeryBad)
            );
        }
        scores.push((*name, loo));
    }

    let named: Vec<(&str, _)> = scores.iter().map(|(name, s)| (*name, s)).collect();
    println!("{:<14} {:>10} {:>10} {:>10}", "model", "elpd_loo", "elpd_diff", "se_diff");
    for row in compare_loo(&named)? {
        println!(
            "{:<14} {:>10.1} {:>10.1} {:>10.1}",
            row.name, row.elpd, row.elpd_diff, row.se_diff
        );
    }
    Ok(())
}
