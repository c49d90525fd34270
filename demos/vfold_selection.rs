extern crate resample_select;

use resample_select::{
    formula::{FormulaSpec, Term},
    helpers::test_helpers::generate_selection_dataset,
    partition::{partition, Scheme},
    selection::{Candidate, ModelSelector, Outcome},
    Result,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let dataset = generate_selection_dataset(300);
    let folds = partition(&dataset, &Scheme::VFold { v: 10, repeats: 2 }, 42)?;

    let candidates = vec![
        Candidate::new("null", FormulaSpec::new("y"), 1.),
        Candidate::new("x0", FormulaSpec::new("y").fields(&["x0"]), 2.),
        Candidate::new("x0 + x1", FormulaSpec::new("y").fields(&["x0", "x1"]), 3.),
        Candidate::new(
            "x0 * x1",
            FormulaSpec::new("y")
                .fields(&["x0", "x1"])
                .term(Term::interaction(&["x0", "x1"])),
            4.,
        ),
        Candidate::new(
            "x0 + x1 + x2 + x2^2",
            FormulaSpec::new("y")
                .fields(&["x0", "x1", "x2"])
                .term(Term::square("x2")),
            5.,
        ),
        // x1 takes negative values, this one fails on every fold
        Candidate::new(
            "x0 + log(x1)",
            FormulaSpec::new("y").fields(&["x0"]).term(Term::log("x1")),
            3.,
        ),
    ];

    let selection = ModelSelector::params()
        .seed(7)
        .select(&candidates, &dataset, &folds)?;

    println!("{:<24} {:>10} {:>10}", "candidate", "rmse", "std err");
    for result in selection.ranked() {
        match result.outcome() {
            Outcome::Evaluated { mean, std_err, .. } => {
                println!("{:<24} {:>10.4} {:>10.4}", result.name(), mean, std_err)
            }
            Outcome::Failed { fold, error } => println!(
                "{:<24} failed on {}: {}",
                result.name(),
                fold.as_deref().unwrap_or("every fold"),
                error
            ),
        }
    }

    if let Some(chosen) = selection.chosen() {
        println!("chosen: {} ({})", chosen.name(), chosen.candidate().formula());
    }
    Ok(())
}
