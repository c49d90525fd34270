//! Model selection over a family of candidate formulas.
//!
//! Every candidate is fitted on the training side and scored on the test
//! side of every fold. Per-fold scores are summarized by their mean and
//! standard error, candidates are ranked by mean, and the simplest
//! candidate within one standard error of the best one is chosen.
//!
//! A candidate that fails on any fold is reported as failed, with its
//! error, and takes no part in the ranking; the other candidates are not
//! affected.

use crate::datasets::Dataset;
use crate::error::{Result, SelectionError};
use crate::estimators::{Engine, FittedModel};
use crate::formula::FormulaSpec;
use crate::metrics::{Direction, Metric, Score};
use crate::Float;

mod hyperparams;
mod selector;

#[cfg(test)]
mod tests;

pub use hyperparams::{SelectorParams, SelectorValidParams};
pub use selector::ModelSelector;

/// A candidate functional form with its caller-supplied complexity (for
/// instance the number of coefficients).
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate<F> {
    name: String,
    formula: FormulaSpec<F>,
    complexity: F,
}

impl<F: Float> Candidate<F> {
    pub fn new(name: &str, formula: FormulaSpec<F>, complexity: F) -> Candidate<F> {
        Candidate {
            name: name.to_string(),
            formula,
            complexity,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn formula(&self) -> &FormulaSpec<F> {
        &self.formula
    }

    pub fn complexity(&self) -> F {
        self.complexity
    }
}

/// Mean score, its standard error and the complexity of a candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary<F> {
    pub mean: F,
    pub std_err: F,
    pub complexity: F,
}

/// Result of evaluating one candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<F> {
    Evaluated {
        fold_scores: Vec<Score<F>>,
        mean: F,
        std_err: F,
    },
    /// The candidate could not be fitted or scored. `fold` is the first fold
    /// that failed, `None` when the failure does not depend on the data split.
    Failed {
        fold: Option<String>,
        error: SelectionError,
    },
}

/// A candidate paired with the outcome of its evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateResult<F> {
    index: usize,
    candidate: Candidate<F>,
    outcome: Outcome<F>,
}

impl<F: Float> CandidateResult<F> {
    /// Position of the candidate in the input sequence.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn candidate(&self) -> &Candidate<F> {
        &self.candidate
    }

    pub fn name(&self) -> &str {
        self.candidate.name()
    }

    pub fn outcome(&self) -> &Outcome<F> {
        &self.outcome
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, Outcome::Failed { .. })
    }

    pub fn mean(&self) -> Option<F> {
        match self.outcome {
            Outcome::Evaluated { mean, .. } => Some(mean),
            Outcome::Failed { .. } => None,
        }
    }

    pub fn std_err(&self) -> Option<F> {
        match self.outcome {
            Outcome::Evaluated { std_err, .. } => Some(std_err),
            Outcome::Failed { .. } => None,
        }
    }

    pub fn fold_scores(&self) -> &[Score<F>] {
        match &self.outcome {
            Outcome::Evaluated { fold_scores, .. } => fold_scores,
            Outcome::Failed { .. } => &[],
        }
    }

    pub fn error(&self) -> Option<&SelectionError> {
        match &self.outcome {
            Outcome::Failed { error, .. } => Some(error),
            Outcome::Evaluated { .. } => None,
        }
    }

    pub fn summary(&self) -> Option<Summary<F>> {
        match self.outcome {
            Outcome::Evaluated { mean, std_err, .. } => Some(Summary {
                mean,
                std_err,
                complexity: self.candidate.complexity(),
            }),
            Outcome::Failed { .. } => None,
        }
    }
}

/// The output of a selection run: every candidate, evaluated ones ranked
/// best first followed by failed ones in input order, and the chosen one.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection<F> {
    metric: Metric,
    ranked: Vec<CandidateResult<F>>,
    n_evaluated: usize,
    chosen: Option<usize>,
}

impl<F: Float> Selection<F> {
    /// Ranks `results` (given in input order) and applies the one standard
    /// error rule.
    pub(crate) fn from_results(metric: Metric, results: Vec<CandidateResult<F>>) -> Selection<F> {
        let direction = metric.direction();
        let (mut evaluated, failed): (Vec<_>, Vec<_>) =
            results.into_iter().partition(|r| !r.is_failed());

        let summaries: Vec<Summary<F>> = evaluated.iter().filter_map(|r| r.summary()).collect();
        let chosen_index = one_standard_error(&summaries, direction).map(|i| evaluated[i].index);

        // stable, so ties keep the input order
        evaluated.sort_by(|a, b| compare_means(direction, a, b));
        let n_evaluated = evaluated.len();
        let chosen = chosen_index.and_then(|idx| evaluated.iter().position(|r| r.index == idx));

        let mut ranked = evaluated;
        ranked.extend(failed);
        Selection {
            metric,
            ranked,
            n_evaluated,
            chosen,
        }
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Every candidate, evaluated ones ranked best first, then failed ones.
    pub fn ranked(&self) -> &[CandidateResult<F>] {
        &self.ranked
    }

    pub fn evaluated(&self) -> &[CandidateResult<F>] {
        &self.ranked[..self.n_evaluated]
    }

    pub fn failed(&self) -> &[CandidateResult<F>] {
        &self.ranked[self.n_evaluated..]
    }

    /// The top-ranked candidate.
    pub fn best(&self) -> Option<&CandidateResult<F>> {
        self.evaluated().first()
    }

    /// The simplest candidate within one standard error of the best one,
    /// `None` if every candidate failed.
    pub fn chosen(&self) -> Option<&CandidateResult<F>> {
        self.chosen.map(|i| &self.ranked[i])
    }

    /// Fits the chosen candidate on the whole `dataset`.
    pub fn refit(&self, dataset: &Dataset<F>, engine: &Engine<F>) -> Result<Box<dyn FittedModel<F>>> {
        let chosen = self.chosen().ok_or_else(|| {
            SelectionError::InvalidParameter("no candidate was successfully evaluated".into())
        })?;
        tracing::info!(candidate = chosen.name(), "refitting the chosen candidate");
        engine.fit(chosen.candidate().formula(), dataset)
    }
}

fn compare_means<F: Float>(
    direction: Direction,
    a: &CandidateResult<F>,
    b: &CandidateResult<F>,
) -> std::cmp::Ordering {
    let (a, b) = (a.mean().unwrap_or(F::nan()), b.mean().unwrap_or(F::nan()));
    let ord = a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal);
    match direction {
        Direction::Minimize => ord,
        Direction::Maximize => ord.reverse(),
    }
}

/// One standard error rule
///
/// Given candidate summaries in input order, finds the best mean in
/// `direction` (the first one on ties), keeps every candidate whose mean is
/// not worse than the best by more than the best's standard error, and
/// returns the index of the one with the lowest complexity (the first one on
/// ties). Returns `None` for an empty input.
pub fn one_standard_error<F: Float>(summaries: &[Summary<F>], direction: Direction) -> Option<usize> {
    let best = summaries
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, &Summary<F>)>, (i, s)| match best {
            Some((_, b)) if !direction.is_better(s.mean, b.mean) => best,
            _ => Some((i, s)),
        })
        .map(|(_, b)| *b)?;

    let within = |s: &Summary<F>| match direction {
        Direction::Minimize => s.mean <= best.mean + best.std_err,
        Direction::Maximize => s.mean >= best.mean - best.std_err,
    };

    summaries
        .iter()
        .enumerate()
        .filter(|&(_, s)| within(s))
        .fold(None, |chosen: Option<(usize, &Summary<F>)>, (i, s)| match chosen {
            Some((_, c)) if c.complexity <= s.complexity => chosen,
            _ => Some((i, s)),
        })
        .map(|(i, _)| i)
}
