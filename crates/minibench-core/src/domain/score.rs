//! Scores and the evaluator return shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One pass/fail verdict with a numeric value and diagnostic details.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Score {
    /// Evaluator-defined label, e.g. `exact_match`.
    pub key: String,

    pub value: f64,

    pub pass: bool,

    /// Diagnostic payload; by convention only present on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl Score {
    /// A passing score with value 1.
    pub fn passed(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: 1.0,
            pass: true,
            details: None,
        }
    }

    /// A failing score with value 0 and the given details.
    pub fn failed(key: impl Into<String>, details: Value) -> Self {
        Self {
            key: key.into(),
            value: 0.0,
            pass: false,
            details: Some(details),
        }
    }
}

/// What an evaluator hands back for one scenario: one score or several.
///
/// The orchestrator flattens both forms with [`EvalOutcome::into_scores`]
/// so nothing downstream ever sees the singular case.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalOutcome {
    One(Score),
    Many(Vec<Score>),
}

impl EvalOutcome {
    /// Normalize to an ordered sequence (insertion order = evaluation order).
    pub fn into_scores(self) -> Vec<Score> {
        match self {
            EvalOutcome::One(score) => vec![score],
            EvalOutcome::Many(scores) => scores,
        }
    }
}

impl From<Score> for EvalOutcome {
    fn from(score: Score) -> Self {
        EvalOutcome::One(score)
    }
}

impl From<Vec<Score>> for EvalOutcome {
    fn from(scores: Vec<Score>) -> Self {
        EvalOutcome::Many(scores)
    }
}

/// Aggregate pass for a score sequence: true iff every score passed.
///
/// An empty sequence is vacuously passing.
pub fn all_pass(scores: &[Score]) -> bool {
    scores.iter().all(|s| s.pass)
}
