//! Evaluator capability: score a runner output against a scenario.

pub mod exact_match;
pub mod registry;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{EvalOutcome, Result, Scenario};

pub use exact_match::ExactMatchEvaluator;
pub use registry::EvaluatorRegistry;

/// Everything an evaluator gets to look at for one scenario.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub scenario: &'a Scenario,
    pub input: Option<&'a Value>,
    pub output_text: &'a str,
}

impl<'a> EvaluationContext<'a> {
    /// Context for `scenario`, taking `input` from the scenario itself.
    pub fn new(scenario: &'a Scenario, output_text: &'a str) -> Self {
        Self {
            scenario,
            input: scenario.input.as_ref(),
            output_text,
        }
    }
}

/// Scores one scenario's output.
///
/// Implementations must not mutate the scenario (they only receive a shared
/// borrow) and should fold scenario-level problems into failing scores.
/// An `Err` is reserved for conditions that should abort the whole run.
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Registry name, e.g. `exact` or `codefix`.
    fn name(&self) -> &str;

    async fn evaluate(&self, ctx: EvaluationContext<'_>) -> Result<EvalOutcome>;
}
