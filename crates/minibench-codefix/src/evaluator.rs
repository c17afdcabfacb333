//! The `codefix` evaluator.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use minibench_core::{CodefixInput, EvalOutcome, EvaluationContext, Evaluator, Result, CODEFIX_KIND};

use crate::config::CodefixConfig;
use crate::engine::{PatchEngine, PatchOutcome};
use crate::error::{PatchFailure, PatchResult};
use crate::host::FunctionHost;

/// Read a scenario input as a [`CodefixInput`].
///
/// A `kind` other than `codefix` is rejected; a missing `kind` is accepted.
pub fn codefix_input(input: Option<&Value>) -> PatchResult<CodefixInput> {
    let raw = input.ok_or_else(|| PatchFailure::NotCodefix {
        reason: "scenario has no input".to_string(),
    })?;
    match raw.get("kind").and_then(Value::as_str) {
        Some(CODEFIX_KIND) | None => {}
        Some(other) => {
            return Err(PatchFailure::NotCodefix {
                reason: format!("input kind is {:?}", other),
            })
        }
    }
    serde_json::from_value(raw.clone()).map_err(|e| PatchFailure::NotCodefix {
        reason: format!("invalid codefix input: {}", e),
    })
}

/// Whether a scenario input explicitly declares `kind = "codefix"`.
pub fn declares_codefix(input: Option<&Value>) -> bool {
    input
        .and_then(|v| v.get("kind"))
        .and_then(Value::as_str)
        .is_some_and(|kind| kind == CODEFIX_KIND)
}

/// Applies the runner's patch to the scenario source and runs its truth table.
///
/// Emits exactly one score; patch problems never surface as errors.
#[derive(Clone, Default)]
pub struct CodefixEvaluator {
    engine: PatchEngine,
}

impl CodefixEvaluator {
    pub fn new(host: Arc<dyn FunctionHost>) -> Self {
        Self {
            engine: PatchEngine::new(host),
        }
    }

    pub fn from_config(config: &CodefixConfig) -> Self {
        Self::new(config.build_host())
    }
}

#[async_trait]
impl Evaluator for CodefixEvaluator {
    fn name(&self) -> &str {
        "codefix"
    }

    async fn evaluate(&self, ctx: EvaluationContext<'_>) -> Result<EvalOutcome> {
        let outcome = match codefix_input(ctx.input) {
            Ok(input) => self.engine.run(&input, ctx.output_text).await,
            Err(failure) => {
                tracing::debug!(
                    scenario_id = %ctx.scenario.id,
                    error_code = %failure.code(),
                    "scenario is not a codefix scenario"
                );
                PatchOutcome::Rejected(failure)
            }
        };
        Ok(outcome.into_score().into())
    }
}
