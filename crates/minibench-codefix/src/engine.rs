//! Codefix patch engine: parse, constrain, apply, materialize, verify.
//!
//! The pipeline is linear. The first failing step ends it with a
//! [`PatchFailure`]; verification collects every mismatching case instead
//! of stopping at the first.

use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use minibench_core::{CodefixInput, Score};

use crate::error::{PatchFailure, PatchResult};
use crate::host::{FunctionHost, ScriptValue};
use crate::patch::Patch;
use crate::script::EmbeddedHost;

/// Score key emitted for codefix scenarios.
pub const CODEFIX_SCORE_KEY: &str = "codefix-patch-applies-and-tests";

/// One truth-table row whose result differed from the expectation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseFailure {
    pub args: Vec<Value>,
    pub expect: Value,
    pub got: Value,
}

/// Result of running one candidate patch.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOutcome {
    /// Every case returned its expected value.
    Passed { patched: String },
    /// The patch applied but some cases failed.
    Failed {
        failures: Vec<CaseFailure>,
        patched: String,
    },
    /// The pipeline stopped before verification finished.
    Rejected(PatchFailure),
}

impl PatchOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, PatchOutcome::Passed { .. })
    }

    pub fn into_score(self) -> Score {
        match self {
            PatchOutcome::Passed { .. } => Score::passed(CODEFIX_SCORE_KEY),
            PatchOutcome::Failed { failures, patched } => Score::failed(
                CODEFIX_SCORE_KEY,
                json!({ "failures": failures, "patched": patched }),
            ),
            PatchOutcome::Rejected(failure) => {
                Score::failed(CODEFIX_SCORE_KEY, failure.details())
            }
        }
    }
}

#[derive(Clone)]
pub struct PatchEngine {
    host: Arc<dyn FunctionHost>,
}

impl Default for PatchEngine {
    fn default() -> Self {
        Self::new(Arc::new(EmbeddedHost::new()))
    }
}

impl PatchEngine {
    pub fn new(host: Arc<dyn FunctionHost>) -> Self {
        Self { host }
    }

    /// Run `output_text` as a patch against `input`. Never fails; problems
    /// become [`PatchOutcome::Rejected`].
    pub async fn run(&self, input: &CodefixInput, output_text: &str) -> PatchOutcome {
        match self.try_run(input, output_text).await {
            Ok(outcome) => outcome,
            Err(failure) => {
                debug!(
                    entry = %input.entry,
                    host = %self.host.name(),
                    error_code = %failure.code(),
                    "codefix patch rejected"
                );
                PatchOutcome::Rejected(failure)
            }
        }
    }

    async fn try_run(&self, input: &CodefixInput, output_text: &str) -> PatchResult<PatchOutcome> {
        let patch = Patch::parse(output_text)?;
        patch.check_allowed(input.allowed_finds())?;
        let patched = patch.apply(&input.source)?;

        let calls: Vec<Vec<Value>> = input.tests.iter().map(|t| t.args.clone()).collect();
        let results = self
            .host
            .invoke_all(&patched, &input.entry, &calls)
            .await?;
        if results.len() != calls.len() {
            return Err(PatchFailure::Runtime {
                message: format!(
                    "function host returned {} results for {} cases",
                    results.len(),
                    calls.len()
                ),
            });
        }

        let failures: Vec<CaseFailure> = input
            .tests
            .iter()
            .zip(results)
            .filter(|(test, got)| !got.strict_eq(&ScriptValue::from_json(&test.expect)))
            .map(|(test, got)| CaseFailure {
                args: test.args.clone(),
                expect: test.expect.clone(),
                got: got.to_json(),
            })
            .collect();

        if failures.is_empty() {
            Ok(PatchOutcome::Passed { patched })
        } else {
            debug!(
                entry = %input.entry,
                failed_cases = failures.len(),
                total_cases = input.tests.len(),
                "codefix cases failed"
            );
            Ok(PatchOutcome::Failed { failures, patched })
        }
    }
}
