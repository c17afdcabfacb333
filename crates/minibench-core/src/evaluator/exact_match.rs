//! Whitespace-trimmed exact comparison.

use async_trait::async_trait;
use serde_json::json;

use super::{EvaluationContext, Evaluator};
use crate::domain::{EvalOutcome, Result, Score};

/// Score key emitted by [`ExactMatchEvaluator`].
pub const EXACT_MATCH_KEY: &str = "exact_match";

/// Compare the trimmed output with the trimmed expected value.
///
/// Case and internal whitespace are significant.
pub fn score_exact_match(expected: &str, output: &str) -> Score {
    let expected = expected.trim();
    let received = output.trim();
    if expected == received {
        Score::passed(EXACT_MATCH_KEY)
    } else {
        Score::failed(
            EXACT_MATCH_KEY,
            json!({ "expected": expected, "received": received }),
        )
    }
}

/// Passes when the output equals `scenario.expected` after trimming.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExactMatchEvaluator;

#[async_trait]
impl Evaluator for ExactMatchEvaluator {
    fn name(&self) -> &str {
        "exact"
    }

    async fn evaluate(&self, ctx: EvaluationContext<'_>) -> Result<EvalOutcome> {
        let expected = ctx.scenario.expected_text();
        Ok(score_exact_match(&expected, ctx.output_text).into())
    }
}
