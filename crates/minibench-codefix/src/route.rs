//! The `auto` evaluator: codefix for codefix scenarios, exact match otherwise.

use async_trait::async_trait;

use minibench_core::{EvalOutcome, EvaluationContext, Evaluator, ExactMatchEvaluator, Result};

use crate::evaluator::{declares_codefix, CodefixEvaluator};

#[derive(Clone, Default)]
pub struct AutoEvaluator {
    codefix: CodefixEvaluator,
    exact: ExactMatchEvaluator,
}

impl AutoEvaluator {
    pub fn new(codefix: CodefixEvaluator) -> Self {
        Self {
            codefix,
            exact: ExactMatchEvaluator,
        }
    }
}

#[async_trait]
impl Evaluator for AutoEvaluator {
    fn name(&self) -> &str {
        "auto"
    }

    async fn evaluate(&self, ctx: EvaluationContext<'_>) -> Result<EvalOutcome> {
        if declares_codefix(ctx.input) {
            self.codefix.evaluate(ctx).await
        } else {
            self.exact.evaluate(ctx).await
        }
    }
}
