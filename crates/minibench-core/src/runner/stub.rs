//! Offline stub runner with a fixed, deterministic answer.

use async_trait::async_trait;

use super::{Runner, RunnerOptions};
use crate::domain::{Result, RunnerResult};

const ANSWER: &str = "return a + b;";
const UNKNOWN: &str = "???";

/// Echoes `return a + b;` when the prompt contains it verbatim, else `???`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubRunner;

#[async_trait]
impl Runner for StubRunner {
    fn name(&self) -> &str {
        "stub"
    }

    async fn run(&self, prompt: &str, _options: &RunnerOptions) -> Result<RunnerResult> {
        let output = if prompt.contains(ANSWER) { ANSWER } else { UNKNOWN };
        Ok(RunnerResult::text(output)
            .with_model("stub-model")
            .with_tokens(output.len() as u64)
            .with_latency_ms(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_the_fix_when_present() {
        let out = StubRunner
            .run("Please fix:\nreturn a + b;\nThanks!", &RunnerOptions::default())
            .await
            .unwrap();
        assert_eq!(out.output_text, "return a + b;");
        assert_eq!(out.tokens, Some(13));
        assert_eq!(out.model.as_ref().map(|m| m.as_str()), Some("stub-model"));
        assert_eq!(out.latency_ms, Some(1));
    }

    #[tokio::test]
    async fn answers_unknown_otherwise() {
        let out = StubRunner
            .run("try this instead: return a+b; // no spaces", &RunnerOptions::default())
            .await
            .unwrap();
        assert_eq!(out.output_text, "???");
        assert_eq!(out.tokens, Some(3));
    }

    #[tokio::test]
    async fn is_deterministic() {
        let opts = RunnerOptions::default();
        let a = StubRunner.run("random text", &opts).await.unwrap();
        let b = StubRunner.run("random text", &opts).await.unwrap();
        assert_eq!(a, b);
    }
}
