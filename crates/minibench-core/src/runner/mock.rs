//! Deterministic mock runners for offline runs and tests.

use async_trait::async_trait;
use regex::Regex;
use serde_json::json;
use std::sync::OnceLock;

use super::{Runner, RunnerOptions};
use crate::domain::scenario::value_text;
use crate::domain::{Result, RunnerResult, CODEFIX_KIND};

/// Strip a leading `Return exactly:` instruction (case-insensitive).
pub fn strip_return_exactly(prompt: &str) -> String {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    let re = PREFIX.get_or_init(|| {
        Regex::new(r"(?i)^Return exactly:\s*").expect("valid prefix regex")
    });
    re.replace(prompt, "").into_owned()
}

/// Returns the scenario's own expected value, so exact-match always passes.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockPassRunner;

#[async_trait]
impl Runner for MockPassRunner {
    fn name(&self) -> &str {
        "mock:pass"
    }

    async fn run(&self, _prompt: &str, options: &RunnerOptions) -> Result<RunnerResult> {
        let expected = options.scenario.as_ref().and_then(|s| s.expected.as_ref());
        Ok(RunnerResult::text(value_text(expected)).with_model("mock"))
    }
}

/// Always answers with an obviously wrong value.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockFailRunner;

#[async_trait]
impl Runner for MockFailRunner {
    fn name(&self) -> &str {
        "mock:fail"
    }

    async fn run(&self, _prompt: &str, _options: &RunnerOptions) -> Result<RunnerResult> {
        Ok(RunnerResult::text("<wrong>").with_model("mock"))
    }
}

/// Echoes the prompt minus a leading `Return exactly:` instruction.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockEchoRunner;

#[async_trait]
impl Runner for MockEchoRunner {
    fn name(&self) -> &str {
        "mock:echo"
    }

    async fn run(&self, prompt: &str, _options: &RunnerOptions) -> Result<RunnerResult> {
        Ok(RunnerResult::text(strip_return_exactly(prompt)).with_model("mock"))
    }
}

/// Proposes the canonical `add` fix for codefix scenarios, echoes otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockCodefixRunner;

#[async_trait]
impl Runner for MockCodefixRunner {
    fn name(&self) -> &str {
        "mock:codefix"
    }

    async fn run(&self, prompt: &str, options: &RunnerOptions) -> Result<RunnerResult> {
        let is_codefix = options
            .scenario
            .as_ref()
            .and_then(|s| s.input_kind())
            .is_some_and(|kind| kind == CODEFIX_KIND);

        let output = if is_codefix {
            json!({
                "explanation": "Replace constant with sum.",
                "patch": { "find": "return 3;", "replace": "return a + b;" },
            })
            .to_string()
        } else {
            strip_return_exactly(prompt)
        };
        Ok(RunnerResult::text(output).with_model("mock"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CodefixInput, Scenario};
    use serde_json::Value;

    fn options(scenario: &Scenario) -> RunnerOptions {
        RunnerOptions::default().for_scenario(scenario)
    }

    #[tokio::test]
    async fn pass_returns_expected_text() {
        let scenario = Scenario::new("toy-1", "Toy", "Return exactly: hello world")
            .with_expected("hello world");
        let out = MockPassRunner.run(&scenario.prompt, &options(&scenario)).await.unwrap();
        assert_eq!(out.output_text, "hello world");
    }

    #[tokio::test]
    async fn pass_renders_non_string_expected_as_json() {
        let scenario = Scenario::new("n", "N", "p").with_expected(42);
        let out = MockPassRunner.run("p", &options(&scenario)).await.unwrap();
        assert_eq!(out.output_text, "42");
    }

    #[tokio::test]
    async fn pass_without_context_returns_empty() {
        let out = MockPassRunner.run("p", &RunnerOptions::default()).await.unwrap();
        assert_eq!(out.output_text, "");
    }

    #[tokio::test]
    async fn fail_is_always_wrong() {
        let out = MockFailRunner.run("anything", &RunnerOptions::default()).await.unwrap();
        assert_eq!(out.output_text, "<wrong>");
    }

    #[tokio::test]
    async fn echo_strips_instruction_case_insensitively() {
        let out = MockEchoRunner
            .run("return EXACTLY:   42", &RunnerOptions::default())
            .await
            .unwrap();
        assert_eq!(out.output_text, "42");

        let untouched = MockEchoRunner
            .run("say: Return exactly: x", &RunnerOptions::default())
            .await
            .unwrap();
        assert_eq!(untouched.output_text, "say: Return exactly: x");
    }

    #[tokio::test]
    async fn codefix_emits_patch_json_for_codefix_inputs() {
        let input = CodefixInput::new("function add(a, b) { return 3; }", "add");
        let scenario = Scenario::new("c", "C", "fix it").with_input(input.to_value());
        let out = MockCodefixRunner.run("fix it", &options(&scenario)).await.unwrap();

        let parsed: Value = serde_json::from_str(&out.output_text).expect("json output");
        assert_eq!(parsed["patch"]["find"], "return 3;");
        assert_eq!(parsed["patch"]["replace"], "return a + b;");
    }

    #[tokio::test]
    async fn codefix_echoes_for_other_scenarios() {
        let scenario = Scenario::new("t", "T", "Return exactly: hi").with_expected("hi");
        let out = MockCodefixRunner
            .run("Return exactly: hi", &options(&scenario))
            .await
            .unwrap();
        assert_eq!(out.output_text, "hi");
    }
}
