//! Runner output and run results.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::ids::{ModelId, ScenarioId, SuiteId};
use super::score::{all_pass, Score};

/// Output of one runner invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunnerResult {
    pub output_text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,

    /// Provider-specific payload, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

impl RunnerResult {
    /// A result carrying only output text.
    pub fn text(output_text: impl Into<String>) -> Self {
        Self {
            output_text: output_text.into(),
            model: None,
            tokens: None,
            latency_ms: None,
            raw: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<ModelId>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_tokens(mut self, tokens: u64) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = Some(latency_ms);
        self
    }
}

/// Result of running and scoring a single scenario.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioRunResult {
    pub scenario_id: ScenarioId,
    pub output_text: String,
    pub scores: Vec<Score>,
    /// True iff every entry in `scores` passed.
    pub pass: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<u64>,
    /// Provider payload from the runner, kept for the artifacts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

impl ScenarioRunResult {
    /// Build a result from a runner output and normalized scores.
    ///
    /// `pass` is derived here so it can never disagree with `scores`.
    pub fn new(scenario_id: ScenarioId, runner: RunnerResult, scores: Vec<Score>) -> Self {
        let pass = all_pass(&scores);
        Self {
            scenario_id,
            output_text: runner.output_text,
            scores,
            pass,
            model: runner.model,
            latency_ms: runner.latency_ms,
            tokens: runner.tokens,
            raw: runner.raw,
        }
    }
}

/// Pass/fail totals for a suite run.
///
/// # Invariants
///
/// `total == passed + failed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SuiteSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

impl SuiteSummary {
    /// Tally a result sequence.
    pub fn from_results(results: &[ScenarioRunResult]) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.pass).count();
        Self {
            total,
            passed,
            failed: total - passed,
        }
    }

    /// Fraction of scenarios that passed (0.0 for an empty run).
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f64 / self.total as f64
        }
    }
}

/// Everything a suite run produces; the sole input to artifact persistence.
///
/// Contains only plain data so it serializes without loss.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SuiteRunResult {
    pub suite_id: SuiteId,
    pub results: Vec<ScenarioRunResult>,
    pub summary: SuiteSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, Value>>,
}

impl SuiteRunResult {
    /// Assemble a run result, computing the summary from `results`.
    pub fn new(suite_id: SuiteId, results: Vec<ScenarioRunResult>) -> Self {
        let summary = SuiteSummary::from_results(&results);
        Self {
            suite_id,
            results,
            summary,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: BTreeMap<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(id: &str, scores: Vec<Score>) -> ScenarioRunResult {
        ScenarioRunResult::new(ScenarioId::from(id), RunnerResult::text("out"), scores)
    }

    #[test]
    fn scenario_pass_is_derived_from_scores() {
        let ok = result("a", vec![Score::passed("k")]);
        assert!(ok.pass);

        let bad = result(
            "b",
            vec![Score::passed("k"), Score::failed("style", json!({"reason": "nope"}))],
        );
        assert!(!bad.pass);
    }

    #[test]
    fn summary_totals_add_up() {
        let results = vec![
            result("a", vec![Score::passed("k")]),
            result("b", vec![Score::failed("k", json!({}))]),
            result("c", vec![Score::passed("k")]),
        ];
        let summary = SuiteSummary::from_results(&results);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total, summary.passed + summary.failed);
    }

    #[test]
    fn empty_summary_has_zero_pass_rate() {
        let summary = SuiteSummary::from_results(&[]);
        assert_eq!(summary, SuiteSummary::default());
        assert_eq!(summary.pass_rate(), 0.0);
    }

    #[test]
    fn runner_metadata_is_copied_through() {
        let mut runner = RunnerResult::text("ok")
            .with_model("test-model")
            .with_latency_ms(5)
            .with_tokens(2);
        runner.raw = Some(json!({"id": "chatcmpl-1"}));
        let r = ScenarioRunResult::new(ScenarioId::from("a"), runner, vec![Score::passed("k")]);
        assert_eq!(r.model.as_ref().map(|m| m.as_str()), Some("test-model"));
        assert_eq!(r.latency_ms, Some(5));
        assert_eq!(r.tokens, Some(2));
        assert_eq!(r.raw, Some(json!({"id": "chatcmpl-1"})));

        let serialized = serde_json::to_value(&r).unwrap();
        assert_eq!(serialized["raw"]["id"], json!("chatcmpl-1"));
    }

    #[test]
    fn suite_result_uses_camel_case_keys() {
        let run = SuiteRunResult::new(SuiteId::from("toy"), vec![result("a", vec![Score::passed("k")])]);
        let raw = serde_json::to_value(&run).unwrap();
        assert_eq!(raw["suiteId"], json!("toy"));
        assert_eq!(raw["results"][0]["scenarioId"], json!("a"));
        assert_eq!(raw["results"][0]["outputText"], json!("out"));
        assert_eq!(raw["summary"], json!({"total": 1, "passed": 1, "failed": 0}));
        assert!(raw.get("metadata").is_none());
    }
}
