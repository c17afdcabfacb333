//! Suite orchestration: filtering, score normalization, summaries and
//! fail-fast error propagation.

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use minibench_core::{
    run_suite, BenchError, EvalOutcome, EvaluationContext, Evaluator, ExactMatchEvaluator,
    InMemorySuiteLoader, MockEchoRunner, MockFailRunner, MockPassRunner, Result, RunSuiteOptions,
    Runner, RunnerOptions, RunnerResult, Scenario, Score, StandardSuiteLoader, Suite,
    SuiteOrchestrator,
};

/// Counts calls and echoes the prompt.
#[derive(Default)]
struct CountingRunner {
    calls: AtomicUsize,
}

#[async_trait]
impl Runner for CountingRunner {
    fn name(&self) -> &str {
        "counting"
    }

    async fn run(&self, prompt: &str, _options: &RunnerOptions) -> Result<RunnerResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(RunnerResult::text(prompt))
    }
}

/// Fails on one scenario id, echoes everything else.
struct ExplodingRunner {
    fail_on: &'static str,
    calls: AtomicUsize,
}

#[async_trait]
impl Runner for ExplodingRunner {
    fn name(&self) -> &str {
        "exploding"
    }

    async fn run(&self, prompt: &str, options: &RunnerOptions) -> Result<RunnerResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let id = options.scenario.as_ref().map(|s| s.id.to_string()).unwrap_or_default();
        if id == self.fail_on {
            return Err(BenchError::Runner("connection reset".to_string()));
        }
        Ok(RunnerResult::text(prompt))
    }
}

/// Returns two scores, the second failing for prompts containing "bad".
struct TwoScoreEvaluator;

#[async_trait]
impl Evaluator for TwoScoreEvaluator {
    fn name(&self) -> &str {
        "two-score"
    }

    async fn evaluate(&self, ctx: EvaluationContext<'_>) -> Result<EvalOutcome> {
        let style = if ctx.output_text.contains("bad") {
            Score::failed("style", json!({"reason": "bad"}))
        } else {
            Score::passed("style")
        };
        Ok(vec![Score::passed("format"), style].into())
    }
}

/// Returns an empty score sequence.
struct SilentEvaluator;

#[async_trait]
impl Evaluator for SilentEvaluator {
    fn name(&self) -> &str {
        "silent"
    }

    async fn evaluate(&self, _ctx: EvaluationContext<'_>) -> Result<EvalOutcome> {
        Ok(EvalOutcome::Many(Vec::new()))
    }
}

fn ab_suite() -> Suite {
    Suite::new("ab", "A/B")
        .add_scenario(Scenario::new("a-1", "A", "good a").with_expected("good a"))
        .add_scenario(Scenario::new("b-2", "B", "bad b").with_expected("bad b"))
}

fn loader() -> InMemorySuiteLoader {
    InMemorySuiteLoader::with_suites([ab_suite()])
}

fn options(runner: Arc<dyn Runner>, evaluator: Arc<dyn Evaluator>) -> RunSuiteOptions {
    RunSuiteOptions::new("ab", runner, evaluator)
}

#[tokio::test]
async fn mock_pass_on_toy_passes_everything() {
    let opts = RunSuiteOptions::new("toy", Arc::new(MockPassRunner), Arc::new(ExactMatchEvaluator));
    let run = run_suite(&StandardSuiteLoader::new(), &opts).await.unwrap();

    assert_eq!(run.suite_id.as_str(), "toy");
    assert_eq!(run.summary.total, 2);
    assert_eq!(run.summary.passed, 2);
    assert_eq!(run.summary.failed, 0);
}

#[tokio::test]
async fn mock_echo_on_toy_is_mixed() {
    let opts = RunSuiteOptions::new("toy", Arc::new(MockEchoRunner), Arc::new(ExactMatchEvaluator));
    let run = run_suite(&StandardSuiteLoader::new(), &opts).await.unwrap();

    let verdicts: Vec<(String, bool)> = run
        .results
        .iter()
        .map(|r| (r.scenario_id.to_string(), r.pass))
        .collect();
    assert_eq!(
        verdicts,
        vec![("toy-1".to_string(), true), ("toy-2".to_string(), false)]
    );
    assert_eq!(run.results[1].scores[0].details, Some(json!({"expected": "0042", "received": "42"})));
}

#[tokio::test]
async fn mock_fail_on_toy_fails_everything() {
    let opts = RunSuiteOptions::new("toy", Arc::new(MockFailRunner), Arc::new(ExactMatchEvaluator));
    let run = run_suite(&StandardSuiteLoader::new(), &opts).await.unwrap();

    assert_eq!(run.summary.passed, 0);
    assert_eq!(run.summary.failed, 2);
    assert!(run.results.iter().all(|r| r.output_text == "<wrong>"));
}

#[tokio::test]
async fn results_follow_suite_order_and_summary_adds_up() {
    let run = run_suite(
        &loader(),
        &options(Arc::new(CountingRunner::default()), Arc::new(TwoScoreEvaluator)),
    )
    .await
    .unwrap();

    let ids: Vec<&str> = run.results.iter().map(|r| r.scenario_id.as_str()).collect();
    assert_eq!(ids, ["a-1", "b-2"]);
    assert_eq!(run.summary.total, run.results.len());
    assert_eq!(run.summary.total, run.summary.passed + run.summary.failed);
    for r in &run.results {
        assert_eq!(r.pass, r.scores.iter().all(|s| s.pass));
    }
}

#[tokio::test]
async fn one_failing_score_fails_the_scenario() {
    let run = run_suite(
        &loader(),
        &options(Arc::new(CountingRunner::default()), Arc::new(TwoScoreEvaluator)),
    )
    .await
    .unwrap();

    let b = &run.results[1];
    assert_eq!(b.scores.len(), 2);
    assert!(b.scores[0].pass);
    assert!(!b.pass);
    assert_eq!(run.summary.passed, 1);
    assert_eq!(run.summary.failed, 1);
}

#[tokio::test]
async fn empty_score_sequence_counts_as_pass() {
    let run = run_suite(
        &loader(),
        &options(Arc::new(CountingRunner::default()), Arc::new(SilentEvaluator)),
    )
    .await
    .unwrap();

    assert!(run.results.iter().all(|r| r.scores.is_empty() && r.pass));
    assert_eq!(run.summary.passed, 2);
}

#[tokio::test]
async fn regex_filter_runs_only_matching_scenarios() {
    let runner = Arc::new(CountingRunner::default());
    let opts = options(runner.clone(), Arc::new(ExactMatchEvaluator))
        .with_filters(vec!["/^b-/".to_string()]);
    let run = run_suite(&loader(), &opts).await.unwrap();

    assert_eq!(run.results.len(), 1);
    assert_eq!(run.results[0].scenario_id.as_str(), "b-2");
    assert_eq!(runner.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn empty_selection_fails_before_any_runner_call() {
    let runner = Arc::new(CountingRunner::default());
    let opts = options(runner.clone(), Arc::new(ExactMatchEvaluator))
        .with_filters(vec!["nope".to_string()]);
    let err = run_suite(&loader(), &opts).await.unwrap_err();

    assert_eq!(err.to_string(), "No scenarios matched filters: nope");
    assert!(err.is_configuration());
    assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_suite_names_the_identifier() {
    let opts = RunSuiteOptions::new("does-not-exist", Arc::new(MockPassRunner), Arc::new(ExactMatchEvaluator));
    let err = run_suite(&StandardSuiteLoader::new(), &opts).await.unwrap_err();

    assert!(matches!(err, BenchError::UnknownSuite(_)));
    assert!(err.to_string().contains("does-not-exist"));
}

#[tokio::test]
async fn runner_error_aborts_without_partial_result() {
    let runner = Arc::new(ExplodingRunner {
        fail_on: "a-1",
        calls: AtomicUsize::new(0),
    });
    let err = run_suite(&loader(), &options(runner.clone(), Arc::new(ExactMatchEvaluator)))
        .await
        .unwrap_err();

    assert!(matches!(err, BenchError::Runner(_)));
    assert_eq!(runner.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn run_metadata_describes_the_run() {
    let run = SuiteOrchestrator::run_loaded(
        &ab_suite(),
        &options(Arc::new(MockPassRunner), Arc::new(ExactMatchEvaluator)),
    )
    .await
    .unwrap();

    let metadata = run.metadata.expect("metadata");
    assert_eq!(metadata["suiteName"], json!("A/B"));
    assert_eq!(metadata["runner"], json!("mock:pass"));
    assert_eq!(metadata["evaluator"], json!("exact"));
    assert!(metadata["runId"].as_str().is_some_and(|id| id.len() == 36));
    for key in ["startedAt", "finishedAt", "durationMs"] {
        assert!(metadata.contains_key(key), "{key} missing");
    }
    assert_eq!(run.summary.passed, 2);
}

#[tokio::test]
async fn suite_result_serializes_losslessly() {
    let run = run_suite(
        &loader(),
        &options(Arc::new(CountingRunner::default()), Arc::new(TwoScoreEvaluator)),
    )
    .await
    .unwrap();

    let text = serde_json::to_string(&run).unwrap();
    let back: minibench_core::SuiteRunResult = serde_json::from_str(&text).unwrap();
    assert_eq!(back, run);
}
