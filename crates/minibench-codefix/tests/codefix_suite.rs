//! Codefix evaluation end to end: builtin suite, file suites and the
//! failure modes a patch can hit.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use minibench_codefix::{
    standard_evaluators, AutoEvaluator, CodefixConfig, CodefixEvaluator, EmbeddedHost,
    CODEFIX_SCORE_KEY,
};
use minibench_core::{
    run_suite, CodefixInput, InMemorySuiteLoader, MockCodefixRunner, Result, RunSuiteOptions,
    Runner, RunnerOptions, RunnerResult, Scenario, StandardSuiteLoader, Suite,
};

/// Answers every prompt with the same text.
struct FixedRunner(String);

#[async_trait]
impl Runner for FixedRunner {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn run(&self, _prompt: &str, _options: &RunnerOptions) -> Result<RunnerResult> {
        Ok(RunnerResult::text(self.0.clone()))
    }
}

fn fixed(output: Value) -> Arc<dyn Runner> {
    Arc::new(FixedRunner(output.to_string()))
}

fn patch(find: &str, replace: &str) -> Value {
    json!({ "explanation": "test", "patch": { "find": find, "replace": replace } })
}

fn single_scenario_suite(input: CodefixInput) -> InMemorySuiteLoader {
    let suite = Suite::new("cf", "Codefix").add_scenario(
        Scenario::new("cf-1", "Codefix", "Fix the function").with_input(input.to_value()),
    );
    InMemorySuiteLoader::with_suites([suite])
}

fn add_input() -> CodefixInput {
    CodefixInput::new("function add(a, b) { return 3; }", "add")
        .with_test(vec![json!(1), json!(1)], json!(2))
        .with_test(vec![json!(2), json!(1)], json!(3))
        .with_test(vec![json!(2), json!(2)], json!(4))
}

#[tokio::test]
async fn mock_codefix_runner_fixes_the_builtin_suite() {
    let options = RunSuiteOptions::new(
        "codefix-toy",
        Arc::new(MockCodefixRunner),
        Arc::new(CodefixEvaluator::default()),
    );
    let run = run_suite(&StandardSuiteLoader, &options).await.unwrap();

    assert_eq!(run.summary.total, 2);
    assert_eq!(run.summary.passed, 2);
    assert_eq!(run.summary.failed, 0);
    for result in &run.results {
        assert_eq!(result.scores.len(), 1);
        assert_eq!(result.scores[0].key, CODEFIX_SCORE_KEY);
    }
}

#[tokio::test]
async fn auto_evaluator_handles_both_builtin_suites() {
    let registry = standard_evaluators(&CodefixConfig::default());
    let auto = registry.resolve("auto").unwrap();

    let toy = RunSuiteOptions::new("toy", Arc::new(MockCodefixRunner), auto.clone());
    let run = run_suite(&StandardSuiteLoader, &toy).await.unwrap();
    assert_eq!((run.summary.passed, run.summary.failed), (1, 1));
    assert_eq!(run.results[0].scores[0].key, "exact_match");

    let codefix = RunSuiteOptions::new("codefix-toy", Arc::new(MockCodefixRunner), auto);
    let run = run_suite(&StandardSuiteLoader, &codefix).await.unwrap();
    assert_eq!(run.summary.passed, 2);
}

#[tokio::test]
async fn constrained_scenario_rejects_other_finds() {
    let options = RunSuiteOptions::new(
        "codefix-toy",
        fixed(patch("function add(a, b) { return 3; }", "function add(a, b) { return a + b; }")),
        Arc::new(CodefixEvaluator::default()),
    );
    let run = run_suite(&StandardSuiteLoader, &options).await.unwrap();

    let unconstrained = &run.results[0];
    assert_eq!(unconstrained.scenario_id.as_str(), "codefix-add-unconstrained");
    assert!(unconstrained.pass);

    let constrained = &run.results[1];
    assert!(!constrained.pass);
    let details = constrained.scores[0].details.as_ref().unwrap();
    assert_eq!(details["error"], json!("find-not-allowed"));
    assert_eq!(details["allowed"], json!(["return 3;"]));
}

#[tokio::test]
async fn failing_cases_are_listed_with_the_patched_source() {
    let loader = single_scenario_suite(add_input());
    let options = RunSuiteOptions::new(
        "cf",
        fixed(patch("return 3;", "return a - b;")),
        Arc::new(CodefixEvaluator::default()),
    );
    let run = run_suite(&loader, &options).await.unwrap();

    let score = &run.results[0].scores[0];
    assert!(!score.pass);
    assert_eq!(score.value, 0.0);
    let details = score.details.as_ref().unwrap();
    assert_eq!(details["patched"], json!("function add(a, b) { return a - b; }"));
    assert_eq!(
        details["failures"],
        json!([
            { "args": [1, 1], "expect": 2, "got": 0 },
            { "args": [2, 1], "expect": 3, "got": 1 },
            { "args": [2, 2], "expect": 4, "got": 0 },
        ])
    );
}

#[tokio::test]
async fn unparseable_output_is_a_score_not_an_error() {
    let loader = single_scenario_suite(add_input());
    let options = RunSuiteOptions::new(
        "cf",
        Arc::new(FixedRunner("I would change return 3 to return a + b".into())),
        Arc::new(CodefixEvaluator::default()),
    );
    let run = run_suite(&loader, &options).await.unwrap();

    assert_eq!(run.summary.failed, 1);
    let details = run.results[0].scores[0].details.as_ref().unwrap();
    assert_eq!(details["error"], json!("bad-patch-shape"));
}

#[tokio::test]
async fn typescript_sources_with_exports_are_supported() {
    let input = CodefixInput::new(
        "export function clamp(x: number, lo: number, hi: number): number {\n  return x;\n}\n",
        "clamp",
    )
    .with_test(vec![json!(5), json!(0), json!(10)], json!(5))
    .with_test(vec![json!(-3), json!(0), json!(10)], json!(0))
    .with_test(vec![json!(42), json!(0), json!(10)], json!(10));

    let loader = single_scenario_suite(input);
    let options = RunSuiteOptions::new(
        "cf",
        fixed(patch("return x;", "return Math.min(hi, Math.max(lo, x));")),
        Arc::new(CodefixEvaluator::new(Arc::new(EmbeddedHost::new()))),
    );
    let run = run_suite(&loader, &options).await.unwrap();
    assert!(run.results[0].pass, "{:?}", run.results[0].scores);
}

#[tokio::test]
async fn string_and_array_helpers_work_in_patches() {
    let input = CodefixInput::new(
        "function initials(name) {\n  return name.split(' ').map(w => w[1]).join('');\n}",
        "initials",
    )
    .with_test(vec![json!("Ada Lovelace")], json!("AL"))
    .with_test(vec![json!("Grace Brewster Hopper")], json!("GBH"));

    let loader = single_scenario_suite(input);
    let options = RunSuiteOptions::new(
        "cf",
        fixed(patch("w[1]", "w[0]")),
        Arc::new(AutoEvaluator::default()),
    );
    let run = run_suite(&loader, &options).await.unwrap();
    assert!(run.results[0].pass, "{:?}", run.results[0].scores);
}

#[tokio::test]
async fn codefix_scenarios_load_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("negate.json");
    let suite = json!({
        "id": "negate",
        "name": "Negate",
        "scenarios": [{
            "id": "negate-1",
            "prompt": "Fix negate",
            "input": {
                "kind": "codefix",
                "source": "const negate = (n) => n;",
                "entry": "negate",
                "tests": [
                    { "args": [1], "expect": -1 },
                    { "args": [-2], "expect": 2 }
                ],
                "constraints": { "allowedFinds": ["=> n;"] }
            }
        }]
    });
    std::fs::write(&path, suite.to_string()).unwrap();

    let options = RunSuiteOptions::new(
        path.to_string_lossy(),
        fixed(patch("=> n;", "=> -n;")),
        standard_evaluators(&CodefixConfig::default())
            .resolve("codefix")
            .unwrap(),
    );
    let run = run_suite(&StandardSuiteLoader, &options).await.unwrap();
    assert_eq!(run.suite_id.as_str(), "negate");
    assert!(run.results[0].pass, "{:?}", run.results[0].scores);
}
