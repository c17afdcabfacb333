//! Suite orchestration.
//!
//! Loads a suite, filters its scenarios, then drives each surviving
//! scenario through Runner -> Evaluator strictly in suite order. Any runner
//! or evaluator error aborts the run; no partial result is produced.

pub mod filter;

use chrono::Utc;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::domain::{Result, Scenario, ScenarioRunResult, Suite, SuiteRunResult};
use crate::evaluator::{EvaluationContext, Evaluator};
use crate::obs;
use crate::runner::{Runner, RunnerOptions};
use crate::suite::SuiteLoader;

pub use filter::{select_scenarios, ScenarioFilter};

/// Inputs to a suite run.
#[derive(Clone)]
pub struct RunSuiteOptions {
    /// Builtin suite id or path to a suite file.
    pub suite_id_or_path: String,
    pub runner: Arc<dyn Runner>,
    pub evaluator: Arc<dyn Evaluator>,
    /// Ids, substrings or `/regex/` patterns; empty runs everything.
    pub scenario_filters: Vec<String>,
    /// Forwarded to every runner call as a hint.
    pub timeout_ms: Option<u64>,
}

impl RunSuiteOptions {
    pub fn new(
        suite_id_or_path: impl Into<String>,
        runner: Arc<dyn Runner>,
        evaluator: Arc<dyn Evaluator>,
    ) -> Self {
        Self {
            suite_id_or_path: suite_id_or_path.into(),
            runner,
            evaluator,
            scenario_filters: Vec::new(),
            timeout_ms: None,
        }
    }

    pub fn with_filters(mut self, filters: Vec<String>) -> Self {
        self.scenario_filters = filters;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: Option<u64>) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// Sequential suite executor.
pub struct SuiteOrchestrator;

impl SuiteOrchestrator {
    /// Load the suite through `loader` and run it.
    pub async fn run(loader: &dyn SuiteLoader, options: &RunSuiteOptions) -> Result<SuiteRunResult> {
        let suite = loader.load_suite(&options.suite_id_or_path).await?;
        Self::run_loaded(&suite, options).await
    }

    /// Run an already-loaded suite.
    ///
    /// Filtering happens before any runner call, so an empty selection fails
    /// without side effects.
    pub async fn run_loaded(suite: &Suite, options: &RunSuiteOptions) -> Result<SuiteRunResult> {
        let selected = select_scenarios(&suite.scenarios, &options.scenario_filters)?;

        let run_id = Uuid::new_v4().to_string();
        let span = obs::suite_span(&run_id, suite.id.as_str());

        async {
            let started_at = Utc::now();
            let start = Instant::now();
            obs::emit_suite_started(
                &run_id,
                suite.id.as_str(),
                selected.len(),
                options.runner.name(),
                options.evaluator.name(),
            );

            let mut results = Vec::with_capacity(selected.len());
            for scenario in selected {
                let result = Self::run_scenario(scenario, options).await?;
                obs::emit_scenario_finished(&result);
                results.push(result);
            }

            let duration_ms = start.elapsed().as_millis() as u64;
            let run = SuiteRunResult::new(suite.id.clone(), results);
            obs::emit_suite_finished(&run_id, &run.summary, duration_ms);

            let mut metadata: BTreeMap<String, Value> = BTreeMap::new();
            metadata.insert("runId".into(), json!(run_id));
            metadata.insert("suiteName".into(), json!(suite.name));
            metadata.insert("runner".into(), json!(options.runner.name()));
            metadata.insert("evaluator".into(), json!(options.evaluator.name()));
            metadata.insert("startedAt".into(), json!(started_at.to_rfc3339()));
            metadata.insert("finishedAt".into(), json!(Utc::now().to_rfc3339()));
            metadata.insert("durationMs".into(), json!(duration_ms));
            if !options.scenario_filters.is_empty() {
                metadata.insert("scenarioFilters".into(), json!(options.scenario_filters));
            }

            Ok(run.with_metadata(metadata))
        }
        .instrument(span)
        .await
    }

    /// Runner -> Evaluator -> normalized scores for one scenario.
    async fn run_scenario(scenario: &Scenario, options: &RunSuiteOptions) -> Result<ScenarioRunResult> {
        let runner_options = RunnerOptions::default()
            .with_timeout_ms(options.timeout_ms)
            .for_scenario(scenario);

        let output = options.runner.run(&scenario.prompt, &runner_options).await?;
        let scores = options
            .evaluator
            .evaluate(EvaluationContext::new(scenario, &output.output_text))
            .await?
            .into_scores();

        Ok(ScenarioRunResult::new(scenario.id.clone(), output, scores))
    }
}

/// Convenience wrapper around [`SuiteOrchestrator::run`].
pub async fn run_suite(loader: &dyn SuiteLoader, options: &RunSuiteOptions) -> Result<SuiteRunResult> {
    SuiteOrchestrator::run(loader, options).await
}
