//! Suite lifecycle events.
//!
//! Everything is emitted at `info!` with an `event` field so JSON logs can
//! be filtered by event name.

use tracing::info;

use crate::domain::{ScenarioRunResult, SuiteSummary};

/// Span tagging all events of one suite run. Attach with
/// [`tracing::Instrument`] so it survives across awaits.
pub fn suite_span(run_id: &str, suite_id: &str) -> tracing::Span {
    tracing::info_span!("minibench.suite", run_id = %run_id, suite_id = %suite_id)
}

/// RAII guard entering a suite span for synchronous sections.
pub struct SuiteSpan {
    _span: tracing::span::EnteredSpan,
}

impl SuiteSpan {
    pub fn enter(run_id: &str, suite_id: &str) -> Self {
        Self {
            _span: suite_span(run_id, suite_id).entered(),
        }
    }
}

pub fn emit_suite_started(
    run_id: &str,
    suite_id: &str,
    scenarios: usize,
    runner: &str,
    evaluator: &str,
) {
    info!(
        event = "suite.started",
        run_id = %run_id,
        suite_id = %suite_id,
        scenarios = scenarios,
        runner = %runner,
        evaluator = %evaluator,
    );
}

pub fn emit_scenario_finished(result: &ScenarioRunResult) {
    info!(
        event = "scenario.finished",
        scenario_id = %result.scenario_id,
        pass = result.pass,
        scores = result.scores.len(),
        latency_ms = result.latency_ms.unwrap_or_default(),
    );
}

pub fn emit_suite_finished(run_id: &str, summary: &SuiteSummary, duration_ms: u64) {
    info!(
        event = "suite.finished",
        run_id = %run_id,
        total = summary.total,
        passed = summary.passed,
        failed = summary.failed,
        pass_rate = summary.pass_rate(),
        duration_ms = duration_ms,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suite_span_create() {
        let _span = SuiteSpan::enter("run-1", "toy");
        emit_suite_finished("run-1", &SuiteSummary::default(), 0);
    }
}
