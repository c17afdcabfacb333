//! Quick verdict printed after a run.

use minibench_core::SuiteRunResult;

/// Scenario ids longer than this overflow the column instead of widening it.
const MAX_ID_WIDTH: usize = 60;

pub fn render(result: &SuiteRunResult) -> String {
    let width = result
        .results
        .iter()
        .map(|r| r.scenario_id.as_str().chars().count())
        .max()
        .unwrap_or(0)
        .min(MAX_ID_WIDTH);

    let mut out = format!("Suite: {}\n", result.suite_id);
    for r in &result.results {
        let verdict = if r.pass { "✓ pass" } else { "✗ fail" };
        out.push_str(&format!(
            "• {:<width$}  {}\n",
            r.scenario_id.as_str(),
            verdict,
            width = width
        ));
    }
    out.push_str(&footer(result));
    out.push('\n');
    out
}

fn footer(result: &SuiteRunResult) -> String {
    let summary = &result.summary;
    let mut parts = Vec::new();
    if summary.passed > 0 {
        parts.push(format!("{} passed", summary.passed));
    }
    if summary.failed > 0 {
        parts.push(format!("{} failed", summary.failed));
    }
    parts.push(format!("{} total", summary.total));
    parts.join(" | ")
}
