//! Scenario selection by id, substring or `/regex/`.

use regex::Regex;

use crate::domain::{BenchError, Result, Scenario};

/// One parsed `--scenario` filter.
#[derive(Debug, Clone)]
pub enum ScenarioFilter {
    /// `/.../`: the inner text is a regex tested against the scenario id.
    Pattern { raw: String, regex: Regex },
    /// Exact id, or case-insensitive substring of the id.
    Text { raw: String, folded: String },
}

impl ScenarioFilter {
    /// Parse a filter; a `/`-wrapped filter must hold a valid regex.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.len() >= 2 && raw.starts_with('/') && raw.ends_with('/') {
            let inner = &raw[1..raw.len() - 1];
            let regex = Regex::new(inner).map_err(|e| BenchError::InvalidFilter {
                filter: raw.to_string(),
                reason: e.to_string(),
            })?;
            return Ok(ScenarioFilter::Pattern {
                raw: raw.to_string(),
                regex,
            });
        }
        Ok(ScenarioFilter::Text {
            raw: raw.to_string(),
            folded: raw.to_lowercase(),
        })
    }

    pub fn raw(&self) -> &str {
        match self {
            ScenarioFilter::Pattern { raw, .. } | ScenarioFilter::Text { raw, .. } => raw,
        }
    }

    /// Regex form first, then exact id, then case-insensitive containment.
    pub fn matches(&self, scenario_id: &str) -> bool {
        match self {
            ScenarioFilter::Pattern { regex, .. } => regex.is_match(scenario_id),
            ScenarioFilter::Text { raw, folded } => {
                scenario_id == raw || scenario_id.to_lowercase().contains(folded.as_str())
            }
        }
    }
}

/// Keep scenarios matching any filter; no filters keeps everything.
///
/// Fails with `EmptySelection` when filters are given but nothing matches.
pub fn select_scenarios<'a>(scenarios: &'a [Scenario], filters: &[String]) -> Result<Vec<&'a Scenario>> {
    if filters.is_empty() {
        return Ok(scenarios.iter().collect());
    }

    let parsed = filters
        .iter()
        .map(|f| ScenarioFilter::parse(f))
        .collect::<Result<Vec<_>>>()?;

    let selected: Vec<&Scenario> = scenarios
        .iter()
        .filter(|s| parsed.iter().any(|f| f.matches(s.id.as_str())))
        .collect();

    if selected.is_empty() {
        return Err(BenchError::EmptySelection {
            filters: parsed.iter().map(|f| f.raw().to_string()).collect(),
        });
    }
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenarios() -> Vec<Scenario> {
        vec![
            Scenario::new("a-1", "A1", "P1"),
            Scenario::new("b-2", "B2", "P2"),
            Scenario::new("Codefix-Add", "C", "P3"),
        ]
    }

    fn ids(selected: &[&Scenario]) -> Vec<String> {
        selected.iter().map(|s| s.id.to_string()).collect()
    }

    #[test]
    fn no_filters_selects_all() {
        let all = scenarios();
        assert_eq!(select_scenarios(&all, &[]).unwrap().len(), 3);
    }

    #[test]
    fn regex_filter_matches_ids() {
        let all = scenarios();
        let selected = select_scenarios(&all, &["/^b-/".to_string()]).unwrap();
        assert_eq!(ids(&selected), ["b-2"]);
    }

    #[test]
    fn exact_and_substring_filters() {
        let all = scenarios();
        assert_eq!(ids(&select_scenarios(&all, &["a-1".to_string()]).unwrap()), ["a-1"]);
        assert_eq!(
            ids(&select_scenarios(&all, &["codefix".to_string()]).unwrap()),
            ["Codefix-Add"]
        );
        assert_eq!(ids(&select_scenarios(&all, &["B-".to_string()]).unwrap()), ["b-2"]);
    }

    #[test]
    fn any_filter_may_match_and_order_follows_suite() {
        let all = scenarios();
        let selected =
            select_scenarios(&all, &["b-2".to_string(), "/^a/".to_string()]).unwrap();
        assert_eq!(ids(&selected), ["a-1", "b-2"]);
    }

    #[test]
    fn regex_form_is_case_sensitive() {
        let all = scenarios();
        let err = select_scenarios(&all, &["/^codefix/".to_string()]).unwrap_err();
        assert!(matches!(err, BenchError::EmptySelection { .. }));
    }

    #[test]
    fn empty_selection_names_filters() {
        let all = scenarios();
        let err = select_scenarios(&all, &["nope".to_string()]).unwrap_err();
        assert_eq!(err.to_string(), "No scenarios matched filters: nope");
    }

    #[test]
    fn invalid_regex_is_rejected() {
        let all = scenarios();
        let err = select_scenarios(&all, &["/(unclosed/".to_string()]).unwrap_err();
        assert!(matches!(err, BenchError::InvalidFilter { .. }));
    }

    #[test]
    fn lone_slash_is_plain_text() {
        let filter = ScenarioFilter::parse("/").unwrap();
        assert!(matches!(filter, ScenarioFilter::Text { .. }));
        assert!(filter.matches("a/b"));
    }
}
