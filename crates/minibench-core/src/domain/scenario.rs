//! Scenario and suite definitions.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

use super::error::{BenchError, Result};
use super::ids::{ScenarioId, SuiteId};

/// One unit of benchmark work: a prompt plus evaluation criteria.
///
/// Scenarios are immutable once loaded; evaluators only ever see `&Scenario`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    /// Unique identifier within the owning suite.
    pub id: ScenarioId,

    /// Human-readable name.
    #[serde(default)]
    pub name: String,

    /// Text sent to the runner.
    pub prompt: String,

    /// Opaque payload interpreted by the evaluator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,

    /// Reference value for simple comparison evaluators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<Value>,

    /// Free-form key/value metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, Value>>,
}

impl Scenario {
    /// Create a scenario with no input, expectation or metadata.
    pub fn new(id: impl Into<ScenarioId>, name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            prompt: prompt.into(),
            input: None,
            expected: None,
            metadata: None,
        }
    }

    /// Attach an evaluator input payload.
    pub fn with_input(mut self, input: Value) -> Self {
        self.input = Some(input);
        self
    }

    /// Attach an expected value.
    pub fn with_expected(mut self, expected: impl Into<Value>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value);
        self
    }

    /// The `kind` discriminator of the input payload, if it declares one.
    pub fn input_kind(&self) -> Option<&str> {
        self.input.as_ref()?.get("kind")?.as_str()
    }

    /// The expected value rendered as text.
    ///
    /// Strings are used verbatim, other JSON values render as their JSON
    /// text, and a missing expectation renders as the empty string.
    pub fn expected_text(&self) -> String {
        value_text(self.expected.as_ref())
    }
}

/// Render an optional JSON value as text the way a prompt answer would read.
pub fn value_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// A named, ordered collection of scenarios.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Suite {
    pub id: SuiteId,
    pub name: String,
    pub scenarios: Vec<Scenario>,
}

impl Suite {
    pub fn new(id: impl Into<SuiteId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            scenarios: Vec::new(),
        }
    }

    /// Append a scenario (builder style).
    pub fn add_scenario(mut self, scenario: Scenario) -> Self {
        self.scenarios.push(scenario);
        self
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Look up a scenario by id.
    pub fn scenario(&self, id: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.id.as_str() == id)
    }

    /// Check suite invariants: scenario ids are unique.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for scenario in &self.scenarios {
            if !seen.insert(scenario.id.as_str()) {
                return Err(BenchError::DuplicateScenarioId {
                    suite: self.id.to_string(),
                    id: scenario.id.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scenario_parses_without_optional_fields() {
        let scenario: Scenario =
            serde_json::from_value(json!({"id": "toy-1", "prompt": "Return exactly: hi"}))
                .expect("parse");
        assert_eq!(scenario.id.as_str(), "toy-1");
        assert!(scenario.name.is_empty());
        assert!(scenario.input.is_none());
        assert!(scenario.expected.is_none());
    }

    #[test]
    fn absent_fields_are_not_serialized() {
        let raw = serde_json::to_value(Scenario::new("a", "A", "p")).unwrap();
        let obj = raw.as_object().unwrap();
        assert!(!obj.contains_key("input"));
        assert!(!obj.contains_key("expected"));
        assert!(!obj.contains_key("metadata"));
    }

    #[test]
    fn expected_text_renders_strings_verbatim() {
        let s = Scenario::new("a", "A", "p").with_expected("hello world");
        assert_eq!(s.expected_text(), "hello world");

        let n = Scenario::new("b", "B", "p").with_expected(42);
        assert_eq!(n.expected_text(), "42");

        let none = Scenario::new("c", "C", "p");
        assert_eq!(none.expected_text(), "");
    }

    #[test]
    fn input_kind_reads_discriminator() {
        let s = Scenario::new("a", "A", "p").with_input(json!({"kind": "codefix"}));
        assert_eq!(s.input_kind(), Some("codefix"));
        assert_eq!(Scenario::new("b", "B", "p").input_kind(), None);
    }

    #[test]
    fn validate_rejects_duplicate_ids() {
        let suite = Suite::new("dup", "Dup")
            .add_scenario(Scenario::new("x", "X", "p"))
            .add_scenario(Scenario::new("x", "X again", "p"));

        let err = suite.validate().unwrap_err();
        assert!(err.to_string().contains("\"x\""));
    }

    #[test]
    fn validate_accepts_unique_ids() {
        let suite = Suite::new("ok", "Ok")
            .add_scenario(Scenario::new("a-1", "A", "p"))
            .add_scenario(Scenario::new("b-2", "B", "p"));
        assert!(suite.validate().is_ok());
        assert_eq!(suite.len(), 2);
        assert!(suite.scenario("b-2").is_some());
    }
}
