//! Input payload for codefix scenarios.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Discriminator carried in `Scenario.input.kind` for codefix scenarios.
pub const CODEFIX_KIND: &str = "codefix";

/// One row of a codefix truth table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodefixTest {
    /// Argument tuple passed to the entry function.
    pub args: Vec<Value>,
    /// Expected return value, compared by strict identity.
    pub expect: Value,
}

/// Restrictions on the patch a runner may propose.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CodefixConstraints {
    /// When non-empty, `patch.find` must be one of these literal strings.
    #[serde(default)]
    pub allowed_finds: Vec<String>,
}

/// Buggy source, the entry function to exercise, and its truth table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CodefixInput {
    #[serde(default = "codefix_kind")]
    pub kind: String,
    pub source: String,
    pub entry: String,
    pub tests: Vec<CodefixTest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<CodefixConstraints>,
}

fn codefix_kind() -> String {
    CODEFIX_KIND.to_string()
}

impl CodefixInput {
    pub fn new(source: impl Into<String>, entry: impl Into<String>) -> Self {
        Self {
            kind: codefix_kind(),
            source: source.into(),
            entry: entry.into(),
            tests: Vec::new(),
            constraints: None,
        }
    }

    /// Append a truth-table row.
    pub fn with_test(mut self, args: Vec<Value>, expect: Value) -> Self {
        self.tests.push(CodefixTest { args, expect });
        self
    }

    /// Restrict `patch.find` to the given literals.
    pub fn with_allowed_finds<I, S>(mut self, finds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constraints = Some(CodefixConstraints {
            allowed_finds: finds.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// The allowed `find` literals; empty means unrestricted.
    pub fn allowed_finds(&self) -> &[String] {
        self.constraints
            .as_ref()
            .map(|c| c.allowed_finds.as_slice())
            .unwrap_or(&[])
    }

    /// Render as a scenario input payload.
    pub fn to_value(&self) -> Value {
        // Plain data with string keys; serialization cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
