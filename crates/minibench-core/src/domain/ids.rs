//! Branded identifier newtypes.
//!
//! Suites, scenarios and models are all identified by plain strings on the
//! wire; the newtypes keep them from being mixed up in signatures.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identity of a suite (`toy`, `codefix-toy`, or a file path).
    SuiteId
);
string_id!(
    /// Identity of a scenario, unique within its suite.
    ScenarioId
);
string_id!(
    /// Identity of the model that produced a runner output.
    ModelId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = ScenarioId::new("toy-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"toy-1\"");

        let back: ScenarioId = serde_json::from_str("\"toy-1\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn ids_display_their_value() {
        assert_eq!(SuiteId::from("codefix-toy").to_string(), "codefix-toy");
        assert_eq!(ModelId::from("stub-model").as_str(), "stub-model");
    }
}
