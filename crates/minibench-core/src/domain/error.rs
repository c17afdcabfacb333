//! Error taxonomy for suite runs.
//!
//! Configuration errors (unknown suite, runner or evaluator, empty filter
//! selection) and transport errors abort the whole run. Scenario-level
//! evaluation problems never show up here; evaluators fold them into scores.

/// Errors that abort a suite run.
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error("Unknown suite \"{0}\"")]
    UnknownSuite(String),

    #[error("invalid suite {source_name}: {reason}")]
    InvalidSuite { source_name: String, reason: String },

    #[error("duplicate scenario id \"{id}\" in suite {suite}")]
    DuplicateScenarioId { suite: String, id: String },

    #[error("Unknown runner \"{name}\". Available: {}", .available.join(", "))]
    UnknownRunner { name: String, available: Vec<String> },

    #[error("Unknown evaluator \"{name}\". Available: {}", .available.join(", "))]
    UnknownEvaluator { name: String, available: Vec<String> },

    #[error("No scenarios matched filters: {}", .filters.join(", "))]
    EmptySelection { filters: Vec<String> },

    #[error("invalid scenario filter {filter}: {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("runner error: {0}")]
    Runner(String),

    #[error("evaluator error: {0}")]
    Evaluator(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BenchError {
    /// Whether this error stems from bad user input rather than a transport failure.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            BenchError::UnknownSuite(_)
                | BenchError::InvalidSuite { .. }
                | BenchError::DuplicateScenarioId { .. }
                | BenchError::UnknownRunner { .. }
                | BenchError::UnknownEvaluator { .. }
                | BenchError::EmptySelection { .. }
                | BenchError::InvalidFilter { .. }
        )
    }
}

impl From<reqwest::Error> for BenchError {
    fn from(err: reqwest::Error) -> Self {
        BenchError::Runner(err.to_string())
    }
}

/// Result type for minibench operations.
pub type Result<T> = std::result::Result<T, BenchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_suite_names_the_identifier() {
        let err = BenchError::UnknownSuite("nope".to_string());
        assert_eq!(err.to_string(), "Unknown suite \"nope\"");
        assert!(err.is_configuration());
    }

    #[test]
    fn empty_selection_lists_filters() {
        let err = BenchError::EmptySelection {
            filters: vec!["nope".to_string(), "/^z/".to_string()],
        };
        assert_eq!(err.to_string(), "No scenarios matched filters: nope, /^z/");
    }

    #[test]
    fn unknown_runner_lists_available() {
        let err = BenchError::UnknownRunner {
            name: "gpt".to_string(),
            available: vec!["mock:pass".to_string(), "stub".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("Unknown runner \"gpt\""));
        assert!(msg.contains("mock:pass, stub"));
    }

    #[test]
    fn transport_errors_are_not_configuration() {
        assert!(!BenchError::Runner("connection reset".to_string()).is_configuration());
    }
}
