//! In-memory suite loader for tests and embedders.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use super::SuiteLoader;
use crate::domain::{BenchError, Result, Suite};

/// Serves suites registered at runtime, keyed by suite id.
#[derive(Debug, Default)]
pub struct InMemorySuiteLoader {
    suites: RwLock<HashMap<String, Suite>>,
}

impl InMemorySuiteLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader pre-populated with `suites`.
    pub fn with_suites(suites: impl IntoIterator<Item = Suite>) -> Self {
        let loader = Self::new();
        for suite in suites {
            loader.insert(suite);
        }
        loader
    }

    /// Register (or replace) a suite under its own id.
    pub fn insert(&self, suite: Suite) {
        let mut suites = self.suites.write().unwrap_or_else(|e| e.into_inner());
        suites.insert(suite.id.to_string(), suite);
    }
}

#[async_trait]
impl SuiteLoader for InMemorySuiteLoader {
    async fn load_suite(&self, id_or_path: &str) -> Result<Suite> {
        let suite = {
            let suites = self.suites.read().unwrap_or_else(|e| e.into_inner());
            suites.get(id_or_path).cloned()
        };
        let suite = suite.ok_or_else(|| BenchError::UnknownSuite(id_or_path.to_string()))?;
        suite.validate()?;
        Ok(suite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Scenario;

    #[tokio::test]
    async fn returns_registered_suite() {
        let loader = InMemorySuiteLoader::with_suites([
            Suite::new("mine", "Mine").add_scenario(Scenario::new("a", "A", "p"))
        ]);
        let suite = loader.load_suite("mine").await.unwrap();
        assert_eq!(suite.len(), 1);
    }

    #[tokio::test]
    async fn unknown_id_fails() {
        let err = InMemorySuiteLoader::new().load_suite("nope").await.unwrap_err();
        assert!(matches!(err, BenchError::UnknownSuite(ref id) if id == "nope"));
    }

    #[tokio::test]
    async fn invalid_suite_is_rejected_on_load() {
        let loader = InMemorySuiteLoader::with_suites([Suite::new("dup", "Dup")
            .add_scenario(Scenario::new("x", "X", "p"))
            .add_scenario(Scenario::new("x", "X", "p"))]);
        let err = loader.load_suite("dup").await.unwrap_err();
        assert!(matches!(err, BenchError::DuplicateScenarioId { .. }));
    }
}
