//! Name-keyed evaluator registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{Evaluator, ExactMatchEvaluator};
use crate::domain::{BenchError, Result};

type EvaluatorFactory = Box<dyn Fn() -> Result<Arc<dyn Evaluator>> + Send + Sync>;

/// Wrap a concrete evaluator for registry factories.
pub fn shared<E: Evaluator + 'static>(evaluator: E) -> Result<Arc<dyn Evaluator>> {
    Ok(Arc::new(evaluator))
}

/// Maps evaluator names (`exact`, `codefix`, ...) to constructors.
#[derive(Default)]
pub struct EvaluatorRegistry {
    factories: BTreeMap<String, EvaluatorFactory>,
}

impl EvaluatorRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Only the evaluators this crate ships (`exact`).
    pub fn core() -> Self {
        Self::empty().register("exact", || shared(ExactMatchEvaluator))
    }

    /// Add or replace a named factory.
    pub fn register<F>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn Evaluator>> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
        self
    }

    pub fn names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Build the evaluator registered under `name`.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Evaluator>> {
        match self.factories.get(name) {
            Some(factory) => factory(),
            None => Err(BenchError::UnknownEvaluator {
                name: name.to_string(),
                available: self.names(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_registry_resolves_exact() {
        let evaluator = EvaluatorRegistry::core().resolve("exact").unwrap();
        assert_eq!(evaluator.name(), "exact");
    }

    #[test]
    fn unknown_evaluator_is_a_configuration_error() {
        let err = EvaluatorRegistry::core().resolve("fuzzy").err().unwrap();
        assert_eq!(err.to_string(), "Unknown evaluator \"fuzzy\". Available: exact");
        assert!(err.is_configuration());
    }
}
