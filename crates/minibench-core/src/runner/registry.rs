//! Name-keyed runner registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{
    MockCodefixRunner, MockEchoRunner, MockFailRunner, MockPassRunner, OpenAiChatRunner, Runner,
    StubRunner,
};
use crate::domain::{BenchError, Result};

type RunnerFactory = Box<dyn Fn() -> Result<Arc<dyn Runner>> + Send + Sync>;

/// Wrap a concrete runner for registry factories.
pub fn shared<R: Runner + 'static>(runner: R) -> Result<Arc<dyn Runner>> {
    Ok(Arc::new(runner))
}

/// Maps runner names (`mock:pass`, `stub`, ...) to constructors.
///
/// Runners are built lazily on [`resolve`](Self::resolve) so that, for
/// example, a missing API key only matters when the remote runner is chosen.
#[derive(Default)]
pub struct RunnerRegistry {
    factories: BTreeMap<String, RunnerFactory>,
}

impl RunnerRegistry {
    /// A registry with nothing in it.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Mocks, the offline stub and the remote chat runner.
    pub fn standard() -> Self {
        Self::empty()
            .register("mock:pass", || shared(MockPassRunner))
            .register("mock:fail", || shared(MockFailRunner))
            .register("mock:echo", || shared(MockEchoRunner))
            .register("mock:codefix", || shared(MockCodefixRunner))
            .register("stub", || shared(StubRunner))
            .register("openai:chat", || shared(OpenAiChatRunner::from_env()?))
    }

    /// Add or replace a named factory.
    pub fn register<F>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn Runner>> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
        self
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Build the runner registered under `name`.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Runner>> {
        match self.factories.get(name) {
            Some(factory) => factory(),
            None => Err(BenchError::UnknownRunner {
                name: name.to_string(),
                available: self.names(),
            }),
        }
    }
}
