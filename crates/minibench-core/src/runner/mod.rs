//! Runner capability: turn a prompt into model output.
//!
//! A runner may suspend on network I/O (remote models) or answer
//! immediately (mocks). The orchestrator treats every call as independent.

pub mod mock;
pub mod openai;
pub mod registry;
pub mod stub;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{Result, RunnerResult, Scenario, ScenarioId};

pub use mock::{MockCodefixRunner, MockEchoRunner, MockFailRunner, MockPassRunner};
pub use openai::{OpenAiChatRunner, OpenAiConfig};
pub use registry::RunnerRegistry;
pub use stub::StubRunner;

/// Per-call options handed to [`Runner::run`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunnerOptions {
    /// Pass-through timeout hint; honoured (or not) by the concrete runner.
    pub timeout_ms: Option<u64>,

    /// The scenario being run, for runners that need more than the prompt.
    pub scenario: Option<ScenarioContext>,
}

impl RunnerOptions {
    pub fn with_timeout_ms(mut self, timeout_ms: Option<u64>) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Attach scenario context.
    pub fn for_scenario(mut self, scenario: &Scenario) -> Self {
        self.scenario = Some(ScenarioContext::from(scenario));
        self
    }
}

/// Read-only view of the scenario a runner call belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioContext {
    pub id: ScenarioId,
    pub expected: Option<Value>,
    pub input: Option<Value>,
}

impl ScenarioContext {
    /// The `kind` discriminator of the scenario input, if present.
    pub fn input_kind(&self) -> Option<&str> {
        self.input.as_ref()?.get("kind")?.as_str()
    }
}

impl From<&Scenario> for ScenarioContext {
    fn from(scenario: &Scenario) -> Self {
        Self {
            id: scenario.id.clone(),
            expected: scenario.expected.clone(),
            input: scenario.input.clone(),
        }
    }
}

/// A model (or mock) that answers prompts.
#[async_trait]
pub trait Runner: Send + Sync {
    /// Registry name, e.g. `mock:pass` or `openai:chat`.
    fn name(&self) -> &str;

    /// Produce output for `prompt`. Errors abort the suite run.
    async fn run(&self, prompt: &str, options: &RunnerOptions) -> Result<RunnerResult>;
}
