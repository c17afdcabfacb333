//! minibench core library
//!
//! Data model, runner and evaluator capabilities, suite loading, the suite
//! orchestrator and the time-capsule artifact writer.

pub mod capsule;
pub mod domain;
pub mod evaluator;
pub mod obs;
pub mod orchestrator;
pub mod runner;
pub mod suite;
pub mod telemetry;

pub use domain::{
    all_pass, BenchError, CodefixConstraints, CodefixInput, CodefixTest, EvalOutcome, ModelId,
    Result, RunnerResult, Scenario, ScenarioId, ScenarioRunResult, Score, Suite, SuiteId,
    SuiteRunResult, SuiteSummary, CODEFIX_KIND,
};

pub use evaluator::{EvaluationContext, Evaluator, EvaluatorRegistry, ExactMatchEvaluator};
pub use runner::{
    MockCodefixRunner, MockEchoRunner, MockFailRunner, MockPassRunner, OpenAiChatRunner,
    OpenAiConfig, Runner, RunnerOptions, RunnerRegistry, ScenarioContext, StubRunner,
};
pub use suite::{builtin_suite, InMemorySuiteLoader, StandardSuiteLoader, SuiteLoader, BUILTIN_SUITE_IDS};

pub use orchestrator::{run_suite, select_scenarios, RunSuiteOptions, SuiteOrchestrator};

pub use capsule::{utc_stamp, CapsuleManifest, TimeCapsule};
pub use telemetry::init_tracing;

/// Crate version, recorded in capsule manifests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
