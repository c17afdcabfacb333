//! Domain model for minibench.
//!
//! Data shapes that flow through the engine:
//! - `Scenario` / `Suite`: what to run
//! - `RunnerResult`: what a runner produced
//! - `Score` / `EvalOutcome`: what an evaluator concluded
//! - `ScenarioRunResult` / `SuiteRunResult`: what a run records
//! - `CodefixInput`: payload for patch-and-test scenarios

pub mod codefix;
pub mod error;
pub mod ids;
pub mod result;
pub mod scenario;
pub mod score;

pub use codefix::{CodefixConstraints, CodefixInput, CodefixTest, CODEFIX_KIND};
pub use error::{BenchError, Result};
pub use ids::{ModelId, ScenarioId, SuiteId};
pub use result::{RunnerResult, ScenarioRunResult, SuiteRunResult, SuiteSummary};
pub use scenario::{Scenario, Suite};
pub use score::{all_pass, EvalOutcome, Score};
