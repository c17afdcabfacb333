//! Codefix evaluation for minibench.
//!
//! A runner proposes a literal find/replace patch as JSON; the
//! [`PatchEngine`] applies it to the scenario source, materializes the entry
//! function through a [`FunctionHost`] and checks every truth-table case.
//! Two hosts ship: the in-process [`EmbeddedHost`] and the subprocess
//! [`NodeHost`].

pub mod config;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod host;
pub mod node;
pub mod patch;
pub mod registry;
pub mod route;
pub mod script;

pub use config::{CodefixConfig, HostKind};
pub use engine::{CaseFailure, PatchEngine, PatchOutcome, CODEFIX_SCORE_KEY};
pub use error::{HostError, PatchFailure, PatchResult};
pub use evaluator::{codefix_input, declares_codefix, CodefixEvaluator};
pub use host::{FunctionHost, ScriptValue};
pub use node::NodeHost;
pub use patch::Patch;
pub use registry::standard_evaluators;
pub use route::AutoEvaluator;
pub use script::{EmbeddedHost, Limits, ScriptError};
