//! Suite loading.
//!
//! A [`SuiteLoader`] resolves an id or filesystem path to a fully
//! materialized [`Suite`]. Loader errors propagate unchanged to the caller
//! of a suite run; an unresolvable id is fatal.

pub mod builtin;
pub mod memory;
pub mod standard;

use async_trait::async_trait;

use crate::domain::{Result, Suite};

pub use builtin::{builtin_suite, BUILTIN_SUITE_IDS};
pub use memory::InMemorySuiteLoader;
pub use standard::StandardSuiteLoader;

/// Resolves suite ids or paths.
#[async_trait]
pub trait SuiteLoader: Send + Sync {
    /// Load and validate a suite, failing with `UnknownSuite` when
    /// `id_or_path` does not resolve.
    async fn load_suite(&self, id_or_path: &str) -> Result<Suite>;
}
