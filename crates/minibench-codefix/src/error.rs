//! Failure taxonomy for the patch engine and the function hosts.
//!
//! Every [`PatchFailure`] is recovered inside the codefix evaluator and turned
//! into a failing score; none of them ever aborts a suite run.

use serde_json::{json, Value};

use crate::script::ScriptError;

/// Why a candidate patch did not make the entry function pass.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PatchFailure {
    /// The scenario carries no usable codefix input.
    #[error("not-codefix: {reason}")]
    NotCodefix { reason: String },

    #[error("bad-patch-shape: {reason}")]
    BadPatchShape {
        /// The runner output as parsed, when it was JSON at all.
        parsed: Option<Value>,
        reason: String,
    },

    #[error("find-not-allowed: {find:?} is not one of {allowed:?}")]
    FindNotAllowed { find: String, allowed: Vec<String> },

    #[error("find-not-found: {find:?}")]
    FindNotFound {
        find: String,
        /// The unpatched source.
        original: String,
    },

    #[error("entry-not-found: {entry}")]
    EntryNotFound { entry: String },

    /// An exception while materializing or invoking the patched code.
    #[error("{message}")]
    Runtime { message: String },
}

impl PatchFailure {
    /// Stable code reported as `details.error`; runtime failures report
    /// their message instead.
    pub fn code(&self) -> &str {
        match self {
            PatchFailure::NotCodefix { .. } => "not-codefix",
            PatchFailure::BadPatchShape { .. } => "bad-patch-shape",
            PatchFailure::FindNotAllowed { .. } => "find-not-allowed",
            PatchFailure::FindNotFound { .. } => "find-not-found",
            PatchFailure::EntryNotFound { .. } => "entry-not-found",
            PatchFailure::Runtime { message } => message,
        }
    }

    /// Score details for this failure.
    pub fn details(&self) -> Value {
        match self {
            PatchFailure::NotCodefix { reason } => json!({
                "error": self.code(),
                "reason": reason,
            }),
            PatchFailure::BadPatchShape { parsed, reason } => json!({
                "error": self.code(),
                "parsed": parsed,
                "reason": reason,
            }),
            PatchFailure::FindNotAllowed { find, allowed } => json!({
                "error": self.code(),
                "find": find,
                "allowed": allowed,
            }),
            PatchFailure::FindNotFound { find, original } => json!({
                "error": self.code(),
                "find": find,
                "source": original,
            }),
            PatchFailure::EntryNotFound { entry } => json!({
                "error": self.code(),
                "entry": entry,
            }),
            PatchFailure::Runtime { .. } => json!({ "error": self.code() }),
        }
    }
}

/// Errors raised by a [`FunctionHost`](crate::host::FunctionHost).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HostError {
    /// The entry binding is missing or not callable.
    #[error("entry {0:?} is not a function")]
    EntryNotFound(String),

    #[error(transparent)]
    Script(#[from] ScriptError),

    /// The host cannot run at all (missing binary, spawn failure).
    #[error("function host unavailable: {0}")]
    Unavailable(String),

    #[error("function host timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// The host ran but its answer could not be understood.
    #[error("function host protocol error: {0}")]
    Protocol(String),
}

impl From<HostError> for PatchFailure {
    fn from(err: HostError) -> Self {
        match err {
            HostError::EntryNotFound(entry) => PatchFailure::EntryNotFound { entry },
            // Scripts report what `err.message` holds, without the class prefix.
            HostError::Script(e) => PatchFailure::Runtime {
                message: e.message().to_string(),
            },
            other => PatchFailure::Runtime {
                message: other.to_string(),
            },
        }
    }
}

pub type PatchResult<T> = std::result::Result<T, PatchFailure>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        let failure = PatchFailure::FindNotAllowed {
            find: "return 4;".into(),
            allowed: vec!["return 3;".into()],
        };
        assert_eq!(failure.code(), "find-not-allowed");
        assert_eq!(
            failure.details(),
            json!({"error": "find-not-allowed", "find": "return 4;", "allowed": ["return 3;"]})
        );
    }

    #[test]
    fn runtime_failures_report_their_message() {
        let failure = PatchFailure::from(HostError::Script(ScriptError::Reference(
            "b is not defined".into(),
        )));
        assert_eq!(failure.code(), "b is not defined");
        assert_eq!(failure.details(), json!({"error": "b is not defined"}));

        let failure =
            PatchFailure::from(HostError::Script(ScriptError::syntax(2, "Unexpected token ';'")));
        assert_eq!(failure.details(), json!({"error": "Unexpected token ';'"}));

        let failure = PatchFailure::from(HostError::Timeout { ms: 500 });
        assert_eq!(failure.code(), "function host timed out after 500ms");
    }

    #[test]
    fn missing_entry_maps_to_entry_not_found() {
        let failure = PatchFailure::from(HostError::EntryNotFound("add".into()));
        assert_eq!(failure.code(), "entry-not-found");
        assert_eq!(failure.details()["entry"], json!("add"));
    }
}
