//! Script-level exceptions.

/// An exception raised while parsing or running a script.
///
/// [`ScriptError::message`] is the bare message a script would see in
/// `err.message`; `Display` prefixes the error class.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScriptError {
    #[error("SyntaxError: {message} (line {line})")]
    Syntax { line: u32, message: String },

    #[error("ReferenceError: {0}")]
    Reference(String),

    #[error("TypeError: {0}")]
    Type(String),

    /// Resource limits: call depth and step budget.
    #[error("RangeError: {0}")]
    Range(String),

    /// A value raised with `throw` that nothing caught.
    #[error("Uncaught {0}")]
    Thrown(String),
}

impl ScriptError {
    pub fn syntax(line: u32, message: impl Into<String>) -> Self {
        ScriptError::Syntax {
            line,
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ScriptError::Syntax { message, .. } => message,
            ScriptError::Reference(m)
            | ScriptError::Type(m)
            | ScriptError::Range(m)
            | ScriptError::Thrown(m) => m,
        }
    }

    /// Constructor name as seen by `err.name`.
    pub fn class_name(&self) -> &'static str {
        match self {
            ScriptError::Syntax { .. } => "SyntaxError",
            ScriptError::Reference(_) => "ReferenceError",
            ScriptError::Type(_) => "TypeError",
            ScriptError::Range(_) => "RangeError",
            ScriptError::Thrown(_) => "Error",
        }
    }
}

pub type ScriptResult<T> = std::result::Result<T, ScriptError>;
