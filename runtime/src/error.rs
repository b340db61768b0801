//! Error types for automation runtime operations.
//!
//! Covers template syntax and transform failures, file access, external
//! process failures and errors surfaced from the core.

use automate_core::AutomateError;
use thiserror::Error;

/// Errors that can occur while running automation.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// File I/O failure on a specific path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Malformed placeholder in a template.
    #[error("syntax error in {description} at {line}:{column}: {message}")]
    Syntax {
        description: String,
        line: usize,
        column: usize,
        message: String,
    },

    /// A well-formed placeholder that could not be rendered.
    #[error("transform error in {description} at {line}:{column}: {message}")]
    Transform {
        description: String,
        line: usize,
        column: usize,
        message: String,
    },

    /// A relative path that would leave the directory it is joined onto.
    #[error("path '{path}' escapes its root: {reason}")]
    PathOutsideRoot { path: String, reason: String },

    /// Arguments could not be split into words.
    #[error("invalid arguments '{arguments}': {reason}")]
    InvalidArguments { arguments: String, reason: String },

    /// The application could not be found on the search path.
    #[error("application '{0}' was not found")]
    ApplicationNotFound(String),

    /// The application ran but reported failure.
    #[error("application '{application}' failed: {message}")]
    ApplicationFailed { application: String, message: String },

    /// The application did not exit within the hang timeout.
    #[error("application '{application}' did not exit within {timeout_ms}ms")]
    ApplicationTimeout { application: String, timeout_ms: u128 },

    /// The automation kind cannot run as a single command.
    #[error("automation '{0}' cannot be executed as a command")]
    UnsupportedCommand(String),

    /// JSON or YAML rendering failure.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Error raised by the core.
    #[error(transparent)]
    Core(#[from] AutomateError),
}

impl RuntimeError {
    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

/// Convenience alias for results with [`RuntimeError`].
pub type Result<T> = std::result::Result<T, RuntimeError>;
