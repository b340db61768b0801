//! Error types for store and workspace operations.

use automate_core::{AutomateError, Id};
use thiserror::Error;

/// Errors that can occur while persisting or loading documents.
#[derive(Debug, Error)]
pub enum StoreError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// No pattern with the id or name is stored.
    #[error("pattern '{0}' was not found")]
    PatternNotFound(String),

    /// No toolkit is installed for the pattern, or not at that version.
    #[error("toolkit '{0}' was not found")]
    ToolkitNotFound(String),

    /// No draft with the id is stored.
    #[error("draft '{0}' was not found")]
    DraftNotFound(Id),

    /// An operation needs a current draft but none is selected.
    #[error("no draft is selected, create or switch to a draft first")]
    NoCurrentDraft,

    /// Error raised by the core.
    #[error(transparent)]
    Core(#[from] AutomateError),
}

/// Convenience alias for results with [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;
