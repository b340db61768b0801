//! Error types for pattern, draft and toolkit operations.
//!
//! A single error type covers both programmer mistakes (malformed path
//! expressions, invalid names, illegal state transitions) and domain
//! failures (missing nodes, value coercion, version rules). Every message is
//! formatted and safe to present to an end user.

use thiserror::Error;

use crate::Id;

/// Errors raised by the core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AutomateError {
    /// Path expression is empty, not wrapped in braces, or has an empty segment.
    #[error("expression '{expression}' is not a valid path expression: {reason}")]
    InvalidExpression { expression: String, reason: String },

    /// Name is not a valid identifier or is reserved.
    #[error("'{name}' is not a valid name: {reason}")]
    InvalidName { name: String, reason: String },

    /// `materialise` was called on the pattern root or another node that
    /// cannot be materialised again.
    #[error("item '{path}' is already materialised")]
    AlreadyMaterialised { path: String },

    /// The owning item has not been materialised yet.
    #[error("item '{path}' has not been materialised")]
    NotMaterialised { path: String },

    /// A collection-only operation was invoked on something else.
    #[error("item '{path}' is not a collection")]
    NotACollection { path: String },

    /// The named property is an element, not an attribute.
    #[error("property '{name}' of '{path}' is not an attribute")]
    NotAnAttribute { name: String, path: String },

    /// No property with the given name exists on the item.
    #[error("item '{path}' has no property named '{name}'")]
    PropertyNotFound { name: String, path: String },

    /// Un-materialisation is only valid on elements, collections and items.
    #[error("item '{path}' cannot be un-materialised")]
    CannotUnMaterialise { path: String },

    /// No draft item with the id exists in the tree.
    #[error("draft item '{0}' was not found")]
    DraftItemNotFound(Id),

    /// No schema node (element, attribute or automation) with the id exists.
    #[error("schema node '{0}' was not found in the pattern")]
    SchemaNotFound(Id),

    /// Raw text could not be parsed as the declared data type.
    #[error("value '{value}' cannot be converted to data type '{data_type}'")]
    ValueCoercion { value: String, data_type: String },

    /// Value is not a member of the attribute's closed choice list.
    #[error("value '{value}' is not one of the choices: {choices}")]
    InvalidChoice { value: String, choices: String },

    /// A launch point references a command id that is not in the pattern.
    #[error("command '{0}' was not found in the pattern")]
    CommandNotFound(Id),

    /// The automation exists but is not a launch point.
    #[error("automation '{0}' is not a launch point")]
    NotALaunchPoint(String),

    /// No code template file with the id exists in the toolkit.
    #[error("code template '{0}' was not found in the toolkit")]
    CodeTemplateNotFound(Id),

    /// A version string did not match `major.minor.patch`.
    #[error("'{0}' is not a valid version, expected 'major.minor.patch'")]
    InvalidVersion(String),

    /// An explicit version would move the toolkit backwards.
    #[error("version '{requested}' must be greater than the current version '{current}'")]
    VersionNotIncreased { requested: String, current: String },

    /// Breaking changes were recorded but the explicit version keeps the major.
    #[error(
        "version '{requested}' must increase the major version of '{current}' because of breaking changes"
    )]
    BreakingChangeRequiresMajor { requested: String, current: String },

    /// The candidate toolkit was built from a different pattern.
    #[error("toolkit for pattern '{candidate}' cannot upgrade a draft of pattern '{current}'")]
    ToolkitMismatch { current: Id, candidate: Id },

    /// A persisted draft document could not be rebuilt.
    #[error("draft document is invalid: {0}")]
    InvalidDocument(String),
}

impl AutomateError {
    /// Returns `true` for programmer/contract errors that the caller cannot
    /// recover from by retrying with different data.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::InvalidExpression { .. }
                | Self::InvalidName { .. }
                | Self::AlreadyMaterialised { .. }
                | Self::NotACollection { .. }
                | Self::CannotUnMaterialise { .. }
                | Self::InvalidDocument(_)
        )
    }
}

/// Convenience alias for results with [`AutomateError`].
pub type Result<T> = std::result::Result<T, AutomateError>;
