//! Pattern schemas, live drafts and toolkit migration.
//!
//! This crate holds the synchronous core of the scaffolding engine:
//!
//! - [`Pattern`]: an authored tree of [`Element`]s and [`Attribute`]s
//!   annotated with [`CodeTemplate`]s and [`Automation`].
//! - [`ToolkitDefinition`]: an immutable, versioned snapshot of a pattern and
//!   its template contents, produced by [`package`].
//! - [`DraftTree`]: the lazily materialised instance tree of a draft, and
//!   [`DraftDefinition`] which binds it to one toolkit version.
//! - [`resolve_schema`], [`resolve_draft`] and [`resolve_relative`]:
//!   bracketed path expressions such as `{Api.Route.Path}`.
//! - [`DraftTree::migrate`] and [`DraftDefinition::upgrade`]: id-keyed
//!   migration onto a newer toolkit with a classified change log.
//! - [`execute_launch_point`]: fans a launch point's commands out over
//!   materialised owners through a [`CommandExecutor`].
//!
//! Validation ([`validate_pattern`], [`DraftTree::validate`]) reports every
//! problem rather than stopping at the first.
//!
//! # Example
//!
//! ```
//! use automate_core::*;
//!
//! let mut pattern = Pattern::new("Api");
//! pattern.root = pattern
//!     .root
//!     .with_attribute(Attribute::new("Title", AttributeDataType::String).required())
//!     .with_element(
//!         Element::new("Route")
//!             .with_cardinality(Cardinality::ZeroOrMany)
//!             .with_attribute(Attribute::new("Verb", AttributeDataType::String).with_default("GET")),
//!     );
//! assert!(validate_pattern(&pattern).is_empty());
//!
//! let toolkit = package(&mut pattern, Vec::new(), VersionInstruction::Auto).unwrap();
//! let mut draft = DraftDefinition::new(&toolkit, "orders").unwrap();
//! assert_eq!(draft.validate().unwrap().len(), 1);
//!
//! let root = draft.tree.root_id().clone();
//! draft.set_property(&root, "Title", "Orders").unwrap();
//! assert!(draft.validate().unwrap().is_empty());
//!
//! let route = draft.tree.resolve("{Api.Route}").unwrap().unwrap().id().clone();
//! let item = draft.materialise_collection_item(&route).unwrap();
//! let verb = draft.tree.resolve_relative(&item, "{Verb}").unwrap().unwrap();
//! assert_eq!(verb.value(), Some(&AttributeValue::String("GET".into())));
//! ```

mod definition;
mod draft;
mod error;
mod ids;
mod index;
mod launch;
mod migration;
mod names;
mod path;
mod toolkit;
mod types;
mod validate;
mod value;
mod version;

pub use definition::DraftDefinition;
pub use draft::{DraftDocument, DraftItem, DraftItemKind, DraftTree, DraftViolation};
pub use error::{AutomateError, Result};
pub use ids::Id;
pub use index::SchemaIndex;
pub use launch::{
    CommandContext, CommandExecutionResult, CommandExecutor, CommandLogEntry, CommandOutcome,
    execute_launch_point,
};
pub use migration::{MigrationChange, MigrationChangeKind, MigrationMessage, MigrationResult};
pub use names::{RESERVED_NAMES, validate_name};
pub use path::{PARENT_SEGMENT, PathExpression, resolve_draft, resolve_relative, resolve_schema};
pub use toolkit::{CodeTemplateFile, ToolkitDefinition, diff_templates, package};
pub use types::*;
pub use validate::{PatternValidationError, validate_pattern};
pub use value::{AttributeDataType, AttributeValue};
pub use version::{
    ToolkitVersion, VersionChange, VersionChangeKind, VersionInstruction, next_version,
};
