//! Automation runtime for pattern drafts.
//!
//! Supplies the collaborators the core hands I/O to:
//!
//! - [`FilePathResolver`] / [`LocalFileSystem`]: reads template sources for
//!   packaging and writes rendered files.
//! - [`TextTransformer`] / [`SimpleTransformer`]: renders `{{ expression }}`
//!   placeholders against draft items.
//! - [`ApplicationExecutor`] / [`ProcessExecutor`]: runs external
//!   applications with a hang timeout.
//! - [`AutomationRunner`]: a [`automate_core::CommandExecutor`] that ties the
//!   three together for launch point execution.
//!
//! [`format_pattern`] and [`format_draft`] render documents as JSON, YAML or
//! a Markdown tree.

mod error;
mod files;
mod output;
mod process;
mod runner;
mod transform;

pub use error::{Result, RuntimeError};
pub use files::{FilePathResolver, LocalFileSystem, package_toolkit, read_code_templates};
pub use output::{OutputFormat, format_draft, format_execution, format_migration, format_pattern};
pub use process::{ApplicationExecutor, DEFAULT_TIMEOUT_MS, ProcessExecutor, split_arguments};
pub use runner::AutomationRunner;
pub use transform::{SimpleTransformer, TextTransformer};
