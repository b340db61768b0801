//! Persistence and sessions for patterns, toolkits and drafts.
//!
//! Documents are stored as pretty-printed JSON under a store directory
//! ([`LocalStore`]). A [`Workspace`] wraps the store with a YAML
//! [`StoreConfig`] and tracks the current draft explicitly.
//!
//! # Quick start
//!
//! ```no_run
//! use automate_core::{Pattern, VersionInstruction, package};
//! use automate_store::{StoreConfig, Workspace};
//!
//! let config = StoreConfig::load(".automate.yml").unwrap_or_default();
//! let mut workspace = Workspace::open(config).unwrap();
//!
//! let mut pattern = Pattern::new("Api");
//! let toolkit = package(&mut pattern, Vec::new(), VersionInstruction::Auto).unwrap();
//! workspace.install_toolkit(&toolkit).unwrap();
//! workspace.create_draft(&toolkit, "orders").unwrap();
//!
//! for draft in workspace.list_drafts().unwrap() {
//!     println!("{} ({})", draft.name, draft.version());
//! }
//! ```

mod config;
mod error;
mod store;
mod workspace;

pub use config::{ProcessConfig, StoreConfig};
pub use error::{Result, StoreError};
pub use store::LocalStore;
pub use workspace::Workspace;
