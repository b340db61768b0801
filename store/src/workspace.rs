//! Explicit session handle over a store.
//!
//! A [`Workspace`] owns the configuration, the document store and the
//! currently selected draft. Every operation that needs "the current draft"
//! goes through the handle instead of process-wide state.

use automate_core::{DraftDefinition, Id, MigrationResult, Pattern, ToolkitDefinition};
use tracing::info;

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::store::LocalStore;

/// A session over one store with an optional current draft.
///
/// # Examples
///
/// ```no_run
/// use automate_core::{Pattern, VersionInstruction, package};
/// use automate_store::{StoreConfig, Workspace};
///
/// let mut workspace = Workspace::open(StoreConfig::default()).unwrap();
/// let mut pattern = Pattern::new("Api");
/// let toolkit = package(&mut pattern, Vec::new(), VersionInstruction::Auto).unwrap();
/// workspace.install_toolkit(&toolkit).unwrap();
///
/// workspace.create_draft(&toolkit, "orders").unwrap();
/// let result = workspace.upgrade_current_draft(false).unwrap();
/// assert!(result.is_success());
/// ```
#[derive(Debug)]
pub struct Workspace {
    config: StoreConfig,
    store: LocalStore,
    current: Option<DraftDefinition>,
}

impl Workspace {
    /// Opens the workspace, creating the store and output directories.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IoError`] if a directory cannot be created.
    pub fn open(config: StoreConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.output_dir)?;
        let store = LocalStore::open(&config.store_dir)?;
        info!(store = %config.store_dir.display(), "Opened workspace");
        Ok(Self {
            config,
            store,
            current: None,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn save_pattern(&self, pattern: &Pattern) -> Result<()> {
        self.store.save_pattern(pattern)
    }

    /// Stores a packaged toolkit together with the pattern it snapshots.
    pub fn install_toolkit(&self, toolkit: &ToolkitDefinition) -> Result<()> {
        self.store.save_toolkit(toolkit)?;
        self.store.save_pattern(&toolkit.pattern)?;
        info!(pattern = %toolkit.name(), version = %toolkit.version, "Installed toolkit");
        Ok(())
    }

    /// Creates and stores a draft of `toolkit`, making it current.
    pub fn create_draft(&mut self, toolkit: &ToolkitDefinition, name: &str) -> Result<&mut DraftDefinition> {
        let draft = DraftDefinition::new(toolkit, name)?;
        self.store.save_draft(&draft)?;
        info!(draft = %draft.name, id = %draft.id, version = %draft.version(), "Created draft");
        Ok(self.current.insert(draft))
    }

    /// Loads the draft `id` and makes it current.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DraftNotFound`] if no such draft is stored; the
    /// current selection is kept.
    pub fn switch_draft(&mut self, id: &Id) -> Result<&mut DraftDefinition> {
        let draft = self.store.load_draft(id)?;
        info!(draft = %draft.name, id = %draft.id, "Switched draft");
        Ok(self.current.insert(draft))
    }

    pub fn current_draft(&self) -> Result<&DraftDefinition> {
        self.current.as_ref().ok_or(StoreError::NoCurrentDraft)
    }

    pub fn current_draft_mut(&mut self) -> Result<&mut DraftDefinition> {
        self.current.as_mut().ok_or(StoreError::NoCurrentDraft)
    }

    /// Persists the current draft.
    pub fn save_draft(&self) -> Result<()> {
        self.store.save_draft(self.current_draft()?)
    }

    /// Upgrades the current draft to the latest installed toolkit of its
    /// pattern.
    ///
    /// The upgraded draft is persisted only when the upgrade succeeds. A
    /// refused upgrade leaves both the stored and the in-memory draft as they
    /// were.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoCurrentDraft`],
    /// [`StoreError::ToolkitNotFound`] when no toolkit is installed, or a core
    /// error raised by the migration.
    pub fn upgrade_current_draft(&mut self, force: bool) -> Result<MigrationResult> {
        let draft = self.current.as_mut().ok_or(StoreError::NoCurrentDraft)?;
        let latest = self.store.latest_toolkit(draft.toolkit.id())?;
        let result = draft.upgrade(&latest, force)?;
        if result.is_success() {
            self.store.save_draft(draft)?;
        }
        Ok(result)
    }

    /// Every stored draft, sorted by name.
    pub fn list_drafts(&self) -> Result<Vec<DraftDefinition>> {
        self.store.list_drafts()
    }

    /// Deletes a stored draft, clearing the selection if it was current.
    pub fn delete_draft(&mut self, id: &Id) -> Result<()> {
        self.store.delete_draft(id)?;
        if self.current.as_ref().is_some_and(|draft| &draft.id == id) {
            self.current = None;
        }
        Ok(())
    }
}
