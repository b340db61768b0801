//! JSON document store on the local file system.
//!
//! Layout under the store root:
//!
//! ```text
//! patterns/<pattern id>.json
//! toolkits/<pattern id>/<version>.json
//! drafts/<draft id>.json
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use automate_core::{DraftDefinition, Id, Pattern, ToolkitDefinition, ToolkitVersion};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Result, StoreError};

const PATTERNS_DIR: &str = "patterns";
const TOOLKITS_DIR: &str = "toolkits";
const DRAFTS_DIR: &str = "drafts";

/// Directory of JSON documents for patterns, toolkits and drafts.
///
/// # Examples
///
/// ```no_run
/// use automate_core::Pattern;
/// use automate_store::LocalStore;
///
/// let store = LocalStore::open(".automate").unwrap();
/// let pattern = Pattern::new("Api");
/// store.save_pattern(&pattern).unwrap();
/// assert_eq!(store.load_pattern(pattern.id()).unwrap(), pattern);
/// ```
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Opens the store at `root`, creating its directories.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IoError`] if a directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for dir in [PATTERNS_DIR, TOOLKITS_DIR, DRAFTS_DIR] {
            std::fs::create_dir_all(root.join(dir))?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn save_pattern(&self, pattern: &Pattern) -> Result<()> {
        write_json(&self.pattern_path(pattern.id()), pattern)
    }

    pub fn load_pattern(&self, id: &Id) -> Result<Pattern> {
        read_json(&self.pattern_path(id))?.ok_or_else(|| StoreError::PatternNotFound(id.to_string()))
    }

    /// Every stored pattern, sorted by name.
    pub fn list_patterns(&self) -> Result<Vec<Pattern>> {
        let mut patterns: Vec<Pattern> = read_all(&self.root.join(PATTERNS_DIR))?;
        patterns.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(patterns)
    }

    pub fn find_pattern(&self, name: &str) -> Result<Pattern> {
        self.list_patterns()?
            .into_iter()
            .find(|pattern| pattern.name() == name)
            .ok_or_else(|| StoreError::PatternNotFound(name.to_string()))
    }

    pub fn save_toolkit(&self, toolkit: &ToolkitDefinition) -> Result<()> {
        let dir = self.root.join(TOOLKITS_DIR).join(toolkit.id().as_str());
        std::fs::create_dir_all(&dir)?;
        write_json(&dir.join(format!("{}.json", toolkit.version)), toolkit)
    }

    pub fn load_toolkit(&self, pattern: &Id, version: ToolkitVersion) -> Result<ToolkitDefinition> {
        let path = self
            .root
            .join(TOOLKITS_DIR)
            .join(pattern.as_str())
            .join(format!("{version}.json"));
        read_json(&path)?.ok_or_else(|| StoreError::ToolkitNotFound(format!("{pattern}@{version}")))
    }

    /// Installed toolkits of a pattern, oldest version first.
    pub fn list_toolkits(&self, pattern: &Id) -> Result<Vec<ToolkitDefinition>> {
        let dir = self.root.join(TOOLKITS_DIR).join(pattern.as_str());
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut toolkits: Vec<ToolkitDefinition> = read_all(&dir)?;
        toolkits.sort_by_key(|toolkit| toolkit.version);
        Ok(toolkits)
    }

    /// The highest installed version of a pattern's toolkit.
    pub fn latest_toolkit(&self, pattern: &Id) -> Result<ToolkitDefinition> {
        self.list_toolkits(pattern)?
            .pop()
            .ok_or_else(|| StoreError::ToolkitNotFound(pattern.to_string()))
    }

    pub fn save_draft(&self, draft: &DraftDefinition) -> Result<()> {
        write_json(&self.draft_path(&draft.id), draft)
    }

    pub fn load_draft(&self, id: &Id) -> Result<DraftDefinition> {
        read_json(&self.draft_path(id))?.ok_or_else(|| StoreError::DraftNotFound(id.clone()))
    }

    /// Every stored draft, sorted by name.
    pub fn list_drafts(&self) -> Result<Vec<DraftDefinition>> {
        let mut drafts: Vec<DraftDefinition> = read_all(&self.root.join(DRAFTS_DIR))?;
        drafts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(drafts)
    }

    pub fn delete_draft(&self, id: &Id) -> Result<()> {
        let path = self.draft_path(id);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "Deleted draft");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::DraftNotFound(id.clone())),
            Err(e) => Err(e.into()),
        }
    }

    fn pattern_path(&self, id: &Id) -> PathBuf {
        self.root.join(PATTERNS_DIR).join(format!("{id}.json"))
    }

    fn draft_path(&self, id: &Id) -> PathBuf {
        self.root.join(DRAFTS_DIR).join(format!("{id}.json"))
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    debug!(path = %path.display(), "Wrote document");
    Ok(())
}

/// Reads a document, or `None` when the file does not exist.
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let value = serde_json::from_reader(BufReader::new(file))?;
    debug!(path = %path.display(), "Read document");
    Ok(Some(value))
}

fn read_all<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut values = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            if let Some(value) = read_json(&path)? {
                values.push(value);
            }
        }
    }
    Ok(values)
}
