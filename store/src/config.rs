//! Workspace configuration.
//!
//! Defines the YAML-serializable configuration that locates the document
//! store and the generated output, and controls how external applications
//! are run.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! store_dir: .automate
//! output_dir: out
//! process:
//!   timeout_ms: 5000
//!   wait_for_exit: true
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Settings for running external applications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessConfig {
    /// Hang timeout in milliseconds.
    pub timeout_ms: u64,
    /// Block until launched applications exit.
    pub wait_for_exit: bool,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            wait_for_exit: true,
        }
    }
}

/// Top-level workspace configuration.
///
/// Loaded from a YAML file (typically `.automate.yml` in the project root).
/// Relative directories are resolved against the process working directory.
///
/// # Examples
///
/// ```
/// # use automate_store::StoreConfig;
/// let yaml = "version: \"1.0\"\nstore_dir: .automate\noutput_dir: out\n";
/// let config: StoreConfig = serde_yaml::from_str(yaml).unwrap();
/// assert_eq!(config.process_timeout().as_millis(), 5_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Configuration format version (e.g., `"1.0"`).
    pub version: String,
    /// Directory holding patterns, toolkits and drafts.
    pub store_dir: PathBuf,
    /// Root that code template commands write under.
    pub output_dir: PathBuf,
    #[serde(default)]
    pub process: ProcessConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            version: "1.0".into(),
            store_dir: PathBuf::from(".automate"),
            output_dir: PathBuf::from("out"),
            process: ProcessConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Configuration with both directories placed under `root`.
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            store_dir: root.join(".automate"),
            output_dir: root.join("out"),
            ..Self::default()
        }
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::StoreError::IoError) if the file cannot
    /// be read, or [`YamlError`](crate::StoreError::YamlError) if parsing
    /// fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::StoreError::IoError) if the file cannot
    /// be written, or [`YamlError`](crate::StoreError::YamlError) if
    /// serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    pub fn process_timeout(&self) -> Duration {
        Duration::from_millis(self.process.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_yaml() -> &'static str {
        r#"
version: "1.0"
store_dir: /var/lib/automate
output_dir: generated
process:
  timeout_ms: 250
  wait_for_exit: false
"#
    }

    #[test]
    fn test_parse_full_config() {
        let config: StoreConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        assert_eq!(config.store_dir, PathBuf::from("/var/lib/automate"));
        assert_eq!(config.output_dir, PathBuf::from("generated"));
        assert_eq!(config.process_timeout(), Duration::from_millis(250));
        assert!(!config.process.wait_for_exit);
    }

    #[test]
    fn test_process_section_defaults() {
        let config: StoreConfig =
            serde_yaml::from_str("version: \"1.0\"\nstore_dir: s\noutput_dir: o\n").unwrap();
        assert_eq!(config.process, ProcessConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("automate.yml");
        let config = StoreConfig::rooted_at(dir.path());

        config.save(&path).unwrap();
        let loaded = StoreConfig::load(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let result = StoreConfig::load("/nonexistent/automate.yml");
        assert!(result.is_err());
    }
}
