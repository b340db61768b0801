use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{AutomateError, Result};
use crate::migration::{MigrationChangeKind, MigrationMessage, MigrationResult};
use crate::types::Pattern;
use crate::version::{ToolkitVersion, VersionInstruction, next_version};
use crate::Id;

/// Contents of one code template, keyed by the template's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CodeTemplateFile {
    pub id: Id,
    #[serde(with = "hex_contents")]
    pub contents: Vec<u8>,
    pub last_modified: DateTime<Utc>,
}

impl CodeTemplateFile {
    pub fn new(id: Id, contents: impl Into<Vec<u8>>, last_modified: DateTime<Utc>) -> Self {
        Self {
            id,
            contents: contents.into(),
            last_modified,
        }
    }

    /// Lowercase hex SHA-256 of the contents.
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(&self.contents))
    }
}

/// Immutable, versioned snapshot of a pattern and its template contents.
///
/// # Examples
///
/// ```
/// use automate_core::*;
///
/// let mut pattern = Pattern::new("Api");
/// let toolkit = package(&mut pattern, Vec::new(), VersionInstruction::Auto).unwrap();
///
/// assert_eq!(toolkit.version, ToolkitVersion::new(0, 1, 0));
/// assert_eq!(toolkit.id(), pattern.id());
/// assert_eq!(pattern.toolkit_version, toolkit.version);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ToolkitDefinition {
    pub version: ToolkitVersion,
    pub pattern: Pattern,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub code_template_files: Vec<CodeTemplateFile>,
}

impl ToolkitDefinition {
    /// The toolkit shares its pattern's id.
    pub fn id(&self) -> &Id {
        self.pattern.id()
    }

    pub fn name(&self) -> &str {
        self.pattern.name()
    }

    pub fn code_template_file(&self, id: &Id) -> Option<&CodeTemplateFile> {
        self.code_template_files.iter().find(|file| file.id == *id)
    }

    /// # Errors
    ///
    /// Returns [`AutomateError::CodeTemplateNotFound`] when no file with the
    /// id was packaged.
    pub fn template_contents(&self, id: &Id) -> Result<&[u8]> {
        self.code_template_file(id)
            .map(|file| file.contents.as_slice())
            .ok_or_else(|| AutomateError::CodeTemplateNotFound(id.clone()))
    }
}

/// Packages the pattern into a new toolkit version.
///
/// The version comes from [`next_version`]; on success the pattern is
/// stamped with it and its pending change log is cleared.
///
/// # Errors
///
/// Fails like [`next_version`]; the pattern is left untouched.
pub fn package(
    pattern: &mut Pattern,
    code_template_files: Vec<CodeTemplateFile>,
    instruction: VersionInstruction,
) -> Result<ToolkitDefinition> {
    let version = next_version(pattern.toolkit_version, pattern.pending_changes(), instruction)?;
    debug!(
        pattern = pattern.name(),
        from = %pattern.toolkit_version,
        to = %version,
        changes = pattern.pending_changes().len(),
        "Packaging toolkit"
    );
    pattern.toolkit_version = version;
    pattern.clear_changes();
    Ok(ToolkitDefinition {
        version,
        pattern: pattern.clone(),
        code_template_files,
    })
}

/// Logs the code template files added, deleted or changed between two
/// toolkits.
///
/// Files with equal modification times are assumed unchanged; otherwise
/// content digests decide.
pub fn diff_templates(
    current: &ToolkitDefinition,
    candidate: &ToolkitDefinition,
    result: &mut MigrationResult,
) {
    let existing: HashMap<&Id, &CodeTemplateFile> = current
        .code_template_files
        .iter()
        .map(|file| (&file.id, file))
        .collect();

    for file in &candidate.code_template_files {
        let label = template_label(candidate, &file.id);
        match existing.get(&file.id) {
            None => result.add(
                MigrationChangeKind::NonBreaking,
                MigrationMessage::CodeTemplateAdded,
                vec![label],
            ),
            Some(old) if old.last_modified == file.last_modified => {}
            Some(old) => {
                if old.digest() != file.digest() {
                    result.add(
                        MigrationChangeKind::NonBreaking,
                        MigrationMessage::CodeTemplateContentChanged,
                        vec![label],
                    );
                }
            }
        }
    }

    for file in &current.code_template_files {
        if candidate.code_template_file(&file.id).is_none() {
            result.add(
                MigrationChangeKind::Breaking,
                MigrationMessage::CodeTemplateDeleted,
                vec![template_label(current, &file.id)],
            );
        }
    }
}

fn template_label(toolkit: &ToolkitDefinition, id: &Id) -> String {
    toolkit
        .pattern
        .find_code_template(id)
        .map(|template| template.name.clone())
        .unwrap_or_else(|| id.to_string())
}

mod hex_contents {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        hex::decode(text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use crate::{CodeTemplate, VersionChangeKind};

    use super::*;

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(seconds, 0).unwrap()
    }

    fn toolkit_with(files: Vec<CodeTemplateFile>) -> ToolkitDefinition {
        let mut pattern = Pattern::new("Api");
        for file in &files {
            let mut template = CodeTemplate::new("Main", "main.rs");
            template.id = file.id.clone();
            pattern.root.code_templates.push(template);
        }
        ToolkitDefinition {
            version: ToolkitVersion::new(1, 0, 0),
            pattern,
            code_template_files: files,
        }
    }

    #[test]
    fn test_package_bumps_major_on_breaking_change() {
        let mut pattern = Pattern::new("Api");
        pattern.toolkit_version = ToolkitVersion::new(1, 2, 0);
        pattern.record_change(VersionChangeKind::Breaking, "Deleted attribute 'Port'");

        let toolkit = package(&mut pattern, Vec::new(), VersionInstruction::Auto).unwrap();

        assert_eq!(toolkit.version, ToolkitVersion::new(2, 0, 0));
        assert!(pattern.pending_changes().is_empty());
        assert!(toolkit.pattern.pending_changes().is_empty());
    }

    #[test]
    fn test_package_failure_leaves_pattern_untouched() {
        let mut pattern = Pattern::new("Api");
        pattern.toolkit_version = ToolkitVersion::new(1, 0, 0);
        pattern.record_change(VersionChangeKind::NonBreaking, "Added attribute 'Port'");

        let instruction = VersionInstruction::Explicit(ToolkitVersion::new(0, 9, 0));
        assert!(package(&mut pattern, Vec::new(), instruction).is_err());
        assert_eq!(pattern.toolkit_version, ToolkitVersion::new(1, 0, 0));
        assert_eq!(pattern.pending_changes().len(), 1);
    }

    #[test]
    fn test_contents_serialize_as_hex() {
        let file = CodeTemplateFile::new(Id::from("t1"), b"hi".to_vec(), at(0));
        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["Contents"], "6869");

        let restored: CodeTemplateFile = serde_json::from_value(json).unwrap();
        assert_eq!(restored, file);
    }

    #[test]
    fn test_diff_templates_classifies_changes() {
        let kept = CodeTemplateFile::new(Id::from("kept"), "same", at(10));
        let touched = CodeTemplateFile::new(Id::from("touched"), "old", at(10));
        let deleted = CodeTemplateFile::new(Id::from("deleted"), "gone", at(10));
        let current = toolkit_with(vec![kept.clone(), touched.clone(), deleted]);

        let mut touched_new = touched.clone();
        touched_new.contents = b"new".to_vec();
        touched_new.last_modified = at(20);
        let added = CodeTemplateFile::new(Id::from("added"), "fresh", at(20));
        let candidate = toolkit_with(vec![kept, touched_new, added]);

        let mut result = MigrationResult::new();
        diff_templates(&current, &candidate, &mut result);

        let messages: Vec<_> = result.changes().iter().map(|c| (c.kind, c.message)).collect();
        assert_eq!(
            messages,
            vec![
                (
                    MigrationChangeKind::NonBreaking,
                    MigrationMessage::CodeTemplateContentChanged
                ),
                (MigrationChangeKind::NonBreaking, MigrationMessage::CodeTemplateAdded),
                (MigrationChangeKind::Breaking, MigrationMessage::CodeTemplateDeleted),
            ]
        );
    }

    #[test]
    fn test_touched_file_with_same_content_is_unchanged() {
        let file = CodeTemplateFile::new(Id::from("t"), "same", at(10));
        let mut touched = file.clone();
        touched.last_modified = at(99);

        let mut result = MigrationResult::new();
        diff_templates(&toolkit_with(vec![file]), &toolkit_with(vec![touched]), &mut result);
        assert!(result.changes().is_empty());
    }
}
