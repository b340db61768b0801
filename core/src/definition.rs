use serde::{Deserialize, Serialize};
use tracing::info;

use crate::draft::{DraftTree, DraftViolation};
use crate::error::{AutomateError, Result};
use crate::launch::{CommandExecutionResult, CommandExecutor, execute_launch_point};
use crate::migration::{MigrationChangeKind, MigrationMessage, MigrationResult};
use crate::toolkit::{ToolkitDefinition, diff_templates};
use crate::types::Pattern;
use crate::version::ToolkitVersion;
use crate::Id;

/// A named live instance of one toolkit version.
///
/// # Examples
///
/// ```
/// use automate_core::*;
///
/// let mut pattern = Pattern::new("Api");
/// pattern.root.attributes.push(Attribute::new("Port", AttributeDataType::Int).with_default("80"));
/// let v1 = package(&mut pattern, Vec::new(), VersionInstruction::Auto).unwrap();
///
/// let mut draft = DraftDefinition::new(&v1, "orders").unwrap();
/// let root = draft.tree.root_id().clone();
/// draft.set_property(&root, "Port", "8080").unwrap();
///
/// pattern.root.attributes.push(Attribute::new("Host", AttributeDataType::String));
/// let v2 = package(&mut pattern, Vec::new(), VersionInstruction::Auto).unwrap();
///
/// let result = draft.upgrade(&v2, false).unwrap();
/// assert!(result.is_success());
/// assert_eq!(draft.version(), ToolkitVersion::new(0, 2, 0));
/// assert!(draft.tree.get_property(&root, "Host").is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DraftDefinition {
    pub id: Id,
    pub name: String,
    pub toolkit: ToolkitDefinition,
    pub tree: DraftTree,
}

impl DraftDefinition {
    /// Instantiates `toolkit` as a new draft with its root materialised.
    ///
    /// # Errors
    ///
    /// Returns [`AutomateError::ValueCoercion`] if a default value in the
    /// toolkit does not parse.
    pub fn new(toolkit: &ToolkitDefinition, name: &str) -> Result<Self> {
        Ok(Self {
            id: Id::generate(),
            name: name.to_string(),
            toolkit: toolkit.clone(),
            tree: DraftTree::new(&toolkit.pattern)?,
        })
    }

    pub fn pattern(&self) -> &Pattern {
        &self.toolkit.pattern
    }

    pub fn version(&self) -> ToolkitVersion {
        self.toolkit.version
    }

    pub fn materialise(&mut self, id: &Id) -> Result<()> {
        self.tree.materialise(&self.toolkit.pattern, id)
    }

    pub fn materialise_collection_item(&mut self, collection: &Id) -> Result<Id> {
        self.tree
            .materialise_collection_item(&self.toolkit.pattern, collection)
    }

    pub fn set_property(&mut self, owner: &Id, name: &str, raw: &str) -> Result<()> {
        self.tree
            .set_property(&self.toolkit.pattern, owner, name, raw)
    }

    pub fn validate(&self) -> Result<Vec<DraftViolation>> {
        self.tree.validate(&self.toolkit.pattern)
    }

    /// Re-bases the draft onto `candidate`.
    ///
    /// - The same version succeeds with a single Abort entry and no changes.
    /// - An older version fails with a single Abort entry.
    /// - A breaking upgrade fails unless `force` is set; the draft is
    ///   untouched. An upgrade is breaking when the migration log holds any
    ///   Breaking entry, or when the candidate's major version is higher
    ///   even if every entry is NonBreaking (so an explicit `0.x` to `1.0`
    ///   release needs `force`).
    /// - Otherwise the migrated tree and the candidate toolkit replace the
    ///   current ones. A forced breaking upgrade appends a Breaking entry.
    ///
    /// # Errors
    ///
    /// Returns [`AutomateError::ToolkitMismatch`] when the candidate was built
    /// from another pattern. Expected divergence is never an error.
    pub fn upgrade(&mut self, candidate: &ToolkitDefinition, force: bool) -> Result<MigrationResult> {
        if candidate.id() != self.toolkit.id() {
            return Err(AutomateError::ToolkitMismatch {
                current: self.toolkit.id().clone(),
                candidate: candidate.id().clone(),
            });
        }

        let current = self.toolkit.version;
        let next = candidate.version;
        let mut result = MigrationResult::new();

        if next == current {
            result.add(
                MigrationChangeKind::Abort,
                MigrationMessage::DraftUpToDate,
                vec![current.to_string()],
            );
            return Ok(result);
        }
        if next < current {
            result.add(
                MigrationChangeKind::Abort,
                MigrationMessage::DowngradeNotAllowed,
                vec![next.to_string(), current.to_string()],
            );
            result.fail();
            return Ok(result);
        }

        let mut tree = self.tree.clone();
        tree.migrate(&self.toolkit.pattern, &candidate.pattern, &mut result)?;
        diff_templates(&self.toolkit, candidate, &mut result);

        let breaking = next.major() > current.major() || result.has_breaking();
        if breaking && !force {
            result.add(
                MigrationChangeKind::Abort,
                MigrationMessage::BreakingChangesNotForced,
                vec![current.to_string(), next.to_string()],
            );
            result.fail();
            info!(draft = %self.name, from = %current, to = %next, "Upgrade refused, breaking changes");
            return Ok(result);
        }

        self.tree = tree;
        self.toolkit = candidate.clone();
        if breaking {
            result.add(
                MigrationChangeKind::Breaking,
                MigrationMessage::ForcedBreakingUpgrade,
                vec![current.to_string(), next.to_string()],
            );
        }
        info!(
            draft = %self.name,
            from = %current,
            to = %next,
            changes = result.changes().len(),
            "Upgraded draft"
        );
        Ok(result)
    }

    /// Executes the launch point named `name` against `context`.
    ///
    /// # Errors
    ///
    /// Returns [`AutomateError::NotALaunchPoint`] when no launch point has the
    /// name, and fails like [`execute_launch_point`].
    pub fn execute_launch_point<E: CommandExecutor>(
        &self,
        name: &str,
        context: &Id,
        executor: &mut E,
    ) -> Result<CommandExecutionResult> {
        let launch_point = self
            .toolkit
            .pattern
            .find_automation_by_name(name)
            .filter(|automation| automation.as_launch_point().is_some())
            .ok_or_else(|| AutomateError::NotALaunchPoint(name.to_string()))?;
        execute_launch_point(&self.toolkit, &self.tree, &launch_point.id, context, executor)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Attribute, AttributeDataType, VersionInstruction, package};

    use super::*;

    fn v1() -> (Pattern, ToolkitDefinition) {
        let mut pattern = Pattern::new("Api");
        pattern
            .root
            .attributes
            .push(Attribute::new("Port", AttributeDataType::Int).with_default("80"));
        let toolkit = package(&mut pattern, Vec::new(), VersionInstruction::Auto).unwrap();
        (pattern, toolkit)
    }

    #[test]
    fn test_same_version_aborts_successfully() {
        let (_, toolkit) = v1();
        let mut draft = DraftDefinition::new(&toolkit, "d").unwrap();
        let before = draft.clone();

        let result = draft.upgrade(&toolkit, false).unwrap();

        assert!(result.is_success());
        assert_eq!(result.changes().len(), 1);
        assert_eq!(result.changes()[0].kind, MigrationChangeKind::Abort);
        assert_eq!(draft, before);
    }

    #[test]
    fn test_downgrade_fails() {
        let (mut pattern, v1) = v1();
        pattern.root.attributes.push(Attribute::new("Host", AttributeDataType::String));
        let v2 = package(&mut pattern, Vec::new(), VersionInstruction::Auto).unwrap();
        let mut draft = DraftDefinition::new(&v2, "d").unwrap();

        let result = draft.upgrade(&v1, true).unwrap();

        assert!(!result.is_success());
        assert_eq!(result.changes()[0].message, MigrationMessage::DowngradeNotAllowed);
        assert_eq!(draft.version(), v2.version);
    }

    #[test]
    fn test_breaking_upgrade_requires_force() {
        let (mut pattern, v1) = v1();
        let port = pattern.root.attributes[0].id.clone();
        pattern.remove_node(&port).unwrap();
        let v2 = package(&mut pattern, Vec::new(), VersionInstruction::Auto).unwrap();
        let mut draft = DraftDefinition::new(&v1, "d").unwrap();

        let refused = draft.upgrade(&v2, false).unwrap();
        assert!(!refused.is_success());
        assert_eq!(draft.version(), v1.version);
        let root = draft.tree.root_id().clone();
        assert!(draft.tree.get_property(&root, "Port").is_ok());

        let forced = draft.upgrade(&v2, true).unwrap();
        assert!(forced.is_success());
        assert_eq!(draft.version(), v2.version);
        assert_eq!(
            forced.changes().last().map(|c| c.message),
            Some(MigrationMessage::ForcedBreakingUpgrade)
        );
        assert!(draft.tree.get_property(&root, "Port").is_err());
    }

    #[test]
    fn test_other_pattern_is_rejected() {
        let (_, v1) = v1();
        let mut other = Pattern::new("Web");
        let foreign = package(&mut other, Vec::new(), VersionInstruction::Auto).unwrap();
        let mut draft = DraftDefinition::new(&v1, "d").unwrap();

        let err = draft.upgrade(&foreign, true).unwrap_err();
        assert!(matches!(err, AutomateError::ToolkitMismatch { .. }));
    }

    #[test]
    fn test_unknown_launch_point_name() {
        let (_, v1) = v1();
        let draft = DraftDefinition::new(&v1, "d").unwrap();
        let mut executor =
            |_: &crate::CommandContext<'_>| -> std::result::Result<Vec<String>, String> { Ok(vec![]) };
        let root = draft.tree.root_id().clone();

        let err = draft
            .execute_launch_point("Missing", &root, &mut executor)
            .unwrap_err();
        assert_eq!(err, AutomateError::NotALaunchPoint("Missing".into()));
    }
}
