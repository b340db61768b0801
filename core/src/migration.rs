//! Re-basing a draft onto a newer pattern snapshot.
//!
//! Old and new schema nodes are matched by [`Id`] through a
//! [`SchemaIndex`] of each snapshot. Expected divergence (deleted, renamed or
//! retyped members) never raises; it is recorded as a classified
//! [`MigrationChange`] on the [`MigrationResult`].

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::draft::{DraftItemKind, DraftTree};
use crate::error::{AutomateError, Result};
use crate::index::SchemaIndex;
use crate::types::{Attribute, Element, Pattern};
use crate::value::AttributeValue;
use crate::Id;

/// Severity of one migration log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MigrationChangeKind {
    /// Informational entry for an upgrade that did not run.
    Abort,
    NonBreaking,
    Breaking,
}

/// What a migration log entry reports; arguments fill the template's
/// numbered placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MigrationMessage {
    DraftUpToDate,
    DowngradeNotAllowed,
    BreakingChangesNotForced,
    ForcedBreakingUpgrade,
    ElementDeleted,
    AttributeDeleted,
    PropertyRenamed,
    CardinalityChanged,
    AttributeAdded,
    AttributeDataTypeChanged,
    AttributeChoicesChanged,
    AttributeDefaultAdopted,
    CodeTemplateAdded,
    CodeTemplateDeleted,
    CodeTemplateContentChanged,
}

impl MigrationMessage {
    pub fn template(&self) -> &'static str {
        match self {
            Self::DraftUpToDate => "The draft already uses version {0} of the toolkit",
            Self::DowngradeNotAllowed => {
                "Toolkit version {0} is older than the draft's toolkit version {1}"
            }
            Self::BreakingChangesNotForced => {
                "Upgrading from version {0} to {1} contains breaking changes and was not forced"
            }
            Self::ForcedBreakingUpgrade => {
                "Upgrade from version {0} to {1} was forced despite breaking changes"
            }
            Self::ElementDeleted => "Element {0} was deleted",
            Self::AttributeDeleted => "Attribute {0} was deleted",
            Self::PropertyRenamed => "Property {0} was renamed to '{1}'",
            Self::CardinalityChanged => {
                "Element {0} changed between a single element and a collection and was reset"
            }
            Self::AttributeAdded => "Attribute {0} was added with value '{1}'",
            Self::AttributeDataTypeChanged => {
                "Attribute {0} changed data type from '{1}' to '{2}', its value is now '{3}'"
            }
            Self::AttributeChoicesChanged => {
                "Attribute {0} changed its choices, its value is now '{1}'"
            }
            Self::AttributeDefaultAdopted => {
                "Attribute {0} adopted the new default value '{2}' in place of '{1}'"
            }
            Self::CodeTemplateAdded => "Code template {0} was added",
            Self::CodeTemplateDeleted => "Code template {0} was deleted",
            Self::CodeTemplateContentChanged => "Code template {0} has new content",
        }
    }
}

/// One classified entry of a migration log.
///
/// # Examples
///
/// ```
/// use automate_core::*;
///
/// let change = MigrationChange::new(
///     MigrationChangeKind::Breaking,
///     MigrationMessage::AttributeDeleted,
///     vec!["{Api.Port}".to_string()],
/// );
/// assert_eq!(change.to_string(), "Attribute {Api.Port} was deleted");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MigrationChange {
    pub kind: MigrationChangeKind,
    pub message: MigrationMessage,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<String>,
}

impl MigrationChange {
    pub fn new(kind: MigrationChangeKind, message: MigrationMessage, arguments: Vec<String>) -> Self {
        Self {
            kind,
            message,
            arguments,
        }
    }
}

impl fmt::Display for MigrationChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut text = self.message.template().to_string();
        for (index, argument) in self.arguments.iter().enumerate() {
            text = text.replace(&format!("{{{index}}}"), argument);
        }
        f.write_str(&text)
    }
}

/// Log and outcome of a migration or upgrade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MigrationResult {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    changes: Vec<MigrationChange>,
    is_success: bool,
}

impl Default for MigrationResult {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationResult {
    pub fn new() -> Self {
        Self {
            changes: Vec::new(),
            is_success: true,
        }
    }

    pub fn changes(&self) -> &[MigrationChange] {
        &self.changes
    }

    pub fn is_success(&self) -> bool {
        self.is_success
    }

    pub fn add(&mut self, kind: MigrationChangeKind, message: MigrationMessage, arguments: Vec<String>) {
        let change = MigrationChange::new(kind, message, arguments);
        debug!(kind = ?change.kind, change = %change, "Migration change");
        self.changes.push(change);
    }

    pub fn has_breaking(&self) -> bool {
        self.changes
            .iter()
            .any(|change| change.kind == MigrationChangeKind::Breaking)
    }

    /// Marks the migration as failed; the log is kept.
    pub fn fail(&mut self) {
        self.is_success = false;
    }
}

struct Migrator<'p> {
    old: SchemaIndex<'p>,
    new: SchemaIndex<'p>,
    old_paths: HashMap<Id, String>,
}

impl DraftTree {
    /// Restructures this tree, built against `old`, to agree with `new`.
    ///
    /// Values survive wherever they remain valid. Every observable change is
    /// appended to `result`.
    ///
    /// # Errors
    ///
    /// Returns [`AutomateError::SchemaNotFound`] if the tree refers to a
    /// schema node that `old` does not declare.
    ///
    /// # Examples
    ///
    /// ```
    /// use automate_core::*;
    ///
    /// let mut old = Pattern::new("Api");
    /// old.root.attributes.push(Attribute::new("a1", AttributeDataType::String));
    /// let a1 = old.root.attributes[0].id.clone();
    ///
    /// let mut tree = DraftTree::new(&old).unwrap();
    /// let root = tree.root_id().clone();
    /// tree.set_property(&old, &root, "a1", "avalue").unwrap();
    ///
    /// let mut new = old.clone();
    /// new.rename_node(&a1, "a2").unwrap();
    ///
    /// let mut result = MigrationResult::new();
    /// tree.migrate(&old, &new, &mut result).unwrap();
    ///
    /// let value = tree.get_property(&root, "a2").unwrap().value();
    /// assert_eq!(value, Some(&AttributeValue::String("avalue".into())));
    /// assert!(tree.get_property(&root, "a1").is_err());
    /// assert!(result.has_breaking());
    /// ```
    pub fn migrate(&mut self, old: &Pattern, new: &Pattern, result: &mut MigrationResult) -> Result<()> {
        let old_paths = self
            .descendants(&self.root)
            .into_iter()
            .map(|id| {
                let path = self.path_of(&id);
                (id, path)
            })
            .collect();
        let migrator = Migrator {
            old: SchemaIndex::new(old),
            new: SchemaIndex::new(new),
            old_paths,
        };

        let root = self.root.clone();
        if self.item(&root)?.name != new.name() {
            migrator.rename(self, &root, new.name(), result)?;
        }
        migrator.migrate_owner(self, &root, &new.root, result)
    }
}

impl Migrator<'_> {
    fn old_path(&self, tree: &DraftTree, id: &Id) -> String {
        self.old_paths
            .get(id)
            .cloned()
            .unwrap_or_else(|| tree.path_of(id))
    }

    fn rename(
        &self,
        tree: &mut DraftTree,
        id: &Id,
        new_name: &str,
        result: &mut MigrationResult,
    ) -> Result<()> {
        let path = self.old_path(tree, id);
        let item = tree.item_mut(id)?;
        item.name = new_name.to_string();
        if item.is_materialised {
            result.add(
                MigrationChangeKind::Breaking,
                MigrationMessage::PropertyRenamed,
                vec![path, new_name.to_string()],
            );
        }
        Ok(())
    }

    /// Migrates the properties of a pattern, element or collection item.
    fn migrate_owner(
        &self,
        tree: &mut DraftTree,
        owner: &Id,
        element: &Element,
        result: &mut MigrationResult,
    ) -> Result<()> {
        let existing: Vec<Id> = tree.item(owner)?.properties.values().cloned().collect();
        let mut kept: HashMap<Id, Id> = HashMap::new();

        for child in existing {
            if let Some((schema_id, id)) = self.migrate_child(tree, owner, &child, element, result)? {
                kept.insert(schema_id, id);
            }
        }

        let owner_materialised = tree.item(owner)?.is_materialised;
        let mut properties = IndexMap::new();
        for attribute in &element.attributes {
            let id = match kept.remove(&attribute.id) {
                Some(id) => id,
                None => {
                    let id = tree.insert_attribute(attribute, Some(owner.clone()));
                    if owner_materialised {
                        self.add_attribute(tree, &id, attribute, result)?;
                    }
                    id
                }
            };
            properties.insert(attribute.name.clone(), id);
        }
        for child in &element.elements {
            let id = match kept.remove(&child.id) {
                Some(id) => id,
                None => tree.insert_child_element(child, owner.clone()),
            };
            properties.insert(child.name.clone(), id);
        }
        tree.item_mut(owner)?.properties = properties;
        Ok(())
    }

    /// Migrates one existing child of `owner`. Returns the schema id and the
    /// draft id of the surviving child, if any.
    fn migrate_child(
        &self,
        tree: &mut DraftTree,
        owner: &Id,
        child: &Id,
        element: &Element,
        result: &mut MigrationResult,
    ) -> Result<Option<(Id, Id)>> {
        let (schema_id, kind, name) = {
            let item = tree.item(child)?;
            (item.schema_id.clone(), item.kind, item.name.clone())
        };

        let still_declared = self.new.parent_of(&schema_id) == Some(&element.id);
        let new_node = self.new.get(&schema_id).filter(|_| still_declared);
        let Some(new_node) = new_node else {
            self.delete(tree, child, result)?;
            return Ok(None);
        };

        if name != new_node.name() {
            self.rename(tree, child, new_node.name(), result)?;
        }

        match (kind, new_node.as_attribute(), new_node.as_element()) {
            (DraftItemKind::Attribute, Some(new_attribute), _) => {
                let old_attribute = self
                    .old
                    .attribute(&schema_id)
                    .ok_or_else(|| AutomateError::SchemaNotFound(schema_id.clone()))?;
                self.migrate_attribute(tree, child, old_attribute, new_attribute, result)?;
                Ok(Some((schema_id, child.clone())))
            }
            (DraftItemKind::Element, _, Some(new_element)) if !new_element.is_collection() => {
                self.migrate_owner(tree, child, new_element, result)?;
                Ok(Some((schema_id, child.clone())))
            }
            (DraftItemKind::Collection, _, Some(new_element)) if new_element.is_collection() => {
                let entries = tree.item(child)?.items.clone();
                for entry in entries {
                    self.migrate_owner(tree, &entry, new_element, result)?;
                }
                Ok(Some((schema_id, child.clone())))
            }
            (DraftItemKind::Element | DraftItemKind::Collection, _, Some(new_element)) => {
                let was_present = is_present(tree, child)?;
                let path = self.old_path(tree, child);
                tree.remove_subtree(child);
                let replacement = tree.insert_child_element(new_element, owner.clone());
                if was_present {
                    result.add(
                        MigrationChangeKind::Breaking,
                        MigrationMessage::CardinalityChanged,
                        vec![path],
                    );
                }
                Ok(Some((schema_id, replacement)))
            }
            _ => {
                self.delete(tree, child, result)?;
                Ok(None)
            }
        }
    }

    fn delete(&self, tree: &mut DraftTree, child: &Id, result: &mut MigrationResult) -> Result<()> {
        let kind = tree.item(child)?.kind;
        if is_present(tree, child)? {
            let message = match kind {
                DraftItemKind::Attribute => MigrationMessage::AttributeDeleted,
                _ => MigrationMessage::ElementDeleted,
            };
            result.add(
                MigrationChangeKind::Breaking,
                message,
                vec![self.old_path(tree, child)],
            );
        }
        tree.remove_subtree(child);
        Ok(())
    }

    fn add_attribute(
        &self,
        tree: &mut DraftTree,
        id: &Id,
        attribute: &Attribute,
        result: &mut MigrationResult,
    ) -> Result<()> {
        let value = parse_default(attribute);
        let item = tree.item_mut(id)?;
        item.value = value.clone();
        item.is_materialised = true;
        result.add(
            MigrationChangeKind::NonBreaking,
            MigrationMessage::AttributeAdded,
            vec![tree.path_of(id), display(&value)],
        );
        Ok(())
    }

    fn migrate_attribute(
        &self,
        tree: &mut DraftTree,
        id: &Id,
        old: &Attribute,
        new: &Attribute,
        result: &mut MigrationResult,
    ) -> Result<()> {
        let path = tree.path_of(id);
        let mut value = tree.item(id)?.value.clone();

        if old.data_type != new.data_type {
            if let Some(current) = &value {
                value = new
                    .data_type
                    .parse(&current.to_string())
                    .ok()
                    .or_else(|| parse_default(new));
                result.add(
                    MigrationChangeKind::Breaking,
                    MigrationMessage::AttributeDataTypeChanged,
                    vec![
                        path.clone(),
                        old.data_type.to_string(),
                        new.data_type.to_string(),
                        display(&value),
                    ],
                );
            }
        }

        if old.choices != new.choices {
            if let Some(current) = &value {
                let valid = new.choices.is_empty() || current.is_one_of(&new.choices);
                if !valid {
                    value = parse_default(new).filter(|default| default.is_one_of(&new.choices));
                }
                let kind = if old.choices.is_empty() || valid {
                    MigrationChangeKind::NonBreaking
                } else {
                    MigrationChangeKind::Breaking
                };
                result.add(
                    kind,
                    MigrationMessage::AttributeChoicesChanged,
                    vec![path.clone(), display(&value)],
                );
            }
        }

        if old.default_value != new.default_value && tree.item(id)?.is_materialised {
            let old_default = old
                .default_value
                .as_deref()
                .and_then(|raw| new.data_type.parse(raw).ok());
            if value == old_default {
                let adopted = parse_default(new);
                if adopted != value {
                    result.add(
                        MigrationChangeKind::NonBreaking,
                        MigrationMessage::AttributeDefaultAdopted,
                        vec![path, display(&value), display(&adopted)],
                    );
                    value = adopted;
                }
            }
        }

        tree.item_mut(id)?.value = value;
        Ok(())
    }
}

/// Whether an item holds observable draft data.
fn is_present(tree: &DraftTree, id: &Id) -> Result<bool> {
    let item = tree.item(id)?;
    Ok(item.is_materialised || !item.items.is_empty())
}

fn parse_default(attribute: &Attribute) -> Option<AttributeValue> {
    attribute
        .default_value
        .as_deref()
        .and_then(|raw| attribute.data_type.parse(raw).ok())
}

fn display(value: &Option<AttributeValue>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}
