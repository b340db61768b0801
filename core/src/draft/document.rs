use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{DraftItem, DraftItemKind, DraftTree};
use crate::error::AutomateError;
use crate::value::AttributeValue;
use crate::Id;

/// Nested persisted form of a [`DraftTree`].
///
/// Each item owns its children by value; parent links are rebuilt on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DraftDocument {
    pub id: Id,
    pub name: String,
    pub schema_id: Id,
    pub kind: DraftItemKind,
    #[serde(default)]
    pub is_materialised: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<AttributeValue>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, DraftDocument>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<DraftDocument>,
}

impl DraftDocument {
    fn from_item(tree: &DraftTree, item: &DraftItem) -> Self {
        let properties = item
            .properties
            .iter()
            .filter_map(|(name, child)| {
                tree.nodes
                    .get(child)
                    .map(|child| (name.clone(), Self::from_item(tree, child)))
            })
            .collect();
        let items = item
            .items
            .iter()
            .filter_map(|entry| tree.nodes.get(entry))
            .map(|entry| Self::from_item(tree, entry))
            .collect();
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            schema_id: item.schema_id.clone(),
            kind: item.kind,
            is_materialised: item.is_materialised,
            value: item.value.clone(),
            properties,
            items,
        }
    }
}

impl From<DraftTree> for DraftDocument {
    fn from(tree: DraftTree) -> Self {
        Self::from_item(&tree, tree.root())
    }
}

impl TryFrom<DraftDocument> for DraftTree {
    type Error = AutomateError;

    fn try_from(document: DraftDocument) -> Result<Self, Self::Error> {
        if document.kind != DraftItemKind::Pattern {
            return Err(AutomateError::InvalidDocument(format!(
                "root item '{}' is a {:?}, expected Pattern",
                document.name, document.kind
            )));
        }
        let root = document.id.clone();
        let mut nodes = HashMap::new();
        insert_document(&mut nodes, document, None)?;
        Ok(Self { root, nodes })
    }
}

fn insert_document(
    nodes: &mut HashMap<Id, DraftItem>,
    document: DraftDocument,
    parent: Option<Id>,
) -> Result<(), AutomateError> {
    let DraftDocument {
        id,
        name,
        schema_id,
        kind,
        is_materialised,
        value,
        properties,
        items,
    } = document;

    if nodes.contains_key(&id) {
        return Err(AutomateError::InvalidDocument(format!(
            "item id '{id}' appears more than once"
        )));
    }
    if kind == DraftItemKind::Pattern && parent.is_some() {
        return Err(AutomateError::InvalidDocument(format!(
            "item '{name}' is a Pattern below the root"
        )));
    }

    let mut item = DraftItem {
        id: id.clone(),
        name,
        schema_id,
        kind,
        value,
        properties: IndexMap::new(),
        items: Vec::new(),
        is_materialised,
        parent,
    };
    let mut children = Vec::with_capacity(properties.len());
    for (key, child) in properties {
        item.properties.insert(key, child.id.clone());
        children.push(child);
    }
    let mut entries = Vec::with_capacity(items.len());
    for entry in items {
        item.items.push(entry.id.clone());
        entries.push(entry);
    }
    nodes.insert(id.clone(), item);

    for child in children.into_iter().chain(entries) {
        insert_document(nodes, child, Some(id.clone()))?;
    }
    Ok(())
}
