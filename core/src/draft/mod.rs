//! Live draft instance trees.
//!
//! A [`DraftTree`] mirrors a [`Pattern`]: every element and attribute has a
//! corresponding [`DraftItem`] from the moment its owner exists, but only
//! materialised items hold values. Collections grow an ordered list of
//! independently materialised items.
//!
//! Items live in an arena keyed by [`Id`]. Ownership runs strictly top-down
//! through `properties` and `items`; the `parent` link is a plain id used for
//! navigation only.
//!
//! # Example
//!
//! ```
//! use automate_core::*;
//!
//! let mut pattern = Pattern::new("Api");
//! pattern.root.attributes.push(Attribute::new("Port", AttributeDataType::Int).with_default("80"));
//! pattern.root.elements.push(
//!     Element::new("Route")
//!         .with_cardinality(Cardinality::ZeroOrMany)
//!         .with_attribute(Attribute::new("Path", AttributeDataType::String)),
//! );
//!
//! let mut tree = DraftTree::new(&pattern).unwrap();
//! let root = tree.root_id().clone();
//! assert_eq!(
//!     tree.get_property(&root, "Port").unwrap().value(),
//!     Some(&AttributeValue::Int(80))
//! );
//!
//! let routes = tree.get(&root).unwrap().property("Route").unwrap().clone();
//! let route = tree.materialise_collection_item(&pattern, &routes).unwrap();
//! tree.set_property(&pattern, &route, "Path", "/health").unwrap();
//! assert_eq!(tree.path_of(&route), format!("{{Api.Route.{route}}}"));
//! ```

mod document;
mod materialise;
mod validate;

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{AutomateError, Result};
use crate::path;
use crate::types::{Attribute, Element, Pattern};
use crate::value::AttributeValue;
use crate::Id;

pub use document::DraftDocument;
pub use validate::DraftViolation;

/// What kind of schema node a draft item stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DraftItemKind {
    /// The draft root, mirroring the pattern; always materialised.
    Pattern,
    /// A singular element.
    Element,
    /// The container of a collection element; holds `items`, no properties.
    Collection,
    /// One entry of a collection.
    CollectionItem,
    Attribute,
}

impl DraftItemKind {
    /// Kinds that own named properties.
    pub fn has_properties(&self) -> bool {
        matches!(self, Self::Pattern | Self::Element | Self::CollectionItem)
    }
}

/// One node of a draft's instance tree.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftItem {
    pub(crate) id: Id,
    pub(crate) name: String,
    pub(crate) schema_id: Id,
    pub(crate) kind: DraftItemKind,
    pub(crate) value: Option<AttributeValue>,
    pub(crate) properties: IndexMap<String, Id>,
    pub(crate) items: Vec<Id>,
    pub(crate) is_materialised: bool,
    pub(crate) parent: Option<Id>,
}

impl DraftItem {
    fn new(name: &str, schema_id: &Id, kind: DraftItemKind, parent: Option<Id>) -> Self {
        Self {
            id: Id::generate(),
            name: name.to_string(),
            schema_id: schema_id.clone(),
            kind,
            value: None,
            properties: IndexMap::new(),
            items: Vec::new(),
            is_materialised: false,
            parent,
        }
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    /// Name of the schema node this item mirrors.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Id of the schema node this item mirrors.
    pub fn schema_id(&self) -> &Id {
        &self.schema_id
    }

    pub fn kind(&self) -> DraftItemKind {
        self.kind
    }

    pub fn value(&self) -> Option<&AttributeValue> {
        self.value.as_ref()
    }

    pub fn is_materialised(&self) -> bool {
        self.is_materialised
    }

    pub fn parent(&self) -> Option<&Id> {
        self.parent.as_ref()
    }

    /// Child item id by schema name.
    pub fn property(&self, name: &str) -> Option<&Id> {
        self.properties.get(name)
    }

    /// Child names in schema declaration order.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Collection entries in insertion order; empty for non-collections.
    pub fn items(&self) -> &[Id] {
        &self.items
    }
}

/// Arena-backed instance tree of one draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "DraftDocument", try_from = "DraftDocument")]
pub struct DraftTree {
    pub(crate) root: Id,
    pub(crate) nodes: HashMap<Id, DraftItem>,
}

impl DraftTree {
    /// Builds the tree for `pattern` with the root materialised.
    ///
    /// Root attributes take their defaults and auto-create elements are
    /// materialised recursively.
    ///
    /// # Errors
    ///
    /// Returns [`AutomateError::ValueCoercion`] if a default value does not
    /// parse as its attribute's data type.
    pub fn new(pattern: &Pattern) -> Result<Self> {
        let mut tree = Self {
            root: Id::from(""),
            nodes: HashMap::new(),
        };
        let root = tree.insert_element(&pattern.root, DraftItemKind::Pattern, None);
        tree.root = root.clone();
        if let Some(item) = tree.nodes.get_mut(&root) {
            item.is_materialised = true;
        }
        tree.materialise_children(pattern, &root)?;
        Ok(tree)
    }

    pub fn root_id(&self) -> &Id {
        &self.root
    }

    pub fn root(&self) -> &DraftItem {
        &self.nodes[&self.root]
    }

    pub fn get(&self, id: &Id) -> Option<&DraftItem> {
        self.nodes.get(id)
    }

    /// Like [`get`](Self::get) but fails with
    /// [`AutomateError::DraftItemNotFound`].
    pub fn item(&self, id: &Id) -> Result<&DraftItem> {
        self.nodes
            .get(id)
            .ok_or_else(|| AutomateError::DraftItemNotFound(id.clone()))
    }

    pub(crate) fn item_mut(&mut self, id: &Id) -> Result<&mut DraftItem> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| AutomateError::DraftItemNotFound(id.clone()))
    }

    pub fn contains(&self, id: &Id) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of items in the arena, materialised or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Direct property children of an item, in declaration order.
    pub fn children(&self, id: &Id) -> Vec<&DraftItem> {
        self.nodes
            .get(id)
            .map(|item| {
                item.properties
                    .values()
                    .filter_map(|child| self.nodes.get(child))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Entries of a collection, in insertion order.
    pub fn collection_items(&self, id: &Id) -> Vec<&DraftItem> {
        self.nodes
            .get(id)
            .map(|item| {
                item.items
                    .iter()
                    .filter_map(|entry| self.nodes.get(entry))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Parents of an item from the nearest up to the root.
    pub fn ancestors(&self, id: &Id) -> Vec<&DraftItem> {
        let mut ancestors = Vec::new();
        let mut current = self.nodes.get(id).and_then(|item| item.parent.as_ref());
        while let Some(parent_id) = current {
            match self.nodes.get(parent_id) {
                Some(parent) => {
                    ancestors.push(parent);
                    current = parent.parent.as_ref();
                }
                None => break,
            }
        }
        ancestors
    }

    /// Ids of the item and everything below it, parents first.
    pub fn descendants(&self, id: &Id) -> Vec<Id> {
        let mut found = Vec::new();
        let mut stack = vec![id.clone()];
        while let Some(current) = stack.pop() {
            if let Some(item) = self.nodes.get(&current) {
                let children = item.properties.values().chain(item.items.iter());
                let mut pending: Vec<Id> = children.cloned().collect();
                pending.reverse();
                stack.extend(pending);
                found.push(current);
            }
        }
        found
    }

    /// Fully qualified bracket expression of an item, with collection item
    /// ids in place of their names.
    pub fn path_of(&self, id: &Id) -> String {
        let mut segments = Vec::new();
        let mut current = self.nodes.get(id);
        while let Some(item) = current {
            match item.kind {
                DraftItemKind::CollectionItem => segments.push(item.id.as_str()),
                _ => segments.push(item.name.as_str()),
            }
            current = item.parent.as_ref().and_then(|parent| self.nodes.get(parent));
        }
        segments.reverse();
        format!("{{{}}}", segments.join("."))
    }

    /// Resolves a fully qualified expression from the root.
    ///
    /// # Errors
    ///
    /// Returns [`AutomateError::InvalidExpression`] only for malformed
    /// expressions; a path that matches nothing yields `Ok(None)`.
    pub fn resolve(&self, expression: &str) -> Result<Option<&DraftItem>> {
        path::resolve_draft(self, expression)
    }

    /// Resolves an expression relative to `from`, allowing `parent` steps.
    pub fn resolve_relative(&self, from: &Id, expression: &str) -> Result<Option<&DraftItem>> {
        path::resolve_relative(self, from, expression)
    }

    pub(crate) fn insert_element(
        &mut self,
        element: &Element,
        kind: DraftItemKind,
        parent: Option<Id>,
    ) -> Id {
        let mut item = DraftItem::new(&element.name, &element.id, kind, parent);
        let id = item.id.clone();
        if kind.has_properties() {
            for attribute in &element.attributes {
                let child = self.insert_attribute(attribute, Some(id.clone()));
                item.properties.insert(attribute.name.clone(), child);
            }
            for child_element in &element.elements {
                let child = self.insert_child_element(child_element, id.clone());
                item.properties.insert(child_element.name.clone(), child);
            }
        }
        self.nodes.insert(id.clone(), item);
        id
    }

    pub(crate) fn insert_child_element(&mut self, element: &Element, parent: Id) -> Id {
        let kind = if element.is_collection() {
            DraftItemKind::Collection
        } else {
            DraftItemKind::Element
        };
        self.insert_element(element, kind, Some(parent))
    }

    pub(crate) fn insert_attribute(&mut self, attribute: &Attribute, parent: Option<Id>) -> Id {
        let item = DraftItem::new(
            &attribute.name,
            &attribute.id,
            DraftItemKind::Attribute,
            parent,
        );
        let id = item.id.clone();
        self.nodes.insert(id.clone(), item);
        id
    }

    /// Drops an item and its descendants from the arena without detaching
    /// it from its parent.
    pub(crate) fn remove_subtree(&mut self, id: &Id) {
        for descendant in self.descendants(id) {
            self.nodes.remove(&descendant);
        }
    }
}
