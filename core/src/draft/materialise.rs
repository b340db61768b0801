//! Materialisation state transitions and property access.

use tracing::debug;

use super::{DraftItem, DraftItemKind, DraftTree};
use crate::error::{AutomateError, Result};
use crate::types::{Attribute, Element, Pattern};
use crate::value::AttributeValue;
use crate::Id;

impl DraftTree {
    /// Materialises an element, collection or attribute.
    ///
    /// Elements take every attribute default and recursively materialise
    /// their auto-create children; materialising an element twice is a
    /// no-op. Collections are marked as present without gaining items.
    /// Attributes take their schema default (see
    /// [`materialise_attribute`](Self::materialise_attribute)).
    ///
    /// # Errors
    ///
    /// Returns [`AutomateError::AlreadyMaterialised`] for the draft root,
    /// which is always materialised.
    pub fn materialise(&mut self, pattern: &Pattern, id: &Id) -> Result<()> {
        let (kind, materialised) = {
            let item = self.item(id)?;
            (item.kind, item.is_materialised)
        };
        match kind {
            DraftItemKind::Pattern => Err(AutomateError::AlreadyMaterialised {
                path: self.path_of(id),
            }),
            DraftItemKind::Attribute => self.materialise_attribute(pattern, id, None),
            DraftItemKind::Collection => {
                self.item_mut(id)?.is_materialised = true;
                Ok(())
            }
            DraftItemKind::Element | DraftItemKind::CollectionItem => {
                if materialised {
                    return Ok(());
                }
                self.item_mut(id)?.is_materialised = true;
                self.materialise_children(pattern, id)
            }
        }
    }

    /// Materialises an attribute with `value`, or with its schema default
    /// when `value` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`AutomateError::NotMaterialised`] when the owning element is
    /// not materialised, [`AutomateError::ValueCoercion`] when the text does
    /// not parse as the attribute's data type, and
    /// [`AutomateError::InvalidChoice`] when an explicit value is not one of
    /// the attribute's choices.
    pub fn materialise_attribute(
        &mut self,
        pattern: &Pattern,
        id: &Id,
        value: Option<&str>,
    ) -> Result<()> {
        let item = self.item(id)?;
        if item.kind != DraftItemKind::Attribute {
            return Err(AutomateError::NotAnAttribute {
                name: item.name.clone(),
                path: self.path_of(id),
            });
        }
        let owner_materialised = item
            .parent
            .as_ref()
            .and_then(|parent| self.nodes.get(parent))
            .is_some_and(|owner| owner.is_materialised);
        if !owner_materialised {
            let owner = item.parent.clone().unwrap_or_else(|| id.clone());
            return Err(AutomateError::NotMaterialised {
                path: self.path_of(&owner),
            });
        }

        let attribute = schema_attribute(pattern, &item.schema_id)?;
        let coerced = match value {
            Some(raw) => Some(coerce_choice(attribute, raw)?),
            None => default_value(attribute)?,
        };

        let item = self.item_mut(id)?;
        item.value = coerced;
        item.is_materialised = true;
        Ok(())
    }

    /// Appends a new, fully materialised entry to a collection.
    ///
    /// # Errors
    ///
    /// Returns [`AutomateError::NotACollection`] when `id` is not a
    /// collection container.
    pub fn materialise_collection_item(&mut self, pattern: &Pattern, id: &Id) -> Result<Id> {
        let collection = self.item(id)?;
        if collection.kind != DraftItemKind::Collection {
            return Err(AutomateError::NotACollection {
                path: self.path_of(id),
            });
        }
        let element = schema_element(pattern, &collection.schema_id)?;

        let entry = self.insert_element(element, DraftItemKind::CollectionItem, Some(id.clone()));
        self.item_mut(&entry)?.is_materialised = true;
        self.materialise_children(pattern, &entry)?;

        let collection = self.item_mut(id)?;
        collection.is_materialised = true;
        collection.items.push(entry.clone());
        debug!(collection = %id, item = %entry, "Materialised collection item");
        Ok(entry)
    }

    /// Reverts an element, collection or collection item to its
    /// un-materialised state.
    ///
    /// Elements clear every descendant, collections drop all their items,
    /// and a collection item removes itself from its collection.
    ///
    /// # Errors
    ///
    /// Returns [`AutomateError::CannotUnMaterialise`] for attributes and the
    /// draft root.
    pub fn unmaterialise(&mut self, id: &Id) -> Result<()> {
        let item = self.item(id)?;
        match item.kind {
            DraftItemKind::Pattern | DraftItemKind::Attribute => {
                Err(AutomateError::CannotUnMaterialise {
                    path: self.path_of(id),
                })
            }
            DraftItemKind::Element => {
                self.reset(id);
                Ok(())
            }
            DraftItemKind::Collection => {
                self.clear_collection(id);
                Ok(())
            }
            DraftItemKind::CollectionItem => {
                let parent = item.parent.clone();
                self.remove_subtree(id);
                if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
                    parent.items.retain(|entry| entry != id);
                }
                Ok(())
            }
        }
    }

    /// Returns the attribute item named `name` on a materialised owner.
    ///
    /// # Errors
    ///
    /// Returns [`AutomateError::NotMaterialised`] when the owner is not
    /// materialised, [`AutomateError::PropertyNotFound`] for unknown names and
    /// [`AutomateError::NotAnAttribute`] when the name is an element.
    pub fn get_property(&self, owner: &Id, name: &str) -> Result<&DraftItem> {
        let owner_item = self.item(owner)?;
        if !owner_item.is_materialised {
            return Err(AutomateError::NotMaterialised {
                path: self.path_of(owner),
            });
        }
        let child = owner_item
            .properties
            .get(name)
            .and_then(|child| self.nodes.get(child))
            .ok_or_else(|| AutomateError::PropertyNotFound {
                name: name.to_string(),
                path: self.path_of(owner),
            })?;
        if child.kind != DraftItemKind::Attribute {
            return Err(AutomateError::NotAnAttribute {
                name: name.to_string(),
                path: self.path_of(owner),
            });
        }
        Ok(child)
    }

    /// Sets an attribute of a materialised owner from raw text.
    ///
    /// # Errors
    ///
    /// Fails like [`get_property`](Self::get_property), and with
    /// [`AutomateError::ValueCoercion`] or [`AutomateError::InvalidChoice`]
    /// when the text is not acceptable for the attribute.
    pub fn set_property(
        &mut self,
        pattern: &Pattern,
        owner: &Id,
        name: &str,
        raw: &str,
    ) -> Result<()> {
        let child = self.get_property(owner, name)?.id.clone();
        self.materialise_attribute(pattern, &child, Some(raw))
    }

    /// Materialises every attribute of an element-like item and every
    /// auto-create child element or collection.
    pub(crate) fn materialise_children(&mut self, pattern: &Pattern, id: &Id) -> Result<()> {
        let children: Vec<Id> = self.item(id)?.properties.values().cloned().collect();
        for child in children {
            let item = self.item(&child)?;
            match item.kind {
                DraftItemKind::Attribute => {
                    if !item.is_materialised {
                        self.materialise_attribute(pattern, &child, None)?;
                    }
                }
                DraftItemKind::Element | DraftItemKind::Collection => {
                    let element = schema_element(pattern, &item.schema_id)?;
                    if element.auto_create {
                        self.materialise(pattern, &child)?;
                    }
                }
                DraftItemKind::Pattern | DraftItemKind::CollectionItem => {}
            }
        }
        Ok(())
    }

    fn reset(&mut self, id: &Id) {
        let Some(item) = self.nodes.get_mut(id) else {
            return;
        };
        item.is_materialised = false;
        item.value = None;
        let children: Vec<Id> = item.properties.values().cloned().collect();
        for child in children {
            match self.nodes.get(&child).map(|c| c.kind) {
                Some(DraftItemKind::Collection) => self.clear_collection(&child),
                Some(_) => self.reset(&child),
                None => {}
            }
        }
    }

    fn clear_collection(&mut self, id: &Id) {
        let entries = match self.nodes.get_mut(id) {
            Some(collection) => {
                collection.is_materialised = false;
                std::mem::take(&mut collection.items)
            }
            None => return,
        };
        for entry in entries {
            self.remove_subtree(&entry);
        }
    }
}

pub(crate) fn schema_element<'p>(pattern: &'p Pattern, id: &Id) -> Result<&'p Element> {
    pattern
        .find_element(id)
        .ok_or_else(|| AutomateError::SchemaNotFound(id.clone()))
}

pub(crate) fn schema_attribute<'p>(pattern: &'p Pattern, id: &Id) -> Result<&'p Attribute> {
    pattern
        .find_attribute(id)
        .ok_or_else(|| AutomateError::SchemaNotFound(id.clone()))
}

/// Parses the attribute's default, if it has one.
pub(crate) fn default_value(attribute: &Attribute) -> Result<Option<AttributeValue>> {
    attribute
        .default_value
        .as_deref()
        .map(|raw| attribute.data_type.parse(raw))
        .transpose()
}

fn coerce_choice(attribute: &Attribute, raw: &str) -> Result<AttributeValue> {
    let value = attribute.data_type.parse(raw)?;
    if !attribute.choices.is_empty() && !value.is_one_of(&attribute.choices) {
        return Err(AutomateError::InvalidChoice {
            value: raw.to_string(),
            choices: attribute.choices.join(", "),
        });
    }
    Ok(value)
}
