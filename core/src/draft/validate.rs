use thiserror::Error;

use super::materialise::{schema_attribute, schema_element};
use super::{DraftItemKind, DraftTree};
use crate::error::Result;
use crate::types::{Cardinality, Pattern};
use crate::Id;

/// A problem found in the materialised state of a draft.
///
/// `path` is the fully qualified bracket expression of the offending item.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftViolation {
    #[error("attribute '{name}' at {path} is required but has no value")]
    RequiredAttributeMissing { name: String, path: String },

    #[error("element '{name}' at {path} is required but has not been materialised")]
    ElementRequired { name: String, path: String },

    #[error("collection '{name}' at {path} requires at least one item")]
    CollectionRequiresItem { name: String, path: String },

    #[error("attribute '{name}' at {path} does not hold a value of type '{data_type}'")]
    WrongDataType {
        name: String,
        path: String,
        data_type: String,
    },

    #[error("attribute '{name}' at {path} holds '{value}' which is not one of its choices")]
    InvalidChoice {
        name: String,
        path: String,
        value: String,
    },
}

impl DraftViolation {
    pub fn path(&self) -> &str {
        match self {
            Self::RequiredAttributeMissing { path, .. }
            | Self::ElementRequired { path, .. }
            | Self::CollectionRequiresItem { path, .. }
            | Self::WrongDataType { path, .. }
            | Self::InvalidChoice { path, .. } => path,
        }
    }
}

impl DraftTree {
    /// Checks materialised items against the schema's requirements.
    ///
    /// Only materialised owners are inspected; optional elements and
    /// collections may be absent or empty.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AutomateError::SchemaNotFound`] when the tree refers
    /// to a schema node that `pattern` does not declare.
    pub fn validate(&self, pattern: &Pattern) -> Result<Vec<DraftViolation>> {
        let mut violations = Vec::new();
        self.validate_owner(pattern, &self.root, &mut violations)?;
        Ok(violations)
    }

    fn validate_owner(
        &self,
        pattern: &Pattern,
        owner: &Id,
        violations: &mut Vec<DraftViolation>,
    ) -> Result<()> {
        let owner = self.item(owner)?;
        if !owner.is_materialised {
            return Ok(());
        }

        for child_id in owner.properties.values() {
            let child = self.item(child_id)?;
            let path = || self.path_of(child_id);
            match child.kind {
                DraftItemKind::Attribute => {
                    let attribute = schema_attribute(pattern, &child.schema_id)?;
                    match &child.value {
                        None if attribute.is_required => {
                            violations.push(DraftViolation::RequiredAttributeMissing {
                                name: child.name.clone(),
                                path: path(),
                            });
                        }
                        None => {}
                        Some(value) if value.data_type() != attribute.data_type => {
                            violations.push(DraftViolation::WrongDataType {
                                name: child.name.clone(),
                                path: path(),
                                data_type: attribute.data_type.to_string(),
                            });
                        }
                        Some(value)
                            if !attribute.choices.is_empty()
                                && !value.is_one_of(&attribute.choices) =>
                        {
                            violations.push(DraftViolation::InvalidChoice {
                                name: child.name.clone(),
                                path: path(),
                                value: value.to_string(),
                            });
                        }
                        Some(_) => {}
                    }
                }
                DraftItemKind::Element => {
                    let element = schema_element(pattern, &child.schema_id)?;
                    if child.is_materialised {
                        self.validate_owner(pattern, child_id, violations)?;
                    } else if element.cardinality == Cardinality::One {
                        violations.push(DraftViolation::ElementRequired {
                            name: child.name.clone(),
                            path: path(),
                        });
                    }
                }
                DraftItemKind::Collection => {
                    let element = schema_element(pattern, &child.schema_id)?;
                    if child.items.is_empty() && element.cardinality.requires_instance() {
                        violations.push(DraftViolation::CollectionRequiresItem {
                            name: child.name.clone(),
                            path: path(),
                        });
                    }
                    for entry in &child.items {
                        self.validate_owner(pattern, entry, violations)?;
                    }
                }
                DraftItemKind::Pattern | DraftItemKind::CollectionItem => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Attribute, AttributeDataType, Element};

    use super::*;

    fn pattern(routes: Cardinality) -> Pattern {
        let mut pattern = Pattern::new("Api");
        pattern.root = pattern
            .root
            .with_attribute(Attribute::new("Title", AttributeDataType::String).required())
            .with_element(
                Element::new("Route")
                    .with_cardinality(routes)
                    .with_attribute(Attribute::new("Path", AttributeDataType::String).required()),
            );
        pattern
    }

    #[test]
    fn test_required_attribute_reports_name_and_path() {
        let pattern = pattern(Cardinality::ZeroOrMany);
        let tree = DraftTree::new(&pattern).unwrap();

        let violations = tree.validate(&pattern).unwrap();

        assert_eq!(
            violations,
            vec![DraftViolation::RequiredAttributeMissing {
                name: "Title".into(),
                path: "{Api.Title}".into(),
            }]
        );
    }

    #[test]
    fn test_optional_collection_may_be_empty() {
        let pattern = pattern(Cardinality::ZeroOrMany);
        let mut tree = DraftTree::new(&pattern).unwrap();
        let root = tree.root_id().clone();
        tree.set_property(&pattern, &root, "Title", "x").unwrap();

        assert!(tree.validate(&pattern).unwrap().is_empty());
    }

    #[test]
    fn test_one_or_many_collection_requires_item() {
        let pattern = pattern(Cardinality::OneOrMany);
        let mut tree = DraftTree::new(&pattern).unwrap();
        let root = tree.root_id().clone();
        tree.set_property(&pattern, &root, "Title", "x").unwrap();

        let violations = tree.validate(&pattern).unwrap();
        assert!(matches!(
            violations.as_slice(),
            [DraftViolation::CollectionRequiresItem { path, .. }] if path == "{Api.Route}"
        ));
    }

    #[test]
    fn test_collection_items_report_their_own_path() {
        let pattern = pattern(Cardinality::OneOrMany);
        let mut tree = DraftTree::new(&pattern).unwrap();
        let root = tree.root_id().clone();
        tree.set_property(&pattern, &root, "Title", "x").unwrap();
        let routes = tree.root().property("Route").unwrap().clone();
        let route = tree.materialise_collection_item(&pattern, &routes).unwrap();

        let violations = tree.validate(&pattern).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path(), format!("{{Api.Route.{route}.Path}}"));
    }

    #[test]
    fn test_unmaterialised_singular_element_is_required() {
        let mut pattern = Pattern::new("Api");
        pattern.root.elements.push(Element::new("Auth"));
        let tree = DraftTree::new(&pattern).unwrap();

        let violations = tree.validate(&pattern).unwrap();
        assert!(matches!(
            violations.as_slice(),
            [DraftViolation::ElementRequired { name, .. }] if name == "Auth"
        ));
    }
}
