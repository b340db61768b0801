use std::collections::HashMap;

use crate::types::{Attribute, Element, Pattern, SchemaNode};
use crate::Id;

#[derive(Debug, Clone, Copy)]
struct Entry<'a> {
    node: SchemaNode<'a>,
    parent: Option<&'a Id>,
}

/// Id-keyed lookup over every node of one pattern snapshot.
///
/// Migration builds one index per snapshot and matches nodes by id, never by
/// structural position.
#[derive(Debug, Clone)]
pub struct SchemaIndex<'a> {
    entries: HashMap<&'a Id, Entry<'a>>,
}

impl<'a> SchemaIndex<'a> {
    pub fn new(pattern: &'a Pattern) -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            &pattern.root.id,
            Entry {
                node: SchemaNode::Element(&pattern.root),
                parent: None,
            },
        );
        pattern.root.walk(&mut |element: &'a Element| {
            let parent = Some(&element.id);
            for attribute in &element.attributes {
                entries.insert(
                    &attribute.id,
                    Entry {
                        node: SchemaNode::Attribute(attribute),
                        parent,
                    },
                );
            }
            for child in &element.elements {
                entries.insert(
                    &child.id,
                    Entry {
                        node: SchemaNode::Element(child),
                        parent,
                    },
                );
            }
            for automation in &element.automation {
                entries.insert(
                    &automation.id,
                    Entry {
                        node: SchemaNode::Automation(automation),
                        parent,
                    },
                );
            }
        });
        Self { entries }
    }

    pub fn get(&self, id: &Id) -> Option<SchemaNode<'a>> {
        self.entries.get(id).map(|entry| entry.node)
    }

    pub fn element(&self, id: &Id) -> Option<&'a Element> {
        self.get(id).and_then(|node| node.as_element())
    }

    pub fn attribute(&self, id: &Id) -> Option<&'a Attribute> {
        self.get(id).and_then(|node| node.as_attribute())
    }

    /// Id of the element that declares the node; `None` for the root.
    pub fn parent_of(&self, id: &Id) -> Option<&'a Id> {
        self.entries.get(id).and_then(|entry| entry.parent)
    }

    pub fn contains(&self, id: &Id) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::{Attribute, AttributeDataType, Automation};

    use super::*;

    #[test]
    fn test_index_records_parents() {
        let mut pattern = Pattern::new("Api");
        let route = Element::new("Route")
            .with_attribute(Attribute::new("Path", AttributeDataType::String))
            .with_automation(Automation::cli_command("Ping", "curl", None));
        let route_id = route.id.clone();
        let path_id = route.attributes[0].id.clone();
        pattern.root.elements.push(route);

        let index = SchemaIndex::new(&pattern);

        assert_eq!(index.len(), 4);
        assert_eq!(index.parent_of(&path_id), Some(&route_id));
        assert_eq!(index.parent_of(&route_id), Some(pattern.id()));
        assert_eq!(index.parent_of(pattern.id()), None);
        assert!(index.attribute(&path_id).is_some());
        assert!(index.element(&path_id).is_none());
    }
}
