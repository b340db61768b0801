//! Bracketed path expressions over schema and draft trees.
//!
//! An expression names a node by the dotted names from the tree root, for
//! example `{Api.Route.Path}`. Against a draft, a collection name may be
//! followed by one of its item ids to descend into that item:
//! `{Api.Route.5f1c....Path}`.
//!
//! Only malformed expressions are errors. A well-formed expression that
//! matches nothing resolves to `None`.
//!
//! # Examples
//!
//! ```
//! use automate_core::*;
//!
//! let mut pattern = Pattern::new("Api");
//! pattern.root.elements.push(
//!     Element::new("Auth").with_attribute(Attribute::new("Scheme", AttributeDataType::String)),
//! );
//!
//! let node = resolve_schema(&pattern, "{Api.Auth.Scheme}").unwrap().unwrap();
//! assert_eq!(node.name(), "Scheme");
//! assert!(resolve_schema(&pattern, "{Other.Auth}").unwrap().is_none());
//! assert!(resolve_schema(&pattern, "Api.Auth").is_err());
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::draft::{DraftItem, DraftItemKind, DraftTree};
use crate::error::{AutomateError, Result};
use crate::types::{Pattern, SchemaNode};
use crate::Id;

static EXPRESSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\{([^{}.\s]+(?:\.[^{}.\s]+)*)\}$").expect("path expression regex")
});

/// Pseudo-segment that steps to the referring item's parent.
pub const PARENT_SEGMENT: &str = "parent";

/// A parsed, well-formed path expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathExpression {
    segments: Vec<String>,
}

impl PathExpression {
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Appends a segment, for building child expressions.
    pub fn join(&self, segment: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Self { segments }
    }
}

impl FromStr for PathExpression {
    type Err = AutomateError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| AutomateError::InvalidExpression {
            expression: s.to_string(),
            reason: reason.to_string(),
        };
        if s.trim().is_empty() {
            return Err(invalid("expression is empty"));
        }
        if !(s.starts_with('{') && s.ends_with('}')) {
            return Err(invalid("expression must be wrapped in braces"));
        }
        let captures = EXPRESSION_RE
            .captures(s)
            .ok_or_else(|| invalid("segments must be non-empty names separated by '.'"))?;
        let segments = captures[1].split('.').map(str::to_string).collect();
        Ok(Self { segments })
    }
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.segments.join("."))
    }
}

/// Resolves a fully qualified expression against a pattern.
///
/// Returns `Ok(None)` when the first segment is not the pattern's name or
/// any later segment matches no child.
///
/// # Errors
///
/// Returns [`AutomateError::InvalidExpression`] for malformed expressions.
pub fn resolve_schema<'p>(pattern: &'p Pattern, expression: &str) -> Result<Option<SchemaNode<'p>>> {
    let expression: PathExpression = expression.parse()?;
    let (first, rest) = split_first(&expression);
    if first != pattern.name() {
        return Ok(None);
    }

    let mut current = SchemaNode::Element(&pattern.root);
    for segment in rest {
        let Some(element) = current.as_element() else {
            return Ok(None);
        };
        match element.child_by_name(segment) {
            Some(child) => current = child,
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}

/// Resolves a fully qualified expression against a draft, starting at its
/// root.
///
/// # Errors
///
/// Returns [`AutomateError::InvalidExpression`] for malformed expressions.
pub fn resolve_draft<'t>(tree: &'t DraftTree, expression: &str) -> Result<Option<&'t DraftItem>> {
    let expression: PathExpression = expression.parse()?;
    Ok(resolve_absolute(tree, &expression))
}

/// Resolves an expression relative to the item `from`.
///
/// Leading `parent` segments step upwards; a collection item's parent is the
/// owner of its collection. Other expressions are tried against `from`
/// first and then as fully qualified expressions from the root.
///
/// # Errors
///
/// Returns [`AutomateError::InvalidExpression`] for malformed expressions.
pub fn resolve_relative<'t>(
    tree: &'t DraftTree,
    from: &Id,
    expression: &str,
) -> Result<Option<&'t DraftItem>> {
    let expression: PathExpression = expression.parse()?;
    let Some(start) = tree.get(from) else {
        return Ok(None);
    };

    let segments = expression.segments();
    if segments[0] == PARENT_SEGMENT {
        return Ok(walk(tree, start, segments));
    }
    if let Some(found) = walk(tree, start, segments) {
        return Ok(Some(found));
    }
    Ok(resolve_absolute(tree, &expression))
}

fn resolve_absolute<'t>(tree: &'t DraftTree, expression: &PathExpression) -> Option<&'t DraftItem> {
    let (first, rest) = split_first(expression);
    let root = tree.root();
    if first != root.name() {
        return None;
    }
    walk(tree, root, rest)
}

fn walk<'t>(tree: &'t DraftTree, start: &'t DraftItem, segments: &[String]) -> Option<&'t DraftItem> {
    let mut current = start;
    for segment in segments {
        current = step(tree, current, segment)?;
    }
    Some(current)
}

fn step<'t>(tree: &'t DraftTree, current: &'t DraftItem, segment: &str) -> Option<&'t DraftItem> {
    if segment == PARENT_SEGMENT {
        return logical_parent(tree, current);
    }
    match current.kind() {
        DraftItemKind::Collection => current
            .items()
            .iter()
            .find(|entry| entry.as_str() == segment)
            .and_then(|entry| tree.get(entry)),
        DraftItemKind::Attribute => None,
        _ => current.property(segment).and_then(|child| tree.get(child)),
    }
}

fn logical_parent<'t>(tree: &'t DraftTree, item: &'t DraftItem) -> Option<&'t DraftItem> {
    let parent = tree.get(item.parent()?)?;
    if item.kind() == DraftItemKind::CollectionItem {
        return tree.get(parent.parent()?);
    }
    Some(parent)
}

fn split_first(expression: &PathExpression) -> (&str, &[String]) {
    match expression.segments().split_first() {
        Some((first, rest)) => (first.as_str(), rest),
        None => ("", Default::default()),
    }
}
