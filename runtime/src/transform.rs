//! Placeholder rendering against draft items.
//!
//! Templates contain `{{ expression }}` placeholders where the expression is
//! a dotted path without the surrounding braces, for example
//! `{{ parent.Name }}`. Each expression is resolved relative to the item the
//! template is rendered for, falling back to a fully qualified lookup from
//! the draft root.

use std::sync::LazyLock;

use automate_core::{AutomateError, DraftItem, DraftItemKind, DraftTree, Id, resolve_relative};
use regex::Regex;

use crate::error::{Result, RuntimeError};

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(.*?)\}\}").expect("placeholder regex"));

const OPENER: &str = "{{";
const CLOSER: &str = "}}";

/// Renders template text for one draft item.
pub trait TextTransformer {
    /// Renders `template` for the item `item` of `tree`.
    ///
    /// `description` names the template in error messages.
    fn transform(&self, description: &str, template: &str, tree: &DraftTree, item: &Id) -> Result<String>;
}

/// The built-in transformer.
///
/// Attributes render their value (absent values render empty), and
/// collection items render their id.
///
/// # Examples
///
/// ```
/// use automate_core::*;
/// use automate_runtime::{SimpleTransformer, TextTransformer};
///
/// let mut pattern = Pattern::new("Api");
/// pattern.root.attributes.push(Attribute::new("Title", AttributeDataType::String).with_default("orders"));
/// let tree = DraftTree::new(&pattern).unwrap();
///
/// let text = SimpleTransformer
///     .transform("readme", "# {{ Title }}", &tree, tree.root_id())
///     .unwrap();
/// assert_eq!(text, "# orders");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleTransformer;

impl TextTransformer for SimpleTransformer {
    fn transform(&self, description: &str, template: &str, tree: &DraftTree, item: &Id) -> Result<String> {
        let mut rendered = String::with_capacity(template.len());
        let mut cursor = 0;

        for placeholder in PLACEHOLDER_RE.find_iter(template) {
            let literal = &template[cursor..placeholder.start()];
            check_unterminated(description, template, cursor, literal)?;
            rendered.push_str(literal);

            let (line, column) = location(template, placeholder.start());
            let text = placeholder.as_str();
            let inner = text[OPENER.len()..text.len() - CLOSER.len()].trim();
            if inner.is_empty() {
                return Err(RuntimeError::Syntax {
                    description: description.to_string(),
                    line,
                    column,
                    message: "empty placeholder".into(),
                });
            }

            let expression = format!("{{{inner}}}");
            let resolved = match resolve_relative(tree, item, &expression) {
                Ok(resolved) => resolved,
                Err(AutomateError::InvalidExpression { reason, .. }) => {
                    return Err(RuntimeError::Syntax {
                        description: description.to_string(),
                        line,
                        column,
                        message: format!("'{inner}' {reason}"),
                    });
                }
                Err(err) => return Err(err.into()),
            };
            let Some(target) = resolved else {
                return Err(RuntimeError::Transform {
                    description: description.to_string(),
                    line,
                    column,
                    message: format!("'{inner}' does not resolve to a draft item"),
                });
            };
            rendered.push_str(&render(target).map_err(|message| RuntimeError::Transform {
                description: description.to_string(),
                line,
                column,
                message: format!("'{inner}' {message}"),
            })?);
            cursor = placeholder.end();
        }

        let tail = &template[cursor..];
        check_unterminated(description, template, cursor, tail)?;
        rendered.push_str(tail);
        Ok(rendered)
    }
}

fn render(item: &DraftItem) -> std::result::Result<String, String> {
    match item.kind() {
        DraftItemKind::Attribute => Ok(item.value().map(ToString::to_string).unwrap_or_default()),
        DraftItemKind::CollectionItem => Ok(item.id().to_string()),
        _ => Err(format!("refers to '{}' which is not an attribute", item.name())),
    }
}

fn check_unterminated(description: &str, template: &str, offset: usize, literal: &str) -> Result<()> {
    match literal.find(OPENER) {
        Some(index) => {
            let (line, column) = location(template, offset + index);
            Err(RuntimeError::Syntax {
                description: description.to_string(),
                line,
                column,
                message: "unterminated placeholder".into(),
            })
        }
        None => Ok(()),
    }
}

/// One-based line and column of the byte `offset`.
fn location(text: &str, offset: usize) -> (usize, usize) {
    let before = &text[..offset];
    let line = before.matches('\n').count() + 1;
    let column = before.rsplit('\n').next().map_or(0, |tail| tail.chars().count()) + 1;
    (line, column)
}
