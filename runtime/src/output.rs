//! Output formatting for patterns, drafts and automation results.

use automate_core::{
    Attribute, Automation, AutomationKind, CommandExecutionResult, CommandOutcome, DraftDefinition,
    DraftItem, DraftItemKind, DraftTree, Element, MigrationResult, Pattern,
};
use serde::Serialize;

use crate::error::{Result, RuntimeError};

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Markdown,
}

/// Formats a pattern in the requested output format.
pub fn format_pattern(pattern: &Pattern, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Markdown => Ok(pattern_to_markdown(pattern)),
        _ => serialize(pattern, format),
    }
}

/// Formats a draft in the requested output format.
pub fn format_draft(draft: &DraftDefinition, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Markdown => Ok(draft_to_markdown(draft)),
        _ => serialize(draft, format),
    }
}

/// Formats an upgrade result in the requested output format.
pub fn format_migration(result: &MigrationResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Markdown => Ok(migration_to_markdown(result)),
        _ => serialize(result, format),
    }
}

/// Formats a launch point execution log in the requested output format.
pub fn format_execution(result: &CommandExecutionResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Markdown => Ok(execution_to_markdown(result)),
        _ => serialize(result, format),
    }
}

fn serialize<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Yaml => serde_yaml::to_string(value)
            .map_err(|e| RuntimeError::Serialization(format!("YAML serialization failed: {e}"))),
        _ => serde_json::to_string_pretty(value)
            .map_err(|e| RuntimeError::Serialization(format!("JSON serialization failed: {e}"))),
    }
}

fn pattern_to_markdown(pattern: &Pattern) -> String {
    let mut out = String::new();

    out.push_str(&format!("# {}\n\n", pattern.name()));
    out.push_str(&format!("**Version:** {}\n\n", pattern.toolkit_version));
    if let Some(ref desc) = pattern.root.description {
        out.push_str(&format!("{desc}\n\n"));
    }

    out.push_str("## Structure\n\n");
    element_to_markdown(pattern, &pattern.root, 0, &mut out);
    out.push('\n');

    let mut templates = Vec::new();
    pattern
        .root
        .walk(&mut |element| templates.extend(element.code_templates.iter()));
    if !templates.is_empty() {
        out.push_str("## Code Templates\n\n");
        out.push_str("| Template | Source |\n");
        out.push_str("|----------|--------|\n");
        for template in templates {
            out.push_str(&format!(
                "| `{}` | {} |\n",
                template.name, template.original_file_path
            ));
        }
        out.push('\n');
    }

    out
}

fn element_to_markdown(pattern: &Pattern, element: &Element, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let mut flags = vec![format!("{:?}", element.cardinality)];
    if element.auto_create {
        flags.push("auto-created".into());
    }
    out.push_str(&format!("{indent}- **{}** ({})\n", element.name, flags.join(", ")));

    let inner = "  ".repeat(depth + 1);
    for attribute in &element.attributes {
        out.push_str(&format!("{inner}- {}\n", attribute_summary(attribute)));
    }
    for automation in &element.automation {
        out.push_str(&format!("{inner}- {}\n", automation_summary(automation, pattern)));
    }
    for child in &element.elements {
        element_to_markdown(pattern, child, depth + 1, out);
    }
}

fn attribute_summary(attribute: &Attribute) -> String {
    let mut text = format!("`{}`: {}", attribute.name, attribute.data_type);
    if attribute.is_required {
        text.push_str(", required");
    }
    if let Some(ref default) = attribute.default_value {
        text.push_str(&format!(", default `{default}`"));
    }
    if !attribute.choices.is_empty() {
        text.push_str(&format!(", one of {}", attribute.choices.join(" | ")));
    }
    text
}

/// Commands and templates are looked up pattern-wide, since a launch point
/// may reference automation declared on any element.
fn automation_summary(automation: &Automation, pattern: &Pattern) -> String {
    match &automation.kind {
        AutomationKind::CodeTemplateCommand(command) => {
            let template = pattern
                .find_code_template(&command.code_template_id)
                .map_or(command.code_template_id.as_str(), |t| t.name.as_str());
            let once = if command.is_one_off { ", one-off" } else { "" };
            format!(
                "_template_ `{}`: `{template}` to `{}`{once}",
                automation.name, command.file_path
            )
        }
        AutomationKind::CliCommand(command) => match command.arguments {
            Some(ref args) => format!(
                "_cli_ `{}`: `{} {args}`",
                automation.name, command.application_name
            ),
            None => format!("_cli_ `{}`: `{}`", automation.name, command.application_name),
        },
        AutomationKind::CommandLaunchPoint(launch) => {
            let names: Vec<String> = launch
                .command_ids()
                .iter()
                .map(|id| {
                    pattern
                        .find_automation(id)
                        .map_or_else(|| id.to_string(), |command| command.name.clone())
                })
                .collect();
            format!("_launch point_ `{}`: {}", automation.name, names.join(", "))
        }
    }
}

fn draft_to_markdown(draft: &DraftDefinition) -> String {
    let mut out = String::new();

    out.push_str(&format!("# {}\n\n", draft.name));
    out.push_str(&format!(
        "**Toolkit:** {} {}\n\n",
        draft.toolkit.name(),
        draft.version()
    ));
    item_to_markdown(&draft.tree, draft.tree.root(), 0, &mut out);
    out
}

fn item_to_markdown(tree: &DraftTree, item: &DraftItem, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    match item.kind() {
        DraftItemKind::Attribute => match item.value() {
            Some(value) => out.push_str(&format!("{indent}- {} = `{value}`\n", item.name())),
            None => out.push_str(&format!("{indent}- {} (no value)\n", item.name())),
        },
        DraftItemKind::Collection => {
            let entries = tree.collection_items(item.id());
            out.push_str(&format!("{indent}- **{}** [{}]\n", item.name(), entries.len()));
            for entry in entries {
                item_to_markdown(tree, entry, depth + 1, out);
            }
        }
        DraftItemKind::CollectionItem => {
            out.push_str(&format!("{indent}- `{}`\n", item.id()));
            for child in tree.children(item.id()) {
                item_to_markdown(tree, child, depth + 1, out);
            }
        }
        DraftItemKind::Pattern | DraftItemKind::Element => {
            if !item.is_materialised() {
                out.push_str(&format!("{indent}- **{}** (not materialised)\n", item.name()));
                return;
            }
            out.push_str(&format!("{indent}- **{}**\n", item.name()));
            for child in tree.children(item.id()) {
                item_to_markdown(tree, child, depth + 1, out);
            }
        }
    }
}

fn migration_to_markdown(result: &MigrationResult) -> String {
    let mut out = String::new();

    let status = if result.is_success() { "succeeded" } else { "failed" };
    out.push_str(&format!("# Upgrade {status}\n\n"));
    if !result.changes().is_empty() {
        out.push_str("| Kind | Change |\n");
        out.push_str("|------|--------|\n");
        for change in result.changes() {
            out.push_str(&format!("| {:?} | {change} |\n", change.kind));
        }
        out.push('\n');
    }

    out
}

fn execution_to_markdown(result: &CommandExecutionResult) -> String {
    let mut out = String::new();

    out.push_str(&format!("# {}\n\n", result.launch_point));
    if result.entries.is_empty() {
        out.push_str("No materialised owners.\n");
        return out;
    }
    out.push_str("| Command | Target | Outcome | Message |\n");
    out.push_str("|---------|--------|---------|---------|\n");
    for entry in &result.entries {
        let outcome = match entry.outcome {
            CommandOutcome::Succeeded => "ok",
            CommandOutcome::Failed => "failed",
        };
        let message = entry.message.replace('\n', "<br>");
        out.push_str(&format!(
            "| `{}` | `{}` | {outcome} | {message} |\n",
            entry.command_name, entry.target
        ));
    }

    out
}
