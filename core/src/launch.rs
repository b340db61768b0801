//! Launch point execution over materialised draft items.
//!
//! A launch point runs its commands once per materialised owner: the draft
//! items that mirror the element declaring the launch point. On a collection
//! element every materialised item is an owner and fans out independently.
//!
//! Commands are interpreted by a [`CommandExecutor`]; the core only decides
//! which command runs against which item and records the outcome. Once
//! execution has started, failures are logged and execution continues.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::draft::{DraftItem, DraftItemKind, DraftTree};
use crate::error::{AutomateError, Result};
use crate::index::SchemaIndex;
use crate::toolkit::ToolkitDefinition;
use crate::types::Automation;
use crate::Id;

/// Everything a command needs to run against one owner.
#[derive(Debug, Clone, Copy)]
pub struct CommandContext<'a> {
    pub toolkit: &'a ToolkitDefinition,
    pub tree: &'a DraftTree,
    /// The owner the command runs against.
    pub target: &'a DraftItem,
    pub command: &'a Automation,
}

/// Runs one command against one owner.
///
/// Implemented for closures, so tests and hosts can pass a plain function.
pub trait CommandExecutor {
    type Error: fmt::Display;

    /// Returns output lines on success.
    fn execute(&mut self, context: &CommandContext<'_>) -> std::result::Result<Vec<String>, Self::Error>;
}

impl<F, E> CommandExecutor for F
where
    F: FnMut(&CommandContext<'_>) -> std::result::Result<Vec<String>, E>,
    E: fmt::Display,
{
    type Error = E;

    fn execute(&mut self, context: &CommandContext<'_>) -> std::result::Result<Vec<String>, E> {
        self(context)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandOutcome {
    Succeeded,
    Failed,
}

/// Outcome of one command against one owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CommandLogEntry {
    pub outcome: CommandOutcome,
    pub command_id: Id,
    pub command_name: String,
    /// Path of the owner the command ran against.
    pub target: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

/// Log of one launch point execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CommandExecutionResult {
    pub launch_point: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<CommandLogEntry>,
}

impl CommandExecutionResult {
    /// `true` when every recorded command succeeded.
    pub fn is_success(&self) -> bool {
        self.entries
            .iter()
            .all(|entry| entry.outcome == CommandOutcome::Succeeded)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CommandLogEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.outcome == CommandOutcome::Failed)
    }
}

/// Executes a launch point against every materialised owner at or below
/// `context`.
///
/// When `context` lies inside an owner (for example an attribute of it), the
/// nearest enclosing owner is used instead.
///
/// # Errors
///
/// Returns [`AutomateError::SchemaNotFound`] or
/// [`AutomateError::NotALaunchPoint`] for a bad launch point id,
/// [`AutomateError::CommandNotFound`] if any referenced command is missing
/// from the pattern (before anything runs), and
/// [`AutomateError::DraftItemNotFound`] for an unknown context.
///
/// # Examples
///
/// ```
/// use automate_core::*;
///
/// let mut pattern = Pattern::new("Api");
/// let build = Automation::cli_command("Build", "cargo", Some("build"));
/// let go = Automation::launch_point("Go", vec![build.id.clone()]);
/// let go_id = go.id.clone();
/// pattern.root.automation.extend([build, go]);
///
/// let toolkit = package(&mut pattern, Vec::new(), VersionInstruction::Auto).unwrap();
/// let tree = DraftTree::new(&toolkit.pattern).unwrap();
///
/// let mut runs = 0;
/// let mut executor = |_: &CommandContext<'_>| -> std::result::Result<Vec<String>, String> {
///     runs += 1;
///     Ok(vec![])
/// };
/// let result = execute_launch_point(&toolkit, &tree, &go_id, tree.root_id(), &mut executor).unwrap();
///
/// assert!(result.is_success());
/// assert_eq!(runs, 1);
/// ```
pub fn execute_launch_point<E: CommandExecutor>(
    toolkit: &ToolkitDefinition,
    tree: &DraftTree,
    launch_point_id: &Id,
    context: &Id,
    executor: &mut E,
) -> Result<CommandExecutionResult> {
    let pattern = &toolkit.pattern;
    let automation = pattern
        .find_automation(launch_point_id)
        .ok_or_else(|| AutomateError::SchemaNotFound(launch_point_id.clone()))?;
    let launch_point = automation
        .as_launch_point()
        .ok_or_else(|| AutomateError::NotALaunchPoint(automation.name.clone()))?;

    let commands = launch_point
        .command_ids()
        .iter()
        .map(|id| {
            pattern
                .find_automation(id)
                .ok_or_else(|| AutomateError::CommandNotFound(id.clone()))
        })
        .collect::<Result<Vec<_>>>()?;

    let index = SchemaIndex::new(pattern);
    let owner_schema = index
        .parent_of(launch_point_id)
        .ok_or_else(|| AutomateError::SchemaNotFound(launch_point_id.clone()))?;
    let owners = find_owners(tree, context, owner_schema)?;

    info!(
        launch_point = %automation.name,
        owners = owners.len(),
        commands = commands.len(),
        "Executing launch point"
    );

    let mut result = CommandExecutionResult {
        launch_point: automation.name.clone(),
        entries: Vec::new(),
    };
    for owner in owners {
        let target = tree.path_of(owner.id());
        for &command in &commands {
            let context = CommandContext {
                toolkit,
                tree,
                target: owner,
                command,
            };
            let (outcome, message) = match executor.execute(&context) {
                Ok(output) => (CommandOutcome::Succeeded, output.join("\n")),
                Err(err) => {
                    warn!(command = %command.name, item = %target, error = %err, "Command failed");
                    (CommandOutcome::Failed, err.to_string())
                }
            };
            result.entries.push(CommandLogEntry {
                outcome,
                command_id: command.id.clone(),
                command_name: command.name.clone(),
                target: target.clone(),
                message,
            });
        }
    }
    Ok(result)
}

fn find_owners<'t>(tree: &'t DraftTree, context: &Id, owner_schema: &Id) -> Result<Vec<&'t DraftItem>> {
    let start = tree.item(context)?;
    let is_owner = |item: &DraftItem| {
        item.is_materialised()
            && item.schema_id() == owner_schema
            && !matches!(item.kind(), DraftItemKind::Collection | DraftItemKind::Attribute)
    };

    let below: Vec<&DraftItem> = tree
        .descendants(context)
        .iter()
        .filter_map(|id| tree.get(id))
        .filter(|item| is_owner(*item))
        .collect();
    if !below.is_empty() {
        return Ok(below);
    }

    Ok(tree
        .ancestors(start.id())
        .into_iter()
        .find(|item| is_owner(*item))
        .into_iter()
        .collect())
}
