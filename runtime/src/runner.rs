//! Command execution for launch points.
//!
//! [`AutomationRunner`] plugs into [`automate_core::execute_launch_point`]
//! and runs each command against its owner:
//!
//! - code template commands render the template and its file path, then
//!   write the file under the output root
//! - CLI commands render and split their arguments, then run the application
//!
//! A launch point listed as a command of another launch point fails.

use std::path::{Path, PathBuf};
use std::time::Duration;

use automate_core::{
    AutomationKind, CliCommand, CodeTemplateCommand, CommandContext, CommandExecutor,
};
use tracing::debug;

use crate::error::{Result, RuntimeError};
use crate::files::{FilePathResolver, LocalFileSystem};
use crate::process::{ApplicationExecutor, ProcessExecutor, split_arguments};
use crate::transform::{SimpleTransformer, TextTransformer};

/// Runs code template and CLI commands.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use automate_core::*;
/// use automate_runtime::AutomationRunner;
///
/// # fn run(draft: &DraftDefinition) -> std::result::Result<(), Box<dyn std::error::Error>> {
/// let mut runner = AutomationRunner::local("out", Duration::from_secs(5));
/// let root = draft.tree.root_id().clone();
/// let result = draft.execute_launch_point("Generate", &root, &mut runner)?;
/// for failure in result.failures() {
///     eprintln!("{}: {}", failure.command_name, failure.message);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AutomationRunner<F, T, A> {
    files: F,
    transformer: T,
    applications: A,
    output_root: PathBuf,
    wait_for_exit: bool,
}

impl AutomationRunner<LocalFileSystem, SimpleTransformer, ProcessExecutor> {
    /// A runner over the local file system and child processes.
    pub fn local(output_root: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self::new(
            LocalFileSystem,
            SimpleTransformer,
            ProcessExecutor::new(timeout),
            output_root,
        )
    }
}

impl<F, T, A> AutomationRunner<F, T, A> {
    pub fn new(files: F, transformer: T, applications: A, output_root: impl Into<PathBuf>) -> Self {
        Self {
            files,
            transformer,
            applications,
            output_root: output_root.into(),
            wait_for_exit: true,
        }
    }

    /// Whether CLI commands block until the application exits. Defaults to
    /// `true`.
    pub fn wait_for_exit(mut self, wait: bool) -> Self {
        self.wait_for_exit = wait;
        self
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn applications(&self) -> &A {
        &self.applications
    }
}

impl<F, T, A> AutomationRunner<F, T, A>
where
    F: FilePathResolver,
    T: TextTransformer,
    A: ApplicationExecutor,
{
    fn render_code_template(
        &self,
        context: &CommandContext<'_>,
        command: &CodeTemplateCommand,
    ) -> Result<Vec<String>> {
        let name = &context.command.name;
        let item = context.target.id();

        let relative = self.transformer.transform(
            &format!("file path of '{name}'"),
            &command.file_path,
            context.tree,
            item,
        )?;
        let path = self.files.create_path(&self.output_root, &relative)?;
        if command.is_one_off && self.files.exists_at_path(&path) {
            debug!(command = %name, path = %path.display(), "Skipped existing one-off file");
            return Ok(vec![format!("skipped existing file {}", path.display())]);
        }

        let template = context
            .toolkit
            .pattern
            .find_code_template(&command.code_template_id)
            .map_or(name.as_str(), |template| template.name.as_str());
        let body = context.toolkit.template_contents(&command.code_template_id)?;
        let rendered = self.transformer.transform(
            &format!("code template '{template}'"),
            &String::from_utf8_lossy(body),
            context.tree,
            item,
        )?;
        self.files.write_file(&path, rendered.as_bytes())?;
        Ok(vec![format!("wrote file {}", path.display())])
    }

    fn run_cli(&self, context: &CommandContext<'_>, command: &CliCommand) -> Result<Vec<String>> {
        let arguments = match &command.arguments {
            Some(raw) => {
                let rendered = self.transformer.transform(
                    &format!("arguments of '{}'", context.command.name),
                    raw,
                    context.tree,
                    context.target.id(),
                )?;
                split_arguments(&rendered)?
            }
            None => Vec::new(),
        };
        let output = self
            .applications
            .run(self.wait_for_exit, &command.application_name, &arguments)?;
        Ok(output.lines().map(str::to_string).collect())
    }
}

impl<F, T, A> CommandExecutor for AutomationRunner<F, T, A>
where
    F: FilePathResolver,
    T: TextTransformer,
    A: ApplicationExecutor,
{
    type Error = RuntimeError;

    fn execute(&mut self, context: &CommandContext<'_>) -> Result<Vec<String>> {
        match &context.command.kind {
            AutomationKind::CodeTemplateCommand(command) => self.render_code_template(context, command),
            AutomationKind::CliCommand(command) => self.run_cli(context, command),
            AutomationKind::CommandLaunchPoint(_) => {
                Err(RuntimeError::UnsupportedCommand(context.command.name.clone()))
            }
        }
    }
}
