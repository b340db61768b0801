use std::cell::RefCell;
use std::fs;
use std::time::Duration;

use automate_core::{
    Attribute, AttributeDataType, Automation, Cardinality, CodeTemplate, CodeTemplateFile,
    CommandOutcome, DraftDefinition, Element, Id, Pattern, VersionInstruction, package,
};
use automate_runtime::{
    ApplicationExecutor, AutomationRunner, LocalFileSystem, Result, SimpleTransformer,
};
use chrono::Utc;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Records every application call instead of spawning it.
#[derive(Default)]
struct Recorder {
    calls: RefCell<Vec<(String, Vec<String>)>>,
}

impl ApplicationExecutor for Recorder {
    fn run(&self, _wait_for_exit: bool, application: &str, arguments: &[String]) -> Result<String> {
        self.calls
            .borrow_mut()
            .push((application.to_string(), arguments.to_vec()));
        Ok(format!("ran {application}"))
    }
}

/// `Api` with a `Service` collection whose items own the automation.
fn draft(template: &str, names: &[&str]) -> (DraftDefinition, Vec<Id>) {
    let dockerfile = CodeTemplate::new("Dockerfile", "templates/Dockerfile");
    let render = Automation::code_template_command(
        "Render",
        dockerfile.id.clone(),
        "{{Slug}}/Dockerfile",
        false,
    );
    let readme = Automation::code_template_command(
        "Readme",
        dockerfile.id.clone(),
        "{{Slug}}/README.md",
        true,
    );
    let build = Automation::cli_command("Build", "docker", Some(r#"build -t "{{Slug}} image" ."#));
    let ship = Automation::launch_point("Ship", vec![render.id.clone(), build.id.clone()]);
    let init = Automation::launch_point("Init", vec![readme.id.clone()]);
    let nested = Automation::launch_point("Nested", vec![ship.id.clone()]);
    let template_id = dockerfile.id.clone();

    let mut pattern = Pattern::new("Api");
    pattern.root.elements.push(
        Element::new("Service")
            .with_cardinality(Cardinality::ZeroOrMany)
            .with_attribute(Attribute::new("Slug", AttributeDataType::String))
            .with_attribute(Attribute::new("Base", AttributeDataType::String).with_default("alpine"))
            .with_code_template(dockerfile)
            .with_automation(render)
            .with_automation(readme)
            .with_automation(build)
            .with_automation(ship)
            .with_automation(init)
            .with_automation(nested),
    );
    let file = CodeTemplateFile::new(template_id, template, Utc::now());
    let toolkit = package(&mut pattern, vec![file], VersionInstruction::Auto).unwrap();

    let mut draft = DraftDefinition::new(&toolkit, "shop").unwrap();
    let services = draft.tree.root().property("Service").unwrap().clone();
    let mut items = Vec::new();
    for name in names {
        let item = draft.materialise_collection_item(&services).unwrap();
        draft.set_property(&item, "Slug", name).unwrap();
        items.push(item);
    }
    (draft, items)
}

fn recording_runner(
    root: &std::path::Path,
) -> AutomationRunner<LocalFileSystem, SimpleTransformer, Recorder> {
    AutomationRunner::new(LocalFileSystem, SimpleTransformer, Recorder::default(), root)
}

// ---------------------------------------------------------------------------
// Code templates and CLI commands
// ---------------------------------------------------------------------------

#[test]
fn test_launch_point_renders_files_and_runs_cli_per_item() {
    let dir = tempfile::tempdir().unwrap();
    let (draft, _) = draft("FROM {{Base}}\nLABEL service={{Slug}}\n", &["web", "db"]);
    let mut runner = recording_runner(dir.path());

    let root = draft.tree.root_id().clone();
    let result = draft.execute_launch_point("Ship", &root, &mut runner).unwrap();

    assert!(result.is_success(), "{:?}", result.entries);
    assert_eq!(result.entries.len(), 4);
    assert_eq!(
        fs::read_to_string(dir.path().join("web/Dockerfile")).unwrap(),
        "FROM alpine\nLABEL service=web\n"
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("db/Dockerfile")).unwrap(),
        "FROM alpine\nLABEL service=db\n"
    );

    let calls = runner.applications().calls.borrow();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, "docker");
    assert_eq!(calls[0].1, ["build", "-t", "web image", "."]);
    assert_eq!(calls[1].1, ["build", "-t", "db image", "."]);
    assert_eq!(result.entries[1].message, "ran docker");
}

#[test]
fn test_one_off_file_is_not_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("web")).unwrap();
    fs::write(dir.path().join("web/README.md"), "custom").unwrap();
    let (draft, _) = draft("# {{Slug}}\n", &["web", "db"]);
    let mut runner = recording_runner(dir.path());

    let root = draft.tree.root_id().clone();
    let result = draft.execute_launch_point("Init", &root, &mut runner).unwrap();

    assert!(result.is_success());
    assert_eq!(fs::read_to_string(dir.path().join("web/README.md")).unwrap(), "custom");
    assert_eq!(fs::read_to_string(dir.path().join("db/README.md")).unwrap(), "# db\n");
    assert!(result.entries[0].message.starts_with("skipped existing file"));
}

#[test]
fn test_template_error_is_logged_and_execution_continues() {
    let dir = tempfile::tempdir().unwrap();
    let (draft, items) = draft("FROM {{Missing}}\n", &["web"]);
    let mut runner = recording_runner(dir.path());

    let result = draft.execute_launch_point("Ship", &items[0], &mut runner).unwrap();

    assert!(!result.is_success());
    let outcomes: Vec<_> = result.entries.iter().map(|entry| entry.outcome).collect();
    assert_eq!(outcomes, vec![CommandOutcome::Failed, CommandOutcome::Succeeded]);
    assert!(
        result.entries[0]
            .message
            .starts_with("transform error in code template 'Dockerfile' at 1:6")
    );
    assert!(!dir.path().join("web/Dockerfile").exists());
    assert_eq!(runner.applications().calls.borrow().len(), 1);
}

#[test]
fn test_rendered_path_cannot_leave_output_root() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out");
    let (draft, _) = draft("FROM {{Base}}\n", &["../escape", "web"]);
    let mut runner = recording_runner(&output);

    let root = draft.tree.root_id().clone();
    let result = draft.execute_launch_point("Ship", &root, &mut runner).unwrap();

    assert!(!result.is_success());
    assert_eq!(result.entries[0].outcome, CommandOutcome::Failed);
    assert_eq!(
        result.entries[0].message,
        "path '../escape/Dockerfile' escapes its root: parent directory component"
    );
    assert!(!dir.path().join("escape").exists());
    assert!(output.join("web/Dockerfile").exists());
    assert_eq!(runner.applications().calls.borrow().len(), 2);
}

#[test]
fn test_nested_launch_point_is_a_failed_entry() {
    let dir = tempfile::tempdir().unwrap();
    let (draft, items) = draft("FROM {{Base}}\n", &["web"]);
    let mut runner = recording_runner(dir.path());

    let result = draft.execute_launch_point("Nested", &items[0], &mut runner).unwrap();

    assert_eq!(result.entries.len(), 1);
    assert_eq!(result.entries[0].outcome, CommandOutcome::Failed);
    assert_eq!(
        result.entries[0].message,
        "automation 'Ship' cannot be executed as a command"
    );
}

// ---------------------------------------------------------------------------
// Real processes
// ---------------------------------------------------------------------------

#[cfg(unix)]
#[test]
fn test_hang_timeout_surfaces_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let mut pattern = Pattern::new("Api");
    let wait = Automation::cli_command("Wait", "sleep", Some("5"));
    let go = Automation::launch_point("Go", vec![wait.id.clone()]);
    pattern.root.automation.extend([wait, go]);
    let toolkit = package(&mut pattern, Vec::new(), VersionInstruction::Auto).unwrap();
    let draft = DraftDefinition::new(&toolkit, "shop").unwrap();
    let mut runner = AutomationRunner::local(dir.path(), Duration::from_millis(100));

    let root = draft.tree.root_id().clone();
    let result = draft.execute_launch_point("Go", &root, &mut runner).unwrap();

    assert_eq!(
        result.entries[0].message,
        "application 'sleep' did not exit within 100ms"
    );
}
