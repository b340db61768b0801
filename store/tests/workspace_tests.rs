use std::path::Path;

use automate_core::{
    Attribute, AttributeDataType, MigrationMessage, Pattern, ToolkitDefinition, ToolkitVersion,
    VersionInstruction, package,
};
use automate_store::{StoreConfig, StoreError, Workspace};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn workspace(root: &Path) -> Workspace {
    Workspace::open(StoreConfig::rooted_at(root)).unwrap()
}

/// Version 0.1.0 with a `Port` attribute, and 1.0.0 with it deleted.
fn toolkits() -> (ToolkitDefinition, ToolkitDefinition) {
    let mut pattern = Pattern::new("Api");
    pattern
        .root
        .attributes
        .push(Attribute::new("Port", AttributeDataType::Int).with_default("80"));
    let v1 = package(&mut pattern, Vec::new(), VersionInstruction::Auto).unwrap();

    let port = pattern.root.attributes[0].id.clone();
    pattern.remove_node(&port).unwrap();
    let v2 = package(&mut pattern, Vec::new(), VersionInstruction::Auto).unwrap();
    (v1, v2)
}

// ---------------------------------------------------------------------------
// Drafts
// ---------------------------------------------------------------------------

#[test]
fn test_open_creates_directories() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = workspace(dir.path());

    assert!(workspace.config().store_dir.join("drafts").is_dir());
    assert!(workspace.config().output_dir.is_dir());
}

#[test]
fn test_created_draft_is_current_and_stored() {
    let dir = tempfile::tempdir().unwrap();
    let mut workspace = workspace(dir.path());
    let (v1, _) = toolkits();
    workspace.install_toolkit(&v1).unwrap();

    let id = workspace.create_draft(&v1, "orders").unwrap().id.clone();

    assert_eq!(workspace.current_draft().unwrap().id, id);
    assert_eq!(workspace.store().load_draft(&id).unwrap().name, "orders");
    assert_eq!(workspace.store().find_pattern("Api").unwrap(), v1.pattern);
}

#[test]
fn test_switch_and_list_drafts() {
    let dir = tempfile::tempdir().unwrap();
    let mut workspace = workspace(dir.path());
    let (v1, _) = toolkits();

    let zeta = workspace.create_draft(&v1, "zeta").unwrap().id.clone();
    workspace.create_draft(&v1, "alpha").unwrap();

    let names: Vec<String> = workspace
        .list_drafts()
        .unwrap()
        .into_iter()
        .map(|draft| draft.name)
        .collect();
    assert_eq!(names, ["alpha", "zeta"]);

    workspace.switch_draft(&zeta).unwrap();
    assert_eq!(workspace.current_draft().unwrap().name, "zeta");
}

#[test]
fn test_unsaved_changes_persist_on_save() {
    let dir = tempfile::tempdir().unwrap();
    let mut workspace = workspace(dir.path());
    let (v1, _) = toolkits();
    workspace.create_draft(&v1, "orders").unwrap();

    let draft = workspace.current_draft_mut().unwrap();
    let root = draft.tree.root_id().clone();
    draft.set_property(&root, "Port", "8080").unwrap();
    let id = draft.id.clone();
    workspace.save_draft().unwrap();

    let stored = workspace.store().load_draft(&id).unwrap();
    assert_eq!(&stored, workspace.current_draft().unwrap());
}

#[test]
fn test_no_current_draft() {
    let dir = tempfile::tempdir().unwrap();
    let mut workspace = workspace(dir.path());

    assert!(matches!(workspace.current_draft(), Err(StoreError::NoCurrentDraft)));
    assert!(matches!(workspace.save_draft(), Err(StoreError::NoCurrentDraft)));
    assert!(matches!(
        workspace.upgrade_current_draft(true),
        Err(StoreError::NoCurrentDraft)
    ));
}

#[test]
fn test_delete_current_draft_clears_selection() {
    let dir = tempfile::tempdir().unwrap();
    let mut workspace = workspace(dir.path());
    let (v1, _) = toolkits();
    let id = workspace.create_draft(&v1, "orders").unwrap().id.clone();

    workspace.delete_draft(&id).unwrap();

    assert!(workspace.current_draft().is_err());
    assert!(workspace.list_drafts().unwrap().is_empty());
    assert!(matches!(
        workspace.switch_draft(&id),
        Err(StoreError::DraftNotFound(_))
    ));
}

// ---------------------------------------------------------------------------
// Upgrades
// ---------------------------------------------------------------------------

#[test]
fn test_refused_upgrade_is_not_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let mut workspace = workspace(dir.path());
    let (v1, v2) = toolkits();
    workspace.install_toolkit(&v1).unwrap();
    let id = workspace.create_draft(&v1, "orders").unwrap().id.clone();
    workspace.install_toolkit(&v2).unwrap();

    let result = workspace.upgrade_current_draft(false).unwrap();

    assert!(!result.is_success());
    assert_eq!(
        result.changes().last().map(|change| change.message),
        Some(MigrationMessage::BreakingChangesNotForced)
    );
    assert_eq!(workspace.current_draft().unwrap().version(), v1.version);
    assert_eq!(workspace.store().load_draft(&id).unwrap().version(), v1.version);
}

#[test]
fn test_forced_upgrade_is_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let mut workspace = workspace(dir.path());
    let (v1, v2) = toolkits();
    workspace.install_toolkit(&v1).unwrap();
    workspace.install_toolkit(&v2).unwrap();
    let id = workspace.create_draft(&v1, "orders").unwrap().id.clone();

    let result = workspace.upgrade_current_draft(true).unwrap();

    assert!(result.is_success());
    assert_eq!(v2.version, ToolkitVersion::new(1, 0, 0));
    let stored = workspace.store().load_draft(&id).unwrap();
    assert_eq!(stored.version(), v2.version);
    let root = stored.tree.root_id().clone();
    assert!(stored.tree.get_property(&root, "Port").is_err());
}

#[test]
fn test_upgrade_without_installed_toolkit() {
    let dir = tempfile::tempdir().unwrap();
    let mut workspace = workspace(dir.path());
    let (v1, _) = toolkits();
    workspace.create_draft(&v1, "orders").unwrap();

    assert!(matches!(
        workspace.upgrade_current_draft(false),
        Err(StoreError::ToolkitNotFound(_))
    ));
}
