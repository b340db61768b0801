use automate_core::{
    Attribute, AttributeDataType, AttributeValue, AutomateError, Automation, Cardinality,
    CodeTemplate, CodeTemplateFile, CommandContext, CommandOutcome, DraftDefinition, DraftTree,
    DraftViolation, Element, Id, Pattern, ToolkitDefinition, VersionInstruction, package,
};
use chrono::{TimeZone, Utc};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `Api` with a `Service` collection whose items own an optional `Docker`
/// element carrying a `Ship` launch point.
fn service_pattern() -> (Pattern, Id) {
    let template = CodeTemplate::new("Dockerfile", "templates/Dockerfile");
    let render = Automation::code_template_command(
        "Render",
        template.id.clone(),
        "{{Name}}/Dockerfile",
        false,
    );
    let build = Automation::cli_command("Build", "docker", Some("build {{Name}}"));
    let launch = Automation::launch_point("Ship", vec![render.id.clone(), build.id.clone()]);
    let launch_id = launch.id.clone();

    let mut pattern = Pattern::new("Api");
    pattern.root = pattern
        .root
        .with_attribute(Attribute::new("Title", AttributeDataType::String).with_default("api"))
        .with_code_template(template)
        .with_element(
            Element::new("Service")
                .with_cardinality(Cardinality::ZeroOrMany)
                .with_attribute(Attribute::new("Port", AttributeDataType::Int).with_default("80"))
                .with_element(
                    Element::new("Docker")
                        .with_cardinality(Cardinality::ZeroOrOne)
                        .with_attribute(
                            Attribute::new("Base", AttributeDataType::String)
                                .with_choices(&["alpine", "debian"])
                                .with_default("alpine"),
                        )
                        .with_automation(render)
                        .with_automation(build)
                        .with_automation(launch),
                ),
        );
    (pattern, launch_id)
}

fn toolkit(pattern: &mut Pattern) -> ToolkitDefinition {
    let template = pattern.root.code_templates[0].id.clone();
    let file = CodeTemplateFile::new(
        template,
        "FROM {{Base}}\n",
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap(),
    );
    package(pattern, vec![file], VersionInstruction::Auto).unwrap()
}

fn property(draft: &DraftDefinition, owner: &Id, name: &str) -> Id {
    draft
        .tree
        .get(owner)
        .unwrap()
        .property(name)
        .unwrap()
        .clone()
}

// ---------------------------------------------------------------------------
// Round trips
// ---------------------------------------------------------------------------

#[test]
fn test_pattern_round_trip_omits_empty_lists() {
    let (pattern, _) = service_pattern();

    let json = serde_json::to_value(&pattern).unwrap();
    assert!(json.get("Automation").is_none());
    assert!(json["Elements"][0].get("Automation").is_none());
    assert_eq!(json["Elements"][0]["Elements"][0]["Automation"][2]["Type"], "CommandLaunchPoint");

    let restored: Pattern = serde_json::from_value(json).unwrap();
    assert_eq!(restored, pattern);
}

#[test]
fn test_toolkit_round_trip_keeps_version_and_contents() {
    let (mut pattern, _) = service_pattern();
    let toolkit = toolkit(&mut pattern);

    let json = serde_json::to_string_pretty(&toolkit).unwrap();
    assert!(json.contains("\"Version\": \"0.1.0\""));

    let restored: ToolkitDefinition = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, toolkit);
}

#[test]
fn test_draft_round_trip_rebuilds_navigation() {
    let (mut pattern, _) = service_pattern();
    let toolkit = toolkit(&mut pattern);
    let mut draft = DraftDefinition::new(&toolkit, "shop").unwrap();
    let root = draft.tree.root_id().clone();
    let services = property(&draft, &root, "Service");
    let item = draft.materialise_collection_item(&services).unwrap();
    draft.set_property(&item, "Port", "8081").unwrap();

    let json = serde_json::to_string(&draft).unwrap();
    let restored: DraftDefinition = serde_json::from_str(&json).unwrap();

    assert_eq!(restored, draft);
    let port = restored.tree.get_property(&item, "Port").unwrap();
    assert_eq!(restored.tree.path_of(port.id()), format!("{{Api.Service.{item}.Port}}"));
}

// ---------------------------------------------------------------------------
// Materialisation and validation
// ---------------------------------------------------------------------------

#[test]
fn test_materialising_element_twice_is_idempotent() {
    let (mut pattern, _) = service_pattern();
    let toolkit = toolkit(&mut pattern);
    let mut draft = DraftDefinition::new(&toolkit, "shop").unwrap();
    let root = draft.tree.root_id().clone();
    let services = property(&draft, &root, "Service");
    let item = draft.materialise_collection_item(&services).unwrap();
    let docker = property(&draft, &item, "Docker");

    draft.materialise(&docker).unwrap();
    let once = draft.tree.clone();
    draft.materialise(&docker).unwrap();

    assert_eq!(draft.tree, once);
    assert_eq!(
        draft.tree.get_property(&docker, "Base").unwrap().value(),
        Some(&AttributeValue::String("alpine".into()))
    );
}

#[test]
fn test_validation_reports_missing_required_attribute() {
    let mut pattern = Pattern::new("Api");
    pattern
        .root
        .attributes
        .push(Attribute::new("Title", AttributeDataType::String).required());
    let toolkit = package(&mut pattern, Vec::new(), VersionInstruction::Auto).unwrap();
    let draft = DraftDefinition::new(&toolkit, "shop").unwrap();

    let violations = draft.validate().unwrap();

    assert_eq!(violations.len(), 1);
    assert_eq!(
        violations[0].to_string(),
        "attribute 'Title' at {Api.Title} is required but has no value"
    );
    assert!(matches!(violations[0], DraftViolation::RequiredAttributeMissing { .. }));
}

/// `Api` with typed attributes whose choices are written in a form other
/// than the value's display text.
fn typed_choices_pattern() -> Pattern {
    let mut pattern = Pattern::new("Api");
    pattern.root = pattern
        .root
        .with_attribute(
            Attribute::new("Enabled", AttributeDataType::Bool).with_choices(&["True", "False"]),
        )
        .with_attribute(
            Attribute::new("Ratio", AttributeDataType::Float)
                .with_choices(&["1.0", "2.5"])
                .with_default("1.0"),
        )
        .with_attribute(
            Attribute::new("Retries", AttributeDataType::Int).with_choices(&["1", "3"]),
        );
    pattern
}

#[test]
fn test_typed_choices_accept_their_own_values() {
    let pattern = typed_choices_pattern();
    let mut tree = DraftTree::new(&pattern).unwrap();
    let root = tree.root_id().clone();

    assert!(tree.validate(&pattern).unwrap().is_empty());

    tree.set_property(&pattern, &root, "Enabled", "True").unwrap();
    tree.set_property(&pattern, &root, "Ratio", "2.5").unwrap();
    tree.set_property(&pattern, &root, "Retries", "03").unwrap();
    assert_eq!(
        tree.get_property(&root, "Enabled").unwrap().value(),
        Some(&AttributeValue::Bool(true))
    );
    assert_eq!(
        tree.get_property(&root, "Retries").unwrap().value(),
        Some(&AttributeValue::Int(3))
    );
    assert!(tree.validate(&pattern).unwrap().is_empty());

    for (name, raw) in [("Ratio", "2.0"), ("Retries", "2")] {
        let err = tree.set_property(&pattern, &root, name, raw).unwrap_err();
        assert!(matches!(err, AutomateError::InvalidChoice { .. }), "{name}={raw}");
    }
}

#[test]
fn test_non_finite_float_is_rejected_and_draft_round_trips() {
    let mut pattern = typed_choices_pattern();
    pattern.root.attributes[1].choices.clear();
    let toolkit = package(&mut pattern, Vec::new(), VersionInstruction::Auto).unwrap();
    let mut draft = DraftDefinition::new(&toolkit, "shop").unwrap();
    let root = draft.tree.root_id().clone();

    for raw in ["NaN", "inf", "-inf"] {
        let err = draft.set_property(&root, "Ratio", raw).unwrap_err();
        assert!(matches!(err, AutomateError::ValueCoercion { .. }), "{raw}");
    }
    draft.set_property(&root, "Ratio", "0.125").unwrap();

    let json = serde_json::to_string(&draft).unwrap();
    let restored: DraftDefinition = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, draft);
}

// ---------------------------------------------------------------------------
// Launch points
// ---------------------------------------------------------------------------

#[test]
fn test_launch_point_runs_only_on_materialised_owners() {
    let (mut pattern, _) = service_pattern();
    let toolkit = toolkit(&mut pattern);
    let mut draft = DraftDefinition::new(&toolkit, "shop").unwrap();
    let root = draft.tree.root_id().clone();
    let services = property(&draft, &root, "Service");

    let mut dockers = Vec::new();
    for _ in 0..3 {
        let item = draft.materialise_collection_item(&services).unwrap();
        dockers.push(property(&draft, &item, "Docker"));
    }
    draft.materialise(&dockers[0]).unwrap();
    draft.materialise(&dockers[2]).unwrap();

    let mut targets = Vec::new();
    let mut executor = |ctx: &CommandContext<'_>| -> Result<Vec<String>, String> {
        targets.push(ctx.target.id().clone());
        if ctx.command.name == "Render" && ctx.target.id() == &dockers[0] {
            return Err("template failed".into());
        }
        Ok(vec![])
    };
    let result = draft.execute_launch_point("Ship", &root, &mut executor).unwrap();

    assert_eq!(
        targets,
        vec![
            dockers[0].clone(),
            dockers[0].clone(),
            dockers[2].clone(),
            dockers[2].clone()
        ]
    );
    assert!(!result.is_success());
    let outcomes: Vec<_> = result.entries.iter().map(|entry| entry.outcome).collect();
    assert_eq!(
        outcomes,
        vec![
            CommandOutcome::Failed,
            CommandOutcome::Succeeded,
            CommandOutcome::Succeeded,
            CommandOutcome::Succeeded
        ]
    );
    assert_eq!(result.entries[0].message, "template failed");
}

#[test]
fn test_launch_point_scoped_to_context_item() {
    let (mut pattern, launch_id) = service_pattern();
    let toolkit = toolkit(&mut pattern);
    let mut draft = DraftDefinition::new(&toolkit, "shop").unwrap();
    let root = draft.tree.root_id().clone();
    let services = property(&draft, &root, "Service");
    let first = draft.materialise_collection_item(&services).unwrap();
    let second = draft.materialise_collection_item(&services).unwrap();
    for item in [&first, &second] {
        let docker = property(&draft, item, "Docker");
        draft.materialise(&docker).unwrap();
    }

    let mut executor =
        |_: &CommandContext<'_>| -> Result<Vec<String>, String> { Ok(vec!["ok".into()]) };
    let result = automate_core::execute_launch_point(
        &draft.toolkit,
        &draft.tree,
        &launch_id,
        &second,
        &mut executor,
    )
    .unwrap();

    assert_eq!(result.entries.len(), 2);
    assert!(result.entries.iter().all(|entry| entry.target.contains(second.as_str())));
}

#[test]
fn test_launch_point_skips_unmaterialised_singular_owner() {
    let (mut pattern, _) = service_pattern();
    let toolkit = toolkit(&mut pattern);
    let mut draft = DraftDefinition::new(&toolkit, "shop").unwrap();
    let root = draft.tree.root_id().clone();
    let services = property(&draft, &root, "Service");
    let item = draft.materialise_collection_item(&services).unwrap();
    let docker = property(&draft, &item, "Docker");
    assert!(!draft.tree.get(&docker).unwrap().is_materialised());

    let mut calls = 0;
    let mut executor = |_: &CommandContext<'_>| -> Result<Vec<String>, String> {
        calls += 1;
        Ok(vec![])
    };
    for context in [&item, &docker, &root] {
        let result = draft.execute_launch_point("Ship", context, &mut executor).unwrap();
        assert!(result.entries.is_empty());
    }

    assert_eq!(calls, 0);
}
