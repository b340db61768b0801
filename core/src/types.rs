//! Pattern schema definitions.
//!
//! A [`Pattern`] is an authored tree of [`Element`]s and [`Attribute`]s
//! annotated with [`CodeTemplate`]s and [`Automation`]. The types serialize
//! with [`serde`] to the persisted document form: PascalCase keys, every node
//! carrying its `Id`, and empty child lists omitted.

use serde::{Deserialize, Serialize};

use crate::error::{AutomateError, Result};
use crate::names::validate_name;
use crate::value::AttributeDataType;
use crate::version::{ToolkitVersion, VersionChange, VersionChangeKind};
use crate::Id;

/// How many draft instances an element may have under its parent.
///
/// # Examples
///
/// ```
/// use automate_core::Cardinality;
///
/// assert!(Cardinality::OneOrMany.is_collection());
/// assert!(Cardinality::OneOrMany.requires_instance());
/// assert!(!Cardinality::ZeroOrOne.is_collection());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Cardinality {
    ZeroOrOne,
    #[default]
    One,
    ZeroOrMany,
    OneOrMany,
}

impl Cardinality {
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::ZeroOrMany | Self::OneOrMany)
    }

    /// Returns `true` when zero instances is a validation failure.
    pub fn requires_instance(&self) -> bool {
        matches!(self, Self::One | Self::OneOrMany)
    }
}

/// Typed, optionally required, optionally choice-constrained schema leaf.
///
/// # Examples
///
/// ```
/// use automate_core::{Attribute, AttributeDataType};
///
/// let port = Attribute::new("Port", AttributeDataType::Int)
///     .with_default("8080")
///     .required();
/// assert!(port.is_required);
/// assert_eq!(port.default_value.as_deref(), Some("8080"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Attribute {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub data_type: AttributeDataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
    #[serde(default)]
    pub is_required: bool,
}

impl Attribute {
    pub fn new(name: &str, data_type: AttributeDataType) -> Self {
        Self {
            id: Id::generate(),
            name: name.to_string(),
            data_type,
            default_value: None,
            choices: Vec::new(),
            is_required: false,
        }
    }

    pub fn with_default(mut self, value: &str) -> Self {
        self.default_value = Some(value.to_string());
        self
    }

    pub fn with_choices(mut self, choices: &[&str]) -> Self {
        self.choices = choices.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }
}

/// Reference to a template file whose contents travel with the toolkit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CodeTemplate {
    pub id: Id,
    pub name: String,
    /// Path the template was authored from.
    pub original_file_path: String,
}

impl CodeTemplate {
    pub fn new(name: &str, original_file_path: &str) -> Self {
        Self {
            id: Id::generate(),
            name: name.to_string(),
            original_file_path: original_file_path.to_string(),
        }
    }
}

/// Renders a code template to a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CodeTemplateCommand {
    pub code_template_id: Id,
    /// Target file path; may contain `{{ expression }}` placeholders.
    pub file_path: String,
    /// Only write the file when it does not exist yet.
    #[serde(default)]
    pub is_one_off: bool,
}

/// Runs an external application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CliCommand {
    pub application_name: String,
    /// Argument expression; may contain `{{ expression }}` placeholders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

/// Ordered, deduplicated set of command ids executed together.
///
/// # Examples
///
/// ```
/// use automate_core::{CommandLaunchPoint, Id};
///
/// let mut lp = CommandLaunchPoint::new(vec![Id::from("a"), Id::from("b"), Id::from("a")]);
/// assert_eq!(lp.command_ids(), &[Id::from("a"), Id::from("b")]);
/// lp.add_commands([Id::from("b"), Id::from("c")]);
/// assert_eq!(lp.command_ids().len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CommandLaunchPoint {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    command_ids: Vec<Id>,
}

impl CommandLaunchPoint {
    pub fn new(command_ids: Vec<Id>) -> Self {
        let mut lp = Self::default();
        lp.add_commands(command_ids);
        lp
    }

    pub fn command_ids(&self) -> &[Id] {
        &self.command_ids
    }

    /// Appends ids that are not already present, keeping first occurrence order.
    pub fn add_commands(&mut self, ids: impl IntoIterator<Item = Id>) {
        for id in ids {
            if !self.command_ids.contains(&id) {
                self.command_ids.push(id);
            }
        }
    }

    /// Removes one id; returns `true` if it was present.
    pub fn remove_command(&mut self, id: &Id) -> bool {
        let before = self.command_ids.len();
        self.command_ids.retain(|existing| existing != id);
        before != self.command_ids.len()
    }
}

/// The closed set of automation kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "Type")]
pub enum AutomationKind {
    CodeTemplateCommand(CodeTemplateCommand),
    CliCommand(CliCommand),
    CommandLaunchPoint(CommandLaunchPoint),
}

impl AutomationKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::CodeTemplateCommand(_) => "CodeTemplateCommand",
            Self::CliCommand(_) => "CliCommand",
            Self::CommandLaunchPoint(_) => "CommandLaunchPoint",
        }
    }
}

/// A schema-attached action.
///
/// # Examples
///
/// ```
/// use automate_core::{Automation, AutomationKind, Id};
///
/// let build = Automation::cli_command("Build", "cargo", Some("build"));
/// let launch = Automation::launch_point("Go", vec![build.id.clone()]);
/// assert!(build.is_command());
/// assert!(matches!(launch.kind, AutomationKind::CommandLaunchPoint(_)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Automation {
    pub id: Id,
    pub name: String,
    #[serde(flatten)]
    pub kind: AutomationKind,
}

impl Automation {
    pub fn code_template_command(
        name: &str,
        code_template_id: Id,
        file_path: &str,
        is_one_off: bool,
    ) -> Self {
        Self::new(
            name,
            AutomationKind::CodeTemplateCommand(CodeTemplateCommand {
                code_template_id,
                file_path: file_path.to_string(),
                is_one_off,
            }),
        )
    }

    pub fn cli_command(name: &str, application_name: &str, arguments: Option<&str>) -> Self {
        Self::new(
            name,
            AutomationKind::CliCommand(CliCommand {
                application_name: application_name.to_string(),
                arguments: arguments.map(String::from),
            }),
        )
    }

    pub fn launch_point(name: &str, command_ids: Vec<Id>) -> Self {
        Self::new(
            name,
            AutomationKind::CommandLaunchPoint(CommandLaunchPoint::new(command_ids)),
        )
    }

    fn new(name: &str, kind: AutomationKind) -> Self {
        Self {
            id: Id::generate(),
            name: name.to_string(),
            kind,
        }
    }

    /// Returns `true` for automations that a launch point may reference.
    pub fn is_command(&self) -> bool {
        !matches!(self.kind, AutomationKind::CommandLaunchPoint(_))
    }

    pub fn as_launch_point(&self) -> Option<&CommandLaunchPoint> {
        match &self.kind {
            AutomationKind::CommandLaunchPoint(lp) => Some(lp),
            _ => None,
        }
    }
}

/// Borrowed view of any schema node.
#[derive(Debug, Clone, Copy)]
pub enum SchemaNode<'a> {
    Element(&'a Element),
    Attribute(&'a Attribute),
    Automation(&'a Automation),
}

impl<'a> SchemaNode<'a> {
    pub fn id(&self) -> &'a Id {
        match self {
            Self::Element(e) => &e.id,
            Self::Attribute(a) => &a.id,
            Self::Automation(a) => &a.id,
        }
    }

    pub fn name(&self) -> &'a str {
        match self {
            Self::Element(e) => &e.name,
            Self::Attribute(a) => &a.name,
            Self::Automation(a) => &a.name,
        }
    }

    pub fn as_element(&self) -> Option<&'a Element> {
        match self {
            Self::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_attribute(&self) -> Option<&'a Attribute> {
        match self {
            Self::Attribute(a) => Some(a),
            _ => None,
        }
    }
}

/// Structural part of a pattern, singular or a collection by cardinality.
///
/// # Examples
///
/// ```
/// use automate_core::*;
///
/// let service = Element::new("Service")
///     .with_cardinality(Cardinality::ZeroOrMany)
///     .with_attribute(Attribute::new("Name", AttributeDataType::String).required());
///
/// assert!(service.is_collection());
/// assert!(service.child_by_name("Name").is_some());
/// assert!(service.child_by_name("Port").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Element {
    pub id: Id,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub cardinality: Cardinality,
    #[serde(default)]
    pub auto_create: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<Element>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub automation: Vec<Automation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub code_templates: Vec<CodeTemplate>,
}

impl Element {
    /// Creates a singular (`One`) element that is not auto-created.
    pub fn new(name: &str) -> Self {
        Self {
            id: Id::generate(),
            name: name.to_string(),
            display_name: None,
            description: None,
            cardinality: Cardinality::One,
            auto_create: false,
            attributes: Vec::new(),
            elements: Vec::new(),
            automation: Vec::new(),
            code_templates: Vec::new(),
        }
    }

    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    pub fn auto_created(mut self) -> Self {
        self.auto_create = true;
        self
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_element(mut self, element: Element) -> Self {
        self.elements.push(element);
        self
    }

    pub fn with_automation(mut self, automation: Automation) -> Self {
        self.automation.push(automation);
        self
    }

    pub fn with_code_template(mut self, template: CodeTemplate) -> Self {
        self.code_templates.push(template);
        self
    }

    pub fn is_collection(&self) -> bool {
        self.cardinality.is_collection()
    }

    /// Finds a direct child of any kind by name.
    pub fn child_by_name(&self, name: &str) -> Option<SchemaNode<'_>> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(SchemaNode::Attribute)
            .or_else(|| {
                self.elements
                    .iter()
                    .find(|e| e.name == name)
                    .map(SchemaNode::Element)
            })
            .or_else(|| {
                self.automation
                    .iter()
                    .find(|a| a.name == name)
                    .map(SchemaNode::Automation)
            })
    }

    /// Returns `true` if `id` names a direct child of any kind.
    pub fn has_child(&self, id: &Id) -> bool {
        self.attributes.iter().any(|a| a.id == *id)
            || self.elements.iter().any(|e| e.id == *id)
            || self.automation.iter().any(|a| a.id == *id)
    }

    /// Names of all direct children, attributes first, then elements, then automation.
    pub fn child_names(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .iter()
            .map(|a| a.name.as_str())
            .chain(self.elements.iter().map(|e| e.name.as_str()))
            .chain(self.automation.iter().map(|a| a.name.as_str()))
    }

    /// Finds this element or a descendant element by id.
    pub fn find_element(&self, id: &Id) -> Option<&Element> {
        if self.id == *id {
            return Some(self);
        }
        self.elements.iter().find_map(|child| child.find_element(id))
    }

    pub fn find_element_mut(&mut self, id: &Id) -> Option<&mut Element> {
        if self.id == *id {
            return Some(self);
        }
        self.elements
            .iter_mut()
            .find_map(|child| child.find_element_mut(id))
    }

    pub fn find_attribute(&self, id: &Id) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| a.id == *id)
            .or_else(|| self.elements.iter().find_map(|e| e.find_attribute(id)))
    }

    pub fn find_attribute_mut(&mut self, id: &Id) -> Option<&mut Attribute> {
        if let Some(index) = self.attributes.iter().position(|a| a.id == *id) {
            return Some(&mut self.attributes[index]);
        }
        self.elements
            .iter_mut()
            .find_map(|e| e.find_attribute_mut(id))
    }

    pub fn find_automation(&self, id: &Id) -> Option<&Automation> {
        self.automation
            .iter()
            .find(|a| a.id == *id)
            .or_else(|| self.elements.iter().find_map(|e| e.find_automation(id)))
    }

    pub fn find_automation_mut(&mut self, id: &Id) -> Option<&mut Automation> {
        if let Some(index) = self.automation.iter().position(|a| a.id == *id) {
            return Some(&mut self.automation[index]);
        }
        self.elements
            .iter_mut()
            .find_map(|e| e.find_automation_mut(id))
    }

    pub fn find_code_template(&self, id: &Id) -> Option<&CodeTemplate> {
        self.code_templates
            .iter()
            .find(|t| t.id == *id)
            .or_else(|| self.elements.iter().find_map(|e| e.find_code_template(id)))
    }

    /// Visits this element and every descendant element, parents first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Element)) {
        visit(self);
        for child in &self.elements {
            child.walk(visit);
        }
    }

    fn find_parent_mut(&mut self, id: &Id) -> Option<&mut Element> {
        if self.has_child(id) {
            return Some(self);
        }
        self.elements
            .iter_mut()
            .find_map(|child| child.find_parent_mut(id))
    }

    fn strip_command(&mut self, id: &Id) {
        for automation in &mut self.automation {
            if let AutomationKind::CommandLaunchPoint(lp) = &mut automation.kind {
                lp.remove_command(id);
            }
        }
        for child in &mut self.elements {
            child.strip_command(id);
        }
    }
}

/// Authored schema tree plus its versioning state.
///
/// The root element carries the pattern's id and name. The pattern tracks the
/// version of the last packaged toolkit and the changes recorded since.
///
/// # Examples
///
/// ```
/// use automate_core::*;
///
/// let mut pattern = Pattern::new("WebApi");
/// pattern.root.attributes.push(Attribute::new("Port", AttributeDataType::Int));
/// let port_id = pattern.root.attributes[0].id.clone();
///
/// pattern.rename_node(&port_id, "HttpPort").unwrap();
/// assert_eq!(pattern.find_attribute(&port_id).unwrap().name, "HttpPort");
/// assert_eq!(pattern.pending_changes().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Pattern {
    #[serde(flatten)]
    pub root: Element,
    #[serde(default)]
    pub toolkit_version: ToolkitVersion,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    change_log: Vec<VersionChange>,
}

impl Pattern {
    /// Creates an empty pattern at version `0.0.0`.
    pub fn new(name: &str) -> Self {
        Self {
            root: Element::new(name).auto_created(),
            toolkit_version: ToolkitVersion::default(),
            change_log: Vec::new(),
        }
    }

    pub fn id(&self) -> &Id {
        &self.root.id
    }

    pub fn name(&self) -> &str {
        &self.root.name
    }

    pub fn find_element(&self, id: &Id) -> Option<&Element> {
        self.root.find_element(id)
    }

    pub fn find_element_mut(&mut self, id: &Id) -> Option<&mut Element> {
        self.root.find_element_mut(id)
    }

    pub fn find_attribute(&self, id: &Id) -> Option<&Attribute> {
        self.root.find_attribute(id)
    }

    pub fn find_attribute_mut(&mut self, id: &Id) -> Option<&mut Attribute> {
        self.root.find_attribute_mut(id)
    }

    pub fn find_automation(&self, id: &Id) -> Option<&Automation> {
        self.root.find_automation(id)
    }

    pub fn find_automation_mut(&mut self, id: &Id) -> Option<&mut Automation> {
        self.root.find_automation_mut(id)
    }

    /// Finds the first automation with this name, searching parents first.
    pub fn find_automation_by_name(&self, name: &str) -> Option<&Automation> {
        let mut found = None;
        self.root.walk(&mut |element| {
            if found.is_none() {
                found = element.automation.iter().find(|a| a.name == name);
            }
        });
        found
    }

    pub fn find_code_template(&self, id: &Id) -> Option<&CodeTemplate> {
        self.root.find_code_template(id)
    }

    /// Changes recorded since the last packaged toolkit.
    pub fn pending_changes(&self) -> &[VersionChange] {
        &self.change_log
    }

    pub fn record_change(&mut self, kind: VersionChangeKind, message: impl Into<String>) {
        self.change_log.push(VersionChange::new(kind, message));
    }

    pub(crate) fn clear_changes(&mut self) {
        self.change_log.clear();
    }

    /// Renames an element, attribute or automation, keeping its id.
    ///
    /// # Errors
    ///
    /// Returns [`AutomateError::InvalidName`] if the name is not an
    /// identifier or a sibling already uses it, and
    /// [`AutomateError::SchemaNotFound`] if no node has the id.
    pub fn rename_node(&mut self, id: &Id, new_name: &str) -> Result<()> {
        validate_name(new_name)?;

        if self.root.id == *id {
            let old = std::mem::replace(&mut self.root.name, new_name.to_string());
            self.record_change(
                VersionChangeKind::Breaking,
                format!("Renamed pattern '{old}' to '{new_name}'"),
            );
            return Ok(());
        }

        let parent = self
            .root
            .find_parent_mut(id)
            .ok_or_else(|| AutomateError::SchemaNotFound(id.clone()))?;
        let collides = parent
            .child_by_name(new_name)
            .is_some_and(|existing| existing.id() != id);
        if collides {
            return Err(AutomateError::InvalidName {
                name: new_name.to_string(),
                reason: format!("'{}' already has a child with this name", parent.name),
            });
        }

        let (kind, old) = if let Some(a) = parent.attributes.iter_mut().find(|a| a.id == *id) {
            ("attribute", std::mem::replace(&mut a.name, new_name.to_string()))
        } else if let Some(e) = parent.elements.iter_mut().find(|e| e.id == *id) {
            ("element", std::mem::replace(&mut e.name, new_name.to_string()))
        } else if let Some(a) = parent.automation.iter_mut().find(|a| a.id == *id) {
            ("automation", std::mem::replace(&mut a.name, new_name.to_string()))
        } else {
            return Err(AutomateError::SchemaNotFound(id.clone()));
        };

        self.record_change(
            VersionChangeKind::Breaking,
            format!("Renamed {kind} '{old}' to '{new_name}'"),
        );
        Ok(())
    }

    /// Deletes an element, attribute or automation and everything below it.
    ///
    /// Deleting a command also removes it from every launch point.
    ///
    /// # Errors
    ///
    /// Returns [`AutomateError::SchemaNotFound`] if no child node has the id
    /// (the root cannot be removed).
    pub fn remove_node(&mut self, id: &Id) -> Result<()> {
        let parent = self
            .root
            .find_parent_mut(id)
            .ok_or_else(|| AutomateError::SchemaNotFound(id.clone()))?;

        let (kind, name) = if let Some(index) = parent.attributes.iter().position(|a| a.id == *id) {
            ("attribute", parent.attributes.remove(index).name)
        } else if let Some(index) = parent.elements.iter().position(|e| e.id == *id) {
            ("element", parent.elements.remove(index).name)
        } else if let Some(index) = parent.automation.iter().position(|a| a.id == *id) {
            ("automation", parent.automation.remove(index).name)
        } else {
            return Err(AutomateError::SchemaNotFound(id.clone()));
        };

        if kind == "automation" {
            self.root.strip_command(id);
        }
        self.record_change(
            VersionChangeKind::Breaking,
            format!("Deleted {kind} '{name}'"),
        );
        Ok(())
    }
}
