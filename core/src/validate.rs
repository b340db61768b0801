//! Pattern validation.
//!
//! Validates structural invariants of a pattern before it is packaged:
//! identifier names, name uniqueness across sibling elements, attributes and
//! automations, unique ids, attribute defaults and choices that agree with
//! the data type, and automation references that resolve inside the pattern.
//!
//! # Examples
//!
//! ```
//! use automate_core::*;
//!
//! let mut pattern = Pattern::new("Api");
//! pattern.root.attributes.push(Attribute::new("Port", AttributeDataType::Int).with_default("80"));
//! assert!(validate_pattern(&pattern).is_empty());
//!
//! // Invalid: default does not parse as an int
//! pattern.root.attributes[0].default_value = Some("eighty".into());
//! assert!(!validate_pattern(&pattern).is_empty());
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::names::validate_name;
use crate::types::{AutomationKind, Element, Pattern};
use crate::Id;

/// Pattern validation errors.
///
/// Each variant names the offending node by its dotted location inside the
/// pattern (for example `Api.Route.Path`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternValidationError {
    /// A node name is not a valid identifier or is reserved.
    #[error("invalid name at {path}: {reason}")]
    InvalidName { path: String, reason: String },
    /// Two children of the same element share a name, whatever their kinds.
    #[error("duplicate name '{name}' in {parent}")]
    DuplicateName { parent: String, name: String },
    /// Two nodes share an id.
    #[error("duplicate id '{0}'")]
    DuplicateId(Id),
    /// An attribute default does not parse as the attribute's data type.
    #[error("default value '{value}' of {path} is not a valid {data_type}")]
    InvalidDefault {
        path: String,
        value: String,
        data_type: String,
    },
    /// An attribute default is not one of its choices.
    #[error("default value '{value}' of {path} is not one of its choices")]
    DefaultNotAChoice { path: String, value: String },
    /// An attribute choice does not parse as the attribute's data type.
    #[error("choice '{value}' of {path} is not a valid {data_type}")]
    InvalidChoice {
        path: String,
        value: String,
        data_type: String,
    },
    /// A launch point references an id that is not a command in the pattern.
    #[error("launch point {path} references unknown command '{command_id}'")]
    UnknownCommand { path: String, command_id: Id },
    /// A code template command references an unknown code template.
    #[error("command {path} references unknown code template '{template_id}'")]
    UnknownCodeTemplate { path: String, template_id: Id },
}

/// Validates a pattern.
///
/// Returns every problem found; an empty list means the pattern is valid.
///
/// # Examples
///
/// ```
/// use automate_core::*;
///
/// let mut pattern = Pattern::new("Api");
/// pattern.root.elements.push(Element::new("Route"));
/// pattern.root.attributes.push(Attribute::new("Route", AttributeDataType::String));
///
/// let errors = validate_pattern(&pattern);
/// assert!(errors.iter().any(|e| matches!(e, PatternValidationError::DuplicateName { .. })));
/// ```
pub fn validate_pattern(pattern: &Pattern) -> Vec<PatternValidationError> {
    let mut errors = Vec::new();
    let mut seen_ids = HashSet::new();
    let mut path = Vec::new();

    validate_element(pattern, &pattern.root, &mut path, &mut seen_ids, &mut errors);
    errors
}

fn validate_element<'a>(
    pattern: &Pattern,
    element: &'a Element,
    path: &mut Vec<&'a str>,
    seen_ids: &mut HashSet<&'a Id>,
    errors: &mut Vec<PatternValidationError>,
) {
    path.push(&element.name);
    let here = path.join(".");

    check_name(&element.name, &here, errors);
    check_id(&element.id, seen_ids, errors);

    let mut seen_names = HashSet::new();
    for name in element.child_names() {
        if !seen_names.insert(name) {
            errors.push(PatternValidationError::DuplicateName {
                parent: here.clone(),
                name: name.to_string(),
            });
        }
    }

    for attribute in &element.attributes {
        let at = format!("{here}.{}", attribute.name);
        check_name(&attribute.name, &at, errors);
        check_id(&attribute.id, seen_ids, errors);

        for choice in &attribute.choices {
            if !attribute.data_type.accepts(choice) {
                errors.push(PatternValidationError::InvalidChoice {
                    path: at.clone(),
                    value: choice.clone(),
                    data_type: attribute.data_type.to_string(),
                });
            }
        }

        if let Some(default) = &attribute.default_value {
            match attribute.data_type.parse(default) {
                Err(_) => errors.push(PatternValidationError::InvalidDefault {
                    path: at.clone(),
                    value: default.clone(),
                    data_type: attribute.data_type.to_string(),
                }),
                Ok(value) if !attribute.choices.is_empty() && !value.is_one_of(&attribute.choices) => {
                    errors.push(PatternValidationError::DefaultNotAChoice {
                        path: at.clone(),
                        value: default.clone(),
                    });
                }
                Ok(_) => {}
            }
        }
    }

    for template in &element.code_templates {
        check_id(&template.id, seen_ids, errors);
    }

    for automation in &element.automation {
        let at = format!("{here}.{}", automation.name);
        check_name(&automation.name, &at, errors);
        check_id(&automation.id, seen_ids, errors);

        match &automation.kind {
            AutomationKind::CodeTemplateCommand(command) => {
                if pattern.find_code_template(&command.code_template_id).is_none() {
                    errors.push(PatternValidationError::UnknownCodeTemplate {
                        path: at,
                        template_id: command.code_template_id.clone(),
                    });
                }
            }
            AutomationKind::CliCommand(_) => {}
            AutomationKind::CommandLaunchPoint(launch_point) => {
                for command_id in launch_point.command_ids() {
                    let resolves = pattern
                        .find_automation(command_id)
                        .is_some_and(|command| command.is_command());
                    if !resolves {
                        errors.push(PatternValidationError::UnknownCommand {
                            path: at.clone(),
                            command_id: command_id.clone(),
                        });
                    }
                }
            }
        }
    }

    for child in &element.elements {
        validate_element(pattern, child, path, seen_ids, errors);
    }
    path.pop();
}

fn check_name(name: &str, path: &str, errors: &mut Vec<PatternValidationError>) {
    if let Err(crate::AutomateError::InvalidName { reason, .. }) = validate_name(name) {
        errors.push(PatternValidationError::InvalidName {
            path: path.to_string(),
            reason,
        });
    }
}

fn check_id<'a>(
    id: &'a Id,
    seen_ids: &mut HashSet<&'a Id>,
    errors: &mut Vec<PatternValidationError>,
) {
    if !seen_ids.insert(id) {
        errors.push(PatternValidationError::DuplicateId(id.clone()));
    }
}

#[cfg(test)]
mod tests {
    use crate::{Attribute, AttributeDataType, Automation, Cardinality};

    use super::*;

    #[test]
    fn test_validate_pattern_accepts_valid_pattern() {
        let mut pattern = Pattern::new("Api");
        let build = Automation::cli_command("Build", "cargo", Some("build"));
        let build_id = build.id.clone();
        pattern.root = pattern
            .root
            .with_attribute(
                Attribute::new("Mode", AttributeDataType::String)
                    .with_choices(&["debug", "release"])
                    .with_default("debug"),
            )
            .with_element(Element::new("Route").with_cardinality(Cardinality::ZeroOrMany))
            .with_automation(build)
            .with_automation(Automation::launch_point("Go", vec![build_id]));

        assert!(validate_pattern(&pattern).is_empty());
    }

    #[test]
    fn test_validate_pattern_rejects_default_outside_choices() {
        let mut pattern = Pattern::new("Api");
        pattern.root.attributes.push(
            Attribute::new("Mode", AttributeDataType::String)
                .with_choices(&["debug", "release"])
                .with_default("fast"),
        );

        let errors = validate_pattern(&pattern);
        assert_eq!(
            errors,
            vec![PatternValidationError::DefaultNotAChoice {
                path: "Api.Mode".to_string(),
                value: "fast".to_string(),
            }]
        );
    }

    #[test]
    fn test_validate_pattern_matches_typed_default_against_choices() {
        let mut pattern = Pattern::new("Api");
        pattern.root = pattern
            .root
            .with_attribute(
                Attribute::new("Ratio", AttributeDataType::Float)
                    .with_choices(&["1.0", "2.5"])
                    .with_default("1"),
            )
            .with_attribute(
                Attribute::new("Enabled", AttributeDataType::Bool)
                    .with_choices(&["True"])
                    .with_default("true"),
            );

        assert!(validate_pattern(&pattern).is_empty());

        pattern.root.attributes[0].default_value = Some("2.0".into());
        assert!(matches!(
            validate_pattern(&pattern).as_slice(),
            [PatternValidationError::DefaultNotAChoice { value, .. }] if value == "2.0"
        ));
    }

    #[test]
    fn test_validate_pattern_rejects_unknown_command() {
        let mut pattern = Pattern::new("Api");
        pattern
            .root
            .automation
            .push(Automation::launch_point("Go", vec![Id::from("missing")]));

        let errors = validate_pattern(&pattern);
        assert_eq!(
            errors,
            vec![PatternValidationError::UnknownCommand {
                path: "Api.Go".to_string(),
                command_id: Id::from("missing"),
            }]
        );
    }

    #[test]
    fn test_validate_pattern_rejects_reserved_name() {
        let mut pattern = Pattern::new("Api");
        pattern.root.elements.push(Element::new("parent"));

        let errors = validate_pattern(&pattern);
        assert!(matches!(
            errors.as_slice(),
            [PatternValidationError::InvalidName { path, .. }] if path == "Api.parent"
        ));
    }
}
