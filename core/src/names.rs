use std::sync::LazyLock;

use regex::Regex;

use crate::error::{AutomateError, Result};

static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("identifier regex"));

const MAX_NAME_LENGTH: usize = 100;

/// Names that collide with path pseudo-segments or document keys.
pub const RESERVED_NAMES: &[&str] = &[
    "parent",
    "Parent",
    "Id",
    "Name",
    "Items",
    "Properties",
    "DisplayName",
    "Description",
    "Root",
    "Pattern",
];

/// Validates a schema node name.
///
/// # Errors
///
/// Returns [`AutomateError::InvalidName`] when the name is empty, too long,
/// not an identifier, or reserved.
///
/// # Examples
///
/// ```
/// use automate_core::validate_name;
///
/// assert!(validate_name("ServiceName").is_ok());
/// assert!(validate_name("2fast").is_err());
/// assert!(validate_name("parent").is_err());
/// ```
pub fn validate_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| AutomateError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name cannot be empty"));
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(invalid("name is longer than 100 characters"));
    }
    if !IDENTIFIER_RE.is_match(name) {
        return Err(invalid(
            "name must start with a letter and contain only letters, digits and underscores",
        ));
    }
    if RESERVED_NAMES.contains(&name) {
        return Err(invalid("name is reserved"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_punctuation() {
        assert!(validate_name("a-b").is_err());
        assert!(validate_name("a.b").is_err());
    }

    #[test]
    fn test_rejects_overlong_name() {
        let name = "a".repeat(101);
        assert!(validate_name(&name).is_err());
    }

    #[test]
    fn test_accepts_underscores_and_digits() {
        assert!(validate_name("route_2").is_ok());
    }
}
