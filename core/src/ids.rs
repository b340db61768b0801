use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity of a schema node or a draft item.
///
/// Ids are generated once and never reused. Nothing in the crate depends on
/// their format beyond uniqueness and string comparison, so ids read back
/// from older documents need not be UUIDs.
///
/// # Examples
///
/// ```
/// use automate_core::Id;
///
/// let a = Id::generate();
/// let b = Id::generate();
/// assert_ne!(a, b);
/// assert_eq!(Id::from("abc").as_str(), "abc");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(String);

impl Id {
    /// Creates a new globally unique id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Id {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_plain_hex() {
        let id = Id::generate();
        assert_eq!(id.as_str().len(), 32);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_id_serializes_as_bare_string() {
        let json = serde_json::to_string(&Id::from("x1")).unwrap();
        assert_eq!(json, "\"x1\"");
    }
}
