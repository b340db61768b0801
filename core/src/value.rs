//! Attribute data types and typed attribute values.
//!
//! Attribute defaults and choices are authored as raw text; draft values are
//! held typed. [`AttributeDataType::parse`] is the single coercion point used
//! by materialisation, property configuration and migration.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AutomateError, Result};

/// Declared data type of an attribute.
///
/// # Examples
///
/// ```
/// use automate_core::{AttributeDataType, AttributeValue};
///
/// assert_eq!(AttributeDataType::default(), AttributeDataType::String);
/// assert_eq!(AttributeDataType::Int.parse("25").unwrap(), AttributeValue::Int(25));
/// assert!(AttributeDataType::Bool.parse("maybe").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AttributeDataType {
    #[default]
    String,
    Bool,
    Int,
    Float,
    DateTime,
}

impl AttributeDataType {
    /// Coerces raw text into a value of this type.
    ///
    /// Strings pass through; bools accept `true`/`false` in any case; ints
    /// and floats use Rust's number parsing, with `NaN` and infinities
    /// rejected because JSON cannot hold them; datetimes accept RFC 3339,
    /// `YYYY-MM-DDTHH:MM:SS` and `YYYY-MM-DD`, and are normalized to UTC.
    ///
    /// # Errors
    ///
    /// Returns [`AutomateError::ValueCoercion`] when the text does not parse.
    pub fn parse(&self, raw: &str) -> Result<AttributeValue> {
        let coercion_error = || AutomateError::ValueCoercion {
            value: raw.to_string(),
            data_type: self.to_string(),
        };

        match self {
            Self::String => Ok(AttributeValue::String(raw.to_string())),
            Self::Bool => match raw.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(AttributeValue::Bool(true)),
                "false" => Ok(AttributeValue::Bool(false)),
                _ => Err(coercion_error()),
            },
            Self::Int => raw
                .trim()
                .parse::<i64>()
                .map(AttributeValue::Int)
                .map_err(|_| coercion_error()),
            Self::Float => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(AttributeValue::Float)
                .ok_or_else(coercion_error),
            Self::DateTime => parse_datetime(raw.trim())
                .map(AttributeValue::DateTime)
                .ok_or_else(coercion_error),
        }
    }

    /// Returns `true` if `raw` parses as this type.
    pub fn accepts(&self, raw: &str) -> bool {
        self.parse(raw).is_ok()
    }
}

impl fmt::Display for AttributeDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::DateTime => write!(f, "datetime"),
        }
    }
}

fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Typed value held by a materialised attribute draft item.
///
/// Serialized externally tagged (`{"Int": 25}`) so that every type,
/// including datetimes, survives a document round-trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    String(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    DateTime(DateTime<Utc>),
}

impl AttributeValue {
    pub fn data_type(&self) -> AttributeDataType {
        match self {
            Self::String(_) => AttributeDataType::String,
            Self::Bool(_) => AttributeDataType::Bool,
            Self::Int(_) => AttributeDataType::Int,
            Self::Float(_) => AttributeDataType::Float,
            Self::DateTime(_) => AttributeDataType::DateTime,
        }
    }

    /// Returns `true` if the value equals one of `choices` parsed as the
    /// value's own data type.
    ///
    /// Choices that do not parse under that type never match.
    pub fn is_one_of(&self, choices: &[String]) -> bool {
        let data_type = self.data_type();
        choices
            .iter()
            .filter_map(|choice| data_type.parse(choice).ok())
            .any(|choice| choice == *self)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(value) => f.write_str(value),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::DateTime(value) => {
                f.write_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
        }
    }
}
