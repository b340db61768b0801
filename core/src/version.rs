//! Toolkit versions and the authoring change log.
//!
//! Each structural edit to a pattern appends a [`VersionChange`] to the
//! pattern's pending log. Packaging a toolkit folds that log into the next
//! [`ToolkitVersion`]: a major bump when any change is breaking, a minor bump
//! otherwise, unless the author supplies an explicit version.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AutomateError, Result};

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        ^\s*
        v?                      # optional 'v' prefix
        (\d{1,9})\.(\d{1,9})    # major.minor
        (?:\.(\d{1,9}))?        # optional .patch
        \s*$
        ",
    )
    .expect("version regex")
});

/// Semantic version of a packaged toolkit.
///
/// # Examples
///
/// ```
/// use automate_core::ToolkitVersion;
///
/// let version: ToolkitVersion = "1.2.3".parse().unwrap();
/// assert_eq!(version.major(), 1);
/// assert_eq!(version.next_major().to_string(), "2.0.0");
/// assert_eq!(version.next_minor().to_string(), "1.3.0");
/// assert!("1.x".parse::<ToolkitVersion>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ToolkitVersion {
    major: u32,
    minor: u32,
    patch: u32,
}

impl ToolkitVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    pub fn patch(&self) -> u32 {
        self.patch
    }

    pub fn next_major(&self) -> Self {
        Self::new(self.major + 1, 0, 0)
    }

    pub fn next_minor(&self) -> Self {
        Self::new(self.major, self.minor + 1, 0)
    }
}

impl fmt::Display for ToolkitVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for ToolkitVersion {
    type Err = AutomateError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || AutomateError::InvalidVersion(s.to_string());
        let caps = VERSION_RE.captures(s).ok_or_else(invalid)?;
        let part = |index: usize| -> Result<u32> {
            caps.get(index)
                .map_or(Ok(0), |m| m.as_str().parse::<u32>().map_err(|_| invalid()))
        };
        Ok(Self::new(part(1)?, part(2)?, part(3)?))
    }
}

impl TryFrom<String> for ToolkitVersion {
    type Error = AutomateError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ToolkitVersion> for String {
    fn from(value: ToolkitVersion) -> Self {
        value.to_string()
    }
}

/// Classification of an authoring edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VersionChangeKind {
    NonBreaking,
    Breaking,
}

/// One entry of a pattern's pending change log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VersionChange {
    pub kind: VersionChangeKind,
    pub message: String,
}

impl VersionChange {
    pub fn new(kind: VersionChangeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// How the author wants the next toolkit version chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionInstruction {
    /// Derive the version from the pending change log.
    #[default]
    Auto,
    /// Use this version; it must increase, and must bump the major version
    /// when breaking changes are pending.
    Explicit(ToolkitVersion),
    /// Use this version; it must increase, but may keep the major version
    /// despite breaking changes.
    Forced(ToolkitVersion),
}

/// Computes the version to stamp on the next packaged toolkit.
///
/// # Errors
///
/// Returns [`AutomateError::VersionNotIncreased`] when an explicit version is
/// not greater than `current`, and
/// [`AutomateError::BreakingChangeRequiresMajor`] when an
/// [`Explicit`](VersionInstruction::Explicit) version keeps the major version
/// while a breaking change is pending.
///
/// # Examples
///
/// ```
/// use automate_core::*;
///
/// let current = ToolkitVersion::new(1, 4, 0);
/// let changes = vec![VersionChange::new(VersionChangeKind::Breaking, "deleted attribute")];
/// let next = next_version(current, &changes, VersionInstruction::Auto).unwrap();
/// assert_eq!(next, ToolkitVersion::new(2, 0, 0));
/// ```
pub fn next_version(
    current: ToolkitVersion,
    pending: &[VersionChange],
    instruction: VersionInstruction,
) -> Result<ToolkitVersion> {
    let has_breaking = pending
        .iter()
        .any(|change| change.kind == VersionChangeKind::Breaking);

    match instruction {
        VersionInstruction::Auto => Ok(if has_breaking {
            current.next_major()
        } else {
            current.next_minor()
        }),
        VersionInstruction::Explicit(requested) | VersionInstruction::Forced(requested) => {
            if requested <= current {
                return Err(AutomateError::VersionNotIncreased {
                    requested: requested.to_string(),
                    current: current.to_string(),
                });
            }
            let forced = matches!(instruction, VersionInstruction::Forced(_));
            if has_breaking && !forced && requested.major() <= current.major() {
                return Err(AutomateError::BreakingChangeRequiresMajor {
                    requested: requested.to_string(),
                    current: current.to_string(),
                });
            }
            Ok(requested)
        }
    }
}
