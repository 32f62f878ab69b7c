//! # Semantic Versions
//!
//! Three-component `major.minor.patch` versions for catalog entries. Every
//! republish of an entry installs a version strictly greater than the one it
//! supersedes, so `Version` carries a total order and a bump operation that
//! is guaranteed to produce a larger value.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A `major.minor.patch` version.
///
/// Ordering is lexicographic over `(major, minor, patch)`, which matches
/// semantic-version precedence for the plain three-component form used in
/// the catalog (no pre-release or build metadata).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// Major component. Bumped for incompatible rewrites.
    pub major: u64,
    /// Minor component. Bumped for feature releases.
    pub minor: u64,
    /// Patch component. Bumped for fixes; the default bump kind.
    pub patch: u64,
}

/// Which component a bump advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionBump {
    /// `X.Y.Z → (X+1).0.0`
    Major,
    /// `X.Y.Z → X.(Y+1).0`
    Minor,
    /// `X.Y.Z → X.Y.(Z+1)`
    Patch,
}

/// Errors from parsing a version string.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum VersionError {
    /// The string does not have exactly three dot-separated components.
    #[error("version {0:?} must have exactly three dot-separated components")]
    WrongComponentCount(String),

    /// A component is not a non-negative integer.
    #[error("version component {component:?} in {input:?} is not a non-negative integer")]
    InvalidComponent {
        /// The full input string.
        input: String,
        /// The offending component.
        component: String,
    },
}

impl Version {
    /// The initial version assigned to a newly created entry.
    pub const V1: Version = Version {
        major: 1,
        minor: 0,
        patch: 0,
    };

    /// Construct a version from its components.
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Return the version produced by applying `bump`.
    ///
    /// Always strictly greater than `self` under the derived ordering.
    pub fn bumped(&self, bump: VersionBump) -> Version {
        match bump {
            VersionBump::Major => Version::new(self.major + 1, 0, 0),
            VersionBump::Minor => Version::new(self.major, self.minor + 1, 0),
            VersionBump::Patch => Version::new(self.major, self.minor, self.patch + 1),
        }
    }

    /// Whether this is the initial `1.0.0` version.
    pub fn is_initial(&self) -> bool {
        *self == Self::V1
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 {
            return Err(VersionError::WrongComponentCount(s.to_string()));
        }
        let mut components = [0u64; 3];
        for (slot, part) in components.iter_mut().zip(&parts) {
            *slot = part
                .parse::<u64>()
                .map_err(|_| VersionError::InvalidComponent {
                    input: s.to_string(),
                    component: (*part).to_string(),
                })?;
        }
        Ok(Version::new(components[0], components[1], components[2]))
    }
}

// Versions serialize as their display string so the persisted record and the
// API surface both carry the plain `"X.Y.Z"` form.
impl Serialize for Version {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
