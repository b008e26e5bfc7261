//! MAJOR.MINOR asset versions.

use std::fmt;
use std::str::FromStr;

use catalog_types::CatalogError;

/// Version assigned to an asset on its first write.
pub const BASE_VERSION: &str = "0.1";

/// A parsed `<major>.<minor>` version.
///
/// Ordering is numeric on `(major, minor)`, so `0.10` sorts after `0.9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
}

impl Version {
    pub const BASE: Version = Version { major: 0, minor: 1 };

    /// Version following this one. Only the minor component moves.
    ///
    /// Fails when the minor component is already at its maximum.
    pub fn next(self, changed: bool) -> Result<Version, CatalogError> {
        if !changed {
            return Ok(self);
        }
        let minor = self
            .minor
            .checked_add(1)
            .ok_or_else(|| CatalogError::VersionOverflow(self.to_string()))?;
        Ok(Version {
            major: self.major,
            minor,
        })
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::BASE
    }
}

impl FromStr for Version {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CatalogError::InvalidVersionFormat(s.to_string());
        let (major, minor) = s.split_once('.').ok_or_else(invalid)?;
        let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if !digits(major) || !digits(minor) {
            return Err(invalid());
        }
        Ok(Version {
            major: major.parse().map_err(|_| invalid())?,
            minor: minor.parse().map_err(|_| invalid())?,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

pub fn parse_version(s: &str) -> Result<Version, CatalogError> {
    s.parse()
}

/// Compute the version string that follows `current`.
///
/// An unchanged asset keeps its version verbatim.
pub fn next_version(current: &str, changed: bool) -> Result<String, CatalogError> {
    let version = parse_version(current)?;
    if !changed {
        return Ok(current.to_string());
    }
    Ok(version.next(true)?.to_string())
}
