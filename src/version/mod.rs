// src/version/mod.rs

//! Tool version detection and capability gating.
//!
//! - [`Version`] is the parsed `major.minor.patch` triple reported by
//!   `<tool> -ver`.
//! - [`cache`] memoizes the detected version per executable path.
//! - [`feature`] maps optional tool behaviour to the minimum version that
//!   supports it.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::StayOpenError;

pub mod cache;
pub mod feature;

pub use cache::VersionCache;
pub use feature::Feature;

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)(?:\.(\d+))?(?:\.(\d+))?$").expect("version pattern is valid")
});

/// Version number reported by the external tool.
///
/// Ordering is lexicographic over `(major, minor, patch)`, which is what the
/// derived `Ord` gives us thanks to the field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    major: u32,
    minor: u32,
    patch: u32,
}

impl Version {
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
}

impl FromStr for Version {
    type Err = StayOpenError;

    /// Parse `"N"`, `"N.N"` or `"N.N.N"`; missing components are zero.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || StayOpenError::InvalidVersion(s.to_string());

        let caps = VERSION_RE.captures(s.trim()).ok_or_else(invalid)?;
        let component = |idx: usize| -> Result<u32, StayOpenError> {
            match caps.get(idx) {
                Some(m) => m.as_str().parse().map_err(|_| invalid()),
                None => Ok(0),
            }
        };

        Ok(Version::new(component(1)?, component(2)?, component(3)?))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
