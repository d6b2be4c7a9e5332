// src/version/feature.rs

use std::fmt;

use super::Version;
use crate::errors::{Result, StayOpenError};

/// Tool behaviour that only exists from a given version onwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// `-stay_open True -@ -` daemon mode.
    StayOpen,
}

impl Feature {
    /// Minimum tool version supporting this feature.
    pub const fn min_version(self) -> Version {
        match self {
            Feature::StayOpen => Version::new(8, 36, 0),
        }
    }

    pub fn is_supported(self, version: &Version) -> bool {
        *version >= self.min_version()
    }

    /// Fail with `UnsupportedCapability` unless `detected` is new enough.
    ///
    /// An unknown version never satisfies a feature requirement.
    pub fn ensure_supported(self, detected: Option<&Version>) -> Result<()> {
        match detected {
            Some(v) if self.is_supported(v) => Ok(()),
            _ => Err(StayOpenError::UnsupportedCapability {
                feature: self,
                required: self.min_version(),
                detected: detected.copied(),
            }),
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feature::StayOpen => f.write_str("stay_open mode"),
        }
    }
}
