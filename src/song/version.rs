//! File format versions.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// The version of an UltraStar song file, consisting of a major, minor and
/// patch component. Versions are totally ordered by comparing the components
/// lexicographically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Version {
    /// The major component.
    pub major: u32,
    /// The minor component.
    pub minor: u32,
    /// The patch component.
    pub patch: u32,
}

impl Version {
    /// Version 0.1.0 of the UltraStar file format.
    pub const V0_1_0: Self = Self::new(0, 1, 0);
    /// Version 0.2.0 of the UltraStar file format.
    pub const V0_2_0: Self = Self::new(0, 2, 0);
    /// Version 0.3.0 of the UltraStar file format. Files without a `#VERSION`
    /// header are interpreted as this version.
    pub const V0_3_0: Self = Self::new(0, 3, 0);
    /// Version 1.0.0 of the UltraStar file format.
    pub const V1_0_0: Self = Self::new(1, 0, 0);
    /// Version 1.1.0 of the UltraStar file format.
    pub const V1_1_0: Self = Self::new(1, 1, 0);
    /// Version 1.2.0 of the UltraStar file format.
    pub const V1_2_0: Self = Self::new(1, 2, 0);
    /// Version 2.0.0 of the UltraStar file format.
    pub const V2_0_0: Self = Self::new(2, 0, 0);

    /// Creates a version from its components.
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Returns true if all components are zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.major == 0 && self.minor == 0 && self.patch == 0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// An error parsing a [`Version`] from its string representation.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseVersionError {
    /// The string did not consist of exactly three dot-separated components.
    #[error("version has {0} components instead of 3")]
    ComponentCount(usize),
    /// A component was not a valid unsigned integer.
    #[error("invalid version component: {0}")]
    InvalidComponent(String),
}

impl FromStr for Version {
    type Err = ParseVersionError;

    /// Parses a version from a triplet of integers separated by periods, such
    /// as `"1.0.0"` or `"15.3.6"`. Shorter formats like `"1.0"` or `"v4"` are
    /// not supported.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let components: Vec<&str> = s.split('.').collect();
        let [major, minor, patch] = components[..] else {
            return Err(ParseVersionError::ComponentCount(components.len()));
        };
        let parse = |c: &str| {
            c.parse::<u32>()
                .map_err(|err| ParseVersionError::InvalidComponent(err.to_string()))
        };
        Ok(Self::new(parse(major)?, parse(minor)?, parse(patch)?))
    }
}
