use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A deployment version: `major.minor[.build[.revision]]`.
///
/// Ordering is lexicographic over the components. An absent component orders
/// before any present one, so `1.0 < 1.0.0 < 1.0.0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    major: u32,
    minor: u32,
    build: Option<u32>,
    revision: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionParseError {
    #[error("version string is empty")]
    Empty,
    #[error("version '{input}' has {count} components, expected 2 to 4")]
    ComponentCount { input: String, count: usize },
    #[error("version component '{component}' in '{input}' is not a non-negative integer")]
    InvalidComponent { input: String, component: String },
    #[error("version component '{component}' in '{input}' is out of range")]
    OutOfRange { input: String, component: String },
}

impl Version {
    #[must_use]
    pub const fn new(major: u32, minor: u32, build: u32, revision: u32) -> Self {
        Self {
            major,
            minor,
            build: Some(build),
            revision: Some(revision),
        }
    }

    #[must_use]
    pub const fn major(&self) -> u32 {
        self.major
    }

    #[must_use]
    pub const fn minor(&self) -> u32 {
        self.minor
    }

    #[must_use]
    pub const fn build(&self) -> Option<u32> {
        self.build
    }

    #[must_use]
    pub const fn revision(&self) -> Option<u32> {
        self.revision
    }

    /// Parse a dotted version string.
    ///
    /// # Errors
    /// Returns an error for empty input, fewer than two or more than four
    /// components, or components that are not plain decimal `u32` values.
    pub fn parse(input: &str) -> Result<Self, VersionParseError> {
        if input.is_empty() {
            return Err(VersionParseError::Empty);
        }

        let parts: Vec<&str> = input.split('.').collect();
        if !(2..=4).contains(&parts.len()) {
            return Err(VersionParseError::ComponentCount {
                input: input.to_string(),
                count: parts.len(),
            });
        }

        let values = parts
            .iter()
            .map(|part| parse_component(input, part))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            major: values[0],
            minor: values[1],
            build: values.get(2).copied(),
            revision: values.get(3).copied(),
        })
    }
}

fn parse_component(input: &str, part: &str) -> Result<u32, VersionParseError> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VersionParseError::InvalidComponent {
            input: input.to_string(),
            component: part.to_string(),
        });
    }

    part.parse::<u32>()
        .map_err(|_| VersionParseError::OutOfRange {
            input: input.to_string(),
            component: part.to_string(),
        })
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if let Some(build) = self.build {
            write!(f, ".{build}")?;
            if let Some(revision) = self.revision {
                write!(f, ".{revision}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Version, VersionParseError};

    fn v(input: &str) -> Version {
        Version::parse(input).expect("version should parse")
    }

    #[test]
    fn parses_two_to_four_components() {
        assert_eq!(v("1.2").to_string(), "1.2");
        assert_eq!(v("1.2.3").to_string(), "1.2.3");
        assert_eq!(v("1.2.3.4"), Version::new(1, 2, 3, 4));
        assert_eq!(v("0.0.0.0").build(), Some(0));
        assert_eq!(v("1.2").revision(), None);
    }

    #[test]
    fn rejects_malformed_versions() {
        assert_eq!(Version::parse(""), Err(VersionParseError::Empty));
        assert!(matches!(
            Version::parse("1"),
            Err(VersionParseError::ComponentCount { count: 1, .. })
        ));
        assert!(matches!(
            Version::parse("1.2.3.4.5"),
            Err(VersionParseError::ComponentCount { count: 5, .. })
        ));
        assert!(matches!(
            Version::parse("1.x.0.0"),
            Err(VersionParseError::InvalidComponent { ref component, .. }) if component == "x"
        ));
        assert!(matches!(
            Version::parse("1..0"),
            Err(VersionParseError::InvalidComponent { .. })
        ));
        assert!(matches!(
            Version::parse("-1.0"),
            Err(VersionParseError::InvalidComponent { .. })
        ));
        assert!(matches!(
            Version::parse("1.0 "),
            Err(VersionParseError::InvalidComponent { .. })
        ));
        assert!(matches!(
            Version::parse("1.4294967296"),
            Err(VersionParseError::OutOfRange { .. })
        ));
    }

    #[test]
    fn compares_lexicographically() {
        assert!(v("1.2.0.0") > v("1.0.0.0"));
        assert!(v("2.0.0.0") > v("1.9.9.9"));
        assert!(v("1.0.0.10") > v("1.0.0.9"));
        assert!(v("1.10") > v("1.9.9.9"));
        assert_eq!(v("3.1.4.1"), v("3.1.4.1"));
    }

    #[test]
    fn missing_components_order_first() {
        assert!(v("1.0") < v("1.0.0"));
        assert!(v("1.0.0") < v("1.0.0.0"));
        assert!(v("1.0.1") > v("1.0.0.5"));
    }
}
