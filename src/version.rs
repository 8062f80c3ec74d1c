use regex::Regex;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VersionError {
    #[error("Invalid version '{0}', expected MAJOR.MINOR.PATCH")]
    Invalid(String),
    #[error("Invalid increment level '{0}', expected one of: patch, minor, major")]
    InvalidLevel(String),
    #[error("Cannot increment {level} of {version}: component overflow")]
    Overflow { version: Version, level: IncrementLevel },
    #[error(transparent)]
    Regex(#[from] regex::Error),
}

fn version_match_regex() -> Result<Regex, regex::Error> {
    Regex::new(r"^([0-9]+)\.([0-9]+)\.([0-9]+)$")
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IncrementLevel {
    Patch,
    Minor,
    Major,
}

impl IncrementLevel {
    pub const ALL: [IncrementLevel; 3] =
        [IncrementLevel::Patch, IncrementLevel::Minor, IncrementLevel::Major];

    pub fn as_str(&self) -> &'static str {
        match self {
            IncrementLevel::Patch => "patch",
            IncrementLevel::Minor => "minor",
            IncrementLevel::Major => "major",
        }
    }
}

impl FromStr for IncrementLevel {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IncrementLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| VersionError::InvalidLevel(s.to_string()))
    }
}

impl fmt::Display for IncrementLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A plain `MAJOR.MINOR.PATCH` version. Pre-release and build metadata are
/// rejected rather than carried along.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Version { major, minor, patch }
    }

    /// Parses `text` after trimming surrounding whitespace, the way version
    /// text usually sits inside an XML element.
    pub fn parse(text: &str) -> Result<Self, VersionError> {
        let invalid = || VersionError::Invalid(text.to_string());
        let regex = version_match_regex()?;
        let captures = regex.captures(text.trim()).ok_or_else(invalid)?;
        let component = |index: usize| -> Result<u64, VersionError> {
            captures
                .get(index)
                .and_then(|m| m.as_str().parse::<u64>().ok())
                .ok_or_else(invalid)
        };

        Ok(Version::new(component(1)?, component(2)?, component(3)?))
    }

    /// Computes the next version for `level`. Lower components reset to zero.
    pub fn increment(&self, level: IncrementLevel) -> Result<Version, VersionError> {
        let overflow = || VersionError::Overflow { version: *self, level };
        let next = match level {
            IncrementLevel::Patch => Version::new(
                self.major,
                self.minor,
                self.patch.checked_add(1).ok_or_else(overflow)?,
            ),
            IncrementLevel::Minor => {
                Version::new(self.major, self.minor.checked_add(1).ok_or_else(overflow)?, 0)
            }
            IncrementLevel::Major => {
                Version::new(self.major.checked_add(1).ok_or_else(overflow)?, 0, 0)
            }
        };
        Ok(next)
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let version = Version::parse("2.3.5").unwrap();
        assert_eq!(version, Version::new(2, 3, 5));
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let version = Version::parse("\n    1.0.12\n  ").unwrap();
        assert_eq!(version, Version::new(1, 0, 12));
    }

    #[test]
    fn test_parse_leading_zeros() {
        assert_eq!(Version::parse("01.002.3").unwrap(), Version::new(1, 2, 3));
    }

    #[test]
    fn test_parse_rejects_wrong_component_count() {
        assert!(Version::parse("1.2").is_err());
        assert!(Version::parse("1.2.3.4").is_err());
        assert!(Version::parse("").is_err());
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        assert!(matches!(
            Version::parse("1.x.3"),
            Err(VersionError::Invalid(text)) if text == "1.x.3"
        ));
        assert!(Version::parse("v1.2.3").is_err());
        assert!(Version::parse("1.-2.3").is_err());
        assert!(Version::parse("١.٢.٣").is_err());
    }

    #[test]
    fn test_parse_rejects_suffixes() {
        assert!(Version::parse("1.2.3-SNAPSHOT").is_err());
        assert!(Version::parse("1.2.3+build.7").is_err());
    }

    #[test]
    fn test_parse_rejects_overflowing_component() {
        assert!(Version::parse("1.2.99999999999999999999999").is_err());
    }

    #[test]
    fn test_display_is_canonical() {
        assert_eq!(Version::new(10, 0, 7).to_string(), "10.0.7");
        assert_eq!(Version::parse(" 01.02.03 ").unwrap().to_string(), "1.2.3");
    }

    #[test]
    fn test_format_then_parse_is_identity() {
        for version in [
            Version::new(0, 0, 0),
            Version::new(2, 3, 5),
            Version::new(u64::MAX, 1, 0),
        ] {
            assert_eq!(Version::parse(&version.to_string()).unwrap(), version);
        }
    }

    #[test]
    fn test_increment_patch() {
        let version = Version::new(2, 3, 5);
        assert_eq!(version.increment(IncrementLevel::Patch).unwrap(), Version::new(2, 3, 6));
    }

    #[test]
    fn test_increment_minor_resets_patch() {
        let version = Version::new(2, 3, 5);
        assert_eq!(version.increment(IncrementLevel::Minor).unwrap(), Version::new(2, 4, 0));
    }

    #[test]
    fn test_increment_major_resets_minor_and_patch() {
        let version = Version::new(2, 3, 5);
        assert_eq!(version.increment(IncrementLevel::Major).unwrap(), Version::new(3, 0, 0));
    }

    #[test]
    fn test_increment_rules_hold_across_versions() {
        for (major, minor, patch) in [(0, 0, 0), (0, 9, 99), (1, 0, 0), (7, 42, 3)] {
            let version = Version::new(major, minor, patch);
            assert_eq!(
                version.increment(IncrementLevel::Patch).unwrap(),
                Version::new(major, minor, patch + 1)
            );
            assert_eq!(
                version.increment(IncrementLevel::Minor).unwrap(),
                Version::new(major, minor + 1, 0)
            );
            assert_eq!(
                version.increment(IncrementLevel::Major).unwrap(),
                Version::new(major + 1, 0, 0)
            );
        }
    }

    #[test]
    fn test_increment_overflow_is_an_error() {
        let version = Version::new(1, 2, u64::MAX);
        assert!(matches!(
            version.increment(IncrementLevel::Patch),
            Err(VersionError::Overflow { level: IncrementLevel::Patch, .. })
        ));
        // minor bump discards the saturated patch, so it still succeeds
        assert_eq!(version.increment(IncrementLevel::Minor).unwrap(), Version::new(1, 3, 0));
    }

    #[test]
    fn test_level_from_str() {
        assert_eq!("patch".parse::<IncrementLevel>().unwrap(), IncrementLevel::Patch);
        assert_eq!("minor".parse::<IncrementLevel>().unwrap(), IncrementLevel::Minor);
        assert_eq!("major".parse::<IncrementLevel>().unwrap(), IncrementLevel::Major);
    }

    #[test]
    fn test_level_from_str_rejects_unknown_tokens() {
        assert!(matches!(
            "bugfix".parse::<IncrementLevel>(),
            Err(VersionError::InvalidLevel(token)) if token == "bugfix"
        ));
        assert!("PATCH".parse::<IncrementLevel>().is_err());
        assert!("".parse::<IncrementLevel>().is_err());
    }

    #[test]
    fn test_level_display_round_trips() {
        for level in IncrementLevel::ALL {
            assert_eq!(level.to_string().parse::<IncrementLevel>().unwrap(), level);
        }
    }
}
