//! Server release numbers.
//!
//! A [`Version`] is parsed once from the version string the server reports in
//! its system-info response and is ordered by `(major, minor, patch)` only.
//! The `build` and `revision` parts are carried for display and logging.
//!
//! # Grammar
//!
//! The input is trimmed and split on `.` and `-`:
//!
//! - the first two segments are `major` and `minor` and must be numeric;
//! - the third segment is `patch` when it is numeric and follows a `.`;
//! - the next segment is `build`, kept verbatim;
//! - any further segments are joined with `.` into `revision`.
//!
//! `"2.38.0-RC1.12345"` therefore parses to `2.38.0`, build `RC1`,
//! revision `12345`, and displays as `"2.38-RC1.12345"`.

use crate::error::VersionParseError;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A server release number.
///
/// Equality, ordering and hashing only look at `(major, minor, patch)`, so
/// `2.40-RC1` and `2.40-RC2` compare equal.
#[derive(Debug, Clone)]
pub struct Version {
    major: u32,
    minor: u32,
    patch: u32,
    build: Option<String>,
    revision: Option<String>,
}

impl Version {
    /// Create a version from its numeric components.
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            build: None,
            revision: None,
        }
    }

    /// Attach a build label such as `RC1` or `SNAPSHOT`.
    #[must_use]
    pub fn with_build(mut self, build: impl Into<String>) -> Self {
        self.build = Some(build.into());
        self
    }

    /// Attach a revision, typically the source control hash of the build.
    #[must_use]
    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    /// Parse a server version string.
    ///
    /// Never panics; malformed input yields an error and never a partially
    /// populated value.
    pub fn parse(raw: &str) -> Result<Self, VersionParseError> {
        let input = raw.trim();
        if input.is_empty() {
            return Err(VersionParseError::Empty);
        }

        let segments = split_segments(input);
        if segments.iter().any(|segment| segment.token.is_empty()) {
            return Err(VersionParseError::EmptyComponent {
                input: input.to_string(),
            });
        }
        if segments.len() < 2 {
            return Err(VersionParseError::TooFewComponents {
                input: input.to_string(),
            });
        }

        let major = numeric_component("major", segments[0].token, input)?;
        let minor = numeric_component("minor", segments[1].token, input)?;

        let mut rest = &segments[2..];
        let mut patch = 0;
        if let Some((first, tail)) = rest.split_first() {
            if first.delimiter == Some('.') && is_digits(first.token) {
                patch = numeric_component("patch", first.token, input)?;
                rest = tail;
            }
        }

        let build = rest.first().map(|segment| segment.token.to_string());
        let revision = (rest.len() > 1).then(|| {
            rest[1..]
                .iter()
                .map(|segment| segment.token)
                .collect::<Vec<_>>()
                .join(".")
        });

        Ok(Self {
            major,
            minor,
            patch,
            build,
            revision,
        })
    }

    /// Major component.
    #[must_use]
    pub const fn major(&self) -> u32 {
        self.major
    }

    /// Minor component.
    #[must_use]
    pub const fn minor(&self) -> u32 {
        self.minor
    }

    /// Patch component (0 when the server did not report one).
    #[must_use]
    pub const fn patch(&self) -> u32 {
        self.patch
    }

    /// Build label, if any.
    #[must_use]
    pub fn build(&self) -> Option<&str> {
        self.build.as_deref()
    }

    /// Revision, if any.
    #[must_use]
    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    /// Whether this version is the same release as `minimum` or a later one.
    #[must_use]
    pub fn is_at_least(&self, minimum: &Version) -> bool {
        self >= minimum
    }

    /// Canonical textual form, see the module documentation.
    #[must_use]
    pub fn to_display_string(&self) -> String {
        self.to_string()
    }

    fn key(&self) -> (u32, u32, u32) {
        (self.major, self.minor, self.patch)
    }
}

struct Segment<'a> {
    delimiter: Option<char>,
    token: &'a str,
}

fn split_segments(input: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut delimiter = None;
    let mut start = 0;

    for (index, ch) in input.char_indices() {
        if ch == '.' || ch == '-' {
            segments.push(Segment {
                delimiter,
                token: &input[start..index],
            });
            delimiter = Some(ch);
            start = index + ch.len_utf8();
        }
    }
    segments.push(Segment {
        delimiter,
        token: &input[start..],
    });

    segments
}

fn is_digits(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

fn numeric_component(
    component: &'static str,
    token: &str,
    input: &str,
) -> Result<u32, VersionParseError> {
    let invalid = || VersionParseError::InvalidComponent {
        component,
        token: token.to_string(),
        input: input.to_string(),
    };

    if !is_digits(token) {
        return Err(invalid());
    }
    token.parse().map_err(|_| invalid())
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if self.patch > 0 {
            write!(f, ".{}", self.patch)?;
        }
        if let Some(build) = &self.build {
            write!(f, "-{build}")?;
        }
        if let Some(revision) = &self.revision {
            write!(f, ".{revision}")?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(raw: &str) -> Version {
        Version::parse(raw).expect("valid version")
    }

    #[test]
    fn test_parse_full_release() {
        let v = parsed("2.40.1");
        assert_eq!((v.major(), v.minor(), v.patch()), (2, 40, 1));
        assert_eq!(v.build(), None);
        assert_eq!(v.revision(), None);
        assert_eq!(v.to_display_string(), "2.40.1");
    }

    #[test]
    fn test_parse_two_components() {
        let v = parsed("2.37");
        assert_eq!((v.major(), v.minor(), v.patch()), (2, 37, 0));
        assert_eq!(v.to_display_string(), "2.37");
    }

    #[test]
    fn test_parse_build_and_revision() {
        let v = parsed("2.38.0-RC1.12345");
        assert_eq!((v.major(), v.minor(), v.patch()), (2, 38, 0));
        assert_eq!(v.build(), Some("RC1"));
        assert_eq!(v.revision(), Some("12345"));
        assert_eq!(v.to_display_string(), "2.38-RC1.12345");
    }

    #[test]
    fn test_parse_snapshot_without_patch() {
        let v = parsed("2.41-SNAPSHOT");
        assert_eq!(v.patch(), 0);
        assert_eq!(v.build(), Some("SNAPSHOT"));
        assert_eq!(v.to_display_string(), "2.41-SNAPSHOT");
    }

    #[test]
    fn test_numeric_segment_after_hyphen_is_build() {
        let v = parsed("2.40-7");
        assert_eq!(v.patch(), 0);
        assert_eq!(v.build(), Some("7"));
    }

    #[test]
    fn test_non_numeric_third_segment_is_build() {
        let v = parsed("2.39.beta");
        assert_eq!(v.patch(), 0);
        assert_eq!(v.build(), Some("beta"));
    }

    #[test]
    fn test_extra_segments_join_into_revision() {
        let v = parsed("2.40.2-RC1.abc-def.9");
        assert_eq!(v.build(), Some("RC1"));
        assert_eq!(v.revision(), Some("abc.def.9"));
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        assert_eq!(parsed("  2.40.1\n"), Version::new(2, 40, 1));
    }

    #[test]
    fn test_malformed_inputs() {
        assert_eq!(Version::parse(""), Err(VersionParseError::Empty));
        assert_eq!(Version::parse("   "), Err(VersionParseError::Empty));
        assert!(matches!(
            Version::parse("bad"),
            Err(VersionParseError::TooFewComponents { .. })
        ));
        assert!(matches!(
            Version::parse("2"),
            Err(VersionParseError::TooFewComponents { .. })
        ));
        assert!(matches!(
            Version::parse("v2.40"),
            Err(VersionParseError::InvalidComponent { component: "major", .. })
        ));
        assert!(matches!(
            Version::parse("2.x"),
            Err(VersionParseError::InvalidComponent { component: "minor", .. })
        ));
        assert!(matches!(
            Version::parse("2..40"),
            Err(VersionParseError::EmptyComponent { .. })
        ));
        assert!(matches!(
            Version::parse("2.40-"),
            Err(VersionParseError::EmptyComponent { .. })
        ));
        assert!(matches!(
            Version::parse("-2.40"),
            Err(VersionParseError::EmptyComponent { .. })
        ));
    }

    #[test]
    fn test_component_overflow() {
        assert!(matches!(
            Version::parse("99999999999.1"),
            Err(VersionParseError::InvalidComponent { component: "major", .. })
        ));
        assert!(matches!(
            Version::parse("2.40.99999999999"),
            Err(VersionParseError::InvalidComponent { component: "patch", .. })
        ));
    }

    #[test]
    fn test_ordering_ignores_build_and_revision() {
        let rc1 = Version::new(2, 40, 0).with_build("RC1");
        let rc2 = Version::new(2, 40, 0).with_build("RC2").with_revision("abc");
        assert_eq!(rc1, rc2);
        assert_eq!(rc1.cmp(&rc2), Ordering::Equal);
    }

    #[test]
    fn test_ordering_short_circuits() {
        assert!(Version::new(3, 0, 0) > Version::new(2, 99, 99));
        assert!(Version::new(2, 40, 0) > Version::new(2, 39, 5));
        assert!(Version::new(2, 40, 1) > Version::new(2, 40, 0));
        assert!(Version::new(2, 39, 5).is_at_least(&Version::new(2, 39, 0)));
        assert!(!Version::new(2, 39, 5).is_at_least(&Version::new(2, 40, 0)));
    }

    #[test]
    fn test_from_str() {
        let v: Version = "2.42.3".parse().expect("parse via FromStr");
        assert_eq!(v, Version::new(2, 42, 3));
    }

    #[test]
    fn test_serde_as_string() {
        let v = parsed("2.38.0-RC1.12345");
        let json = serde_json::to_string(&v).expect("serialize version");
        assert_eq!(json, r#""2.38-RC1.12345""#);

        let back: Version = serde_json::from_str(&json).expect("deserialize version");
        assert_eq!(back.build(), Some("RC1"));
        assert_eq!(back.revision(), Some("12345"));

        let err = serde_json::from_str::<Version>(r#""nope""#);
        assert!(err.is_err());
    }
}
