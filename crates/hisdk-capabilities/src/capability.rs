//! Capability identifiers.
//!
//! Capabilities are keyed by stable kebab-case names so that the registry can
//! also be extended from TOML definitions. [`KnownCapability`] lists the
//! capabilities the SDK itself gates on, together with the server release
//! that introduced each one.

use crate::error::{CapabilityError, Result};
use hisdk_core::Version;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Capabilities the SDK's API wrappers gate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KnownCapability {
    /// `GET /api/system/info`; the handshake itself
    SystemInfo,
    /// Full metadata endpoints used for the initial metadata download
    MetadataApi,
    /// Event and enrollment endpoints of the pre-2.36 tracker
    TrackerSyncLegacy,
    /// Saved working lists for program stages
    ProgramStageWorkingLists,
    /// Lightweight `gist` metadata views
    MetadataGist,
    /// Relationship constraints on tracked entity types
    RelationshipConstraints,
    /// The `/api/tracker` import and export endpoints
    NewTrackerApi,
    /// Metadata dependency export for a single object
    MetadataDependencies,
    /// Asynchronous tracker imports polled through job reports
    TrackerImportAsync,
    /// Data value set queries filtered by attribute option combo
    DataValueSetsByAttribute,
    /// Server-sent push notifications
    PushNotifications,
    /// The route API for proxied external services
    RouteApi,
}

impl KnownCapability {
    /// Every built-in capability, in order of introduction.
    #[must_use]
    pub const fn all() -> &'static [KnownCapability] {
        &[
            Self::SystemInfo,
            Self::MetadataApi,
            Self::TrackerSyncLegacy,
            Self::ProgramStageWorkingLists,
            Self::MetadataGist,
            Self::RelationshipConstraints,
            Self::NewTrackerApi,
            Self::MetadataDependencies,
            Self::TrackerImportAsync,
            Self::DataValueSetsByAttribute,
            Self::PushNotifications,
            Self::RouteApi,
        ]
    }

    /// Stable identifier used as the registry key.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SystemInfo => "system-info",
            Self::MetadataApi => "metadata-api",
            Self::TrackerSyncLegacy => "tracker-sync-legacy",
            Self::ProgramStageWorkingLists => "program-stage-working-lists",
            Self::MetadataGist => "metadata-gist",
            Self::RelationshipConstraints => "relationship-constraints",
            Self::NewTrackerApi => "new-tracker-api",
            Self::MetadataDependencies => "metadata-dependencies",
            Self::TrackerImportAsync => "tracker-import-async",
            Self::DataValueSetsByAttribute => "data-value-sets-by-attribute",
            Self::PushNotifications => "push-notifications",
            Self::RouteApi => "route-api",
        }
    }

    /// Server release that introduced the capability.
    #[must_use]
    pub const fn since(&self) -> Version {
        match self {
            Self::SystemInfo | Self::MetadataApi | Self::TrackerSyncLegacy => {
                Version::new(2, 29, 0)
            }
            Self::ProgramStageWorkingLists => Version::new(2, 33, 0),
            Self::MetadataGist => Version::new(2, 34, 0),
            Self::RelationshipConstraints => Version::new(2, 35, 0),
            Self::NewTrackerApi => Version::new(2, 36, 0),
            Self::MetadataDependencies => Version::new(2, 37, 0),
            Self::TrackerImportAsync => Version::new(2, 38, 0),
            Self::DataValueSetsByAttribute => Version::new(2, 39, 0),
            Self::PushNotifications => Version::new(2, 40, 0),
            Self::RouteApi => Version::new(2, 41, 0),
        }
    }

    /// Whether the SDK cannot operate against a server lacking this capability.
    #[must_use]
    pub const fn is_mandatory(&self) -> bool {
        matches!(self, Self::SystemInfo | Self::MetadataApi)
    }

    /// Get a description of what this capability provides.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::SystemInfo => "Server self-description used for version detection",
            Self::MetadataApi => "Metadata download for programs, data sets and options",
            Self::TrackerSyncLegacy => "Event and enrollment sync through the legacy endpoints",
            Self::ProgramStageWorkingLists => "Saved working lists for program stages",
            Self::MetadataGist => "Compact metadata views without full object graphs",
            Self::RelationshipConstraints => "Relationship constraints on tracked entity types",
            Self::NewTrackerApi => "Tracker import and export through /api/tracker",
            Self::MetadataDependencies => "Dependency export for a single metadata object",
            Self::TrackerImportAsync => "Asynchronous tracker imports with job reports",
            Self::DataValueSetsByAttribute => "Data value set queries by attribute option combo",
            Self::PushNotifications => "Server-initiated push notifications",
            Self::RouteApi => "Proxied access to external services through routes",
        }
    }
}

impl fmt::Display for KnownCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for KnownCapability {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Validate capability name format: lowercase alphanumeric with hyphens, 2-64 chars.
pub fn validate_name(name: &str) -> Result<()> {
    static NAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = NAME_REGEX
        .get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9-]*[a-z0-9]$").expect("valid regex"));

    if name.len() < 2 || name.len() > 64 {
        return Err(CapabilityError::InvalidName {
            name: name.to_string(),
            reason: format!("must be 2-64 characters, got {}", name.len()),
        });
    }

    if regex.is_match(name) {
        Ok(())
    } else {
        Err(CapabilityError::InvalidName {
            name: name.to_string(),
            reason: "must be lowercase alphanumeric with hyphens".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_identifiers_are_unique_and_valid() {
        let mut seen = HashSet::new();
        for capability in KnownCapability::all() {
            assert!(seen.insert(capability.as_str()), "duplicate id {capability}");
            validate_name(capability.as_str()).expect("built-in id is valid");
            assert!(!capability.description().is_empty());
        }
    }

    #[test]
    fn test_all_is_ordered_by_introduction() {
        let versions: Vec<Version> = KnownCapability::all()
            .iter()
            .map(KnownCapability::since)
            .collect();
        assert!(versions.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn test_serde_uses_identifier() {
        let json = serde_json::to_string(&KnownCapability::PushNotifications)
            .expect("serialize capability");
        assert_eq!(json, r#""push-notifications""#);

        let back: KnownCapability =
            serde_json::from_str(r#""new-tracker-api""#).expect("deserialize capability");
        assert_eq!(back, KnownCapability::NewTrackerApi);
    }

    #[test]
    fn test_mandatory_set() {
        let mandatory: Vec<_> = KnownCapability::all()
            .iter()
            .filter(|c| c.is_mandatory())
            .collect();
        assert_eq!(
            mandatory,
            vec![&KnownCapability::SystemInfo, &KnownCapability::MetadataApi]
        );
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("push-notifications").is_ok());
        assert!(validate_name("x").is_err());
        assert!(validate_name("Push").is_err());
        assert!(validate_name("-leading").is_err());
        assert!(validate_name("trailing-").is_err());
        assert!(validate_name("with space").is_err());
        assert!(validate_name(&"a".repeat(65)).is_err());
    }
}
