//! The check every version-sensitive call site makes before issuing a request.
//!
//! A denial is an ordinary value: call sites branch to their legacy endpoint or
//! surface a "not supported on this server" result. Only an unregistered
//! capability name is an error, since it can only come from an SDK defect.

use crate::error::{CapabilityError, Result};
use crate::registry::CapabilityRegistry;
use hisdk_core::Version;
use serde::Serialize;
use std::fmt;
use tracing::{debug, error};

/// Why a capability was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialCause {
    /// Detected server is older than the capability
    BelowMinimum,
    /// No usable server version was detected for the connection
    VersionUnknown,
    /// Switched off through configuration
    DisabledByConfig,
}

/// Structured denial, renderable as a single log or error line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityDenial {
    capability: String,
    required: Version,
    detected: Option<Version>,
    cause: DenialCause,
}

impl CapabilityDenial {
    pub(crate) fn new(
        capability: impl Into<String>,
        required: Version,
        detected: Option<Version>,
        cause: DenialCause,
    ) -> Self {
        Self {
            capability: capability.into(),
            required,
            detected,
            cause,
        }
    }

    /// Capability that was denied.
    #[must_use]
    pub fn capability(&self) -> &str {
        &self.capability
    }

    /// Minimum version the capability needs.
    #[must_use]
    pub fn required(&self) -> &Version {
        &self.required
    }

    /// Detected server version, if one is known.
    #[must_use]
    pub fn detected(&self) -> Option<&Version> {
        self.detected.as_ref()
    }

    /// Detected version as display text, `unknown` when undetected.
    #[must_use]
    pub fn detected_display(&self) -> String {
        self.detected
            .as_ref()
            .map_or_else(|| "unknown".to_string(), Version::to_display_string)
    }

    /// Why the capability was denied.
    #[must_use]
    pub fn cause(&self) -> DenialCause {
        self.cause
    }

    /// Human-readable reason naming the capability and both versions.
    #[must_use]
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CapabilityDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cause {
            DenialCause::BelowMinimum => write!(
                f,
                "capability '{}' requires server version {} or later, detected {}",
                self.capability,
                self.required,
                self.detected_display()
            ),
            DenialCause::VersionUnknown => write!(
                f,
                "capability '{}' requires server version {} or later, server version is unknown",
                self.capability, self.required
            ),
            DenialCause::DisabledByConfig => write!(
                f,
                "capability '{}' is disabled by configuration (requires {}, detected {})",
                self.capability,
                self.required,
                self.detected_display()
            ),
        }
    }
}

/// Outcome of a capability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityDecision {
    /// The operation may proceed
    Allowed,
    /// The operation must take its fallback path
    Denied(CapabilityDenial),
}

impl CapabilityDecision {
    /// Check if the capability is available
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// Get the denial, if denied
    #[must_use]
    pub fn denial(&self) -> Option<&CapabilityDenial> {
        match self {
            Self::Denied(denial) => Some(denial),
            Self::Allowed => None,
        }
    }

    /// Get the denial reason, if denied
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.denial().map(CapabilityDenial::reason)
    }

    /// Turn a denial into [`CapabilityError::Denied`].
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Allowed => Ok(()),
            Self::Denied(denial) => Err(CapabilityError::Denied(denial)),
        }
    }
}

/// Capability check against a registry.
#[derive(Debug, Clone, Copy)]
pub struct CapabilityGate<'r> {
    registry: &'r CapabilityRegistry,
}

impl<'r> CapabilityGate<'r> {
    /// Create a gate over the given registry.
    #[must_use]
    pub fn new(registry: &'r CapabilityRegistry) -> Self {
        Self { registry }
    }

    /// Registry the gate consults.
    #[must_use]
    pub fn registry(&self) -> &'r CapabilityRegistry {
        self.registry
    }

    /// Decide whether `capability` is available on `detected`.
    ///
    /// Allowed iff `detected >= minimum`.
    ///
    /// # Errors
    /// Returns [`CapabilityError::UnknownCapability`] if the name was never registered.
    pub fn check_capability(
        &self,
        capability: impl AsRef<str>,
        detected: &Version,
    ) -> Result<CapabilityDecision> {
        let name = capability.as_ref();
        let required = self.minimum_version(name)?;

        if detected.is_at_least(required) {
            debug!(capability = name, %detected, %required, "capability allowed");
            return Ok(CapabilityDecision::Allowed);
        }

        let denial = CapabilityDenial::new(
            name,
            required.clone(),
            Some(detected.clone()),
            DenialCause::BelowMinimum,
        );
        debug!(capability = name, reason = %denial, "capability denied");
        Ok(CapabilityDecision::Denied(denial))
    }

    /// Like [`check_capability`](Self::check_capability), but a denial is an error.
    ///
    /// For capabilities the calling operation cannot do without.
    pub fn require(&self, capability: impl AsRef<str>, detected: &Version) -> Result<()> {
        self.check_capability(capability, detected)?.into_result()
    }

    /// Decision for every registered capability.
    #[must_use]
    pub fn matrix(&self, detected: &Version) -> CapabilityMatrix {
        let rows = self
            .registry
            .capabilities()
            .map(|entry| MatrixRow {
                name: entry.name().to_string(),
                since: entry.since().clone(),
                mandatory: entry.is_mandatory(),
                allowed: detected.is_at_least(entry.since()),
            })
            .collect();

        CapabilityMatrix {
            detected: Some(detected.clone()),
            rows,
        }
    }

    pub(crate) fn minimum_version(&self, name: &str) -> Result<&'r Version> {
        self.registry.minimum_version_for(name).inspect_err(|_| {
            error!(capability = name, "check against unregistered capability");
        })
    }
}

impl CapabilityGate<'static> {
    /// Gate over [`CapabilityRegistry::standard`].
    #[must_use]
    pub fn standard() -> Self {
        Self::new(CapabilityRegistry::standard())
    }
}

/// One capability's status in a [`CapabilityMatrix`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatrixRow {
    /// Capability identifier
    pub name: String,
    /// Minimum version
    pub since: Version,
    /// Whether the SDK requires it
    pub mandatory: bool,
    /// Whether the detected server provides it
    pub allowed: bool,
}

/// Every registered capability with its decision for one server version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityMatrix {
    /// Detected server version (`None` when detection failed)
    pub detected: Option<Version>,
    /// Rows sorted by capability name
    pub rows: Vec<MatrixRow>,
}

impl CapabilityMatrix {
    /// Names of the allowed capabilities.
    pub fn allowed(&self) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .filter(|row| row.allowed)
            .map(|row| row.name.as_str())
    }

    /// Names of the denied capabilities.
    pub fn denied(&self) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .filter(|row| !row.allowed)
            .map(|row| row.name.as_str())
    }

    /// Whether every mandatory capability is allowed.
    #[must_use]
    pub fn is_compatible(&self) -> bool {
        self.rows.iter().all(|row| row.allowed || !row.mandatory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::KnownCapability;

    fn push_registry() -> CapabilityRegistry {
        let mut builder = CapabilityRegistry::builder();
        builder
            .register("push-notifications", Version::new(2, 40, 0))
            .expect("register push");
        builder.build()
    }

    #[test]
    fn test_denied_below_minimum() {
        let registry = push_registry();
        let gate = CapabilityGate::new(&registry);

        let decision = gate
            .check_capability("push-notifications", &Version::new(2, 39, 5))
            .expect("known capability");
        assert!(!decision.is_allowed());

        let reason = decision.reason().expect("denied has reason");
        assert!(reason.contains("push-notifications"));
        assert!(reason.contains("2.40"));
        assert!(reason.contains("2.39.5"));
        assert_eq!(
            reason,
            "capability 'push-notifications' requires server version 2.40 or later, detected 2.39.5"
        );

        let denial = decision.denial().expect("denial");
        assert_eq!(denial.cause(), DenialCause::BelowMinimum);
        assert_eq!(denial.required(), &Version::new(2, 40, 0));
        assert_eq!(denial.detected(), Some(&Version::new(2, 39, 5)));
    }

    #[test]
    fn test_allowed_at_and_above_minimum() {
        let registry = push_registry();
        let gate = CapabilityGate::new(&registry);

        for detected in [Version::new(2, 40, 0), Version::new(2, 40, 3), Version::new(3, 0, 0)] {
            let decision = gate
                .check_capability("push-notifications", &detected)
                .expect("known capability");
            assert_eq!(decision, CapabilityDecision::Allowed, "{detected}");
            assert!(decision.reason().is_none());
        }
    }

    #[test]
    fn test_build_label_does_not_affect_decision() {
        let registry = push_registry();
        let gate = CapabilityGate::new(&registry);
        let rc = Version::parse("2.40.0-RC1.abc123").expect("parse");
        assert!(gate
            .check_capability("push-notifications", &rc)
            .expect("known capability")
            .is_allowed());
    }

    #[test]
    fn test_unknown_capability_is_distinct() {
        let registry = push_registry();
        let gate = CapabilityGate::new(&registry);
        let err = gate
            .check_capability("nonexistent-capability", &Version::new(2, 42, 0))
            .expect_err("unknown capability");
        assert!(matches!(err, CapabilityError::UnknownCapability { .. }));
    }

    #[test]
    fn test_require() {
        let registry = push_registry();
        let gate = CapabilityGate::new(&registry);

        assert!(gate
            .require("push-notifications", &Version::new(2, 41, 0))
            .is_ok());

        let err = gate
            .require("push-notifications", &Version::new(2, 38, 0))
            .expect_err("denied");
        match err {
            CapabilityError::Denied(denial) => {
                assert_eq!(denial.capability(), "push-notifications");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_standard_gate_accepts_known_enum() {
        let gate = CapabilityGate::standard();
        let detected = Version::new(2, 37, 0);

        assert!(gate
            .check_capability(KnownCapability::MetadataDependencies, &detected)
            .expect("known")
            .is_allowed());
        assert!(!gate
            .check_capability(KnownCapability::TrackerImportAsync, &detected)
            .expect("known")
            .is_allowed());
    }

    #[test]
    fn test_matrix() {
        let gate = CapabilityGate::standard();
        let matrix = gate.matrix(&Version::new(2, 39, 0));

        assert_eq!(matrix.rows.len(), KnownCapability::all().len());
        assert!(matrix.is_compatible());
        assert!(matrix.allowed().any(|name| name == "data-value-sets-by-attribute"));
        assert!(matrix.denied().any(|name| name == "push-notifications"));

        let old = gate.matrix(&Version::new(2, 28, 0));
        assert!(!old.is_compatible());
        assert_eq!(old.allowed().count(), 0);
    }

    #[test]
    fn test_matrix_serializes() {
        let gate = CapabilityGate::standard();
        let json = serde_json::to_value(gate.matrix(&Version::new(2, 40, 1))).expect("serialize");
        assert_eq!(json["detected"], "2.40.1");
        assert!(json["rows"].as_array().expect("rows array").len() > 1);
    }
}
