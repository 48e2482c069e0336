//! Per-connection server version and the capability checks made against it.
//!
//! The transport layer fetches `GET /api/system/info` during the handshake and
//! hands the response to [`ServerConnection::record_system_info`]. The detected
//! version is published exactly once; every later check reads it without
//! locking. If the version cannot be parsed the connection fails closed and
//! every optional capability is denied.

use crate::error::{CapabilityError, Result};
use crate::gate::{
    CapabilityDecision, CapabilityDenial, CapabilityGate, CapabilityMatrix, DenialCause, MatrixRow,
};
use crate::registry::CapabilityRegistry;
use hisdk_core::{CompatibilityConfig, SdkConfig, Version, VersionParseError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// The parts of the server's system-info response used during the handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    /// Self-reported release, e.g. `2.40.1`
    pub version: String,
    /// Source control revision of the build
    pub revision: Option<String>,
    /// When the server build was produced
    pub build_time: Option<String>,
    /// Server clock at the time of the request
    pub server_date: Option<String>,
    /// Public base URL of the instance
    pub context_path: Option<String>,
    /// Instance name configured by the administrator
    pub system_name: Option<String>,
}

impl SystemInfo {
    /// Decode a system-info JSON body. Unknown fields are ignored.
    pub fn from_json(body: &str) -> serde_json::Result<Self> {
        serde_json::from_str(body)
    }
}

/// Outcome of version detection for one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectedVersion {
    /// The server reported a usable version
    Known(Version),
    /// The server's version string could not be parsed
    Unavailable {
        /// Raw string as reported
        raw: String,
        /// Why it was rejected
        error: VersionParseError,
    },
}

impl DetectedVersion {
    /// The version, if detection succeeded.
    #[must_use]
    pub fn version(&self) -> Option<&Version> {
        match self {
            Self::Known(version) => Some(version),
            Self::Unavailable { .. } => None,
        }
    }
}

impl fmt::Display for DetectedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(version) => write!(f, "{version}"),
            Self::Unavailable { raw, .. } => write!(f, "unknown ('{raw}')"),
        }
    }
}

/// Capability state for a single server connection.
///
/// `Send + Sync`; share it behind an `Arc` across the operations of one
/// connection.
#[derive(Debug)]
pub struct ServerConnection<'r> {
    gate: CapabilityGate<'r>,
    detected: OnceLock<DetectedVersion>,
    disabled: BTreeSet<String>,
    minimum_server_version: Version,
}

impl<'r> ServerConnection<'r> {
    /// Create a connection with no detected version yet.
    #[must_use]
    pub fn new(registry: &'r CapabilityRegistry) -> Self {
        Self {
            gate: CapabilityGate::new(registry),
            detected: OnceLock::new(),
            disabled: BTreeSet::new(),
            minimum_server_version: CompatibilityConfig::default().minimum_server_version,
        }
    }

    /// Create a connection honouring the compatibility and capability settings.
    ///
    /// Disabling a mandatory or unregistered capability has no effect and is
    /// logged as a warning.
    #[must_use]
    pub fn with_config(registry: &'r CapabilityRegistry, config: &SdkConfig) -> Self {
        let mut connection = Self::new(registry);
        connection.minimum_server_version = config.compatibility.minimum_server_version.clone();

        for name in &config.capabilities.disabled {
            match registry.get(name) {
                Ok(entry) if entry.is_mandatory() => {
                    warn!(capability = %name, "mandatory capability cannot be disabled");
                }
                Ok(_) => {
                    connection.disabled.insert(name.clone());
                }
                Err(_) => {
                    warn!(capability = %name, "ignoring unknown capability in disabled list");
                }
            }
        }

        connection
    }

    /// Registry used by this connection.
    #[must_use]
    pub fn registry(&self) -> &'r CapabilityRegistry {
        self.gate.registry()
    }

    /// Record the version string reported by the server.
    ///
    /// # Errors
    /// - [`CapabilityError::VersionAlreadyRecorded`] on a second call
    /// - [`CapabilityError::Version`] if the string does not parse; the
    ///   connection then stays usable with every optional capability denied
    pub fn record_version(&self, raw: &str) -> Result<Version> {
        let parsed = Version::parse(raw);
        let detected = match &parsed {
            Ok(version) => DetectedVersion::Known(version.clone()),
            Err(error) => DetectedVersion::Unavailable {
                raw: raw.to_string(),
                error: error.clone(),
            },
        };

        if self.detected.set(detected).is_err() {
            let existing = self
                .detected
                .get()
                .map_or_else(|| "unknown".to_string(), ToString::to_string);
            return Err(CapabilityError::VersionAlreadyRecorded { existing });
        }

        match parsed {
            Ok(version) => {
                info!(%version, "detected server version");
                Ok(version)
            }
            Err(error) => {
                warn!(raw, %error, "server version not parseable, optional capabilities disabled");
                Err(error.into())
            }
        }
    }

    /// Record the version from a system-info response.
    pub fn record_system_info(&self, system_info: &SystemInfo) -> Result<Version> {
        debug!(
            revision = system_info.revision.as_deref().unwrap_or("-"),
            system_name = system_info.system_name.as_deref().unwrap_or("-"),
            "received system info"
        );
        self.record_version(&system_info.version)
    }

    /// Detection outcome, `None` before the handshake.
    #[must_use]
    pub fn detected(&self) -> Option<&DetectedVersion> {
        self.detected.get()
    }

    /// Detected version, `None` before the handshake or when unparseable.
    #[must_use]
    pub fn detected_version(&self) -> Option<&Version> {
        self.detected.get().and_then(DetectedVersion::version)
    }

    /// Decide whether `capability` may be used on this connection.
    ///
    /// # Errors
    /// Returns [`CapabilityError::UnknownCapability`] if the name was never registered.
    pub fn check(&self, capability: impl AsRef<str>) -> Result<CapabilityDecision> {
        let name = capability.as_ref();
        let required = self.gate.minimum_version(name)?;
        let detected = self.detected_version();

        if self.disabled.contains(name) {
            let denial = CapabilityDenial::new(
                name,
                required.clone(),
                detected.cloned(),
                DenialCause::DisabledByConfig,
            );
            debug!(capability = name, reason = %denial, "capability denied");
            return Ok(CapabilityDecision::Denied(denial));
        }

        match detected {
            Some(version) => self.gate.check_capability(name, version),
            None => {
                let denial = CapabilityDenial::new(
                    name,
                    required.clone(),
                    None,
                    DenialCause::VersionUnknown,
                );
                debug!(capability = name, reason = %denial, "capability denied");
                Ok(CapabilityDecision::Denied(denial))
            }
        }
    }

    /// `true` only when the capability is allowed.
    ///
    /// Unregistered names are reported as unsupported (and logged as errors).
    #[must_use]
    pub fn is_supported(&self, capability: impl AsRef<str>) -> bool {
        self.check(capability)
            .map(|decision| decision.is_allowed())
            .unwrap_or(false)
    }

    /// Fail with [`CapabilityError::Denied`] unless the capability is allowed.
    pub fn require(&self, capability: impl AsRef<str>) -> Result<()> {
        self.check(capability)?.into_result()
    }

    /// Run `modern` if the capability is allowed, `legacy` otherwise.
    ///
    /// ```
    /// use hisdk_capabilities::{KnownCapability, ServerConnection};
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let connection = ServerConnection::standard();
    /// connection.record_version("2.35.4")?;
    ///
    /// let endpoint = connection.select(
    ///     KnownCapability::NewTrackerApi,
    ///     || "/api/tracker/trackedEntities",
    ///     || "/api/trackedEntityInstances",
    /// )?;
    /// assert_eq!(endpoint, "/api/trackedEntityInstances");
    /// # Ok(())
    /// # }
    /// ```
    pub fn select<T>(
        &self,
        capability: impl AsRef<str>,
        modern: impl FnOnce() -> T,
        legacy: impl FnOnce() -> T,
    ) -> Result<T> {
        Ok(if self.check(capability)?.is_allowed() {
            modern()
        } else {
            legacy()
        })
    }

    /// Verify the server meets the configured minimum version and provides
    /// every mandatory capability.
    ///
    /// # Errors
    /// Returns [`CapabilityError::IncompatibleServer`] otherwise.
    pub fn ensure_compatible(&self) -> Result<()> {
        let Some(detected) = self.detected_version() else {
            return Err(CapabilityError::IncompatibleServer {
                detected: self
                    .detected()
                    .map_or_else(|| "unknown".to_string(), ToString::to_string),
                required: self.minimum_server_version.to_string(),
            });
        };

        let minimum = self
            .registry()
            .mandatory()
            .map(|entry| entry.since())
            .chain(std::iter::once(&self.minimum_server_version))
            .max()
            .unwrap_or(&self.minimum_server_version);

        if detected.is_at_least(minimum) {
            Ok(())
        } else {
            Err(CapabilityError::IncompatibleServer {
                detected: detected.to_string(),
                required: minimum.to_string(),
            })
        }
    }

    /// Decision for every registered capability on this connection.
    #[must_use]
    pub fn matrix(&self) -> CapabilityMatrix {
        let detected = self.detected_version();
        let rows = self
            .registry()
            .capabilities()
            .map(|entry| MatrixRow {
                name: entry.name().to_string(),
                since: entry.since().clone(),
                mandatory: entry.is_mandatory(),
                allowed: !self.disabled.contains(entry.name())
                    && detected.is_some_and(|version| version.is_at_least(entry.since())),
            })
            .collect();

        CapabilityMatrix {
            detected: detected.cloned(),
            rows,
        }
    }
}

impl ServerConnection<'static> {
    /// Connection over [`CapabilityRegistry::standard`].
    #[must_use]
    pub fn standard() -> Self {
        Self::new(CapabilityRegistry::standard())
    }
}
