//! Error types for the capability subsystem.

use crate::gate::CapabilityDenial;
use hisdk_core::{SdkError, VersionParseError};
use thiserror::Error;

/// Errors that can occur while building the registry or gating a call.
///
/// `Denied` is only produced by the `require` family; plain checks return the
/// denial as an ordinary [`CapabilityDecision`](crate::CapabilityDecision).
#[derive(Error, Debug)]
pub enum CapabilityError {
    /// A call site referenced a capability that was never registered
    #[error("unknown capability: {name}")]
    UnknownCapability {
        /// The capability name that was not found
        name: String,
    },

    /// The same capability was registered twice
    #[error("capability '{name}' is already registered (since {existing})")]
    DuplicateRegistration {
        /// The duplicated name
        name: String,
        /// Minimum version of the entry already present
        existing: String,
    },

    /// Capability name does not match the identifier format
    #[error("invalid capability name '{name}': {reason}")]
    InvalidName {
        /// Rejected name
        name: String,
        /// Reason for rejection
        reason: String,
    },

    /// A required capability is not available on the detected server
    #[error("{0}")]
    Denied(CapabilityDenial),

    /// The server cannot be used by this SDK at all
    #[error("server version {detected} is not supported, requires {required} or later")]
    IncompatibleServer {
        /// Detected server version, or `unknown`
        detected: String,
        /// Version the SDK needs
        required: String,
    },

    /// The connection already holds a detected version
    #[error("server version already recorded for this connection ({existing})")]
    VersionAlreadyRecorded {
        /// The version recorded first
        existing: String,
    },

    /// The server version string could not be parsed
    #[error("invalid server version: {0}")]
    Version(#[from] VersionParseError),

    /// Capability definitions file could not be parsed
    #[error("failed to parse capability definitions: {0}")]
    Definition(#[from] toml::de::Error),

    /// I/O error while reading capability definitions
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for capability operations.
pub type Result<T> = std::result::Result<T, CapabilityError>;

impl From<CapabilityError> for SdkError {
    fn from(err: CapabilityError) -> Self {
        match err {
            CapabilityError::Denied(denial) => SdkError::Unsupported {
                capability: denial.capability().to_string(),
                required: denial.required().to_string(),
                detected: denial.detected_display(),
            },
            CapabilityError::IncompatibleServer { detected, required } => {
                SdkError::IncompatibleServer { detected, required }
            }
            CapabilityError::Version(err) => SdkError::Version(err),
            CapabilityError::Io(err) => SdkError::Io(err),
            other => SdkError::Internal(other.to_string()),
        }
    }
}
