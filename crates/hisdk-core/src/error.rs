//! Core error types for the hisdk client.
//!
//! [`SdkError`] is the single error surfaced to SDK consumers. Subsystem crates
//! keep their own error enums and convert into it at the boundary.

use thiserror::Error;

/// Central error type for SDK operations.
#[derive(Error, Debug)]
pub enum SdkError {
    /// Configuration errors (file loading, parsing, validation)
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The server reported a version string that could not be parsed
    #[error("server version error: {0}")]
    Version(#[from] VersionParseError),

    /// An optional feature is not available on the connected server
    #[error("feature '{capability}' is not supported on server version {detected}, requires {required}")]
    Unsupported {
        /// Capability identifier
        capability: String,
        /// Minimum version that introduced the capability
        required: String,
        /// Version reported by the server, or `unknown`
        detected: String,
    },

    /// The connected server is too old for the SDK to function at all
    #[error("server version {detected} is not supported, requires {required} or later")]
    IncompatibleServer {
        /// Version reported by the server, or `unknown`
        detected: String,
        /// Minimum version the SDK needs
        required: String,
    },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Defects in the SDK itself (unregistered or duplicated capabilities)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Reasons a server version string cannot be turned into a [`Version`](crate::Version).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionParseError {
    /// Nothing left after trimming whitespace
    #[error("version string is empty")]
    Empty,

    /// Fewer than the two required components (major and minor)
    #[error("version '{input}' needs at least a major and a minor component")]
    TooFewComponents {
        /// Trimmed input
        input: String,
    },

    /// A numeric component is not a non-negative integer that fits in 32 bits
    #[error("invalid {component} component '{token}' in version '{input}'")]
    InvalidComponent {
        /// Which component failed (`major`, `minor` or `patch`)
        component: &'static str,
        /// Offending token
        token: String,
        /// Trimmed input
        input: String,
    },

    /// Two delimiters in a row, or a leading/trailing delimiter
    #[error("version '{input}' contains an empty component")]
    EmptyComponent {
        /// Trimmed input
        input: String,
    },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to determine config directory path
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// Config file not found at an explicitly requested path
    #[error("config file not found at {path}")]
    NotFound {
        /// Path where config was expected
        path: String,
    },

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config
    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// I/O error reading/writing config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },
}

/// Result type alias using `SdkError`.
pub type Result<T> = std::result::Result<T, SdkError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SdkError::Unsupported {
            capability: "push-notifications".to_string(),
            required: "2.40".to_string(),
            detected: "2.39.5".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "feature 'push-notifications' is not supported on server version 2.39.5, requires 2.40"
        );

        let err = ConfigError::NoConfigDir;
        assert_eq!(
            err.to_string(),
            "could not determine config directory (XDG base directories not available)"
        );
    }

    #[test]
    fn test_parse_error_display() {
        let err = VersionParseError::InvalidComponent {
            component: "minor",
            token: "x".to_string(),
            input: "2.x".to_string(),
        };
        assert_eq!(err.to_string(), "invalid minor component 'x' in version '2.x'");
    }

    #[test]
    fn test_error_from_config() {
        let config_err = ConfigError::NoConfigDir;
        let sdk_err: SdkError = config_err.into();
        assert!(matches!(sdk_err, SdkError::Config(_)));
    }

    #[test]
    fn test_error_from_version() {
        let sdk_err: SdkError = VersionParseError::Empty.into();
        assert!(matches!(sdk_err, SdkError::Version(VersionParseError::Empty)));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let sdk_err: SdkError = io_err.into();
        assert!(matches!(sdk_err, SdkError::Io(_)));
    }
}
