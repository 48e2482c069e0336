//! hisdk Core - Foundation crate for the hisdk health-information-system client.
//!
//! This crate provides the server version model, error handling and
//! configuration management that the other hisdk crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`version`] - Server release numbers with a total order on `(major, minor, patch)`
//!
//! # Example
//!
//! ```rust
//! use hisdk_core::{SdkConfig, Version};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SdkConfig::default();
//! let detected = Version::parse("2.40.1")?;
//!
//! if detected.is_at_least(&config.compatibility.minimum_server_version) {
//!     println!("Server {detected} is supported");
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod version;

// Re-export commonly used types
pub use config::{CapabilityConfig, CompatibilityConfig, LoggingConfig, SdkConfig};
pub use error::{ConfigError, ConfigResult, Result, SdkError, VersionParseError};
pub use version::Version;
