//! Configuration management for hisdk.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use crate::version::Version;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main SDK configuration.
///
/// This is loaded from `~/.config/hisdk/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    /// Server compatibility settings
    pub compatibility: CompatibilityConfig,
    /// Capability gating overrides
    pub capabilities: CapabilityConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl SdkConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit path.
    ///
    /// Unlike [`SdkConfig::load`], a missing file is an error here.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }

        tracing::debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `HISDK_MIN_SERVER_VERSION`: Override the minimum supported server version
    /// - `HISDK_DISABLED_CAPABILITIES`: Comma-separated capabilities to force off
    /// - `HISDK_LOG`: Override the log filter
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply `HISDK_*` environment overrides on top of the current values.
    pub fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        if let Ok(val) = std::env::var("HISDK_MIN_SERVER_VERSION") {
            let version = Version::parse(&val).map_err(|e| ConfigError::InvalidValue {
                field: "compatibility.minimum_server_version".to_string(),
                reason: e.to_string(),
            })?;
            tracing::debug!("Override minimum_server_version from env: {}", version);
            self.compatibility.minimum_server_version = version;
        }

        if let Ok(val) = std::env::var("HISDK_DISABLED_CAPABILITIES") {
            self.capabilities.disabled = val
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
            tracing::debug!(
                "Override capabilities.disabled from env: {:?}",
                self.capabilities.disabled
            );
        }

        if let Ok(val) = std::env::var("HISDK_LOG") {
            tracing::debug!("Override logging.filter from env: {}", val);
            self.logging.filter = val;
        }

        Ok(())
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to an explicit path.
    pub fn save_to(&self, config_path: &Path) -> ConfigResult<()> {
        let config_dir = config_path
            .parent()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "config_path".to_string(),
                reason: "no parent directory".to_string(),
            })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/hisdk/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("org", "hisdk", "hisdk").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// Server compatibility settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompatibilityConfig {
    /// Oldest server release the SDK agrees to talk to
    pub minimum_server_version: Version,
}

impl Default for CompatibilityConfig {
    fn default() -> Self {
        Self {
            minimum_server_version: Version::new(2, 29, 0),
        }
    }
}

/// Capability gating overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityConfig {
    /// Capabilities reported as denied regardless of server version
    pub disabled: Vec<String>,
    /// Extra capability definitions (TOML) merged into the built-in table
    pub definitions: Option<PathBuf>,
}

impl CapabilityConfig {
    /// Whether the named capability has been switched off by configuration.
    #[must_use]
    pub fn is_disabled(&self, name: &str) -> bool {
        self.disabled.iter().any(|disabled| disabled == name)
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,hisdk=debug".to_string(),
        }
    }
}
