//! Static table mapping capability names to the server release that
//! introduced them.
//!
//! The table is assembled once through [`CapabilityRegistryBuilder`] and is
//! read-only afterwards, so a built registry can be shared across threads
//! without locking.

use crate::capability::{validate_name, KnownCapability};
use crate::error::{CapabilityError, Result};
use hisdk_core::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info};

/// One row of the capability table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityEntry {
    name: String,
    since: Version,
    mandatory: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl CapabilityEntry {
    /// Capability identifier.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Minimum server version that provides the capability.
    #[must_use]
    pub fn since(&self) -> &Version {
        &self.since
    }

    /// Whether the SDK cannot function without it.
    #[must_use]
    pub fn is_mandatory(&self) -> bool {
        self.mandatory
    }

    /// Human-readable description, if one was registered.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Read-only capability table.
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    entries: BTreeMap<String, CapabilityEntry>,
}

impl CapabilityRegistry {
    /// Start building a new, empty registry.
    #[must_use]
    pub fn builder() -> CapabilityRegistryBuilder {
        CapabilityRegistryBuilder::default()
    }

    /// The process-wide registry holding every [`KnownCapability`].
    ///
    /// Built on first use and never mutated afterwards.
    #[must_use]
    pub fn standard() -> &'static CapabilityRegistry {
        static STANDARD: OnceLock<CapabilityRegistry> = OnceLock::new();
        STANDARD.get_or_init(|| {
            CapabilityRegistryBuilder::with_known()
                .expect("built-in capability table has unique, valid names")
                .build()
        })
    }

    /// Minimum version that introduced the named capability.
    ///
    /// # Errors
    /// Returns [`CapabilityError::UnknownCapability`] if the name was never registered.
    pub fn minimum_version_for(&self, name: &str) -> Result<&Version> {
        self.get(name).map(CapabilityEntry::since)
    }

    /// Full entry for the named capability.
    ///
    /// # Errors
    /// Returns [`CapabilityError::UnknownCapability`] if the name was never registered.
    pub fn get(&self, name: &str) -> Result<&CapabilityEntry> {
        self.entries
            .get(name)
            .ok_or_else(|| CapabilityError::UnknownCapability {
                name: name.to_string(),
            })
    }

    /// Check if a capability exists in the registry.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of registered capabilities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, sorted by name.
    pub fn capabilities(&self) -> impl Iterator<Item = &CapabilityEntry> {
        self.entries.values()
    }

    /// Entries the SDK cannot function without.
    pub fn mandatory(&self) -> impl Iterator<Item = &CapabilityEntry> {
        self.entries.values().filter(|entry| entry.mandatory)
    }

    /// Entries available on a server running `version`.
    pub fn available_at<'a>(
        &'a self,
        version: &'a Version,
    ) -> impl Iterator<Item = &'a CapabilityEntry> + 'a {
        self.entries
            .values()
            .filter(move |entry| version.is_at_least(&entry.since))
    }
}

/// Builder for [`CapabilityRegistry`]; rejects duplicate names.
#[derive(Debug, Default)]
pub struct CapabilityRegistryBuilder {
    entries: BTreeMap<String, CapabilityEntry>,
}

/// TOML layout accepted by [`CapabilityRegistryBuilder::register_from_toml`].
#[derive(Debug, Deserialize)]
struct DefinitionFile {
    #[serde(default)]
    capability: Vec<CapabilityDefinition>,
}

#[derive(Debug, Deserialize)]
struct CapabilityDefinition {
    name: String,
    since: Version,
    #[serde(default)]
    mandatory: bool,
    description: Option<String>,
}

impl CapabilityRegistryBuilder {
    /// A builder pre-populated with every [`KnownCapability`].
    pub fn with_known() -> Result<Self> {
        let mut builder = Self::default();
        for capability in KnownCapability::all() {
            builder.insert(CapabilityEntry {
                name: capability.as_str().to_string(),
                since: capability.since(),
                mandatory: capability.is_mandatory(),
                description: Some(capability.description().to_string()),
            })?;
        }
        Ok(builder)
    }

    /// Register an optional capability.
    ///
    /// # Errors
    /// Returns [`CapabilityError::DuplicateRegistration`] if the name is taken,
    /// or [`CapabilityError::InvalidName`] if it is not a valid identifier.
    pub fn register(&mut self, name: impl Into<String>, min_version: Version) -> Result<&mut Self> {
        self.insert(CapabilityEntry {
            name: name.into(),
            since: min_version,
            mandatory: false,
            description: None,
        })?;
        Ok(self)
    }

    /// Register a capability the SDK cannot function without.
    pub fn register_mandatory(
        &mut self,
        name: impl Into<String>,
        min_version: Version,
    ) -> Result<&mut Self> {
        self.insert(CapabilityEntry {
            name: name.into(),
            since: min_version,
            mandatory: true,
            description: None,
        })?;
        Ok(self)
    }

    /// Register every `[[capability]]` table found in a TOML document.
    ///
    /// ```toml
    /// [[capability]]
    /// name = "analytics-outlier-detection"
    /// since = "2.36"
    /// description = "Outlier detection in analytics queries"
    /// ```
    ///
    /// The document is registered as a whole: if any definition is invalid or
    /// duplicated, nothing from it is added.
    pub fn register_from_toml(&mut self, contents: &str) -> Result<&mut Self> {
        let file: DefinitionFile = toml::from_str(contents)?;

        let mut staged = Self::default();
        for definition in file.capability {
            let entry = CapabilityEntry {
                name: definition.name,
                since: definition.since,
                mandatory: definition.mandatory,
                description: definition.description,
            };
            self.check_available(&entry)?;
            staged.insert(entry)?;
        }

        self.entries.extend(staged.entries);
        Ok(self)
    }

    /// Read a definitions file and register its contents.
    pub fn register_from_file(&mut self, path: &Path) -> Result<&mut Self> {
        let contents = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), "loading capability definitions");
        self.register_from_toml(&contents)
    }

    /// Freeze the table.
    #[must_use]
    pub fn build(self) -> CapabilityRegistry {
        info!(count = self.entries.len(), "built capability registry");
        CapabilityRegistry {
            entries: self.entries,
        }
    }

    fn check_available(&self, entry: &CapabilityEntry) -> Result<()> {
        validate_name(&entry.name)?;

        match self.entries.get(&entry.name) {
            Some(existing) => Err(CapabilityError::DuplicateRegistration {
                name: entry.name.clone(),
                existing: existing.since.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn insert(&mut self, entry: CapabilityEntry) -> Result<()> {
        self.check_available(&entry)?;

        debug!(capability = %entry.name, since = %entry.since, "registered capability");
        self.entries.insert(entry.name.clone(), entry);
        Ok(())
    }
}
