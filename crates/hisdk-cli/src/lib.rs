//! hisdk command-line shell
//!
//! Thin front end over `hisdk-capabilities` for checking what a given server
//! release supports. Core logic lives in the library crates.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hisdk_capabilities::{
    CapabilityDecision, CapabilityMatrix, CapabilityRegistry, CapabilityRegistryBuilder,
    ServerConnection, SystemInfo,
};
use hisdk_core::SdkConfig;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "hisdk", version, about = "Inspect server capability negotiation")]
pub struct Cli {
    /// Configuration file (defaults to the XDG config path)
    #[arg(long, global = true, env = "HISDK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Extra capability definitions in TOML
    #[arg(long, global = true)]
    pub definitions: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check one capability against a server version
    Check {
        /// Server version, e.g. 2.40.1
        version: String,
        /// Capability identifier, e.g. push-notifications
        capability: String,
    },
    /// Show every capability's status for a server version
    Matrix {
        /// Server version, e.g. 2.40.1
        version: String,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Detect the version from a saved system-info response
    SystemInfo {
        /// Path to the JSON body of `GET /api/system/info`
        file: PathBuf,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// List the capability registry
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

/// Result of a command that ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Capability allowed, or nothing to gate
    Success,
    /// Capability denied or server incompatible
    Denied,
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success => ExitCode::SUCCESS,
            Outcome::Denied => ExitCode::from(1),
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_tracing(default_filter: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Parse-independent entry point used by `main`.
pub fn run(cli: &Cli) -> Result<ExitCode> {
    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.logging.filter);

    info!("Starting hisdk v{}", env!("CARGO_PKG_VERSION"));

    let registry = build_registry(cli.definitions.as_deref(), &config)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let outcome = execute(&cli.command, &registry, &config, &mut out)?;
    Ok(outcome.into())
}

/// Load configuration from `path`, or the default location, with env overrides.
pub fn load_config(path: Option<&Path>) -> Result<SdkConfig> {
    match path {
        Some(path) => {
            let mut config = SdkConfig::load_from(path)
                .with_context(|| format!("loading config from {}", path.display()))?;
            config.apply_env_overrides()?;
            Ok(config)
        }
        None => Ok(SdkConfig::load_with_env()?),
    }
}

/// Built-in capabilities plus definitions from `definitions` or the config.
pub fn build_registry(
    definitions: Option<&Path>,
    config: &SdkConfig,
) -> Result<CapabilityRegistry> {
    let mut builder = CapabilityRegistryBuilder::with_known()?;
    if let Some(path) = definitions.or(config.capabilities.definitions.as_deref()) {
        builder
            .register_from_file(path)
            .with_context(|| format!("loading capability definitions from {}", path.display()))?;
    }
    Ok(builder.build())
}

/// Run a subcommand, writing its report to `out`.
pub fn execute(
    command: &Command,
    registry: &CapabilityRegistry,
    config: &SdkConfig,
    out: &mut impl Write,
) -> Result<Outcome> {
    match command {
        Command::Check {
            version,
            capability,
        } => {
            let connection = ServerConnection::with_config(registry, config);
            let detected = connection
                .record_version(version)
                .with_context(|| format!("invalid server version '{version}'"))?;

            match connection.check(capability)? {
                CapabilityDecision::Allowed => {
                    let since = registry.minimum_version_for(capability)?;
                    writeln!(out, "allowed: '{capability}' requires {since}, detected {detected}")?;
                    Ok(Outcome::Success)
                }
                CapabilityDecision::Denied(denial) => {
                    writeln!(out, "denied: {denial}")?;
                    Ok(Outcome::Denied)
                }
            }
        }
        Command::Matrix { version, json } => {
            let connection = ServerConnection::with_config(registry, config);
            connection
                .record_version(version)
                .with_context(|| format!("invalid server version '{version}'"))?;
            write_matrix(out, &connection.matrix(), *json)?;
            Ok(Outcome::Success)
        }
        Command::SystemInfo { file, json } => {
            let body = std::fs::read_to_string(file)
                .with_context(|| format!("reading {}", file.display()))?;
            let system_info = SystemInfo::from_json(&body)
                .with_context(|| format!("decoding system info from {}", file.display()))?;

            let connection = ServerConnection::with_config(registry, config);
            // An unparseable version leaves the connection failing closed
            if let Err(err) = connection.record_system_info(&system_info) {
                if !*json {
                    writeln!(out, "warning: {err}")?;
                }
            }

            let compatible = connection.ensure_compatible();
            if !json {
                let detected = connection
                    .detected()
                    .map_or_else(|| "unknown".to_string(), ToString::to_string);
                let system_name = system_info.system_name.as_deref().unwrap_or("-");
                writeln!(out, "server: {system_name}")?;
                writeln!(out, "detected: {detected}")?;
                match &compatible {
                    Ok(()) => writeln!(out, "compatible: yes")?,
                    Err(err) => writeln!(out, "compatible: no ({err})")?,
                }
            }
            write_matrix(out, &connection.matrix(), *json)?;

            Ok(if compatible.is_ok() {
                Outcome::Success
            } else {
                Outcome::Denied
            })
        }
        Command::List { json } => {
            if *json {
                let entries: Vec<_> = registry.capabilities().collect();
                serde_json::to_writer_pretty(&mut *out, &entries)?;
                writeln!(out)?;
            } else {
                writeln!(
                    out,
                    "{:<32} {:<8} {:<9} DESCRIPTION",
                    "CAPABILITY", "SINCE", "MANDATORY"
                )?;
                for entry in registry.capabilities() {
                    writeln!(
                        out,
                        "{:<32} {:<8} {:<9} {}",
                        entry.name(),
                        entry.since().to_string(),
                        if entry.is_mandatory() { "yes" } else { "no" },
                        entry.description().unwrap_or("")
                    )?;
                }
            }
            Ok(Outcome::Success)
        }
    }
}

fn write_matrix(out: &mut impl Write, matrix: &CapabilityMatrix, json: bool) -> Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, matrix)?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(out, "{:<32} {:<8} STATUS", "CAPABILITY", "SINCE")?;
    for row in &matrix.rows {
        let status = match (row.allowed, row.mandatory) {
            (true, _) => "allowed",
            (false, true) => "MISSING",
            (false, false) => "denied",
        };
        writeln!(out, "{:<32} {:<8} {status}", row.name, row.since.to_string())?;
    }
    Ok(())
}
