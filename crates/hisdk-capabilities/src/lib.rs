//! hisdk Capabilities - Version-aware capability negotiation.
//!
//! The same logical operation is implemented differently, or not at all,
//! across server releases. This crate decides, per connection, which request
//! shapes and endpoints the SDK may use.
//!
//! # Architecture
//!
//! - **Capabilities** ([`capability`]): Stable identifiers for gated behaviour
//! - **Registry** ([`registry`]): Read-only table of capability → minimum version
//! - **Gate** ([`gate`]): The allow/deny check with a uniform denial contract
//! - **Connection** ([`connection`]): The detected version of one server connection
//! - **Errors** ([`error`]): Capability-specific error types
//!
//! # Example
//!
//! ```rust
//! use hisdk_capabilities::{CapabilityGate, KnownCapability};
//! use hisdk_core::Version;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let gate = CapabilityGate::standard();
//! let detected = Version::parse("2.39.5")?;
//!
//! let decision = gate.check_capability(KnownCapability::PushNotifications, &detected)?;
//! if let Some(reason) = decision.reason() {
//!     println!("falling back: {reason}");
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

pub mod capability;
pub mod connection;
pub mod error;
pub mod gate;
pub mod registry;

// Re-export commonly used types
pub use capability::KnownCapability;
pub use connection::{DetectedVersion, ServerConnection, SystemInfo};
pub use error::{CapabilityError, Result};
pub use gate::{
    CapabilityDecision, CapabilityDenial, CapabilityGate, CapabilityMatrix, DenialCause, MatrixRow,
};
pub use registry::{CapabilityEntry, CapabilityRegistry, CapabilityRegistryBuilder};
