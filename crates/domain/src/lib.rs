//! # zmapi Domain
//!
//! Pure types for the surveillance-server API client.
//!
//! This crate contains:
//! - Wire models for login, event, monitor, frame and zone payloads
//! - Local zone geometry (`ZoneDefinition`, `MonitorZoneConfig`)
//! - Configuration structures
//! - Domain error types and protocol constants
//!
//! ## Architecture
//! - No I/O and no dependencies on other zmapi crates
//! - `zmapi-infra` builds the network client on top of these types

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
