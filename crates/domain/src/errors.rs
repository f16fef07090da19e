//! Error types used by the pure domain layer

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Domain-level error for configuration failures.
///
/// Network and server-classified failures live in the infrastructure crate
/// (`ApiError`); this type never carries transport detail.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum ZmError {
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for domain operations
pub type Result<T> = std::result::Result<T, ZmError>;
