//! # zmapi Infrastructure
//!
//! Network side of the surveillance-server API client.
//!
//! This crate contains:
//! - The token lifecycle and the request executor (`api`)
//! - Zone reconciliation against local monitor settings
//! - The HTTP transport wrapper (`http`)
//! - Configuration loading from environment and files (`config`)
//!
//! ## Architecture
//! - Builds on the pure types in `zmapi-domain`
//! - Contains all I/O

pub mod api;
pub mod config;
pub mod errors;
pub mod http;

pub use api::{
    ApiCommands, ApiError, ApiErrorCategory, ApiRequest, ApiResponse, TokenLifecycle, TokenProvider,
    ZmApiClient, ZoneReconciler,
};
pub use http::{HttpClient, HttpClientBuilder};
