//! Authenticated client for the surveillance server API
//!
//! - [`auth`]: token lifecycle (login, lazy refresh, grace window)
//! - [`client`]: request executor with response classification and a single
//!   re-authentication retry
//! - [`commands`]: typed event, monitor, timezone, frame and zone lookups
//! - [`zones`]: non-destructive merge of server zones into local config
//!
//! Only authentication-classified failures are retried, and only once.
//! Transport errors and 5xx replies propagate immediately.

pub mod auth;
pub mod client;
pub mod commands;
pub mod errors;
pub mod response;
pub mod zones;

pub use auth::{AuthPhase, TokenLifecycle, TokenProvider, TokenState};
pub use client::{ApiRequest, ZmApiClient, ZmApiClientBuilder};
pub use commands::{ApiCommands, FrameImage, FrameSelector};
pub use errors::{ApiError, ApiErrorCategory};
pub use response::{classify, ApiResponse, ResponseMeta};
pub use zones::{
    match_origin_zone, ReconcileContext, ZoneChange, ZoneChangeKind, ZoneDelta, ZoneImportSettings,
    ZoneReconciler,
};
