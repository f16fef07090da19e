//! Domain types and wire models

pub mod auth;
pub mod event;
pub mod zone;

pub use auth::{LoginResponse, ServerVersion, TimezoneResponse};
pub use event::{
    EventBody, EventData, EventEnvelope, EventRecord, FrameRecord, MonitorBody, MonitorEnvelope,
    MonitorRecord,
};
pub use zone::{
    format_coords, parse_coords, MonitorZoneConfig, ParsedCoords, Point, Resolution, ServerZone,
    ServerZoneEnvelope, ServerZoneRecord, ZoneDefinition, ZonesResponse,
};
