//! Detection-zone geometry
//!
//! Zones are named polygons on a monitor's image plane. The server is the
//! authority on which zones exist; the local configuration owns the points
//! once a user has set them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::INACTIVE_ZONE_TYPE;

/// A polygon vertex in source-resolution pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Width/height of the image a zone was drawn against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Result of parsing a server `Coords` string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCoords {
    pub points: Vec<Point>,
    /// Tokens that were not a valid `x,y` pair.
    pub rejected: Vec<String>,
}

/// Parse `"x1,y1 x2,y2 ..."` into points, collecting malformed pairs.
pub fn parse_coords(coords: &str) -> ParsedCoords {
    let mut parsed = ParsedCoords::default();
    for token in coords.split_whitespace() {
        let pair = token
            .split_once(',')
            .and_then(|(x, y)| Some(Point::new(x.trim().parse().ok()?, y.trim().parse().ok()?)));
        match pair {
            Some(point) => parsed.points.push(point),
            None => parsed.rejected.push(token.to_string()),
        }
    }
    parsed
}

/// Render points back into the server's `Coords` notation.
pub fn format_coords(points: &[Point]) -> String {
    points.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")
}

/// A locally held zone. The name is the key in [`MonitorZoneConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneDefinition {
    /// Polygon vertices; empty means "not set yet".
    #[serde(default, deserialize_with = "points_from_any")]
    pub points: Vec<Point>,
    #[serde(default)]
    pub resolution: Option<Resolution>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Default for ZoneDefinition {
    fn default() -> Self {
        Self { points: Vec::new(), resolution: None, active: true }
    }
}

impl ZoneDefinition {
    pub fn new(points: Vec<Point>, resolution: Resolution) -> Self {
        Self { points, resolution: Some(resolution), active: true }
    }

    /// A stub: declared locally but without geometry.
    pub fn stub() -> Self {
        Self::default()
    }

    pub fn has_points(&self) -> bool {
        !self.points.is_empty()
    }
}

/// Zone name -> definition for one monitor.
pub type MonitorZoneConfig = BTreeMap<String, ZoneDefinition>;

/// Points may be written as a `Coords` string or as a list of `{x, y}`.
fn points_from_any<'de, D>(deserializer: D) -> Result<Vec<Point>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Points {
        Coords(String),
        List(Vec<Point>),
    }

    match Option::<Points>::deserialize(deserializer)? {
        None => Ok(Vec::new()),
        Some(Points::List(points)) => Ok(points),
        Some(Points::Coords(coords)) => {
            let parsed = parse_coords(&coords);
            if let Some(bad) = parsed.rejected.first() {
                return Err(serde::de::Error::custom(format!("invalid zone point {bad:?}")));
            }
            Ok(parsed.points)
        }
    }
}

/// Raw `Zone` object from `zones/forMonitor/{id}.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerZoneRecord {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Type", default)]
    pub zone_type: String,
    #[serde(rename = "Coords", default)]
    pub coords: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerZoneEnvelope {
    #[serde(rename = "Zone", default)]
    pub zone: ServerZoneRecord,
}

/// Body of `zones/forMonitor/{id}.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZonesResponse {
    #[serde(default)]
    pub zones: Vec<ServerZoneEnvelope>,
}

/// A server-side zone with its coordinates parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerZone {
    pub name: String,
    pub zone_type: String,
    pub points: Vec<Point>,
}

impl ServerZone {
    pub fn new(name: impl Into<String>, zone_type: impl Into<String>, points: Vec<Point>) -> Self {
        Self { name: name.into(), zone_type: zone_type.into(), points }
    }

    pub fn is_inactive(&self) -> bool {
        self.zone_type.eq_ignore_ascii_case(INACTIVE_ZONE_TYPE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_server_coords() {
        let parsed = parse_coords("0,0 639,0 639,479 0,479");
        assert_eq!(parsed.points.len(), 4);
        assert_eq!(parsed.points[2], Point::new(639, 479));
        assert!(parsed.rejected.is_empty());
        assert_eq!(format_coords(&parsed.points), "0,0 639,0 639,479 0,479");
    }

    #[test]
    fn collects_malformed_pairs() {
        let parsed = parse_coords("1,2 oops 3,x 4,5");
        assert_eq!(parsed.points, vec![Point::new(1, 2), Point::new(4, 5)]);
        assert_eq!(parsed.rejected, vec!["oops".to_string(), "3,x".to_string()]);
        assert!(parse_coords("   ").points.is_empty());
    }

    #[test]
    fn zone_points_accept_string_or_list() {
        let from_str: ZoneDefinition =
            serde_json::from_str(r#"{"points": "1,1 5,1 5,5", "resolution": {"width": 640, "height": 480}}"#)
                .unwrap();
        assert_eq!(from_str.points.len(), 3);
        assert!(from_str.active);

        let from_list: ZoneDefinition =
            serde_json::from_str(r#"{"points": [{"x": 1, "y": 1}], "active": false}"#).unwrap();
        assert_eq!(from_list.points, vec![Point::new(1, 1)]);
        assert!(!from_list.active);

        let stub: ZoneDefinition = serde_json::from_str("{}").unwrap();
        assert!(!stub.has_points());
    }

    #[test]
    fn inactive_type_is_case_insensitive() {
        assert!(ServerZone::new("a", "inactive", vec![]).is_inactive());
        assert!(ServerZone::new("a", "Inactive", vec![]).is_inactive());
        assert!(!ServerZone::new("a", "Active", vec![]).is_inactive());
    }

    #[test]
    fn zones_response_shape() {
        let body = r#"{"zones": [{"Zone": {"Id": "1", "Name": "Driveway", "Type": "Active", "Coords": "0,0 10,0 10,10"}}]}"#;
        let response: ZonesResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.zones.len(), 1);
        assert_eq!(response.zones[0].zone.name, "Driveway");
        assert_eq!(response.zones[0].zone.coords, "0,0 10,0 10,10");
    }
}
