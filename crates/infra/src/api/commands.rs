//! Higher-level API operations
//!
//! Typed lookups built on [`ZmApiClient::execute`]: events, monitors, the
//! server timezone, frame images and zone lists.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};
use zmapi_domain::{
    parse_coords, EventData, EventEnvelope, MonitorEnvelope, MonitorRecord, ServerZone,
    TimezoneResponse, ZonesResponse,
};

use super::client::{ApiRequest, ZmApiClient};
use super::errors::ApiError;
use super::response::ApiResponse;
use crate::errors::conversions::from_reqwest;

/// Which frame of an event to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSelector {
    /// 1-based frame id within the event.
    Index(u64),
    /// The highest-scoring frame.
    Snapshot,
    /// The first alarm frame.
    Alarm,
}

impl fmt::Display for FrameSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(id) => write!(f, "{id}"),
            Self::Snapshot => f.write_str("snapshot"),
            Self::Alarm => f.write_str("alarm"),
        }
    }
}

/// Raw image bytes as served; no decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameImage {
    pub content_type: String,
    pub data: Vec<u8>,
}

/// API commands for event, monitor and zone lookups
pub struct ApiCommands {
    client: Arc<ZmApiClient>,
    timezone: RwLock<Option<String>>,
}

impl ApiCommands {
    pub fn new(client: Arc<ZmApiClient>) -> Self {
        Self { client, timezone: RwLock::new(None) }
    }

    pub fn client(&self) -> &Arc<ZmApiClient> {
        &self.client
    }

    async fn get_typed<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.get_typed_at(self.client.api_url(path)).await
    }

    async fn get_typed_at<T: DeserializeOwned>(&self, url: String) -> Result<T, ApiError> {
        let value = self.client.execute_json(ApiRequest::get(url.clone())).await?;
        serde_json::from_value(value)
            .map_err(|e| ApiError::InvalidResponse(format!("{url}: unexpected shape: {e}")))
    }

    /// Fetch an event with its monitor and frames from one envelope.
    ///
    /// # Errors
    /// `InvalidEvent` for an unknown id; `InvalidResponse` when the
    /// envelope lacks the event or monitor record.
    #[instrument(skip(self))]
    pub async fn get_event(&self, event_id: u64) -> Result<EventData, ApiError> {
        let path = format!("events/{event_id}.json");
        let envelope: EventEnvelope = self.get_typed(&path).await?;

        let body = envelope.event;
        let event = body
            .event
            .ok_or_else(|| ApiError::InvalidResponse(format!("{path}: missing Event record")))?;
        let monitor = body
            .monitor
            .ok_or_else(|| ApiError::InvalidResponse(format!("{path}: missing Monitor record")))?;
        let frames = body.frames.unwrap_or_default();
        let frame_count = frames.len();

        debug!(event_id, monitor_id = monitor.id, frame_count, "event fetched");
        Ok(EventData { event, monitor, frames, frame_count })
    }

    /// Fetch a monitor record. Failures are logged and yield `None`;
    /// callers proceed with defaults.
    #[instrument(skip(self))]
    pub async fn get_monitor(&self, monitor_id: u64) -> Option<MonitorRecord> {
        let path = format!("monitors/{monitor_id}.json");
        match self.get_typed::<MonitorEnvelope>(&path).await {
            Ok(envelope) => {
                let monitor = envelope.monitor.monitor;
                if monitor.is_none() {
                    warn!(monitor_id, "monitor reply carried no Monitor record");
                }
                monitor
            }
            Err(err) => {
                warn!(monitor_id, kind = err.label(), error = %err, "monitor lookup failed");
                None
            }
        }
    }

    /// Server timezone; served from cache unless empty or `force` is set.
    ///
    /// A failed fetch is logged and the cached value kept. `None` means
    /// "use process-local time".
    #[instrument(skip(self))]
    pub async fn timezone(&self, force: bool) -> Option<String> {
        if !force {
            if let Some(tz) = self.timezone.read().await.clone() {
                return Some(tz);
            }
        }

        match self.get_typed::<TimezoneResponse>("host/gettimezone.json").await {
            Ok(TimezoneResponse { tz: Some(tz) }) if !tz.trim().is_empty() => {
                debug!(%tz, "server timezone");
                let mut cached = self.timezone.write().await;
                *cached = Some(tz.clone());
                Some(tz)
            }
            Ok(_) => {
                warn!("timezone reply carried no tz; keeping cached value");
                self.timezone.read().await.clone()
            }
            Err(err) => {
                warn!(kind = err.label(), error = %err, "timezone lookup failed; keeping cached value");
                self.timezone.read().await.clone()
            }
        }
    }

    pub async fn get_timezone(&self) -> Option<String> {
        self.timezone(false).await
    }

    /// Download one frame of an event.
    ///
    /// # Errors
    /// The media failures (`BadImage`, `FrameNotFound`, `ImageMissing`) as
    /// classified by the executor; `InvalidResponse` if the server answers
    /// with something other than an image.
    #[instrument(skip(self))]
    pub async fn fetch_frame(&self, event_id: u64, frame: FrameSelector) -> Result<FrameImage, ApiError> {
        let request = ApiRequest::get(self.client.portal_url("index.php"))
            .query("view", "image")
            .query("eid", event_id)
            .query("fid", frame);
        let timeout = self.client.settings().timeouts.media();

        match self.client.execute(request).await? {
            ApiResponse::Image(response) => {
                let content_type = response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("image/jpeg")
                    .to_string();
                let data = response.bytes().await.map_err(|e| from_reqwest(e, timeout))?;
                if data.is_empty() {
                    return Err(ApiError::BadImage(format!("event {event_id} frame {frame}: empty image")));
                }
                debug!(event_id, %frame, bytes = data.len(), %content_type, "frame fetched");
                Ok(FrameImage { content_type, data: data.to_vec() })
            }
            other => Err(ApiError::InvalidResponse(format!(
                "event {event_id} frame {frame}: expected image, got {}",
                other.kind()
            ))),
        }
    }

    /// Zones defined on the server for a monitor, in server order.
    ///
    /// # Errors
    /// Any executor failure; malformed coordinate pairs are skipped.
    #[instrument(skip(self))]
    pub async fn get_zones(&self, monitor_id: u32) -> Result<Vec<ServerZone>, ApiError> {
        // Served under the portal, which may live apart from the API host.
        let url = self.client.portal_url(&format!("api/zones/forMonitor/{monitor_id}.json"));
        let response: ZonesResponse = self.get_typed_at(url).await?;

        let zones = response
            .zones
            .into_iter()
            .map(|envelope| {
                let record = envelope.zone;
                let parsed = parse_coords(&record.coords);
                if !parsed.rejected.is_empty() {
                    warn!(
                        monitor_id,
                        zone = %record.name,
                        rejected = ?parsed.rejected,
                        "skipping malformed zone coordinates"
                    );
                }
                ServerZone::new(record.name, record.zone_type, parsed.points)
            })
            .collect::<Vec<_>>();

        debug!(monitor_id, count = zones.len(), "zones fetched");
        Ok(zones)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_selector_renders_fid() {
        assert_eq!(FrameSelector::Index(12).to_string(), "12");
        assert_eq!(FrameSelector::Snapshot.to_string(), "snapshot");
        assert_eq!(FrameSelector::Alarm.to_string(), "alarm");
    }
}
