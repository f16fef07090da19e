//! Event, monitor and frame records as returned by the server

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::zone::Resolution;
use crate::utils::lenient;

/// `Event` sub-structure of `events/{id}.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(rename = "Id", deserialize_with = "lenient::u64")]
    pub id: u64,
    #[serde(rename = "MonitorId", default, deserialize_with = "lenient::opt_u64")]
    pub monitor_id: Option<u64>,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Cause", default)]
    pub cause: Option<String>,
    #[serde(rename = "Notes", default)]
    pub notes: Option<String>,
    #[serde(rename = "StartDateTime", alias = "StartTime", default)]
    pub start_time: Option<String>,
    #[serde(rename = "EndDateTime", alias = "EndTime", default)]
    pub end_time: Option<String>,
    #[serde(rename = "Frames", default, deserialize_with = "lenient::opt_u64")]
    pub frames: Option<u64>,
    #[serde(rename = "AlarmFrames", default, deserialize_with = "lenient::opt_u64")]
    pub alarm_frames: Option<u64>,
    #[serde(rename = "MaxScoreFrameId", default, deserialize_with = "lenient::opt_u64")]
    pub max_score_frame_id: Option<u64>,
    #[serde(rename = "Width", default, deserialize_with = "lenient::opt_u64")]
    pub width: Option<u64>,
    #[serde(rename = "Height", default, deserialize_with = "lenient::opt_u64")]
    pub height: Option<u64>,
    /// Columns this client does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `Monitor` record from `monitors/{id}.json` or an event envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorRecord {
    #[serde(rename = "Id", deserialize_with = "lenient::u64")]
    pub id: u64,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Type", default)]
    pub monitor_type: Option<String>,
    #[serde(rename = "Function", default)]
    pub function: Option<String>,
    #[serde(rename = "Width", default, deserialize_with = "lenient::opt_u64")]
    pub width: Option<u64>,
    #[serde(rename = "Height", default, deserialize_with = "lenient::opt_u64")]
    pub height: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MonitorRecord {
    /// Capture resolution, when both dimensions are known and fit.
    pub fn resolution(&self) -> Option<Resolution> {
        let width = u32::try_from(self.width?).ok()?;
        let height = u32::try_from(self.height?).ok()?;
        Some(Resolution::new(width, height))
    }
}

/// One entry of the `Frame` array in an event envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    #[serde(rename = "Id", default, deserialize_with = "lenient::opt_u64")]
    pub id: Option<u64>,
    #[serde(rename = "FrameId", deserialize_with = "lenient::u64")]
    pub frame_id: u64,
    #[serde(rename = "EventId", default, deserialize_with = "lenient::opt_u64")]
    pub event_id: Option<u64>,
    #[serde(rename = "Type", default)]
    pub frame_type: Option<String>,
    #[serde(rename = "TimeStamp", default)]
    pub timestamp: Option<String>,
    #[serde(rename = "Delta", default, deserialize_with = "lenient::opt_f64")]
    pub delta: Option<f64>,
    #[serde(rename = "Score", default, deserialize_with = "lenient::opt_i64")]
    pub score: Option<i64>,
}

impl FrameRecord {
    pub fn is_alarm(&self) -> bool {
        self.frame_type.as_deref().is_some_and(|t| t.eq_ignore_ascii_case("alarm"))
    }
}

/// Inner body of `events/{id}.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventBody {
    #[serde(rename = "Event", default)]
    pub event: Option<EventRecord>,
    #[serde(rename = "Monitor", default)]
    pub monitor: Option<MonitorRecord>,
    #[serde(rename = "Frame", default)]
    pub frames: Option<Vec<FrameRecord>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(default)]
    pub event: EventBody,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorBody {
    #[serde(rename = "Monitor", default)]
    pub monitor: Option<MonitorRecord>,
}

/// Body of `monitors/{id}.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorEnvelope {
    #[serde(default)]
    pub monitor: MonitorBody,
}

/// Everything one event lookup yields.
#[derive(Debug, Clone, PartialEq)]
pub struct EventData {
    pub event: EventRecord,
    pub monitor: MonitorRecord,
    /// In server order.
    pub frames: Vec<FrameRecord>,
    pub frame_count: usize,
}
