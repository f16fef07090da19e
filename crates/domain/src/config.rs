//! Client configuration structures
//!
//! The configuration is owned by the caller. The API client reads
//! [`ApiSettings`]; the zone reconciler reads [`DetectionSettings`] and
//! mutates [`MonitorConfigs`] in place.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    AUTH_GRACE_SECS, CONNECT_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS, MEDIA_TIMEOUT_SECS,
    ORIGIN_DOWN_DELAY_SECS,
};
use crate::errors::{Result, ZmError};
use crate::types::MonitorZoneConfig;

/// Username/password pair. Immutable once built.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    user: String,
    password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self { user: user.into(), password: password.into() }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").field("user", &self.user).field("password", &"***").finish()
    }
}

/// Timeouts and auth timing knobs, all in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
    pub connect_secs: u64,
    /// Applies to the login exchange and non-GET requests.
    pub default_secs: u64,
    /// Applies to GET requests, which may stream large media.
    pub media_secs: u64,
    pub auth_grace_secs: u64,
    pub origin_down_delay_secs: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            connect_secs: CONNECT_TIMEOUT_SECS,
            default_secs: DEFAULT_TIMEOUT_SECS,
            media_secs: MEDIA_TIMEOUT_SECS,
            auth_grace_secs: AUTH_GRACE_SECS,
            origin_down_delay_secs: ORIGIN_DOWN_DELAY_SECS,
        }
    }
}

impl TimeoutSettings {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn default_request(&self) -> Duration {
        Duration::from_secs(self.default_secs)
    }

    pub fn media(&self) -> Duration {
        Duration::from_secs(self.media_secs)
    }

    pub fn auth_grace(&self) -> Duration {
        Duration::from_secs(self.auth_grace_secs)
    }

    pub fn origin_down_delay(&self) -> Duration {
        Duration::from_secs(self.origin_down_delay_secs)
    }
}

/// Connection settings for the server API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base API URL, e.g. `https://host/zm/api`.
    pub api_url: String,
    /// Portal URL; derived from `api_url` when unset.
    #[serde(default)]
    pub portal_url: Option<String>,
    #[serde(default)]
    pub credentials: Option<Credentials>,
    #[serde(default = "default_ssl_verify")]
    pub ssl_verify: bool,
    #[serde(default)]
    pub timeouts: TimeoutSettings,
}

fn default_ssl_verify() -> bool {
    true
}

impl ApiSettings {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            portal_url: None,
            credentials: None,
            ssl_verify: true,
            timeouts: TimeoutSettings::default(),
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// API URL without a trailing slash.
    pub fn api_base(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }

    /// Portal URL: explicit, or the API URL with its `/api` suffix removed.
    pub fn portal_base(&self) -> String {
        if let Some(portal) = self.portal_url.as_deref().filter(|p| !p.trim().is_empty()) {
            return portal.trim_end_matches('/').to_string();
        }
        let api = self.api_base();
        api.strip_suffix("/api").unwrap_or(api).to_string()
    }

    /// Reject settings that cannot produce a working client.
    ///
    /// # Errors
    /// Returns `ZmError::Config` for a missing or non-HTTP(S) URL.
    pub fn validate(&self) -> Result<()> {
        for (label, value) in [("api_url", Some(self.api_url.as_str())), ("portal_url", self.portal_url.as_deref())] {
            let Some(value) = value else { continue };
            let parsed = url::Url::parse(value)
                .map_err(|e| ZmError::Config(format!("Invalid {label} '{value}': {e}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ZmError::Config(format!(
                    "Unsupported {label} scheme '{}'",
                    parsed.scheme()
                )));
            }
        }
        if let Some(credentials) = &self.credentials {
            if credentials.user().is_empty() || credentials.password().is_empty() {
                return Err(ZmError::Config(
                    "Credentials require both a user and a password".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Global zone-import switches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    /// Pull zone definitions from the server into the local config.
    pub import_zones: bool,
    /// Only import zones named in the event cause.
    pub match_origin_zone: bool,
}

/// Per-monitor settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// Overrides [`DetectionSettings::import_zones`] for this monitor.
    pub import_zones: Option<bool>,
    pub zones: MonitorZoneConfig,
}

/// Monitor id -> settings.
pub type MonitorConfigs = BTreeMap<u32, MonitorSettings>;

/// Top-level configuration object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api: ApiSettings,
    #[serde(default)]
    pub detection: DetectionSettings,
    #[serde(default, with = "monitor_keys")]
    pub monitors: MonitorConfigs,
}

/// Monitor ids are map keys; text formats such as TOML only have string keys.
mod monitor_keys {
    use std::collections::BTreeMap;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::{MonitorConfigs, MonitorSettings};

    pub fn serialize<S: Serializer>(monitors: &MonitorConfigs, serializer: S) -> Result<S::Ok, S::Error> {
        monitors
            .iter()
            .map(|(id, settings)| (id.to_string(), settings))
            .collect::<BTreeMap<_, _>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<MonitorConfigs, D::Error> {
        BTreeMap::<String, MonitorSettings>::deserialize(deserializer)?
            .into_iter()
            .map(|(key, settings)| {
                key.trim()
                    .parse::<u32>()
                    .map(|id| (id, settings))
                    .map_err(|_| D::Error::custom(format!("invalid monitor id {key:?}")))
            })
            .collect()
    }
}

impl ClientConfig {
    pub fn new(api: ApiSettings) -> Self {
        Self { api, detection: DetectionSettings::default(), monitors: MonitorConfigs::new() }
    }

    /// Whether zone import is enabled for `monitor_id`.
    pub fn import_zones_for(&self, monitor_id: u32) -> bool {
        self.monitors
            .get(&monitor_id)
            .and_then(|m| m.import_zones)
            .unwrap_or(self.detection.import_zones)
    }

    /// # Errors
    /// Returns `ZmError::Config` if the API settings are unusable.
    pub fn validate(&self) -> Result<()> {
        self.api.validate()
    }
}
