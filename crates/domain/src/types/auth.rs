//! Login exchange payloads and server version

use serde::{Deserialize, Serialize};

use crate::constants::MIN_TOKEN_API_VERSION;
use crate::utils::lenient;
use crate::utils::version::at_least;

/// Body of a `host/login.json` reply.
///
/// Every field is optional: a server with authentication disabled echoes
/// only the version pair, and a refresh exchange omits the refresh token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub apiversion: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub access_token_expires: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub refresh_token_expires: Option<i64>,
}

impl LoginResponse {
    /// The issued access token, if the reply carries a non-empty one.
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }

    /// The issued refresh token, if the reply carries a non-empty one.
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// API protocol version and server product version, learned at login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerVersion {
    pub api_version: String,
    pub product_version: String,
}

impl ServerVersion {
    pub fn new(api_version: impl Into<String>, product_version: impl Into<String>) -> Self {
        Self { api_version: api_version.into(), product_version: product_version.into() }
    }

    /// Whether the server issues access/refresh token pairs (API >= 2.0).
    pub fn supports_tokens(&self) -> bool {
        at_least(&self.api_version, MIN_TOKEN_API_VERSION)
    }
}

impl From<&LoginResponse> for ServerVersion {
    fn from(response: &LoginResponse) -> Self {
        Self::new(
            response.apiversion.clone().unwrap_or_default(),
            response.version.clone().unwrap_or_default(),
        )
    }
}

/// Body of `host/gettimezone.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimezoneResponse {
    #[serde(default)]
    pub tz: Option<String>,
}
