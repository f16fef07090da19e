//! Request executor for the surveillance server API
//!
//! Every call goes through [`ZmApiClient::execute`]: the token is checked,
//! attached as a query parameter, the reply is classified, and a stale-token
//! answer is retried exactly once after re-authentication.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use tracing::{debug, info, instrument, warn};
use zmapi_domain::constants::TOKEN_QUERY_PARAM;
use zmapi_domain::ApiSettings;

use super::auth::{TokenLifecycle, TokenProvider};
use super::errors::ApiError;
use super::response::{classify, ApiResponse, ResponseMeta};
use crate::errors::conversions::from_reqwest;
use crate::http::HttpClient;

/// One logical request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    /// Form-encoded body.
    pub payload: Option<Vec<(String, String)>>,
    /// Re-authenticate and retry once on a stale-token reply.
    pub allow_retry: bool,
    /// Upper bound for the whole call, re-authentication included.
    pub deadline: Option<Duration>,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self { method, url: url.into(), query: Vec::new(), payload: None, allow_retry: true, deadline: None }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    #[must_use]
    pub fn form(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.payload.get_or_insert_with(Vec::new).push((key.into(), value.to_string()));
        self
    }

    #[must_use]
    pub fn allow_retry(mut self, allow: bool) -> Self {
        self.allow_retry = allow;
        self
    }

    #[must_use]
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Authenticated client for the server API.
pub struct ZmApiClient {
    http: HttpClient,
    auth: Arc<dyn TokenProvider>,
    lifecycle: Option<Arc<TokenLifecycle>>,
    settings: ApiSettings,
}

impl ZmApiClient {
    pub fn builder() -> ZmApiClientBuilder {
        ZmApiClientBuilder::default()
    }

    /// Build a client and log in immediately.
    ///
    /// # Errors
    /// `Config` for unusable settings, `AuthFailed` or a transport error if
    /// the initial login fails.
    #[instrument(skip(settings), fields(api_url = %settings.api_url))]
    pub async fn connect(settings: ApiSettings) -> Result<Self, ApiError> {
        let client = Self::builder().settings(settings).build()?;
        if let Some(lifecycle) = &client.lifecycle {
            lifecycle.login().await?;
            let version = lifecycle.server_version().await.unwrap_or_default();
            info!(
                api_version = %version.api_version,
                product_version = %version.product_version,
                auth_enabled = lifecycle.auth_enabled().await,
                "connected to server"
            );
        }
        Ok(client)
    }

    pub fn settings(&self) -> &ApiSettings {
        &self.settings
    }

    /// The built-in token lifecycle; `None` when a provider was injected.
    pub fn token_lifecycle(&self) -> Option<&Arc<TokenLifecycle>> {
        self.lifecycle.as_ref()
    }

    pub fn portal_base(&self) -> String {
        self.settings.portal_base()
    }

    /// Absolute URL for an API path such as `events/1.json`.
    pub fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.settings.api_base(), path.trim_start_matches('/'))
    }

    /// Absolute URL for a portal path such as `index.php`.
    pub fn portal_url(&self, path: &str) -> String {
        format!("{}/{}", self.portal_base(), path.trim_start_matches('/'))
    }

    /// Execute one logical request.
    ///
    /// # Errors
    /// One of the classified failures. `NeedsReauth` never escapes: it turns
    /// into `AuthFailed` once the single retry is spent or disabled.
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let result = match request.deadline {
            Some(deadline) => tokio::time::timeout(deadline, self.execute_with_reauth(&request))
                .await
                .unwrap_or_else(|_| {
                    warn!(deadline_ms = deadline.as_millis() as u64, "request deadline exceeded");
                    Err(ApiError::Timeout(deadline))
                }),
            None => self.execute_with_reauth(&request).await,
        };

        if let Err(err) = &result {
            if err.is_soft_failure() {
                warn!(kind = err.label(), error = %err, "media unavailable");
            } else {
                debug!(kind = err.label(), error = %err, "request failed");
            }
        }
        result
    }

    /// Execute and require a JSON reply.
    ///
    /// # Errors
    /// As [`ZmApiClient::execute`], plus `InvalidResponse` for a non-JSON
    /// success.
    pub async fn execute_json(&self, request: ApiRequest) -> Result<serde_json::Value, ApiError> {
        let url = request.url.clone();
        match self.execute(request).await? {
            ApiResponse::Json(value) => Ok(value),
            other => Err(ApiError::InvalidResponse(format!("{url}: expected JSON, got {}", other.kind()))),
        }
    }

    async fn execute_with_reauth(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let token = self.auth.ensure_valid().await?;

        match self.execute_once(request, token.as_deref()).await {
            Err(ApiError::NeedsReauth(reason)) if request.allow_retry => {
                warn!(%reason, "server rejected token, re-authenticating once");
                let token = self.auth.force_refresh(token.as_deref()).await?;
                match self.execute_once(request, token.as_deref()).await {
                    Err(ApiError::NeedsReauth(reason)) => Err(ApiError::AuthFailed(format!(
                        "still rejected after re-authentication: {reason}"
                    ))),
                    other => other,
                }
            }
            Err(ApiError::NeedsReauth(reason)) => Err(ApiError::AuthFailed(reason)),
            other => other,
        }
    }

    async fn execute_once(&self, request: &ApiRequest, token: Option<&str>) -> Result<ApiResponse, ApiError> {
        let timeout = if request.method == Method::GET {
            self.settings.timeouts.media()
        } else {
            self.settings.timeouts.default_request()
        };

        let mut query: Vec<(&str, &str)> =
            request.query.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        if let Some(token) = token {
            query.push((TOKEN_QUERY_PARAM, token));
        }

        let mut builder = self.http.request(request.method.clone(), &request.url);
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        if let Some(payload) = &request.payload {
            builder = builder.form(payload);
        }

        let response = self.http.send(builder, Some(timeout)).await?;
        let meta = ResponseMeta::from_response(&response);

        if meta.status.is_success() && meta.is_image() {
            debug!(content_type = ?meta.content_type, "image response");
            return Ok(ApiResponse::Image(response));
        }

        let body = response.text().await.map_err(|err| from_reqwest(err, timeout))?;
        classify(&meta, &body, &request.url)
    }
}

/// Builder for [`ZmApiClient`]
#[derive(Default)]
pub struct ZmApiClientBuilder {
    settings: Option<ApiSettings>,
    auth: Option<Arc<dyn TokenProvider>>,
    http: Option<HttpClient>,
}

impl ZmApiClientBuilder {
    pub fn settings(mut self, settings: ApiSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Use this provider instead of the built-in token lifecycle.
    pub fn auth(mut self, auth: Arc<dyn TokenProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn http_client(mut self, http: HttpClient) -> Self {
        self.http = Some(http);
        self
    }

    /// # Errors
    /// `Config` if settings are missing or invalid, or the HTTP client
    /// cannot be built.
    pub fn build(self) -> Result<ZmApiClient, ApiError> {
        let settings =
            self.settings.ok_or_else(|| ApiError::Config("API settings not set".to_string()))?;
        settings.validate()?;

        let http = match self.http {
            Some(http) => http,
            None => HttpClient::builder()
                .timeout(settings.timeouts.default_request())
                .connect_timeout(settings.timeouts.connect())
                .user_agent(concat!("zmapi/", env!("CARGO_PKG_VERSION")))
                .accept_invalid_certs(!settings.ssl_verify)
                .build()?,
        };

        let (auth, lifecycle) = match self.auth {
            Some(auth) => (auth, None),
            None => {
                let lifecycle = Arc::new(TokenLifecycle::new(http.clone(), &settings));
                (lifecycle.clone() as Arc<dyn TokenProvider>, Some(lifecycle))
            }
        };

        Ok(ZmApiClient { http, auth, lifecycle, settings })
    }
}
