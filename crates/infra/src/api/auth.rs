//! Token lifecycle for the server API
//!
//! Decides, before every outbound request, whether the current credential is
//! usable and obtains a new one with the fewest round trips when it is not.
//!
//! ```text
//! LoggedOut ──login──► Authenticated ──grace reached──► NeedsRefresh ──refresh──► Authenticated
//!     │                      ▲                               │
//!     │                      └────────── login ◄── Expired ◄─┘ (refresh token unusable)
//!     └──reply without access_token──► NoAuth
//! ```
//!
//! Refresh is lazy: there is no background timer. The state sits behind a
//! mutex held across the network exchange, so a check followed by token use
//! is atomic with respect to a concurrent refresh.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};
use zmapi_domain::constants::ORIGIN_DOWN_STATUS;
use zmapi_domain::{ApiSettings, Credentials, LoginResponse, ServerVersion};

use super::errors::ApiError;
use crate::errors::conversions::from_reqwest;
use crate::http::HttpClient;

/// Trait for providing access tokens
///
/// The request executor only sees this seam, which keeps it testable with
/// mock providers.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Make sure a usable credential exists.
    ///
    /// Returns the token to attach, or `None` when the server runs without
    /// authentication.
    async fn ensure_valid(&self) -> Result<Option<String>, ApiError>;

    /// Obtain a new credential after the server rejected `stale`.
    ///
    /// If the current token already differs from `stale`, another request
    /// refreshed it in the meantime and no exchange is made.
    async fn force_refresh(&self, stale: Option<&str>) -> Result<Option<String>, ApiError>;
}

/// Where the lifecycle currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    /// No login has completed yet.
    LoggedOut,
    /// The server reported authentication disabled.
    NoAuth,
    Authenticated,
    /// Access token inside the grace window; refresh token still usable.
    NeedsRefresh,
    /// Access token inside the grace window and no usable refresh token.
    Expired,
}

/// Current authentication state. Only [`TokenLifecycle`] mutates it.
#[derive(Clone, Default)]
pub struct TokenState {
    access_token: String,
    access_expiry: Option<DateTime<Utc>>,
    refresh_token: Option<String>,
    refresh_expiry: Option<DateTime<Utc>>,
    auth_enabled: bool,
    server_version: Option<ServerVersion>,
    logged_in: bool,
}

impl fmt::Debug for TokenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenState")
            .field("has_access_token", &!self.access_token.is_empty())
            .field("access_expiry", &self.access_expiry)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("refresh_expiry", &self.refresh_expiry)
            .field("auth_enabled", &self.auth_enabled)
            .field("server_version", &self.server_version)
            .field("logged_in", &self.logged_in)
            .finish()
    }
}

impl TokenState {
    pub fn auth_enabled(&self) -> bool {
        self.auth_enabled
    }

    pub fn access_expiry(&self) -> Option<DateTime<Utc>> {
        self.access_expiry
    }

    pub fn refresh_expiry(&self) -> Option<DateTime<Utc>> {
        self.refresh_expiry
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.is_some()
    }

    pub fn server_version(&self) -> Option<&ServerVersion> {
        self.server_version.as_ref()
    }

    /// Token to attach to requests; never consulted when auth is disabled.
    pub fn token(&self) -> Option<String> {
        self.auth_enabled.then(|| self.access_token.clone())
    }

    pub fn phase(&self, now: DateTime<Utc>, grace: chrono::Duration) -> AuthPhase {
        if !self.logged_in {
            return AuthPhase::LoggedOut;
        }
        if !self.auth_enabled {
            return AuthPhase::NoAuth;
        }
        match self.access_expiry {
            // Nothing to evaluate: keep using the token until the server objects.
            None => AuthPhase::Authenticated,
            Some(expiry) if expiry - now >= grace => AuthPhase::Authenticated,
            Some(_) if self.usable_refresh_token(now, grace).is_some() => AuthPhase::NeedsRefresh,
            Some(_) => AuthPhase::Expired,
        }
    }

    /// The refresh token, if the server supports token refresh and the token
    /// outlives the grace window.
    fn usable_refresh_token(&self, now: DateTime<Utc>, grace: chrono::Duration) -> Option<&str> {
        if !self.server_version.as_ref().is_some_and(ServerVersion::supports_tokens) {
            return None;
        }
        let expiry = self.refresh_expiry?;
        if expiry - now <= grace {
            return None;
        }
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }

    fn apply_login(&mut self, response: &LoginResponse, request: &LoginRequest, now: DateTime<Utc>) {
        let version = ServerVersion::from(response);
        if !version.api_version.is_empty() || self.server_version.is_none() {
            self.server_version = Some(version);
        }
        self.logged_in = true;

        let Some(access_token) = response.access_token() else {
            // No access_token key: the server runs without authentication.
            let server_version = self.server_version.take();
            *self = Self { server_version, logged_in: true, ..Self::default() };
            return;
        };

        self.auth_enabled = true;
        self.access_token = access_token.to_string();
        self.access_expiry = response.access_token_expires.and_then(|secs| expiry_after(now, secs));

        let supports_tokens = self.server_version.as_ref().is_some_and(ServerVersion::supports_tokens);
        if !supports_tokens {
            self.refresh_token = None;
            self.refresh_expiry = None;
        } else if let Some(refresh_token) = response.refresh_token() {
            self.refresh_token = Some(refresh_token.to_string());
            self.refresh_expiry = response.refresh_token_expires.and_then(|secs| expiry_after(now, secs));
        } else if !matches!(request, LoginRequest::Refresh(_)) {
            self.refresh_token = None;
            self.refresh_expiry = None;
        }
    }
}

/// `now + secs`, or `None` when the server sent a lifetime chrono cannot
/// represent. The token is then used until the server rejects it.
fn expiry_after(now: DateTime<Utc>, secs: i64) -> Option<DateTime<Utc>> {
    let expiry = chrono::Duration::try_seconds(secs).and_then(|d| now.checked_add_signed(d));
    if expiry.is_none() {
        warn!(secs, "token lifetime out of range, ignoring expiry");
    }
    expiry
}

/// Body of one `host/login.json` exchange.
#[derive(Clone)]
enum LoginRequest {
    Credentials(Credentials),
    Refresh(String),
    /// No credentials configured: ask the server whether auth is enabled.
    Probe,
}

impl LoginRequest {
    fn label(&self) -> &'static str {
        match self {
            Self::Credentials(_) => "credentials",
            Self::Refresh(_) => "refresh",
            Self::Probe => "probe",
        }
    }
}

/// Why one login exchange did not produce a usable state.
enum LoginFailure {
    /// 401/403/404: retry the login once.
    Rejected { status: u16, message: String },
    /// 521: wait, then retry once through the refresh path.
    OriginDown,
    /// A refresh reply without an access token.
    NoAccessToken,
    Status { status: u16, message: String },
    Malformed(String),
    Transport(ApiError),
}

impl LoginFailure {
    fn into_api_error(self, request: &LoginRequest) -> ApiError {
        let label = request.label();
        match self {
            Self::Transport(err) => err,
            Self::Rejected { status, message } | Self::Status { status, message } => {
                ApiError::AuthFailed(format!("{label} login returned {status}: {message}"))
            }
            Self::OriginDown => {
                ApiError::AuthFailed(format!("{label} login: origin server down ({ORIGIN_DOWN_STATUS})"))
            }
            Self::NoAccessToken => {
                ApiError::AuthFailed(format!("{label} login reply carried no access token"))
            }
            Self::Malformed(message) => {
                ApiError::AuthFailed(format!("{label} login reply was malformed: {message}"))
            }
        }
    }
}

/// Owns the authentication state for one server connection.
pub struct TokenLifecycle {
    http: HttpClient,
    login_url: String,
    credentials: Option<Credentials>,
    grace: Duration,
    origin_down_delay: Duration,
    request_timeout: Duration,
    state: Mutex<TokenState>,
}

impl TokenLifecycle {
    /// Create a lifecycle in the `LoggedOut` phase. No network I/O happens
    /// until [`TokenLifecycle::login`] or the first `ensure_valid`.
    pub fn new(http: HttpClient, settings: &ApiSettings) -> Self {
        Self {
            http,
            login_url: format!("{}/host/login.json", settings.api_base()),
            credentials: settings.credentials.clone(),
            grace: settings.timeouts.auth_grace(),
            origin_down_delay: settings.timeouts.origin_down_delay(),
            request_timeout: settings.timeouts.default_request(),
            state: Mutex::new(TokenState::default()),
        }
    }

    /// Force a full re-login with the stored credentials.
    ///
    /// # Errors
    /// `AuthFailed` once the single retry is exhausted; transport errors
    /// propagate as-is.
    #[instrument(skip(self))]
    pub async fn login(&self) -> Result<(), ApiError> {
        let mut state = self.state.lock().await;
        self.authenticate(&mut state, self.full_login_request()).await
    }

    pub async fn phase(&self) -> AuthPhase {
        self.state.lock().await.phase(Utc::now(), self.grace_window())
    }

    pub async fn auth_enabled(&self) -> bool {
        self.state.lock().await.auth_enabled
    }

    pub async fn server_version(&self) -> Option<ServerVersion> {
        self.state.lock().await.server_version.clone()
    }

    /// Copy of the current state, for inspection.
    pub async fn snapshot(&self) -> TokenState {
        self.state.lock().await.clone()
    }

    fn grace_window(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.grace).unwrap_or_else(|_| chrono::Duration::seconds(300))
    }

    fn full_login_request(&self) -> LoginRequest {
        match &self.credentials {
            Some(credentials) => LoginRequest::Credentials(credentials.clone()),
            None => LoginRequest::Probe,
        }
    }

    fn refresh_or_login_request(&self, state: &TokenState, now: DateTime<Utc>) -> LoginRequest {
        match state.usable_refresh_token(now, self.grace_window()) {
            Some(token) => LoginRequest::Refresh(token.to_string()),
            None => {
                debug!("refresh token unusable, falling back to full login");
                self.full_login_request()
            }
        }
    }

    /// Run one exchange, retrying once on 401/403/404 (full login) or after
    /// a delay on 521 (refresh path).
    async fn authenticate(&self, state: &mut TokenState, request: LoginRequest) -> Result<(), ApiError> {
        let failure = match self.attempt(state, &request).await {
            Ok(()) => return Ok(()),
            Err(failure) => failure,
        };

        let retry = match failure {
            LoginFailure::Rejected { status, .. } => {
                warn!(kind = request.label(), status, "login rejected, retrying login once");
                self.full_login_request()
            }
            LoginFailure::NoAccessToken => {
                warn!("refresh reply carried no access token, retrying with full login");
                self.full_login_request()
            }
            LoginFailure::OriginDown => {
                warn!(
                    delay_ms = self.origin_down_delay.as_millis() as u64,
                    "origin server reported down, waiting before one retry"
                );
                tokio::time::sleep(self.origin_down_delay).await;
                self.refresh_or_login_request(state, Utc::now())
            }
            other => {
                let err = other.into_api_error(&request);
                error!(kind = request.label(), error = %err, "login failed");
                return Err(err);
            }
        };

        self.attempt(state, &retry).await.map_err(|failure| {
            let err = failure.into_api_error(&retry);
            error!(kind = retry.label(), error = %err, "login retry failed");
            err
        })
    }

    async fn attempt(&self, state: &mut TokenState, request: &LoginRequest) -> Result<(), LoginFailure> {
        let response = self.post_login(request).await?;
        state.apply_login(&response, request, Utc::now());

        if state.auth_enabled {
            info!(
                kind = request.label(),
                api_version = state.server_version.as_ref().map(|v| v.api_version.as_str()),
                access_expiry = ?state.access_expiry,
                refresh_expiry = ?state.refresh_expiry,
                "authenticated"
            );
        } else {
            info!(
                api_version = state.server_version.as_ref().map(|v| v.api_version.as_str()),
                "server reports authentication disabled"
            );
        }
        Ok(())
    }

    async fn post_login(&self, request: &LoginRequest) -> Result<LoginResponse, LoginFailure> {
        debug!(kind = request.label(), "posting login");
        let builder = self.http.request(Method::POST, &self.login_url);
        let builder = match request {
            LoginRequest::Credentials(credentials) => builder
                .form(&[("user", credentials.user()), ("pass", credentials.password())]),
            LoginRequest::Refresh(token) => builder.form(&[("token", token.as_str())]),
            LoginRequest::Probe => builder,
        };

        let response = self
            .http
            .send(builder, Some(self.request_timeout))
            .await
            .map_err(LoginFailure::Transport)?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LoginFailure::Transport(from_reqwest(e, self.request_timeout)))?;

        if !status.is_success() {
            let message = truncate(&body);
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                    LoginFailure::Rejected { status: status.as_u16(), message }
                }
                s if s.as_u16() == ORIGIN_DOWN_STATUS => LoginFailure::OriginDown,
                s => LoginFailure::Status { status: s.as_u16(), message },
            });
        }

        let parsed: LoginResponse =
            serde_json::from_str(&body).map_err(|e| LoginFailure::Malformed(e.to_string()))?;

        if matches!(request, LoginRequest::Refresh(_)) && parsed.access_token().is_none() {
            return Err(LoginFailure::NoAccessToken);
        }
        Ok(parsed)
    }
}

#[async_trait]
impl TokenProvider for TokenLifecycle {
    #[instrument(skip(self))]
    async fn ensure_valid(&self) -> Result<Option<String>, ApiError> {
        let mut state = self.state.lock().await;
        let now = Utc::now();

        match state.phase(now, self.grace_window()) {
            AuthPhase::NoAuth | AuthPhase::Authenticated => {}
            AuthPhase::LoggedOut => {
                debug!("no session yet, logging in");
                self.authenticate(&mut state, self.full_login_request()).await?;
            }
            AuthPhase::NeedsRefresh => {
                debug!(
                    remaining_secs = state.access_expiry.map(|e| (e - now).num_seconds()),
                    "access token inside grace window, refreshing"
                );
                let request = self.refresh_or_login_request(&state, now);
                self.authenticate(&mut state, request).await?;
            }
            AuthPhase::Expired => {
                debug!("access and refresh tokens exhausted, logging in again");
                self.authenticate(&mut state, self.full_login_request()).await?;
            }
        }

        Ok(state.token())
    }

    #[instrument(skip(self, stale))]
    async fn force_refresh(&self, stale: Option<&str>) -> Result<Option<String>, ApiError> {
        let mut state = self.state.lock().await;

        let current = state.token();
        if state.logged_in && current.is_some() && current.as_deref() != stale {
            debug!("token already replaced by a concurrent refresh");
            return Ok(current);
        }

        let request = if state.logged_in && state.auth_enabled {
            self.refresh_or_login_request(&state, Utc::now())
        } else {
            self.full_login_request()
        };
        self.authenticate(&mut state, request).await?;
        Ok(state.token())
    }
}

fn truncate(body: &str) -> String {
    const LIMIT: usize = 200;
    match body.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
