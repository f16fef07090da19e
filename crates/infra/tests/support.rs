//! Shared fixtures for integration tests: a mocked server and tracing setup.
#![allow(dead_code)]

use std::sync::OnceLock;

use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zmapi_domain::{ApiSettings, Credentials};

pub const USER: &str = "admin";
pub const PASSWORD: &str = "secret";
pub const LOGIN_PATH: &str = "/zm/api/host/login.json";

/// Install a test subscriber once; `RUST_LOG` controls verbosity.
pub fn init_tracing() {
    static INIT: OnceLock<()> = OnceLock::new();
    INIT.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Settings pointing at `server`, with credentials and no 521 back-off.
pub fn settings(server: &MockServer) -> ApiSettings {
    let mut settings = ApiSettings::new(format!("{}/zm/api", server.uri()))
        .with_credentials(Credentials::new(USER, PASSWORD));
    settings.timeouts.origin_down_delay_secs = 0;
    settings
}

pub fn api_path(rest: &str) -> String {
    format!("/zm/api/{}", rest.trim_start_matches('/'))
}

/// Token login reply.
pub fn token_login(api_version: &str, access: &str, access_secs: i64, refresh_secs: i64) -> Value {
    json!({
        "access_token": access,
        "access_token_expires": access_secs,
        "refresh_token": format!("{access}-refresh"),
        "refresh_token_expires": refresh_secs,
        "version": "1.36.12",
        "apiversion": api_version,
    })
}

/// Login reply of a server with authentication disabled.
pub fn no_auth_login() -> Value {
    json!({"version": "1.36.12", "apiversion": "2.0"})
}

/// Answer credential logins (`user=` in the form body) with `body`.
pub async fn mount_credential_login(server: &MockServer, body: Value) {
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .and(body_string_contains("user="))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Answer refresh exchanges (`token=` in the form body) with `body`.
pub async fn mount_refresh(server: &MockServer, body: Value) {
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .and(body_string_contains("token="))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Form bodies of every login POST the server received, in order.
pub async fn login_bodies(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == LOGIN_PATH)
        .map(|r| String::from_utf8_lossy(&r.body).into_owned())
        .collect()
}

/// Requests to anything but the login endpoint.
pub async fn api_requests(server: &MockServer) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() != LOGIN_PATH)
        .collect()
}
