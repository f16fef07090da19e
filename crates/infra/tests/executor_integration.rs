//! Integration tests for request execution and response classification.

mod support;

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zmapi_infra::api::{ApiCommands, FrameSelector};
use zmapi_infra::{ApiError, ZmApiClient};

use support::{
    api_path, api_requests, init_tracing, login_bodies, mount_credential_login, mount_refresh,
    no_auth_login, settings, token_login,
};

async fn connect(server: &MockServer) -> ApiCommands {
    let client = ZmApiClient::connect(settings(server)).await.expect("connect");
    ApiCommands::new(Arc::new(client))
}

fn token_of(request: &wiremock::Request) -> Option<String> {
    request.url.query_pairs().find(|(k, _)| k == "token").map(|(_, v)| v.into_owned())
}

fn event_envelope() -> serde_json::Value {
    json!({
        "event": {
            "Event": {"Id": "42", "MonitorId": "1", "Cause": "Motion: Driveway", "Frames": "3"},
            "Monitor": {"Id": "1", "Name": "Front", "Width": "1920", "Height": "1080"},
            "Frame": [
                {"Id": "900", "FrameId": "1", "Type": "Normal", "Score": "0"},
                {"Id": "901", "FrameId": "2", "Type": "Alarm", "Score": "45"},
                {"Id": "902", "FrameId": "3", "Type": "Alarm", "Score": "12"}
            ]
        }
    })
}

#[tokio::test]
async fn get_event_decodes_envelope_and_sends_token() {
    init_tracing();
    let server = MockServer::start().await;
    mount_credential_login(&server, token_login("2.0", "tok", 3600, 86_400)).await;
    Mock::given(method("GET"))
        .and(path(api_path("events/42.json")))
        .and(query_param("token", "tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(event_envelope()))
        .expect(1)
        .mount(&server)
        .await;

    let commands = connect(&server).await;
    let data = commands.get_event(42).await.unwrap();

    assert_eq!(data.event.id, 42);
    assert_eq!(data.event.cause.as_deref(), Some("Motion: Driveway"));
    assert_eq!(data.monitor.name.as_deref(), Some("Front"));
    assert_eq!(data.frame_count, 3);
    assert_eq!(data.frames.iter().map(|f| f.frame_id).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert!(data.frames[1].is_alarm());
}

#[tokio::test]
async fn unknown_event_is_invalid_event_without_reauth() {
    init_tracing();
    let server = MockServer::start().await;
    mount_credential_login(&server, token_login("2.0", "tok", 3600, 86_400)).await;
    Mock::given(method("GET"))
        .and(path(api_path("events/7.json")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "success": false,
            "data": {"name": "Invalid event", "message": "Invalid event", "url": "/zm/api/events/7.json"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let commands = connect(&server).await;
    let err = commands.get_event(7).await.unwrap_err();

    assert!(matches!(err, ApiError::InvalidEvent(_)), "got {err:?}");
    assert_eq!(login_bodies(&server).await.len(), 1);
}

#[tokio::test]
async fn stale_token_is_refreshed_and_request_retried_once() {
    init_tracing();
    let server = MockServer::start().await;
    mount_credential_login(&server, token_login("2.0", "old", 3600, 86_400)).await;
    mount_refresh(&server, token_login("2.0", "new", 3600, 86_400)).await;
    Mock::given(method("GET"))
        .and(path(api_path("events/42.json")))
        .and(query_param("token", "old"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(api_path("events/42.json")))
        .and(query_param("token", "new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(event_envelope()))
        .mount(&server)
        .await;

    let commands = connect(&server).await;
    let data = commands.get_event(42).await.unwrap();
    assert_eq!(data.event.id, 42);

    let requests = api_requests(&server).await;
    assert_eq!(requests.len(), 2);
    assert_eq!(token_of(&requests[0]).as_deref(), Some("old"));
    assert_eq!(token_of(&requests[1]).as_deref(), Some("new"));
    assert_eq!(login_bodies(&server).await[1], "token=old-refresh");
}

#[tokio::test]
async fn login_page_in_place_of_json_fails_after_one_retry() {
    init_tracing();
    let server = MockServer::start().await;
    mount_credential_login(&server, token_login("2.0", "tok", 3600, 86_400)).await;
    mount_refresh(&server, token_login("2.0", "tok2", 3600, 86_400)).await;
    Mock::given(method("GET"))
        .and(path(api_path("monitors/1.json")))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<html><body>Login</body></html>", "text/html"),
        )
        .expect(2)
        .mount(&server)
        .await;

    let commands = connect(&server).await;
    let err = commands
        .client()
        .execute(zmapi_infra::ApiRequest::get(commands.client().api_url("monitors/1.json")))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::AuthFailed(_)), "got {err:?}");
}

#[tokio::test]
async fn server_errors_propagate_without_retry() {
    init_tracing();
    let server = MockServer::start().await;
    mount_credential_login(&server, token_login("2.0", "tok", 3600, 86_400)).await;
    Mock::given(method("GET"))
        .and(path(api_path("events/1.json")))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(1)
        .mount(&server)
        .await;

    let commands = connect(&server).await;
    let err = commands.get_event(1).await.unwrap_err();
    assert!(matches!(err, ApiError::Http { status: 503, .. }), "got {err:?}");
    assert_eq!(login_bodies(&server).await.len(), 1);
}

#[tokio::test]
async fn auth_disabled_requests_carry_no_token() {
    init_tracing();
    let server = MockServer::start().await;
    mount_credential_login(&server, no_auth_login()).await;
    Mock::given(method("GET"))
        .and(path(api_path("monitors/3.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "monitor": {"Monitor": {"Id": "3", "Name": "Garage", "Width": "1280", "Height": "720"}}
        })))
        .mount(&server)
        .await;

    let commands = connect(&server).await;
    let monitor = commands.get_monitor(3).await.expect("monitor");
    assert_eq!(monitor.name.as_deref(), Some("Garage"));

    let requests = api_requests(&server).await;
    assert_eq!(requests.len(), 1);
    assert_eq!(token_of(&requests[0]), None);
}

#[tokio::test]
async fn monitor_lookup_failure_yields_none() {
    init_tracing();
    let server = MockServer::start().await;
    mount_credential_login(&server, no_auth_login()).await;
    Mock::given(method("GET"))
        .and(path(api_path("monitors/9.json")))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let commands = connect(&server).await;
    assert_eq!(commands.get_monitor(9).await, None);
}

#[tokio::test]
async fn timezone_keeps_cached_value_on_failure() {
    init_tracing();
    let server = MockServer::start().await;
    mount_credential_login(&server, no_auth_login()).await;
    Mock::given(method("GET"))
        .and(path(api_path("host/gettimezone.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tz": "Europe/Berlin"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(api_path("host/gettimezone.json")))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let commands = connect(&server).await;
    assert_eq!(commands.get_timezone().await.as_deref(), Some("Europe/Berlin"));
    // Cached: no second request.
    assert_eq!(commands.get_timezone().await.as_deref(), Some("Europe/Berlin"));
    assert_eq!(api_requests(&server).await.len(), 1);

    assert_eq!(commands.timezone(true).await.as_deref(), Some("Europe/Berlin"));
    assert_eq!(api_requests(&server).await.len(), 2);
}

#[tokio::test]
async fn timezone_defaults_to_none() {
    init_tracing();
    let server = MockServer::start().await;
    mount_credential_login(&server, no_auth_login()).await;
    Mock::given(method("GET"))
        .and(path(api_path("host/gettimezone.json")))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let commands = connect(&server).await;
    assert_eq!(commands.get_timezone().await, None);
}

#[tokio::test]
async fn frame_fetch_returns_image_bytes() {
    init_tracing();
    let server = MockServer::start().await;
    mount_credential_login(&server, token_login("2.0", "tok", 3600, 86_400)).await;
    let jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
    Mock::given(method("GET"))
        .and(path("/zm/index.php"))
        .and(query_param("view", "image"))
        .and(query_param("eid", "42"))
        .and(query_param("fid", "snapshot"))
        .and(query_param("token", "tok"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(jpeg.clone(), "image/jpeg"))
        .expect(1)
        .mount(&server)
        .await;

    let commands = connect(&server).await;
    let frame = commands.fetch_frame(42, FrameSelector::Snapshot).await.unwrap();
    assert_eq!(frame.content_type, "image/jpeg");
    assert_eq!(frame.data, jpeg);
}

#[tokio::test]
async fn zero_length_frame_is_bad_image_without_retry() {
    init_tracing();
    let server = MockServer::start().await;
    mount_credential_login(&server, token_login("2.0", "tok", 3600, 86_400)).await;
    Mock::given(method("GET"))
        .and(path("/zm/index.php"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let commands = connect(&server).await;
    let err = commands.fetch_frame(42, FrameSelector::Index(999)).await.unwrap_err();
    assert!(matches!(err, ApiError::BadImage(_)), "got {err:?}");
    assert!(err.is_soft_failure());
    assert_eq!(login_bodies(&server).await.len(), 1);
}

#[tokio::test]
async fn missing_frame_text_is_frame_not_found() {
    init_tracing();
    let server = MockServer::start().await;
    mount_credential_login(&server, token_login("2.0", "tok", 3600, 86_400)).await;
    Mock::given(method("GET"))
        .and(path("/zm/index.php"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("No Frame found for event 42 frame 12", "text/html"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let commands = connect(&server).await;
    let err = commands.fetch_frame(42, FrameSelector::Index(12)).await.unwrap_err();
    assert!(matches!(err, ApiError::FrameNotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn missing_image_404_is_image_missing() {
    init_tracing();
    let server = MockServer::start().await;
    mount_credential_login(&server, token_login("2.0", "tok", 3600, 86_400)).await;
    Mock::given(method("GET"))
        .and(path("/zm/index.php"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "success": false,
            "data": {"message": "Can't find frame"}
        })))
        .mount(&server)
        .await;

    let commands = connect(&server).await;
    let err = commands.fetch_frame(42, FrameSelector::Alarm).await.unwrap_err();
    assert!(matches!(err, ApiError::ImageMissing(_)), "got {err:?}");
}
