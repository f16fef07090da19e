//! Conversions from external infrastructure errors into API errors.

use std::time::Duration;

use reqwest::Error as HttpError;
use zmapi_domain::ZmError;

use crate::api::errors::ApiError;

/* -------------------------------------------------------------------------- */
/* reqwest::Error → ApiError */
/* -------------------------------------------------------------------------- */

/// Map a transport failure. `timeout` is the bound that was in force, used
/// for the `Timeout` variant since reqwest does not report it.
pub fn from_reqwest(err: HttpError, timeout: Duration) -> ApiError {
    if err.is_timeout() {
        return ApiError::Timeout(timeout);
    }
    if err.is_builder() {
        return ApiError::Config(format!("invalid HTTP request: {err}"));
    }
    if err.is_decode() {
        return ApiError::InvalidResponse(format!("failed to decode response body: {err}"));
    }
    if err.is_connect() {
        return ApiError::Network(format!("connection failed: {err}"));
    }
    ApiError::Network(format!("http transport error: {err}"))
}

/* -------------------------------------------------------------------------- */
/* ZmError → ApiError */
/* -------------------------------------------------------------------------- */

impl From<ZmError> for ApiError {
    fn from(err: ZmError) -> Self {
        match err {
            ZmError::Config(message) => Self::Config(message),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(format!("malformed JSON: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use super::*;

    #[test]
    fn domain_errors_map_to_config_errors() {
        assert!(matches!(ApiError::from(ZmError::Config("x".into())), ApiError::Config(_)));
    }

    #[test]
    fn json_errors_are_invalid_responses() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        assert!(matches!(ApiError::from(err), ApiError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn connection_refused_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener); // release the port so that requests fail with ECONNREFUSED

        let err = reqwest::Client::new().get(format!("http://{addr}")).send().await.unwrap_err();
        match from_reqwest(err, Duration::from_secs(1)) {
            ApiError::Network(msg) => assert!(msg.contains("connection failed")),
            other => panic!("expected network error, got {other:?}"),
        }
    }
}
