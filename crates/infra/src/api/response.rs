//! Response classification
//!
//! Maps a raw server reply to JSON, image, empty, or one typed failure.
//! The rules are evaluated in a fixed order; the first match wins.

use reqwest::header::{HeaderName, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use zmapi_domain::constants::{INVALID_EVENT_MESSAGE, NO_FRAME_FOUND_PREFIX};

use super::errors::ApiError;

/// Successful outcome of one executed request.
#[derive(Debug)]
pub enum ApiResponse {
    Json(Value),
    /// Image reply, body unread so the caller can stream it.
    Image(Response),
    /// Non-JSON reply without a Content-Length header.
    Empty,
}

impl ApiResponse {
    pub fn into_json(self) -> Option<Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Json(_) => "json",
            Self::Image(_) => "image",
            Self::Empty => "empty",
        }
    }
}

/// The header fields classification looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMeta {
    pub status: StatusCode,
    pub content_type: Option<String>,
    /// Raw header value; `"0"` and absent mean different things.
    pub content_length: Option<String>,
}

impl ResponseMeta {
    pub fn from_response(response: &Response) -> Self {
        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(|value| value.trim().to_string())
        };
        Self {
            status: response.status(),
            content_type: header(CONTENT_TYPE),
            content_length: header(CONTENT_LENGTH),
        }
    }

    fn content_type_is(&self, prefix: &str) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().starts_with(prefix))
    }

    pub fn is_json(&self) -> bool {
        self.content_type_is("application/json")
    }

    pub fn is_image(&self) -> bool {
        self.content_type_is("image/")
    }
}

/// `{success: false, data: {message}}` carried by 404 replies.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    data: Option<ErrorData>,
}

#[derive(Debug, Deserialize)]
struct ErrorData {
    #[serde(default)]
    message: Option<String>,
}

fn envelope_message(body: &str) -> Option<String> {
    let envelope: ErrorEnvelope = serde_json::from_str(body).ok()?;
    if envelope.success == Some(true) {
        return None;
    }
    envelope.data?.message
}

/// Classify a reply whose body has been read.
///
/// Image replies never reach this point; they are returned before the
/// body is consumed.
///
/// # Errors
/// The failure the reply maps to. `NeedsReauth` is for the executor to
/// handle, not for callers.
pub fn classify(meta: &ResponseMeta, body: &str, url: &str) -> Result<ApiResponse, ApiError> {
    if meta.status.is_success() {
        return classify_success(meta, body, url);
    }

    match meta.status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(ApiError::NeedsReauth(format!("{url} returned {}", meta.status.as_u16())))
        }
        StatusCode::NOT_FOUND => match envelope_message(body) {
            Some(message) if message.trim() == INVALID_EVENT_MESSAGE => {
                Err(ApiError::InvalidEvent(format!("{url}: {message}")))
            }
            Some(message) => Err(ApiError::ImageMissing(format!("{url}: {message}"))),
            None => Err(ApiError::ImageMissing(format!("{url} returned 404"))),
        },
        status => Err(ApiError::Http { status: status.as_u16(), message: summarize(url, body) }),
    }
}

fn classify_success(meta: &ResponseMeta, body: &str, url: &str) -> Result<ApiResponse, ApiError> {
    if meta.is_json() && !body.trim().is_empty() {
        return serde_json::from_str(body)
            .map(ApiResponse::Json)
            .map_err(|e| ApiError::InvalidResponse(format!("{url}: malformed JSON: {e}")));
    }

    match meta.content_length.as_deref() {
        Some("0") => Err(ApiError::BadImage(format!(
            "{url}: empty body, frame index likely outside the buffer"
        ))),
        Some(_) => {
            if body.trim_start().to_lowercase().starts_with(NO_FRAME_FOUND_PREFIX) {
                Err(ApiError::FrameNotFound(format!("{url}: {}", body.trim())))
            } else {
                // The server answers stale tokens with an HTML login page.
                Err(ApiError::NeedsReauth(format!("{url}: non-JSON body in place of data")))
            }
        }
        None => Ok(ApiResponse::Empty),
    }
}

fn summarize(url: &str, body: &str) -> String {
    const LIMIT: usize = 200;
    let body = body.trim();
    if body.is_empty() {
        return url.to_string();
    }
    let clipped: String = body.chars().take(LIMIT).collect();
    format!("{url}: {clipped}")
}
