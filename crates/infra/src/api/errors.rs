//! API-specific error types
//!
//! A closed taxonomy: callers dispatch on the variant, never on the message.

use std::time::Duration;

use thiserror::Error;

/// Categories of API errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// Credential problems (login exhausted or stale token)
    Authentication,
    /// The requested event does not exist server-side
    MissingEvent,
    /// Requested media is unavailable; the caller may skip and continue
    Media,
    /// Server errors (5xx)
    Server,
    /// Client errors (4xx not otherwise classified)
    Client,
    /// Network/connection errors and timeouts
    Network,
    /// A response that does not match the protocol
    Protocol,
    /// Configuration errors
    Config,
}

/// API operation errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Login or refresh exhausted its single retry.
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// The server answered as if the token were stale. Handled inside the
    /// executor; callers only see it as [`ApiError::AuthFailed`].
    #[error("Re-authentication required: {0}")]
    NeedsReauth(String),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Image missing: {0}")]
    ImageMissing(String),

    /// Zero-length body: the frame index is outside the buffer.
    #[error("Bad image: {0}")]
    BadImage(String),

    #[error("Frame not found: {0}")]
    FrameNotFound(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Get the error category for this error
    pub fn category(&self) -> ApiErrorCategory {
        match self {
            Self::AuthFailed(_) | Self::NeedsReauth(_) => ApiErrorCategory::Authentication,
            Self::InvalidEvent(_) => ApiErrorCategory::MissingEvent,
            Self::ImageMissing(_) | Self::BadImage(_) | Self::FrameNotFound(_) => {
                ApiErrorCategory::Media
            }
            Self::Http { status, .. } if *status >= 500 => ApiErrorCategory::Server,
            Self::Http { .. } => ApiErrorCategory::Client,
            Self::Network(_) | Self::Timeout(_) => ApiErrorCategory::Network,
            Self::InvalidResponse(_) => ApiErrorCategory::Protocol,
            Self::Config(_) => ApiErrorCategory::Config,
        }
    }

    /// Media unavailable: log, skip the frame, keep going.
    pub fn is_soft_failure(&self) -> bool {
        self.category() == ApiErrorCategory::Media
    }

    /// Whether the executor answers this error with one re-authentication.
    pub fn triggers_reauth(&self) -> bool {
        matches!(self, Self::NeedsReauth(_))
    }

    /// Stable label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::AuthFailed(_) => "auth_failed",
            Self::NeedsReauth(_) => "needs_reauth",
            Self::InvalidEvent(_) => "invalid_event",
            Self::ImageMissing(_) => "image_missing",
            Self::BadImage(_) => "bad_image",
            Self::FrameNotFound(_) => "frame_not_found",
            Self::Http { .. } => "http",
            Self::Network(_) => "network",
            Self::Timeout(_) => "timeout",
            Self::InvalidResponse(_) => "invalid_response",
            Self::Config(_) => "config",
        }
    }
}
