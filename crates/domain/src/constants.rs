//! Protocol constants
//!
//! Values the server protocol fixes, plus the defaults used when the
//! configuration does not override them.

/// Seconds before expiry at which a token is treated as needing refresh.
pub const AUTH_GRACE_SECS: u64 = 300;

/// Upper bound for GET requests, sized for large media responses.
pub const MEDIA_TIMEOUT_SECS: u64 = 240;

/// Timeout for non-GET requests and the login exchange.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Delay before retrying a login that hit an "origin down" (521) reply.
pub const ORIGIN_DOWN_DELAY_SECS: u64 = 5;

/// Lowest API version that issues access/refresh token pairs.
pub const MIN_TOKEN_API_VERSION: (u32, u32) = (2, 0);

/// Query parameter carrying the access token.
pub const TOKEN_QUERY_PARAM: &str = "token";

/// Body prefix (lowercased) the server sends when a frame is not buffered.
pub const NO_FRAME_FOUND_PREFIX: &str = "no frame found";

/// 404 envelope message for an unknown event id.
pub const INVALID_EVENT_MESSAGE: &str = "Invalid event";

/// Status code used by fronting proxies when the origin server is down.
pub const ORIGIN_DOWN_STATUS: u16 = 521;

/// Zone type the server uses for disabled zones.
pub const INACTIVE_ZONE_TYPE: &str = "Inactive";
