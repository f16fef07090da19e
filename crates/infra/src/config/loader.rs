//! Configuration loader
//!
//! Loads the client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `ZMAPI_URL` is unset or a value is invalid, falls back to a file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `ZMAPI_URL`: API base URL (required), e.g. `https://nvr/zm/api`
//! - `ZMAPI_PORTAL_URL`: Portal URL, derived from `ZMAPI_URL` when unset
//! - `ZMAPI_USER` / `ZMAPI_PASSWORD`: Credentials, both or neither
//! - `ZMAPI_SSL_VERIFY`: Verify TLS certificates (default true)
//! - `ZMAPI_IMPORT_ZONES`: Import server zones (default false)
//! - `ZMAPI_MATCH_ORIGIN_ZONE`: Only import zones named in the event cause
//!   (default false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./zmapi.toml` or `./zmapi.json` (current working directory)
//! 2. `./config.toml` or `./config.json` (current working directory)
//! 3. The same names relative to the executable location

use std::path::{Path, PathBuf};

use zmapi_domain::{ApiSettings, ClientConfig, Credentials, DetectionSettings, Result, ZmError};

const CONFIG_NAMES: [&str; 4] = ["zmapi.toml", "zmapi.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `ZmError::Config` if neither source yields a valid configuration.
pub fn load() -> Result<ClientConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `ZmError::Config` if `ZMAPI_URL` is missing or the resulting
/// configuration does not validate.
pub fn load_from_env() -> Result<ClientConfig> {
    let mut api = ApiSettings::new(env_var("ZMAPI_URL")?);
    api.portal_url = env_opt("ZMAPI_PORTAL_URL");
    api.ssl_verify = env_bool("ZMAPI_SSL_VERIFY", true);

    api.credentials = match (env_opt("ZMAPI_USER"), env_opt("ZMAPI_PASSWORD")) {
        (Some(user), Some(password)) => Some(Credentials::new(user, password)),
        (None, None) => None,
        _ => {
            return Err(ZmError::Config(
                "ZMAPI_USER and ZMAPI_PASSWORD must be set together".to_string(),
            ))
        }
    };

    let config = ClientConfig {
        detection: DetectionSettings {
            import_zones: env_bool("ZMAPI_IMPORT_ZONES", false),
            match_origin_zone: env_bool("ZMAPI_MATCH_ORIGIN_ZONE", false),
        },
        ..ClientConfig::new(api)
    };
    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations.
///
/// # Errors
/// Returns `ZmError::Config` if the file is missing, unreadable, malformed,
/// or does not validate.
pub fn load_from_file(path: Option<PathBuf>) -> Result<ClientConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ZmError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            ZmError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| ZmError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<ClientConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| ZmError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| ZmError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(ZmError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing config file in the working directory, then next to the
/// executable.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
        dirs.push(exe_dir);
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

fn env_var(key: &str) -> Result<String> {
    env_opt(key)
        .ok_or_else(|| ZmError::Config(format!("Missing required environment variable: {key}")))
}

/// Set and non-blank.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive).
/// Anything else keeps `default`.
fn env_bool(key: &str, default: bool) -> bool {
    let Ok(raw) = std::env::var(key) else {
        return default;
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        other => {
            tracing::warn!(key, value = other, default, "unrecognised boolean, using default");
            default
        }
    }
}
