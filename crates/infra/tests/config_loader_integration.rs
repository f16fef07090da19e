//! Integration tests for configuration loading.

use std::io::Write;

use tempfile::NamedTempFile;
use zmapi_infra::api::ZoneImportSettings;
use zmapi_infra::config;

#[test]
fn test_load_config_from_toml_file() {
    let toml_content = r#"
[api]
api_url = "https://nvr.example.com/zm/api"
portal_url = "https://nvr.example.com/zm"

[api.credentials]
user = "admin"
password = "secret"

[api.timeouts]
auth_grace_secs = 120

[detection]
import_zones = true
match_origin_zone = true

[monitors.1.zones.Door]
points = [{ x = 0, y = 0 }, { x = 10, y = 0 }, { x = 10, y = 10 }]
resolution = { width = 1920, height = 1080 }

[monitors.1.zones.Gate]
"#;

    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file.write_all(toml_content.as_bytes()).expect("Failed to write to temp file");
    let path = temp_file.path().with_extension("toml");
    std::fs::copy(temp_file.path(), &path).expect("Failed to copy file");

    let result = config::load_from_file(Some(path.clone()));
    std::fs::remove_file(path).ok();
    let config = result.expect("Failed to load config from TOML file");

    assert_eq!(config.api.portal_base(), "https://nvr.example.com/zm");
    assert_eq!(config.api.timeouts.auth_grace_secs, 120);
    assert_eq!(config.api.timeouts.media_secs, 240);

    let import = ZoneImportSettings::from(&config.detection);
    assert!(import.import_zones && import.match_origin_zone);

    let zones = &config.monitors[&1].zones;
    assert!(zones["Door"].has_points());
    assert!(!zones["Gate"].has_points());
}

#[test]
fn test_load_config_rejects_half_credentials() {
    let json_content = r#"{"api": {"api_url": "https://nvr/zm/api", "credentials": {"user": "admin", "password": ""}}}"#;

    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file.write_all(json_content.as_bytes()).expect("Failed to write to temp file");
    let path = temp_file.path().with_extension("json");
    std::fs::copy(temp_file.path(), &path).expect("Failed to copy file");

    let result = config::load_from_file(Some(path.clone()));
    std::fs::remove_file(path).ok();
    assert!(result.is_err());
}
