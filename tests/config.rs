use riftwatch::RuntimeConfig;
use riftwatch::runtime::error::ConfigError;
use std::fs;
use tempfile::TempDir;

fn write_config(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("riftwatch.json");
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn full_config_loads() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"{
            "bind_address": "0.0.0.0",
            "port": 9000,
            "return_portal_max_distance": 8,
            "pouch_capacity": 27,
            "active_guardian_animation": 1234
        }"#,
    );

    let config = RuntimeConfig::load(&path).unwrap();
    assert_eq!(config.bind_address, "0.0.0.0");
    assert_eq!(config.port, 9000);
    assert_eq!(config.return_portal_max_distance, 8);
    assert_eq!(config.pouch_capacity, 27);
    assert_eq!(config.active_guardian_animation, 1234);
}

#[test]
fn partial_config_takes_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, r#"{"port": 7000}"#);

    let config = RuntimeConfig::load(&path).unwrap();
    assert_eq!(
        config,
        RuntimeConfig {
            port: 7000,
            ..RuntimeConfig::default()
        }
    );
}

#[test]
fn zero_pouch_capacity_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, r#"{"pouch_capacity": 0}"#);

    match RuntimeConfig::load(&path) {
        Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "pouch_capacity"),
        other => panic!("expected invalid config, got {other:?}"),
    }
}

#[test]
fn malformed_config_reports_path() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "{ port: ");

    let err = RuntimeConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("riftwatch.json"));
}

#[test]
fn missing_config_file() {
    let dir = TempDir::new().unwrap();
    let err = RuntimeConfig::load(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}
