use priority_window::{ConfigError, LogLevel, PriorityWidth, WindowConfig, DEFAULT_WINDOW_ID};
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn loads_config_with_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("window.json");
    fs::write(&path, r#"{"period_ms": 1000}"#).unwrap();
    let config = WindowConfig::load_from_file(&path).unwrap();
    assert_eq!(config.window_id, DEFAULT_WINDOW_ID);
    assert_eq!(config.period(), Duration::from_secs(1));
    assert_eq!(config.width, PriorityWidth::Long);
    assert_eq!(config.log_level, LogLevel::Info);
    assert_eq!(config, WindowConfig::with_period(Duration::from_secs(1)));
}

#[test]
fn loads_full_config() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("window.json");
    fs::write(
        &path,
        r#"{
            "window_id": "cse-priority",
            "period_ms": 500,
            "width": "int",
            "log_level": "DEBUG",
            "log_rotation": {"max_bytes": 4096}
        }"#,
    )
    .unwrap();
    let config = WindowConfig::load_from_file(&path).unwrap();
    assert_eq!(config.window_id, "cse-priority");
    assert_eq!(config.width, PriorityWidth::Int);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.log_rotation.max_bytes, 4096);
    assert_eq!(config.log_rotation.max_files, 4);
}

#[test]
fn rejects_zero_period() {
    let err = WindowConfig::from_json(r#"{"period_ms": 0}"#).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidPeriod { period_ms: 0 }));
}

#[test]
fn rejects_blank_window_id() {
    let err = WindowConfig::from_json(r#"{"period_ms": 10, "window_id": "  "}"#).unwrap_err();
    assert!(matches!(err, ConfigError::EmptyWindowId));
}

#[test]
fn reports_missing_and_malformed_files() {
    let dir = tempdir().unwrap();
    let missing = WindowConfig::load_from_file(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(missing, ConfigError::Read { .. }));

    let path = dir.path().join("broken.json");
    fs::write(&path, "{\"period_ms\": ").unwrap();
    let broken = WindowConfig::load_from_file(&path).unwrap_err();
    assert!(matches!(broken, ConfigError::ParseFile { .. }));
    assert!(broken.to_string().contains("broken.json"));
}

#[test]
fn fractional_periods_round_up_to_whole_millis() {
    assert_eq!(WindowConfig::with_period(Duration::from_micros(500)).period_ms, 1);
    assert_eq!(WindowConfig::with_period(Duration::from_micros(1_500)).period_ms, 2);
    assert_eq!(WindowConfig::with_period(Duration::from_millis(250)).period_ms, 250);
    assert_eq!(WindowConfig::with_period(Duration::ZERO).period_ms, 0);
}
