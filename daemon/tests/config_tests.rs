use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use vmwatch_daemon::config::Config;
use vmwatch_daemon::error::ConfigError;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.general.poll_interval_ms, 100);
    assert_eq!(config.general.window_capacity, 100);
    assert_eq!(config.filter.pattern, "vm");
    assert_eq!(config.sample_timeout(), Duration::from_millis(100));
    assert!(config.validate().is_ok());
}

#[test]
fn test_load_from_toml() {
    let toml_content = r#"
[general]
poll_interval_ms = 250
window_capacity = 60
sample_timeout_ms = 80

[filter]
pattern = "QEMU"
"#;
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(toml_content.as_bytes()).unwrap();
    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.poll_interval(), Duration::from_millis(250));
    assert_eq!(config.general.window_capacity, 60);
    assert_eq!(config.sample_timeout(), Duration::from_millis(80));
    assert!(config.name_filter().matches("qemu-system-x86_64"));
}

#[test]
fn test_missing_sections_take_defaults() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"[general]\nwindow_capacity = 10\n").unwrap();
    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.general.window_capacity, 10);
    assert_eq!(config.general.poll_interval_ms, 100);
    assert_eq!(config.filter.pattern, "vm");
}

#[test]
fn test_zero_capacity_is_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"[general]\nwindow_capacity = 0\n").unwrap();
    let err = Config::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_malformed_toml_is_parse_error() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"[general\npoll_interval_ms = ").unwrap();
    assert!(matches!(Config::load(file.path()), Err(ConfigError::Parse(_))));
}

#[test]
fn test_save_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");
    let mut config = Config::default();
    config.general.poll_interval_ms = 500;
    config.filter.pattern = "virtualbox".to_string();
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded, config);
}
