//! Integration tests for loading `lodtex.yaml` and turning it into runtime choices

use camino::Utf8PathBuf;
use lodtex::ConfigManager;
use lodtex::config::SETTINGS_FILE_NAME;
use lodtex::models::{ConversionConfig, WidthClass};
use lodtex::services::{HttpBackend, policy_from_settings};
use std::fs;
use tempfile::TempDir;

fn manager_in(temp_dir: &TempDir) -> ConfigManager {
    let dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    ConfigManager::new(&dir).unwrap()
}

#[test]
fn test_full_settings_file() {
    let temp_dir = TempDir::new().unwrap();
    let manager = manager_in(&temp_dir);

    fs::write(
        temp_dir.path().join(SETTINGS_FILE_NAME),
        r#"
service:
  base_url: "http://converter.local:8080/lod"
  request_timeout_secs: 45
downloads:
  directory: "C:/Users/me/Documents/tables"
validation:
  enforce_width_range: true
  min_width: 0.5
  max_width: 12.0
debug_mode: true
"#,
    )
    .unwrap();

    let settings = manager.load_settings().unwrap();

    assert_eq!(settings.service.base_url, "http://converter.local:8080/lod");
    assert_eq!(settings.service.request_timeout_secs, Some(45));
    assert_eq!(
        settings.downloads.directory,
        Some(Utf8PathBuf::from("C:/Users/me/Documents/tables"))
    );
    assert!(settings.validation.enforce_width_range);
    assert_eq!(settings.validation.min_width, 0.5);
    assert_eq!(settings.validation.max_width, 12.0);
    assert!(settings.debug_mode);
}

#[test]
fn test_settings_drive_backend_and_policy() {
    let temp_dir = TempDir::new().unwrap();
    let manager = manager_in(&temp_dir);

    fs::write(
        temp_dir.path().join(SETTINGS_FILE_NAME),
        "service:\n  base_url: http://converter.local:8080/lod\nvalidation:\n  enforce_width_range: true\n",
    )
    .unwrap();
    let settings = manager.load_settings().unwrap();

    let backend = HttpBackend::new(&settings.service).unwrap();
    assert_eq!(
        backend.endpoint("api/download-zip").unwrap().as_str(),
        "http://converter.local:8080/lod/api/download-zip"
    );

    let policy = policy_from_settings(&settings.validation);
    let mut config = ConversionConfig::default();
    assert!(policy.validate(&config).is_ok());

    config.set_column_width(WidthClass::Second, "11");
    assert!(policy.validate(&config).is_err());
}

#[test]
fn test_malformed_yaml_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let manager = manager_in(&temp_dir);

    fs::write(
        temp_dir.path().join(SETTINGS_FILE_NAME),
        "service: [this is not a mapping",
    )
    .unwrap();

    let err = manager.load_settings().unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to parse settings"));
}

#[test]
fn test_save_then_load_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let manager = manager_in(&temp_dir);

    let mut settings = manager.load_settings().unwrap();
    settings.downloads.directory = Some(Utf8PathBuf::from("out"));
    settings.service.request_timeout_secs = Some(10);
    manager.save_settings(&settings).unwrap();

    let reloaded = manager_in(&temp_dir).load_settings().unwrap();
    assert_eq!(reloaded, settings);
}

#[test]
fn test_empty_base_url_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let manager = manager_in(&temp_dir);

    fs::write(
        temp_dir.path().join(SETTINGS_FILE_NAME),
        "service:\n  base_url: \"  \"\n",
    )
    .unwrap();

    assert!(manager.load_settings().is_err());
}
