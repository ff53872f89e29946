/// Configuration loading tests
/// Tests file sources, defaults and validation failures
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use vireo_cli::AppConfig;
use vireo_core::{
    BackendKind, NetworkKind, PlaybackMode, ProfileCondition, Resolution, SegmentCategory,
};

fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("vireo.toml");
    fs::write(&path, contents).unwrap();
    path
}

/// Test the shipped example configuration loads and validates
#[test]
fn test_example_config_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/vireo.toml");
    let config = AppConfig::load(Some(&path)).unwrap();

    let profiles = &config.player.quality_profiles;
    assert_eq!(profiles.len(), 3);
    assert_eq!(profiles[0].name, "Data Saver");
    assert_eq!(profiles[0].max_resolution, Resolution::SD_480P);
    assert_eq!(profiles[0].conditions, vec![ProfileCondition::Network(NetworkKind::Cellular)]);
    assert_eq!(profiles[1].conditions, vec![ProfileCondition::LowPower(true)]);
    assert_eq!(profiles[2].backend, BackendKind::Library);
    assert_eq!(profiles[2].max_resolution, Resolution::UHD_2160P60);
    assert_eq!(
        config.player.skip_categories,
        vec![SegmentCategory::Sponsor, SegmentCategory::Selfpromo]
    );
}

/// Test missing keys fall back to defaults
#[test]
fn test_partial_config_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[player]
default_mode = "loop_one"
close_on_eof = true
"#,
    );

    let config = AppConfig::load(Some(&path)).unwrap();

    assert_eq!(config.player.default_mode, PlaybackMode::LoopOne);
    assert!(config.player.close_on_eof);
    assert_eq!(config.player.frequent_tick_ms, 500);
    assert_eq!(config.player.quality_profiles.len(), 1);
    assert_eq!(config.logging.level, AppConfig::default().logging.level);
}

/// Test an explicit path that does not exist is an error
#[test]
fn test_missing_explicit_file_fails() {
    let dir = TempDir::new().unwrap();
    let result = AppConfig::load(Some(&dir.path().join("absent.toml")));
    assert!(result.is_err());
}

/// Test validation runs after loading
#[test]
fn test_invalid_values_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[player]
frequent_tick_ms = 0
"#,
    );

    let err = AppConfig::load(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("tick"), "unexpected error: {err}");
}

/// Test malformed values are reported
#[test]
fn test_bad_resolution_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[[player.quality_profiles]]
name = "Broken"
max_resolution = "widescreen"
"#,
    );

    assert!(AppConfig::load(Some(&path)).is_err());
}
