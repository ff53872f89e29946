/// Environment override tests
/// Kept in their own test binary; environment variables are process-wide
use std::fs;
use tempfile::TempDir;
use vireo_cli::AppConfig;
use vireo_core::{BackendKind, PlaybackMode};

/// Test VIREO_ variables override file values
#[test]
fn test_environment_overrides_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vireo.toml");
    fs::write(
        &path,
        r#"
[player]
default_mode = "queue"
default_backend = "platform"
"#,
    )
    .unwrap();

    std::env::set_var("VIREO_PLAYER__DEFAULT_MODE", "shuffle");
    std::env::set_var("VIREO_PLAYER__CLOSE_ON_EOF", "true");
    std::env::set_var("VIREO_PLAYER__WATCH_UPDATE_INTERVAL_MS", "5000");
    let config = AppConfig::load(Some(&path));
    std::env::remove_var("VIREO_PLAYER__DEFAULT_MODE");
    std::env::remove_var("VIREO_PLAYER__CLOSE_ON_EOF");
    std::env::remove_var("VIREO_PLAYER__WATCH_UPDATE_INTERVAL_MS");

    let config = config.unwrap();
    assert_eq!(config.player.default_mode, PlaybackMode::Shuffle);
    assert!(config.player.close_on_eof);
    assert_eq!(config.player.watch_update_interval_ms, 5000);
    assert_eq!(config.player.default_backend, BackendKind::Platform);
}
