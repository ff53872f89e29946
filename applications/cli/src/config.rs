/// CLI configuration
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use vireo_playback::PlayerConfig;

/// File read when no `--config` is given, if present
pub const DEFAULT_CONFIG_FILE: &str = "vireo.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingSettings,

    #[serde(default)]
    pub player: PlayerConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directive, overridden by `RUST_LOG`
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// An explicit `path` must exist; otherwise `vireo.toml` in the working
    /// directory is read when present. `VIREO_`-prefixed variables override
    /// both, with `__` between nested keys (`VIREO_PLAYER__CLOSE_ON_EOF=true`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("VIREO")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = settings
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Failed to parse configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if let Err(err) = EnvFilter::try_new(&self.logging.level) {
            bail!("Invalid log level {:?}: {}", self.logging.level, err);
        }
        self.player.validate()?;
        Ok(())
    }
}

fn default_level() -> String {
    "vireo_cli=info,vireo_playback=info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.player, PlayerConfig::default());
    }

    #[test]
    fn rejects_bad_log_level() {
        let config = AppConfig {
            logging: LoggingSettings {
                level: "vireo=loudest".to_string(),
            },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_invalid_player_settings() {
        let mut config = AppConfig::default();
        config.player.quality_profiles.clear();
        assert!(config.validate().is_err());
    }
}
