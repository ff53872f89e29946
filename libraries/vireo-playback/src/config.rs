/// Player configuration
use crate::backend::SeekTolerance;
use crate::error::{PlaybackError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use vireo_core::{BackendKind, PlaybackMode, QualityProfile, SegmentCategory};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PlayerConfig {
    #[serde(default)]
    pub default_mode: PlaybackMode,

    /// Close the player when the queue runs out
    #[serde(default)]
    pub close_on_eof: bool,

    #[serde(default = "default_frequent_tick_ms")]
    pub frequent_tick_ms: u64,

    #[serde(default = "default_persistence_tick_ms")]
    pub persistence_tick_ms: u64,

    /// Minimum interval between watch-position updates for one video
    #[serde(default = "default_watch_update_interval_ms")]
    pub watch_update_interval_ms: u64,

    /// Segments starting within this window are skipped before playback starts
    #[serde(default = "default_intro_skip_window_ms")]
    pub intro_skip_window_ms: u64,

    #[serde(default = "default_skip_categories")]
    pub skip_categories: Vec<SegmentCategory>,

    #[serde(default = "default_seek_tolerance_before_ms")]
    pub seek_tolerance_before_ms: u64,

    #[serde(default)]
    pub seek_tolerance_after_ms: u64,

    #[serde(default)]
    pub default_backend: BackendKind,

    /// Ordered; the first profile whose conditions hold applies
    #[serde(default = "default_quality_profiles")]
    pub quality_profiles: Vec<QualityProfile>,

    /// Re-select the current item when device conditions change the profile
    #[serde(default = "default_auto_switch")]
    pub auto_switch: bool,

    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    #[serde(default = "default_command_capacity")]
    pub command_capacity: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_mode: PlaybackMode::default(),
            close_on_eof: false,
            frequent_tick_ms: default_frequent_tick_ms(),
            persistence_tick_ms: default_persistence_tick_ms(),
            watch_update_interval_ms: default_watch_update_interval_ms(),
            intro_skip_window_ms: default_intro_skip_window_ms(),
            skip_categories: default_skip_categories(),
            seek_tolerance_before_ms: default_seek_tolerance_before_ms(),
            seek_tolerance_after_ms: 0,
            default_backend: BackendKind::default(),
            quality_profiles: default_quality_profiles(),
            auto_switch: default_auto_switch(),
            event_capacity: default_event_capacity(),
            command_capacity: default_command_capacity(),
        }
    }
}

impl PlayerConfig {
    pub fn frequent_tick(&self) -> Duration {
        Duration::from_millis(self.frequent_tick_ms)
    }

    pub fn persistence_tick(&self) -> Duration {
        Duration::from_millis(self.persistence_tick_ms)
    }

    pub fn watch_update_interval(&self) -> Duration {
        Duration::from_millis(self.watch_update_interval_ms)
    }

    pub fn intro_skip_window(&self) -> Duration {
        Duration::from_millis(self.intro_skip_window_ms)
    }

    /// Tolerance applied to engine-initiated seeks
    pub fn seek_tolerance(&self) -> SeekTolerance {
        SeekTolerance::new(
            Duration::from_millis(self.seek_tolerance_before_ms),
            Duration::from_millis(self.seek_tolerance_after_ms),
        )
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.frequent_tick_ms == 0 || self.persistence_tick_ms == 0 {
            return Err(PlaybackError::Config(
                "tick intervals must be greater than zero".to_string(),
            ));
        }

        if self.quality_profiles.is_empty() {
            return Err(PlaybackError::Config(
                "at least one quality profile is required".to_string(),
            ));
        }

        if let Some(profile) = self.quality_profiles.iter().find(|p| p.formats.is_empty()) {
            return Err(PlaybackError::Config(format!(
                "quality profile {:?} accepts no formats",
                profile.name
            )));
        }

        if self.event_capacity == 0 || self.command_capacity == 0 {
            return Err(PlaybackError::Config(
                "channel capacities must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

// Default values
fn default_frequent_tick_ms() -> u64 {
    500
}

fn default_persistence_tick_ms() -> u64 {
    3_000
}

fn default_watch_update_interval_ms() -> u64 {
    2_000
}

fn default_intro_skip_window_ms() -> u64 {
    3_000
}

fn default_skip_categories() -> Vec<SegmentCategory> {
    SegmentCategory::DEFAULT_SKIPPED.to_vec()
}

fn default_seek_tolerance_before_ms() -> u64 {
    1_000
}

fn default_quality_profiles() -> Vec<QualityProfile> {
    vec![QualityProfile::default()]
}

fn default_auto_switch() -> bool {
    true
}

fn default_event_capacity() -> usize {
    256
}

fn default_command_capacity() -> usize {
    64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = PlayerConfig::default();
        config.validate().unwrap();
        assert_eq!(config.frequent_tick(), Duration::from_millis(500));
        assert_eq!(config.persistence_tick(), Duration::from_secs(3));
        assert_eq!(config.seek_tolerance(), SeekTolerance::default());
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config: PlayerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, PlayerConfig::default());
    }

    #[test]
    fn rejects_missing_profiles() {
        let config = PlayerConfig {
            quality_profiles: Vec::new(),
            ..PlayerConfig::default()
        };
        assert!(matches!(config.validate(), Err(PlaybackError::Config(_))));
    }

    #[test]
    fn rejects_zero_tick() {
        let config = PlayerConfig {
            frequent_tick_ms: 0,
            ..PlayerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
