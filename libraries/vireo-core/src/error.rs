/// Core error types for Vireo
use std::time::Duration;
use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while building or parsing model values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Resolution label could not be parsed (expected e.g. `1080p60`)
    #[error("Invalid resolution: {0}")]
    InvalidResolution(String),

    /// Segment end does not come after its start
    #[error("Invalid segment range: {start:?}..{end:?}")]
    InvalidSegment {
        /// Segment start
        start: Duration,
        /// Segment end
        end: Duration,
    },

    /// Playback mode label not recognized
    #[error("Unknown playback mode: {0}")]
    UnknownPlaybackMode(String),

    /// Backend label not recognized
    #[error("Unknown backend: {0}")]
    UnknownBackend(String),

    /// A split-adaptive stream was built without both assets, or vice versa
    #[error("Stream kind {kind} does not match its assets")]
    MismatchedAssets {
        /// Declared stream kind
        kind: String,
    },
}
