//! Error types for the playback engine

use crate::backend::BackendState;
use thiserror::Error;
use vireo_core::{BackendKind, CoreError, VideoId};

/// Playback errors
///
/// Only load and selection failures are meant for the user; see
/// [`PlaybackError::is_user_visible`]. The rest are coordination outcomes
/// that the engine handles locally.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlaybackError {
    /// An asset or manifest failed to resolve or prepare
    #[error("Failed to load {locator}: {reason}")]
    LoadFailure {
        /// Asset locator (or stream description)
        locator: String,
        /// Loader-supplied reason
        reason: String,
    },

    /// The selector found nothing within the active quality settings
    #[error("No stream of {video_id} matches the current quality settings")]
    NoPlayableStream {
        /// Video whose candidates were rejected
        video_id: VideoId,
    },

    /// A seek was requested while another is in flight
    #[error("Seek rejected: another seek is in flight")]
    SeekRejected,

    /// A completion arrived for a superseded selection
    #[error("Stale result discarded")]
    StaleResult,

    /// Related mode finished with no autoplay candidate
    #[error("Nothing to play next")]
    NothingToPlay,

    /// Command needs a loaded item
    #[error("No item loaded")]
    NoItemLoaded,

    /// The backend cannot play this kind or format of stream
    #[error("{backend} backend cannot play {stream}")]
    UnsupportedStream {
        /// Backend asked to play the stream
        backend: BackendKind,
        /// Stream description
        stream: String,
    },

    /// Backend state machine refused a transition
    #[error("Invalid backend transition: {from} -> {to}")]
    InvalidTransition {
        /// State before
        from: BackendState,
        /// Requested state
        to: BackendState,
    },

    /// An in-flight load was cancelled
    #[error("Load cancelled")]
    Cancelled,

    /// Renderer or channel failure
    #[error("Backend error: {0}")]
    Backend(String),

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Model error
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl PlaybackError {
    /// Whether this error belongs in the player's "current playback error" slot
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            Self::LoadFailure { .. }
                | Self::NoPlayableStream { .. }
                | Self::UnsupportedStream { .. }
                | Self::NothingToPlay
        )
    }

    pub(crate) fn load_failure(locator: impl ToString, reason: impl ToString) -> Self {
        Self::LoadFailure {
            locator: locator.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
