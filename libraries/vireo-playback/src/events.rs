//! Player events
//!
//! Two channels leave the engine's components:
//! - [`BackendEvent`]s flow from loads and renderers back to the controller
//!   through an [`EventSink`]. Each is tagged with the backend and selection
//!   generation it belongs to, so the controller can drop stale ones.
//! - [`PlayerEvent`]s flow from the controller to observers through the
//!   [`EventBus`], alongside the [`PlayerSnapshot`] watch channel.

use crate::backend::{BackendState, SeekKind};
use crate::generation::{Generation, SelectionGuard};
use crate::renderer::PreparedItem;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::debug;
use vireo_core::{BackendKind, PlaybackMode, SegmentCategory, VideoId};

/// What a load or renderer reports
#[derive(Debug, Clone)]
pub enum BackendSignal {
    /// Assets resolved; the item can be installed
    Prepared(PreparedItem),

    /// Assets failed to resolve
    LoadFailed(String),

    /// A seek issued through the backend completed
    SeekFinished {
        /// Kind the seek was issued with
        kind: SeekKind,
        /// Whether the renderer reached the target
        success: bool,
    },

    /// The current item played through to its end
    PlayedToEnd,

    /// The renderer failed while playing
    Failed(String),
}

/// A signal tagged with its origin
#[derive(Debug, Clone)]
pub struct BackendEvent {
    pub backend: BackendKind,
    pub generation: Generation,
    pub signal: BackendSignal,
}

/// Sending half handed to loads and renderers
///
/// Bound to one backend and one selection; cloning it is cheap.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<BackendEvent>,
    backend: BackendKind,
    guard: SelectionGuard,
}

impl EventSink {
    pub fn new(
        tx: mpsc::UnboundedSender<BackendEvent>,
        backend: BackendKind,
        guard: SelectionGuard,
    ) -> Self {
        Self { tx, backend, guard }
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    pub fn generation(&self) -> Generation {
        self.guard.generation()
    }

    /// Selection guard for the work this sink reports on
    pub fn guard(&self) -> &SelectionGuard {
        &self.guard
    }

    /// Whether this sink's selection is still the latest
    pub fn is_current(&self) -> bool {
        self.guard.is_current()
    }

    /// Deliver a signal to the controller
    ///
    /// Dropped silently once the controller is gone.
    pub fn send(&self, signal: BackendSignal) {
        let event = BackendEvent {
            backend: self.backend,
            generation: self.guard.generation(),
            signal,
        };
        if let Err(err) = self.tx.send(event) {
            debug!(
                backend = %self.backend,
                signal = ?err.0.signal,
                "Player gone, dropping backend signal"
            );
        }
    }
}

/// Events published to observers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlayerEvent {
    /// A backend changed lifecycle state
    StateChanged {
        backend: BackendKind,
        state: BackendState,
    },

    /// A new item became current
    ItemChanged { video_id: VideoId, title: String },

    /// A stream was selected for the current item
    StreamChanged {
        backend: BackendKind,
        description: String,
    },

    /// The active backend changed
    BackendChanged { from: BackendKind, to: BackendKind },

    /// Periodic position update
    TimeUpdated {
        position_ms: u64,
        duration_ms: Option<u64>,
    },

    /// A seek issued by the engine or the user completed
    SeekCompleted {
        kind: SeekKind,
        position_ms: u64,
        success: bool,
    },

    /// A skip segment was jumped over
    SegmentSkipped {
        video_id: VideoId,
        segment_id: String,
        category: SegmentCategory,
        to_ms: u64,
    },

    /// The user undid the last skip
    SegmentRestored { video_id: VideoId, segment_id: String },

    /// The current item reached its end
    EndOfFile { video_id: VideoId },

    /// Related mode had no autoplay candidate
    NothingToPlay,

    /// Playback mode changed
    ModeChanged { mode: PlaybackMode },

    /// Queue length changed
    QueueChanged { length: usize },

    /// Picture-in-Picture entered or left
    PictureInPictureChanged { active: bool },

    /// Playback rate changed
    RateChanged { rate: f32 },

    /// A user-visible error was stored
    Error { message: String },

    /// The current item was closed
    Closed,
}

/// Observer-facing view of the player
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerSnapshot {
    pub video_id: Option<VideoId>,
    pub current_time: Option<Duration>,
    pub duration: Option<Duration>,
    pub playing: bool,
    pub paused: bool,
    pub loading: bool,
    /// Diagnostic description of the active stream
    pub stream_description: Option<String>,
    pub backend: BackendKind,
    pub mode: PlaybackMode,
    pub rate: f32,
    pub picture_in_picture: bool,
    pub queue_length: usize,
    /// The single "current playback error" slot
    pub error: Option<String>,
}

/// Broadcast channel for [`PlayerEvent`]s
///
/// Publishing never blocks; slow subscribers see `RecvError::Lagged`.
#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
}

impl EventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish to all subscribers (dropped if there are none)
    pub fn publish(&self, event: PlayerEvent) {
        let _ = self.tx.send(event);
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }
}
