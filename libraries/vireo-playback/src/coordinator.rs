//! Backend Switch & Time-Preservation Coordinator
//!
//! Every load goes through [`SwitchCoordinator::switch`]: cancel in-flight
//! loads on the current backend, capture (or reuse) the position to
//! preserve, hand over to the target backend and start the new load.
//!
//! When the backend reports ready, the coordinator seeks to the preserved
//! position with the tolerant window before playback starts. The position
//! is discarded only after that seek completes successfully, so it survives
//! failed loads and rapid repeated switches.
//!
//! The coordinator is the only writer of the preserved position.

use crate::backend::{Backends, LoadRequest, PlaybackBackend, SeekKind};
use crate::error::Result;
use crate::events::EventSink;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use vireo_core::{BackendKind, Stream, Video};

/// What to carry across a switch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preserve {
    /// Fresh start from zero (new item, queue advance, autoplay)
    Nothing,
    /// The current position, unless a capture is already pending
    Current,
    /// An explicit position, e.g. a saved resume time
    At(Duration),
}

/// One switch request
#[derive(Debug, Clone)]
pub struct SwitchRequest {
    pub target: BackendKind,
    pub stream: Stream,
    pub video: Arc<Video>,
    pub preserve: Preserve,
    /// Same item, different stream
    pub upgrading: bool,
    /// Begin playing once the switch settles
    pub start_playing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Loading { start_playing: bool },
    Seeking { kind: SeekKind, start_playing: bool },
    Settled,
}

/// What the controller does after the backend reported ready
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyAction {
    /// A preserved-position seek was issued; playback starts when it completes
    AwaitSeek,
    /// Nothing restored; `fresh` loads are eligible for the initial segment skip
    Start { start_playing: bool, fresh: bool },
}

#[derive(Debug)]
pub struct SwitchCoordinator {
    preserved: Option<Duration>,
    phase: Phase,
}

impl Default for SwitchCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl SwitchCoordinator {
    pub fn new() -> Self {
        Self {
            preserved: None,
            phase: Phase::Idle,
        }
    }

    /// Position waiting to be restored
    pub fn preserved(&self) -> Option<Duration> {
        self.preserved
    }

    /// A load or the seek that completes it is in progress
    pub fn shows_loading(&self) -> bool {
        matches!(self.phase, Phase::Loading { .. } | Phase::Seeking { .. })
    }

    /// Whether playback starts once the pending switch settles
    pub fn will_start(&self) -> bool {
        match self.phase {
            Phase::Loading { start_playing } | Phase::Seeking { start_playing, .. } => {
                start_playing
            }
            Phase::Idle | Phase::Settled => false,
        }
    }

    /// Record a play/pause request made while switching
    ///
    /// Returns `false` when no switch is pending and the request should go
    /// to the backend directly.
    pub fn request_start(&mut self, start: bool) -> bool {
        match &mut self.phase {
            Phase::Loading { start_playing } | Phase::Seeking { start_playing, .. } => {
                *start_playing = start;
                true
            }
            Phase::Idle | Phase::Settled => false,
        }
    }

    /// Run the switch protocol up to the start of the new load
    ///
    /// `active` is the backend currently driving playback. On failure the
    /// preserved position is kept; there is no fallback to the old backend.
    pub fn switch(
        &mut self,
        backends: &mut Backends,
        active: BackendKind,
        request: SwitchRequest,
        sink: EventSink,
    ) -> Result<()> {
        let current = backends.get_mut(active);
        current.cancel_loads();

        match request.preserve {
            Preserve::Nothing => {
                if self.preserved.take().is_some() {
                    debug!("Dropping pending preserved position for fresh start");
                }
            }
            Preserve::Current => match self.preserved {
                Some(pending) => {
                    debug!(position = ?pending, "Reusing pending preserved position");
                }
                None => {
                    self.preserved = current.current_time();
                    debug!(position = ?self.preserved, backend = %active, "Captured position");
                }
            },
            Preserve::At(position) => {
                self.preserved = Some(position);
            }
        }

        if request.target != active {
            info!(from = %active, to = %request.target, "Switching backend");
            current.close_item();
            current.did_change_to(false);
            backends.get_mut(request.target).did_change_to(true);
        }

        let preserving = self.preserved.is_some();
        self.phase = Phase::Loading {
            start_playing: request.start_playing,
        };
        let load = LoadRequest {
            stream: request.stream,
            video: request.video,
            preserving_time: preserving,
            upgrading: request.upgrading,
        };

        if let Err(err) = backends.get_mut(request.target).load(load, sink) {
            warn!(
                backend = %request.target,
                error = %err,
                preserved = ?self.preserved,
                "Switch failed to start load"
            );
            self.phase = Phase::Idle;
            return Err(err);
        }
        Ok(())
    }

    /// The target backend installed its item
    pub fn on_ready(&mut self, backend: &mut dyn PlaybackBackend) -> ReadyAction {
        let start_playing = self.will_start();

        let Some(position) = self.preserved else {
            self.phase = Phase::Settled;
            return ReadyAction::Start {
                start_playing,
                fresh: true,
            };
        };

        match backend.seek(position, SeekKind::PreservedPosition) {
            Ok(()) => {
                debug!(backend = %backend.kind(), ?position, "Restoring preserved position");
                self.await_seek(SeekKind::PreservedPosition, start_playing);
                ReadyAction::AwaitSeek
            }
            Err(err) => {
                warn!(backend = %backend.kind(), error = %err, "Could not restore position");
                self.phase = Phase::Settled;
                ReadyAction::Start {
                    start_playing,
                    fresh: false,
                }
            }
        }
    }

    /// Hold playback until a seek of `kind` completes
    pub fn await_seek(&mut self, kind: SeekKind, start_playing: bool) {
        self.phase = Phase::Seeking { kind, start_playing };
    }

    /// A seek completed
    ///
    /// Returns whether to start playing when this completes the pending
    /// switch, `None` when the seek was unrelated.
    pub fn on_seek_finished(&mut self, kind: SeekKind, success: bool) -> Option<bool> {
        let Phase::Seeking {
            kind: awaited,
            start_playing,
        } = self.phase
        else {
            return None;
        };
        if awaited != kind {
            return None;
        }

        if kind == SeekKind::PreservedPosition {
            if success {
                debug!(position = ?self.preserved, "Preserved position restored");
                self.preserved = None;
            } else {
                warn!(
                    position = ?self.preserved,
                    "Preserved-position seek failed, keeping position"
                );
            }
        }
        self.phase = Phase::Settled;
        Some(start_playing)
    }

    /// The target backend failed to become ready
    pub fn on_load_failed(&mut self) {
        if self.preserved.is_some() {
            debug!(position = ?self.preserved, "Load failed, keeping preserved position");
        }
        self.phase = Phase::Idle;
    }

    /// Forget everything (item closed)
    pub fn reset(&mut self) {
        self.preserved = None;
        self.phase = Phase::Idle;
    }
}
