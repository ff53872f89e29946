//! Backend contract
//!
//! Both playback engines implement [`PlaybackBackend`]. Most of the contract
//! is provided on top of the shared [`BackendCore`]; an engine supplies its
//! capabilities and how it turns a stream into a prepared item.
//!
//! Loads and seeks are asynchronous. `load` returns once the work is
//! started; the outcome arrives later as a [`BackendSignal`] through the
//! [`EventSink`] passed in. Same for seeks, which complete with
//! `SeekFinished`.
//!
//! [`BackendSignal`]: crate::events::BackendSignal

mod library;
mod platform;
mod shared;
mod status;

pub use library::LibraryBackend;
pub use platform::PlatformBackend;
pub use shared::BackendCore;
pub use status::BackendState;

use crate::error::{PlaybackError, Result};
use crate::events::EventSink;
use crate::renderer::PreparedItem;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use vireo_core::{BackendKind, Stream, StreamFormat, StreamKind, Video};

/// Why a seek was issued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeekKind {
    /// Scrubbing or an explicit jump
    User,
    /// Restoring a position across a backend or stream switch
    PreservedPosition,
    /// Jumping over a skip segment
    SegmentSkip,
    /// Returning to zero in loop-one mode
    LoopRestart,
}

impl SeekKind {
    /// Tolerance window for this kind of seek
    ///
    /// Engine-initiated jumps may land on a nearby keyframe; user seeks and
    /// loop restarts are exact.
    pub fn tolerance(self, tolerant: SeekTolerance) -> SeekTolerance {
        match self {
            Self::PreservedPosition | Self::SegmentSkip => tolerant,
            Self::User | Self::LoopRestart => SeekTolerance::EXACT,
        }
    }
}

/// How far a seek may land from its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeekTolerance {
    pub before: Duration,
    pub after: Duration,
}

impl SeekTolerance {
    pub const EXACT: Self = Self {
        before: Duration::ZERO,
        after: Duration::ZERO,
    };

    pub fn new(before: Duration, after: Duration) -> Self {
        Self { before, after }
    }

    /// Whether `position` is an acceptable landing point for `target`
    pub fn accepts(&self, target: Duration, position: Duration) -> bool {
        position + self.before >= target && position <= target + self.after
    }
}

impl Default for SeekTolerance {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::ZERO)
    }
}

/// What an engine can do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendCapabilities {
    /// Plays adaptive manifests
    pub manifest: bool,
    /// Combines separate audio/video assets itself (no composition needed)
    pub native_split: bool,
    /// Can keep playing in Picture-in-Picture
    pub picture_in_picture: bool,
    /// Formats the engine cannot decode
    pub unsupported_formats: &'static [StreamFormat],
}

/// Parameters of one load
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub stream: Stream,
    pub video: Arc<Video>,
    /// The coordinator will restore a prior position once ready
    pub preserving_time: bool,
    /// Replacing the current item's stream with a different quality
    pub upgrading: bool,
}

/// Capability surface of a playback engine
pub trait PlaybackBackend: Send {
    fn capabilities(&self) -> BackendCapabilities;

    fn core(&self) -> &BackendCore;

    fn core_mut(&mut self) -> &mut BackendCore;

    /// Start loading `request.stream`, preempting any in-flight load
    ///
    /// The outcome is reported through `sink` as `Prepared` or `LoadFailed`.
    fn load(&mut self, request: LoadRequest, sink: EventSink) -> Result<()>;

    fn kind(&self) -> BackendKind {
        self.core().kind()
    }

    fn can_play(&self, stream: &Stream) -> bool {
        let capabilities = self.capabilities();
        if capabilities.unsupported_formats.contains(&stream.format) {
            return false;
        }
        match stream.kind {
            StreamKind::Progressive | StreamKind::SplitAdaptive => true,
            StreamKind::Manifest => capabilities.manifest,
        }
    }

    fn state(&self) -> BackendState {
        self.core().state()
    }

    fn current_stream(&self) -> Option<&Stream> {
        self.core().stream()
    }

    /// Attach a prepared item reported by the current load
    fn install(&mut self, item: PreparedItem, sink: EventSink) -> Result<()> {
        self.core_mut().install(item, sink)
    }

    fn play(&mut self) -> Result<()> {
        self.core_mut().play()
    }

    fn pause(&mut self) -> Result<()> {
        self.core_mut().pause()
    }

    fn toggle_play(&mut self) -> Result<()> {
        if self.state() == BackendState::Playing {
            self.pause()
        } else {
            self.play()
        }
    }

    fn stop(&mut self) -> Result<()> {
        self.core_mut().stop()
    }

    /// Start a seek; completion arrives as `SeekFinished`
    fn seek(&mut self, to: Duration, kind: SeekKind) -> Result<()> {
        self.core_mut().seek(to, kind)
    }

    fn on_seek_finished(&mut self) -> Option<SeekKind> {
        self.core_mut().on_seek_finished()
    }

    fn seek_in_flight(&self) -> Option<SeekKind> {
        self.core().seek_in_flight()
    }

    fn set_rate(&mut self, rate: f32) {
        self.core_mut().set_rate(rate);
    }

    fn rate(&self) -> f32 {
        self.core().rate()
    }

    fn close_item(&mut self) {
        self.core_mut().close_item();
    }

    fn current_time(&self) -> Option<Duration> {
        self.core().current_time()
    }

    fn duration(&self) -> Option<Duration> {
        self.core().duration()
    }

    fn did_change_to(&mut self, active: bool) {
        self.core_mut().did_change_to(active);
    }

    fn cancel_loads(&mut self) {
        self.core_mut().cancel_loads();
    }

    fn mark_ended(&mut self) -> Result<()> {
        self.core_mut().mark_ended()
    }

    fn mark_failed(&mut self, reason: &str) {
        self.core_mut().mark_failed(reason);
    }
}

pub(crate) fn unsupported(backend: BackendKind, stream: &Stream) -> PlaybackError {
    PlaybackError::UnsupportedStream {
        backend,
        stream: stream.description(),
    }
}

/// Both engines, addressed by kind
pub struct Backends {
    platform: PlatformBackend,
    library: LibraryBackend,
}

impl Backends {
    pub fn new(platform: PlatformBackend, library: LibraryBackend) -> Self {
        Self { platform, library }
    }

    pub fn get(&self, kind: BackendKind) -> &dyn PlaybackBackend {
        match kind {
            BackendKind::Platform => &self.platform,
            BackendKind::Library => &self.library,
        }
    }

    pub fn get_mut(&mut self, kind: BackendKind) -> &mut dyn PlaybackBackend {
        match kind {
            BackendKind::Platform => &mut self.platform,
            BackendKind::Library => &mut self.library,
        }
    }

    /// First backend able to keep playing in Picture-in-Picture
    pub fn picture_in_picture_capable(&self) -> Option<BackendKind> {
        BackendKind::ALL
            .into_iter()
            .find(|kind| self.get(*kind).capabilities().picture_in_picture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerance_windows() {
        let tolerant = SeekTolerance::default();
        let target = Duration::from_secs(42);

        assert!(tolerant.accepts(target, Duration::from_secs(41)));
        assert!(tolerant.accepts(target, target));
        assert!(!tolerant.accepts(target, Duration::from_millis(40_900)));
        assert!(!tolerant.accepts(target, Duration::from_millis(42_001)));

        assert!(SeekTolerance::EXACT.accepts(target, target));
        assert!(!SeekTolerance::EXACT.accepts(target, Duration::from_secs(41)));
    }

    #[test]
    fn only_engine_seeks_are_tolerant() {
        let tolerant = SeekTolerance::default();
        assert_eq!(SeekKind::PreservedPosition.tolerance(tolerant), tolerant);
        assert_eq!(SeekKind::SegmentSkip.tolerance(tolerant), tolerant);
        assert_eq!(SeekKind::User.tolerance(tolerant), SeekTolerance::EXACT);
        assert_eq!(SeekKind::LoopRestart.tolerance(tolerant), SeekTolerance::EXACT);
    }
}
