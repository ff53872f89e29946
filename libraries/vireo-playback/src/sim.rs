//! Deterministic simulation collaborators
//!
//! [`SimRenderer`] and [`SimAssetLoader`] stand in for a real decode
//! pipeline and network stack. Time only moves when the owner advances it,
//! loads can be held open per locator, and failures can be injected, so the
//! whole engine can be driven step by step from tests or the CLI.

use crate::asset::{AssetKind, AssetLoader, LoadedAsset};
use crate::backend::{Backends, LibraryBackend, PlatformBackend, SeekKind, SeekTolerance};
use crate::error::{PlaybackError, Result};
use crate::events::{BackendSignal, EventSink};
use crate::renderer::{PreparedItem, Renderer};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tracing::trace;
use url::Url;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ===== Renderer =====

#[derive(Debug, Default)]
struct RendererState {
    item: Option<PreparedItem>,
    sink: Option<EventSink>,
    position: Duration,
    playing: bool,
    rate: f32,
    ended: bool,
    hold_seeks: bool,
    fail_seeks: bool,
    pending_seek: Option<(Duration, SeekTolerance, SeekKind)>,
    keyframe_interval: Option<Duration>,
    seeks: Vec<(Duration, SeekKind)>,
    attach_count: usize,
}

impl RendererState {
    fn duration(&self) -> Option<Duration> {
        self.item.as_ref().and_then(PreparedItem::duration)
    }

    fn send(&self, signal: BackendSignal) {
        if let Some(sink) = &self.sink {
            sink.send(signal);
        }
    }

    /// Land a seek on the nearest preceding keyframe when the tolerance allows it
    fn complete_seek(&mut self, target: Duration, tolerance: SeekTolerance, kind: SeekKind) {
        if self.fail_seeks {
            self.send(BackendSignal::SeekFinished { kind, success: false });
            return;
        }

        let landing = match self.keyframe_interval {
            Some(interval) if !interval.is_zero() => {
                let keyframe = interval * (target.as_millis() / interval.as_millis()) as u32;
                if tolerance.accepts(target, keyframe) {
                    keyframe
                } else {
                    target
                }
            }
            _ => target,
        };
        trace!(?target, ?landing, ?kind, "Sim seek landed");

        self.position = landing;
        if self.duration().is_some_and(|d| landing < d) {
            self.ended = false;
        }
        self.send(BackendSignal::SeekFinished { kind, success: true });
    }
}

/// In-memory renderer driven through a [`SimRendererHandle`]
pub struct SimRenderer {
    state: Arc<Mutex<RendererState>>,
}

impl SimRenderer {
    pub fn new() -> (Self, SimRendererHandle) {
        let state = Arc::new(Mutex::new(RendererState {
            rate: 1.0,
            ..RendererState::default()
        }));
        let handle = SimRendererHandle {
            state: Arc::clone(&state),
        };
        (Self { state }, handle)
    }
}

impl Renderer for SimRenderer {
    fn attach(&mut self, item: PreparedItem, sink: EventSink) {
        let mut state = lock(&self.state);
        state.item = Some(item);
        state.sink = Some(sink);
        state.position = Duration::ZERO;
        state.playing = false;
        state.ended = false;
        state.pending_seek = None;
        state.attach_count += 1;
    }

    fn detach(&mut self) {
        let mut state = lock(&self.state);
        state.item = None;
        state.sink = None;
        state.position = Duration::ZERO;
        state.playing = false;
        state.pending_seek = None;
    }

    fn set_playing(&mut self, playing: bool) {
        let mut state = lock(&self.state);
        state.playing = playing && state.item.is_some();
    }

    fn set_rate(&mut self, rate: f32) {
        lock(&self.state).rate = rate;
    }

    fn seek(&mut self, to: Duration, tolerance: SeekTolerance, kind: SeekKind) {
        let mut state = lock(&self.state);
        state.seeks.push((to, kind));
        if state.hold_seeks {
            state.pending_seek = Some((to, tolerance, kind));
        } else {
            state.complete_seek(to, tolerance, kind);
        }
    }

    fn position(&self) -> Duration {
        lock(&self.state).position
    }

    fn duration(&self) -> Option<Duration> {
        lock(&self.state).duration()
    }
}

/// Test-side control of a [`SimRenderer`]
#[derive(Clone)]
pub struct SimRendererHandle {
    state: Arc<Mutex<RendererState>>,
}

impl SimRendererHandle {
    /// Move the playhead forward while playing
    ///
    /// Reports `PlayedToEnd` once when the end is reached.
    pub fn advance(&self, by: Duration) {
        let mut state = lock(&self.state);
        if !state.playing || state.ended {
            return;
        }
        let rate = state.rate;
        state.position += by.mul_f32(rate);
        if let Some(duration) = state.duration() {
            if state.position >= duration {
                state.position = duration;
                state.ended = true;
                state.playing = false;
                state.send(BackendSignal::PlayedToEnd);
            }
        }
    }

    /// Jump to the end and report `PlayedToEnd`, even if already ended
    pub fn play_to_end(&self) {
        let mut state = lock(&self.state);
        if let Some(duration) = state.duration() {
            state.position = duration;
        }
        state.ended = true;
        state.playing = false;
        state.send(BackendSignal::PlayedToEnd);
    }

    /// Report a renderer failure
    pub fn fail(&self, reason: &str) {
        lock(&self.state).send(BackendSignal::Failed(reason.to_string()));
    }

    /// Keep seeks pending until [`complete_pending_seek`](Self::complete_pending_seek)
    pub fn hold_seeks(&self, hold: bool) {
        lock(&self.state).hold_seeks = hold;
    }

    /// Finish the held seek; returns whether one was pending
    pub fn complete_pending_seek(&self) -> bool {
        let mut state = lock(&self.state);
        match state.pending_seek.take() {
            Some((to, tolerance, kind)) => {
                state.complete_seek(to, tolerance, kind);
                true
            }
            None => false,
        }
    }

    pub fn fail_seeks(&self, fail: bool) {
        lock(&self.state).fail_seeks = fail;
    }

    /// Make tolerant seeks snap back to keyframes spaced by `interval`
    pub fn set_keyframe_interval(&self, interval: Duration) {
        lock(&self.state).keyframe_interval = Some(interval);
    }

    pub fn position(&self) -> Duration {
        lock(&self.state).position
    }

    pub fn is_playing(&self) -> bool {
        lock(&self.state).playing
    }

    pub fn rate(&self) -> f32 {
        lock(&self.state).rate
    }

    /// Every seek requested so far, in order
    pub fn seeks(&self) -> Vec<(Duration, SeekKind)> {
        lock(&self.state).seeks.clone()
    }

    /// How many items were attached so far
    pub fn attach_count(&self) -> usize {
        lock(&self.state).attach_count
    }

    pub fn attached(&self) -> Option<PreparedItem> {
        lock(&self.state).item.clone()
    }
}

// ===== Asset Loader =====

#[derive(Debug, Default)]
struct LoaderState {
    default_duration: Option<Duration>,
    durations: HashMap<Url, Duration>,
    failures: HashMap<Url, String>,
    gates: HashMap<Url, watch::Sender<bool>>,
    delay: Option<Duration>,
    loads: Vec<(Url, AssetKind)>,
}

/// In-memory asset loader with per-locator gates and failure injection
#[derive(Debug, Clone)]
pub struct SimAssetLoader {
    state: Arc<Mutex<LoaderState>>,
}

impl Default for SimAssetLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SimAssetLoader {
    /// Every asset resolves immediately with a 120 s duration
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(LoaderState {
                default_duration: Some(Duration::from_secs(120)),
                ..LoaderState::default()
            })),
        }
    }

    pub fn set_default_duration(&self, duration: Option<Duration>) {
        lock(&self.state).default_duration = duration;
    }

    pub fn set_duration(&self, url: &Url, duration: Duration) {
        lock(&self.state).durations.insert(url.clone(), duration);
    }

    /// Make loads of `url` fail with `reason`
    pub fn fail(&self, url: &Url, reason: &str) {
        lock(&self.state).failures.insert(url.clone(), reason.to_string());
    }

    /// Undo [`fail`](Self::fail)
    pub fn recover(&self, url: &Url) {
        lock(&self.state).failures.remove(url);
    }

    /// Simulated latency applied to every load
    pub fn set_delay(&self, delay: Duration) {
        lock(&self.state).delay = Some(delay);
    }

    /// Keep loads of `url` pending until [`release`](Self::release)
    pub fn hold(&self, url: &Url) {
        let (tx, _) = watch::channel(false);
        lock(&self.state).gates.insert(url.clone(), tx);
    }

    pub fn release(&self, url: &Url) {
        if let Some(gate) = lock(&self.state).gates.get(url) {
            gate.send_replace(true);
        }
    }

    /// Number of loads started
    pub fn load_count(&self) -> usize {
        lock(&self.state).loads.len()
    }

    /// Every load started so far, in order
    pub fn loads(&self) -> Vec<(Url, AssetKind)> {
        lock(&self.state).loads.clone()
    }
}

#[async_trait]
impl AssetLoader for SimAssetLoader {
    async fn load(&self, url: &Url, kind: AssetKind) -> Result<LoadedAsset> {
        let (gate, delay) = {
            let mut state = lock(&self.state);
            state.loads.push((url.clone(), kind));
            (state.gates.get(url).map(watch::Sender::subscribe), state.delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(mut gate) = gate {
            let opened = gate.wait_for(|open| *open).await.is_ok();
            if !opened {
                return Err(PlaybackError::load_failure(url, "loader shut down"));
            }
        }

        let state = lock(&self.state);
        if let Some(reason) = state.failures.get(url) {
            return Err(PlaybackError::load_failure(url, reason));
        }
        Ok(LoadedAsset {
            url: url.clone(),
            kind,
            duration: state.durations.get(url).copied().or(state.default_duration),
        })
    }
}

/// Both engines wired to simulated renderers sharing one loader
///
/// Returns the backends and the platform and library renderer handles.
pub fn sim_backends(
    loader: &SimAssetLoader,
    tolerance: SeekTolerance,
) -> (Backends, SimRendererHandle, SimRendererHandle) {
    let loader: Arc<dyn AssetLoader> = Arc::new(loader.clone());
    let (platform_renderer, platform) = SimRenderer::new();
    let (library_renderer, library) = SimRenderer::new();
    let backends = Backends::new(
        PlatformBackend::new(Box::new(platform_renderer), Arc::clone(&loader), tolerance),
        LibraryBackend::new(Box::new(library_renderer), loader, tolerance),
    );
    (backends, platform, library)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(path: &str) -> Url {
        Url::parse(&format!("https://media.example/{path}")).unwrap()
    }

    #[tokio::test]
    async fn resolves_with_configured_duration() {
        let loader = SimAssetLoader::new();
        loader.set_duration(&url("short"), Duration::from_secs(30));

        let asset = loader.load(&url("short"), AssetKind::Progressive).await.unwrap();
        assert_eq!(asset.duration, Some(Duration::from_secs(30)));
        let asset = loader.load(&url("other"), AssetKind::Manifest).await.unwrap();
        assert_eq!(asset.duration, Some(Duration::from_secs(120)));
        assert_eq!(loader.load_count(), 2);
    }

    #[tokio::test]
    async fn injected_failure() {
        let loader = SimAssetLoader::new();
        loader.fail(&url("broken"), "404");

        let err = loader.load(&url("broken"), AssetKind::Video).await.unwrap_err();
        assert!(matches!(err, PlaybackError::LoadFailure { .. }));
    }

    #[tokio::test]
    async fn held_load_completes_after_release() {
        let loader = SimAssetLoader::new();
        loader.hold(&url("slow"));

        let task = tokio::spawn({
            let loader = loader.clone();
            async move { loader.load(&url("slow"), AssetKind::Audio).await }
        });
        tokio::task::yield_now().await;
        assert!(!task.is_finished());

        loader.release(&url("slow"));
        assert!(task.await.unwrap().is_ok());
    }

    #[test]
    fn tolerant_seek_snaps_to_keyframe() {
        let (mut renderer, handle) = SimRenderer::new();
        handle.set_keyframe_interval(Duration::from_secs(2));
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let sink = EventSink::new(
            tx,
            vireo_core::BackendKind::Library,
            crate::generation::SelectionVersion::new().guard(),
        );
        renderer.attach(
            PreparedItem::Asset(LoadedAsset {
                url: url("v"),
                kind: AssetKind::Progressive,
                duration: Some(Duration::from_secs(120)),
            }),
            sink,
        );

        renderer.seek(
            Duration::from_millis(42_500),
            SeekTolerance::default(),
            SeekKind::PreservedPosition,
        );
        assert_eq!(handle.position(), Duration::from_secs(42));

        renderer.seek(Duration::from_millis(42_500), SeekTolerance::EXACT, SeekKind::User);
        assert_eq!(handle.position(), Duration::from_millis(42_500));
    }
}
