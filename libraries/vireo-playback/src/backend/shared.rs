//! State shared by both engines
//!
//! `BackendCore` owns the renderer, the lifecycle state machine, the
//! cancellation token of the current load, the seek-in-flight gate and the
//! playback rate. Engines differ only in what they can play and how they
//! turn a stream into a [`PreparedItem`].

use super::{BackendState, SeekKind, SeekTolerance};
use crate::asset::{AssetKind, AssetLoader};
use crate::error::{PlaybackError, Result};
use crate::events::{BackendSignal, EventSink};
use crate::renderer::{PreparedItem, Renderer};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;
use vireo_core::{BackendKind, Stream};

pub struct BackendCore {
    kind: BackendKind,
    state: BackendState,
    renderer: Box<dyn Renderer>,
    loader: Arc<dyn AssetLoader>,
    tolerance: SeekTolerance,
    cancel: CancellationToken,
    seek_in_flight: Option<SeekKind>,
    rate: f32,
    stream: Option<Stream>,
    active: bool,
}

impl BackendCore {
    pub fn new(
        kind: BackendKind,
        renderer: Box<dyn Renderer>,
        loader: Arc<dyn AssetLoader>,
        tolerance: SeekTolerance,
    ) -> Self {
        Self {
            kind,
            state: BackendState::Idle,
            renderer,
            loader,
            tolerance,
            cancel: CancellationToken::new(),
            seek_in_flight: None,
            rate: 1.0,
            stream: None,
            active: false,
        }
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn state(&self) -> BackendState {
        self.state
    }

    pub fn stream(&self) -> Option<&Stream> {
        self.stream.as_ref()
    }

    pub fn loader(&self) -> Arc<dyn AssetLoader> {
        Arc::clone(&self.loader)
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn seek_in_flight(&self) -> Option<SeekKind> {
        self.seek_in_flight
    }

    /// Move to `next`, rejecting transitions the lifecycle forbids
    pub fn transition(&mut self, next: BackendState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            warn!(
                backend = %self.kind,
                from = %self.state,
                to = %next,
                "Rejected state transition"
            );
            return Err(PlaybackError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        if self.state != next {
            debug!(backend = %self.kind, from = %self.state, to = %next, "Backend state changed");
            self.state = next;
        }
        Ok(())
    }

    // ===== Loading =====

    /// Preempt the current item and enter `Loading`
    ///
    /// Returns the token the new load must observe.
    pub fn begin_load(&mut self, stream: &Stream) -> Result<CancellationToken> {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.seek_in_flight = None;
        self.renderer.detach();
        self.transition(BackendState::Loading)?;
        self.stream = Some(stream.clone());
        info!(backend = %self.kind, stream = %stream.description(), "Loading stream");
        Ok(self.cancel.clone())
    }

    /// Run `load` on the runtime and report its outcome through `sink`
    ///
    /// Nothing is reported when the token fires or the selection was
    /// superseded before the load finished.
    pub fn spawn_load<F>(&self, sink: EventSink, token: CancellationToken, load: F)
    where
        F: Future<Output = Result<PreparedItem>> + Send + 'static,
    {
        let backend = self.kind;
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => {
                    debug!(%backend, generation = %sink.generation(), "Load cancelled");
                }
                result = load => match result {
                    Ok(_) if !sink.is_current() => {
                        debug!(
                            %backend,
                            generation = %sink.generation(),
                            "Discarding stale load result"
                        );
                    }
                    Ok(item) => sink.send(BackendSignal::Prepared(item)),
                    Err(PlaybackError::StaleResult | PlaybackError::Cancelled) => {
                        debug!(%backend, generation = %sink.generation(), "Load superseded");
                    }
                    Err(err) => {
                        warn!(%backend, error = %err, "Load failed");
                        sink.send(BackendSignal::LoadFailed(err.to_string()));
                    }
                },
            }
        });
    }

    /// Spawn a load for a progressive file or manifest
    pub fn spawn_single_load(
        &self,
        url: Url,
        kind: AssetKind,
        sink: EventSink,
        token: CancellationToken,
    ) {
        let loader = self.loader();
        self.spawn_load(sink, token, async move {
            loader.load(&url, kind).await.map(PreparedItem::Asset)
        });
    }

    /// Attach a prepared item and enter `Ready`
    pub fn install(&mut self, item: PreparedItem, sink: EventSink) -> Result<()> {
        if self.state != BackendState::Loading {
            return Err(PlaybackError::InvalidTransition {
                from: self.state,
                to: BackendState::Ready,
            });
        }
        self.renderer.attach(item, sink);
        self.renderer.set_rate(self.rate);
        self.transition(BackendState::Ready)
    }

    /// Cancel the in-flight load, if any (idempotent)
    pub fn cancel_loads(&mut self) {
        if !self.cancel.is_cancelled() {
            debug!(backend = %self.kind, "Cancelling loads");
            self.cancel.cancel();
        }
        if self.state == BackendState::Loading {
            self.state = BackendState::Idle;
            self.stream = None;
        }
    }

    pub fn mark_failed(&mut self, reason: &str) {
        warn!(backend = %self.kind, %reason, "Backend failed");
        self.renderer.detach();
        self.seek_in_flight = None;
        if self.transition(BackendState::Error).is_err() {
            self.state = BackendState::Error;
        }
    }

    // ===== Playback Control =====

    /// Start rendering; from `Playing` this restarts a renderer that stopped
    pub fn play(&mut self) -> Result<()> {
        match self.state {
            BackendState::Playing => {
                self.renderer.set_playing(true);
                Ok(())
            }
            BackendState::Ready | BackendState::Paused | BackendState::Ended => {
                self.transition(BackendState::Playing)?;
                self.renderer.set_playing(true);
                Ok(())
            }
            _ => Err(PlaybackError::NoItemLoaded),
        }
    }

    pub fn pause(&mut self) -> Result<()> {
        match self.state {
            BackendState::Paused => Ok(()),
            BackendState::Ready | BackendState::Playing | BackendState::Ended => {
                self.transition(BackendState::Paused)?;
                self.renderer.set_playing(false);
                Ok(())
            }
            _ => Err(PlaybackError::NoItemLoaded),
        }
    }

    /// Pause and return to the start
    pub fn stop(&mut self) -> Result<()> {
        self.pause()?;
        match self.seek(Duration::ZERO, SeekKind::User) {
            Ok(()) | Err(PlaybackError::SeekRejected) => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Start a seek; rejected while another is in flight
    pub fn seek(&mut self, to: Duration, kind: SeekKind) -> Result<()> {
        if let Some(in_flight) = self.seek_in_flight {
            debug!(backend = %self.kind, ?kind, ?in_flight, "Seek rejected");
            return Err(PlaybackError::SeekRejected);
        }
        if !self.state.has_item() {
            return Err(PlaybackError::NoItemLoaded);
        }

        let to = match self.renderer.duration() {
            Some(duration) => to.min(duration),
            None => to,
        };
        debug!(backend = %self.kind, ?kind, target = ?to, "Seeking");
        self.seek_in_flight = Some(kind);
        self.renderer.seek(to, kind.tolerance(self.tolerance), kind);
        Ok(())
    }

    /// Clear the seek gate; returns the kind that was in flight
    pub fn on_seek_finished(&mut self) -> Option<SeekKind> {
        self.seek_in_flight.take()
    }

    pub fn set_rate(&mut self, rate: f32) {
        self.rate = rate;
        if self.state.has_item() {
            self.renderer.set_rate(rate);
        }
    }

    pub fn mark_ended(&mut self) -> Result<()> {
        self.transition(BackendState::Ended)?;
        self.renderer.set_playing(false);
        Ok(())
    }

    /// Release the item and return to `Idle`
    pub fn close_item(&mut self) {
        self.cancel.cancel();
        self.renderer.detach();
        self.seek_in_flight = None;
        self.stream = None;
        if self.state != BackendState::Idle {
            debug!(backend = %self.kind, from = %self.state, "Closing item");
            self.state = BackendState::Idle;
        }
    }

    pub fn current_time(&self) -> Option<Duration> {
        self.state.has_item().then(|| self.renderer.position())
    }

    pub fn duration(&self) -> Option<Duration> {
        if self.state.has_item() {
            self.renderer.duration()
        } else {
            None
        }
    }

    /// Lifecycle hook: this backend became (or stopped being) the active one
    pub fn did_change_to(&mut self, active: bool) {
        if self.active != active {
            info!(backend = %self.kind, active, "Backend activation changed");
        }
        self.active = active;
        if !active {
            self.renderer.set_playing(false);
        }
    }
}
