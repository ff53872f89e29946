//! Composition Builder
//!
//! Backends without native split audio/video support play a split-adaptive
//! stream through a synthetic timeline. The builder loads both elementary
//! assets in parallel; each load inserts its track at offset zero once it
//! completes. Readiness requires both tracks, in either arrival order.
//!
//! A load that finishes after its selection was superseded is discarded
//! before insertion. If one load fails the other track stays inserted, but
//! the build reports the failure and never yields a composition.

use crate::asset::{AssetKind, AssetLoader, LoadedAsset};
use crate::error::{PlaybackError, Result};
use crate::generation::SelectionGuard;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

/// Track role within a composition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Video,
    Audio,
}

impl TrackKind {
    fn asset_kind(self) -> AssetKind {
        match self {
            Self::Video => AssetKind::Video,
            Self::Audio => AssetKind::Audio,
        }
    }
}

/// An elementary asset placed on the timeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionTrack {
    pub kind: TrackKind,
    pub asset: LoadedAsset,
    /// Always zero
    pub offset: Duration,
    pub length: Duration,
}

/// Synthetic combined timeline
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Composition {
    duration: Option<Duration>,
    video: Option<CompositionTrack>,
    audio: Option<CompositionTrack>,
}

impl Composition {
    /// Empty timeline for a stream of known (or yet unknown) duration
    pub fn new(duration: Option<Duration>) -> Self {
        Self {
            duration,
            video: None,
            audio: None,
        }
    }

    /// Insert `asset` at offset zero, replacing any track of the same kind
    ///
    /// The timeline length is the stream's known duration, falling back to
    /// the asset's own.
    pub fn insert(&mut self, kind: TrackKind, asset: LoadedAsset) -> Result<()> {
        let length = self
            .duration
            .or(asset.duration)
            .ok_or_else(|| PlaybackError::load_failure(&asset.url, "duration unknown"))?;
        self.duration = Some(length);

        let track = CompositionTrack {
            kind,
            asset,
            offset: Duration::ZERO,
            length,
        };
        match kind {
            TrackKind::Video => self.video = Some(track),
            TrackKind::Audio => self.audio = Some(track),
        }
        Ok(())
    }

    /// Both tracks inserted
    pub fn is_ready(&self) -> bool {
        self.video.is_some() && self.audio.is_some()
    }

    pub fn track(&self, kind: TrackKind) -> Option<&CompositionTrack> {
        match kind {
            TrackKind::Video => self.video.as_ref(),
            TrackKind::Audio => self.audio.as_ref(),
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }
}

fn lock(composition: &Mutex<Composition>) -> MutexGuard<'_, Composition> {
    composition.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Builds one composition for one selection
pub struct CompositionBuilder {
    loader: Arc<dyn AssetLoader>,
    composition: Arc<Mutex<Composition>>,
    guard: SelectionGuard,
}

impl CompositionBuilder {
    pub fn new(
        loader: Arc<dyn AssetLoader>,
        duration: Option<Duration>,
        guard: SelectionGuard,
    ) -> Self {
        Self {
            loader,
            composition: Arc::new(Mutex::new(Composition::new(duration))),
            guard,
        }
    }

    /// Shared timeline, observable while the build is in progress
    pub fn composition(&self) -> Arc<Mutex<Composition>> {
        Arc::clone(&self.composition)
    }

    /// Load both tracks in parallel and return the ready composition
    ///
    /// Returns `Cancelled` if `cancel` fires first, `StaleResult` if the
    /// selection was superseded, otherwise the first load error.
    pub async fn build(
        &self,
        video: &Url,
        audio: &Url,
        cancel: &CancellationToken,
    ) -> Result<Composition> {
        let results = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(%video, %audio, "Composition build cancelled");
                return Err(PlaybackError::Cancelled);
            }
            results = async {
                tokio::join!(
                    self.load_track(TrackKind::Video, video),
                    self.load_track(TrackKind::Audio, audio),
                )
            } => results,
        };

        match results {
            (Ok(()), Ok(())) => {}
            (Err(PlaybackError::StaleResult), _) | (_, Err(PlaybackError::StaleResult)) => {
                return Err(PlaybackError::StaleResult);
            }
            (Err(err), _) | (_, Err(err)) => {
                warn!(error = %err, "Composition track failed to load");
                return Err(err);
            }
        }

        let composition = lock(&self.composition).clone();
        if composition.is_ready() {
            debug!(duration = ?composition.duration(), "Composition ready");
            Ok(composition)
        } else {
            Err(PlaybackError::load_failure(video, "composition incomplete"))
        }
    }

    async fn load_track(&self, kind: TrackKind, url: &Url) -> Result<()> {
        let asset = self.loader.load(url, kind.asset_kind()).await?;

        if !self.guard.is_current() {
            debug!(?kind, %url, generation = %self.guard.generation(), "Discarding stale track");
            return Err(PlaybackError::StaleResult);
        }

        lock(&self.composition).insert(kind, asset)?;
        debug!(?kind, %url, "Track inserted into composition");
        Ok(())
    }
}
