//! Render pipeline seam
//!
//! Decoding and presentation are not implemented here. Each backend drives
//! a [`Renderer`], which reports asynchronous outcomes (seek completion,
//! end of item, failures) through the [`EventSink`] it was attached with.

use crate::asset::LoadedAsset;
use crate::backend::{SeekKind, SeekTolerance};
use crate::composition::Composition;
use crate::events::EventSink;
use std::time::Duration;

/// An item whose assets are resolved and that a renderer can attach
#[derive(Debug, Clone, PartialEq)]
pub enum PreparedItem {
    /// Progressive file or manifest
    Asset(LoadedAsset),

    /// Synthetic timeline assembled from separate audio and video assets
    Composition(Composition),

    /// Separate assets the renderer combines natively
    Split { video: LoadedAsset, audio: LoadedAsset },
}

impl PreparedItem {
    /// Playable length, when known
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Self::Asset(asset) => asset.duration,
            Self::Composition(composition) => composition.duration(),
            Self::Split { video, audio } => match (video.duration, audio.duration) {
                (Some(v), Some(a)) => Some(v.min(a)),
                (v, a) => v.or(a),
            },
        }
    }
}

/// Decode/render pipeline driven by a backend
pub trait Renderer: Send {
    /// Replace whatever is attached with `item`, paused at zero
    fn attach(&mut self, item: PreparedItem, sink: EventSink);

    /// Stop rendering and release the attached item
    fn detach(&mut self);

    fn set_playing(&mut self, playing: bool);

    fn set_rate(&mut self, rate: f32);

    /// Start a seek; completion is reported as `SeekFinished` through the sink
    fn seek(&mut self, to: Duration, tolerance: SeekTolerance, kind: SeekKind);

    fn position(&self) -> Duration;

    fn duration(&self) -> Option<Duration>;
}
