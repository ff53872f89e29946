//! Embedded playback library backend

use super::{
    unsupported, BackendCapabilities, BackendCore, LoadRequest, PlaybackBackend, SeekTolerance,
};
use crate::asset::{AssetKind, AssetLoader};
use crate::error::Result;
use crate::events::EventSink;
use crate::renderer::{PreparedItem, Renderer};
use std::sync::Arc;
use tracing::debug;
use vireo_core::{BackendKind, StreamAssets};

/// Engine backed by an embedded playback library
///
/// Decodes every container and codec and combines split audio/video
/// natively. It has no Picture-in-Picture support.
pub struct LibraryBackend {
    core: BackendCore,
}

impl LibraryBackend {
    pub fn new(
        renderer: Box<dyn Renderer>,
        loader: Arc<dyn AssetLoader>,
        tolerance: SeekTolerance,
    ) -> Self {
        Self {
            core: BackendCore::new(BackendKind::Library, renderer, loader, tolerance),
        }
    }
}

impl PlaybackBackend for LibraryBackend {
    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            manifest: true,
            native_split: true,
            picture_in_picture: false,
            unsupported_formats: &[],
        }
    }

    fn core(&self) -> &BackendCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BackendCore {
        &mut self.core
    }

    fn load(&mut self, request: LoadRequest, sink: EventSink) -> Result<()> {
        request.stream.validate()?;
        if !self.can_play(&request.stream) {
            return Err(unsupported(BackendKind::Library, &request.stream));
        }

        let token = self.core.begin_load(&request.stream)?;
        debug!(
            preserving = request.preserving_time,
            upgrading = request.upgrading,
            generation = %sink.generation(),
            "Library load started"
        );

        let single_kind = if request.stream.is_manifest() {
            AssetKind::Manifest
        } else {
            AssetKind::Progressive
        };

        match request.stream.assets {
            StreamAssets::Single { url } => {
                self.core.spawn_single_load(url, single_kind, sink, token);
            }
            StreamAssets::Split { video, audio } => {
                let loader = self.core.loader();
                self.core.spawn_load(sink, token, async move {
                    let (video, audio) = tokio::join!(
                        loader.load(&video, AssetKind::Video),
                        loader.load(&audio, AssetKind::Audio),
                    );
                    Ok(PreparedItem::Split {
                        video: video?,
                        audio: audio?,
                    })
                });
            }
        }
        Ok(())
    }
}
