//! Platform media framework backend

use super::{
    unsupported, BackendCapabilities, BackendCore, LoadRequest, PlaybackBackend, SeekTolerance,
};
use crate::asset::{AssetKind, AssetLoader};
use crate::composition::CompositionBuilder;
use crate::error::Result;
use crate::events::EventSink;
use crate::renderer::{PreparedItem, Renderer};
use std::sync::Arc;
use tracing::debug;
use vireo_core::{BackendKind, StreamAssets, StreamFormat};

/// Engine backed by the operating system's media framework
///
/// Plays manifests and progressive files natively and supports
/// Picture-in-Picture. It cannot mux separate audio and video, so
/// split-adaptive streams go through the Composition Builder. WebM and AV1
/// are not decodable.
pub struct PlatformBackend {
    core: BackendCore,
}

impl PlatformBackend {
    const UNSUPPORTED_FORMATS: &'static [StreamFormat] = &[StreamFormat::Webm, StreamFormat::Av1];

    pub fn new(
        renderer: Box<dyn Renderer>,
        loader: Arc<dyn AssetLoader>,
        tolerance: SeekTolerance,
    ) -> Self {
        Self {
            core: BackendCore::new(BackendKind::Platform, renderer, loader, tolerance),
        }
    }
}

impl PlaybackBackend for PlatformBackend {
    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            manifest: true,
            native_split: false,
            picture_in_picture: true,
            unsupported_formats: Self::UNSUPPORTED_FORMATS,
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
            return Err(unsupported(BackendKind::Platform, &request.stream));
        }

        let token = self.core.begin_load(&request.stream)?;
        debug!(
            preserving = request.preserving_time,
            upgrading = request.upgrading,
            generation = %sink.generation(),
            "Platform load started"
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
                let builder = CompositionBuilder::new(
                    self.core.loader(),
                    request.video.duration,
                    sink.guard().clone(),
                );
                let cancel = token.clone();
                self.core.spawn_load(sink, token, async move {
                    builder
                        .build(&video, &audio, &cancel)
                        .await
                        .map(PreparedItem::Composition)
                });
            }
        }
        Ok(())
    }
}
