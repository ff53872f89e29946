//! Shared fixtures for player integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use url::Url;
use vireo_core::{
    BackendKind, PlaybackMode, QualityProfile, Resolution, Segment, SegmentCategory, Stream,
    StreamFormat, Video,
};
use vireo_playback::sim::{sim_backends, SimAssetLoader, SimRendererHandle};
use vireo_playback::{PlayerConfig, PlayerController, PlayerEvent, WatchProgressSink};

pub const VIDEO_LENGTH: Duration = Duration::from_secs(120);

/// How long the player must stay silent before a test step is considered settled
pub const QUIET: Duration = Duration::from_millis(50);

pub fn url(path: &str) -> Url {
    Url::parse(&format!("https://media.example/{path}")).unwrap()
}

pub fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

pub fn progressive(video: &str, resolution: Resolution, format: StreamFormat) -> Stream {
    let label = resolution.label();
    Stream::progressive(url(&format!("{video}/{label}.{format}")), resolution, format)
        .with_id(format!("{video}-{label}"))
}

pub fn split(video: &str, resolution: Resolution, format: StreamFormat) -> Stream {
    let label = resolution.label();
    Stream::split(
        url(&format!("{video}/{label}/video")),
        url(&format!("{video}/{label}/audio")),
        resolution,
        format,
    )
    .with_id(format!("{video}-{label}-split"))
}

/// 120 s video with a single 720p MP4 stream
pub fn create_video(id: &str) -> Video {
    Video::new(id, format!("Video {id}"), "Author")
        .with_duration(VIDEO_LENGTH)
        .with_streams(vec![progressive(id, Resolution::HD_720P, StreamFormat::Mp4)])
}

pub fn sponsor(id: &str, start: Duration, end: Duration) -> Segment {
    Segment::new(id, start, end, SegmentCategory::Sponsor).unwrap()
}

/// Player over simulated engines, with handles to drive them
pub struct Rig {
    pub player: PlayerController,
    pub loader: SimAssetLoader,
    pub platform: SimRendererHandle,
    pub library: SimRendererHandle,
    pub events: broadcast::Receiver<PlayerEvent>,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_config(PlayerConfig::default())
    }

    pub fn with_mode(mode: PlaybackMode) -> Self {
        Self::with_config(PlayerConfig {
            default_mode: mode,
            ..PlayerConfig::default()
        })
    }

    /// Every profile plays on `backend`
    pub fn on_backend(backend: BackendKind) -> Self {
        Self::with_config(PlayerConfig {
            default_backend: backend,
            quality_profiles: vec![QualityProfile::new(
                "Default",
                backend,
                Resolution::UHD_2160P60,
            )],
            ..PlayerConfig::default()
        })
    }

    pub fn with_config(config: PlayerConfig) -> Self {
        let loader = SimAssetLoader::new();
        let (backends, platform, library) = sim_backends(&loader, config.seek_tolerance());
        let player = PlayerController::new(config, backends).unwrap();
        let events = player.subscribe();
        Self {
            player,
            loader,
            platform,
            library,
            events,
        }
    }

    /// Report watch progress to `sink`
    pub fn with_sink(self, sink: Arc<dyn WatchProgressSink>) -> Self {
        Self {
            player: self.player.with_progress_sink(sink),
            ..self
        }
    }

    /// Renderer of the backend currently driving playback
    pub fn active_renderer(&self) -> &SimRendererHandle {
        match self.player.active_backend() {
            BackendKind::Platform => &self.platform,
            BackendKind::Library => &self.library,
        }
    }

    /// Apply backend events until the player goes quiet
    pub async fn settle(&mut self) -> usize {
        self.player.drain_events(QUIET).await
    }

    /// Player events published so far
    pub fn published(&mut self) -> Vec<PlayerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}
