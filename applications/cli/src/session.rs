//! Selection reports and simulated playback sessions
//!
//! Both commands run the real engine over the simulated renderer and asset
//! loader from `vireo_playback::sim`. Simulated time advances in fixed steps
//! and every player event is written as one JSON line.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::VecDeque;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};
use vireo_core::{
    select_profile, BackendKind, DeviceConditions, PlaybackMode, PlayerQueueItem, QualityProfile,
    Stream, Video,
};
use vireo_playback::sim::{sim_backends, SimAssetLoader, SimRendererHandle};
use vireo_playback::{
    annotated_candidates, best_playable, BackendState, PlayerConfig, PlayerController, PlayerEvent,
};

/// Quiet period that ends one simulation step
const STEP_QUIET: Duration = Duration::from_millis(5);

/// Read a video description (metadata, streams, segments) from JSON
pub fn load_video(path: &Path) -> Result<Video> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let video: Video =
        serde_json::from_str(&json).with_context(|| format!("Failed to parse {}", path.display()))?;
    for stream in &video.streams {
        stream
            .validate()
            .with_context(|| format!("Invalid stream {} in {}", stream.id, path.display()))?;
    }
    Ok(video)
}

// ===== Selection =====

/// Outcome of stream selection for one video
#[derive(Debug, Clone, Serialize)]
pub struct SelectionReport {
    pub profile: String,
    pub backend: BackendKind,
    /// Candidates the backend can play, as ranked (manifests annotated)
    pub candidates: Vec<Stream>,
    pub selected: Option<Stream>,
}

/// Run selection for `video` under a named or condition-matched profile
pub fn select(
    config: &PlayerConfig,
    video: &Video,
    profile: Option<&str>,
    conditions: DeviceConditions,
) -> Result<SelectionReport> {
    let profile: QualityProfile = match profile {
        Some(name) => config
            .quality_profiles
            .iter()
            .find(|p| p.name == name)
            .with_context(|| format!("Unknown quality profile {name:?}"))?
            .clone(),
        None => select_profile(&config.quality_profiles, &conditions)
            .or_else(|| config.quality_profiles.first())
            .cloned()
            .unwrap_or_default(),
    };

    let (backends, _, _) = sim_backends(&SimAssetLoader::new(), config.seek_tolerance());
    let engine = backends.get(profile.backend);
    let playable: Vec<Stream> = video
        .streams
        .iter()
        .filter(|stream| engine.can_play(stream))
        .cloned()
        .collect();

    let selected = best_playable(&playable, profile.max_resolution, &profile.formats);
    debug!(
        video = %video.id,
        profile = %profile.name,
        playable = playable.len(),
        selected = ?selected.as_ref().map(Stream::description),
        "Selection finished"
    );

    Ok(SelectionReport {
        candidates: annotated_candidates(&playable, profile.max_resolution),
        selected,
        backend: profile.backend,
        profile: profile.name,
    })
}

// ===== Simulation =====

#[derive(Debug, Clone)]
pub struct SimulationOptions {
    /// Overrides the configured default mode
    pub mode: Option<PlaybackMode>,
    /// Simulated time per step
    pub step: Duration,
    /// Simulated time after which the session stops
    pub limit: Duration,
    /// Move playback to another backend once this much time has passed
    pub switch: Option<(Duration, BackendKind)>,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            mode: None,
            step: Duration::from_millis(500),
            limit: Duration::from_secs(600),
            switch: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimulationSummary {
    /// Items that became current, including the first
    pub items_started: usize,
    pub events: usize,
    pub elapsed_ms: u64,
    pub final_state: String,
}

#[derive(Serialize)]
struct TimedEvent<'a> {
    at_ms: u64,
    #[serde(flatten)]
    event: &'a PlayerEvent,
}

/// Play `videos` through a simulated player, writing events to `out`
///
/// The first video is opened, the rest are queued. In related mode they are
/// offered one by one as the autoplay candidate instead.
pub async fn simulate<W: Write>(
    config: PlayerConfig,
    videos: Vec<Video>,
    options: &SimulationOptions,
    out: &mut W,
) -> Result<SimulationSummary> {
    let loader = SimAssetLoader::new();
    for video in &videos {
        if let Some(duration) = video.duration {
            for url in video.streams.iter().flat_map(|s| s.assets.urls()) {
                loader.set_duration(url, duration);
            }
        }
    }

    let (backends, platform, library) = sim_backends(&loader, config.seek_tolerance());
    let mut player = PlayerController::new(config, backends)?;
    let mut events = player.subscribe();
    if let Some(mode) = options.mode {
        player.set_playback_mode(mode);
    }
    let related = player.mode() == PlaybackMode::Related;

    let mut videos: VecDeque<Video> = videos.into();
    let first = videos.pop_front().context("No video to play")?;
    let mut candidates = VecDeque::new();
    if related {
        candidates = videos;
    } else {
        for video in videos {
            player.enqueue(PlayerQueueItem::new(video));
        }
    }

    info!(video = %first.id, mode = %player.mode(), "Starting simulation");
    player.open(PlayerQueueItem::new(first))?;

    let mut summary = SimulationSummary::default();
    let mut elapsed = Duration::ZERO;
    let mut switch = options.switch;

    loop {
        player.drain_events(STEP_QUIET).await;

        while let Ok(event) = events.try_recv() {
            if matches!(event, PlayerEvent::ItemChanged { .. }) {
                summary.items_started += 1;
                if related {
                    let next = candidates.pop_front().map(PlayerQueueItem::autoplay);
                    player.set_autoplay_candidate(next);
                }
            }
            summary.events += 1;
            let line = TimedEvent {
                at_ms: elapsed.as_millis() as u64,
                event: &event,
            };
            serde_json::to_writer(&mut *out, &line)?;
            writeln!(out)?;
        }

        let state = player.backend_state();
        let finished = matches!(
            state,
            BackendState::Ended | BackendState::Idle | BackendState::Error
        ) && !player.snapshot().loading;
        if finished || elapsed >= options.limit {
            summary.final_state = state.to_string();
            break;
        }

        if let Some((at, backend)) = switch {
            if elapsed >= at {
                info!(%backend, "Switching backend");
                player.switch_backend(backend)?;
                switch = None;
                continue;
            }
        }

        active_renderer(&player, &platform, &library).advance(options.step);
        elapsed += options.step;
        player.on_frequent_tick();
        player.on_persistence_tick();
    }

    summary.elapsed_ms = elapsed.as_millis() as u64;
    player.close();
    Ok(summary)
}

fn active_renderer<'a>(
    player: &PlayerController,
    platform: &'a SimRendererHandle,
    library: &'a SimRendererHandle,
) -> &'a SimRendererHandle {
    match player.active_backend() {
        BackendKind::Platform => platform,
        BackendKind::Library => library,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;
    use vireo_core::{Resolution, StreamFormat};

    fn video(id: &str, seconds: u64) -> Video {
        let url = |p: &str| Url::parse(&format!("https://media.example/{id}/{p}")).unwrap();
        Video::new(id, format!("Video {id}"), "Author")
            .with_duration(Duration::from_secs(seconds))
            .with_streams(vec![
                Stream::progressive(url("480.mp4"), Resolution::SD_480P, StreamFormat::Mp4)
                    .with_id("480"),
                Stream::progressive(url("1080.webm"), Resolution::FHD_1080P, StreamFormat::Webm)
                    .with_id("1080"),
            ])
    }

    #[test]
    fn selection_honours_backend_formats() {
        let config = PlayerConfig::default();
        let report = select(&config, &video("a", 60), None, DeviceConditions::default()).unwrap();

        assert_eq!(report.backend, BackendKind::Platform);
        assert_eq!(report.candidates.len(), 1);
        assert_eq!(report.selected.unwrap().id.as_str(), "480");
    }

    #[test]
    fn unknown_profile_is_an_error() {
        let config = PlayerConfig::default();
        let conditions = DeviceConditions::default();
        assert!(select(&config, &video("a", 60), Some("Ultra"), conditions).is_err());
    }

    #[tokio::test]
    async fn queue_plays_every_video() {
        let mut out = Vec::new();
        let options = SimulationOptions {
            step: Duration::from_secs(5),
            ..SimulationOptions::default()
        };

        let summary = simulate(
            PlayerConfig::default(),
            vec![video("a", 20), video("b", 20)],
            &options,
            &mut out,
        )
        .await
        .unwrap();

        assert_eq!(summary.items_started, 2);
        assert_eq!(summary.final_state, "ended");
        let output = String::from_utf8(out).unwrap();
        assert_eq!(output.lines().count(), summary.events);
        assert!(output.lines().any(|line| line.contains("\"event\":\"end_of_file\"")));
    }
}
