//! Vireo - Playback Engine
//!
//! Backend-agnostic video playback engine for Vireo.
//!
//! This crate provides:
//! - Stream selection under a quality profile (resolution ceiling + format order)
//! - Two playback engines behind one backend contract
//! - Composition of split audio/video streams for engines that cannot mux them
//! - Backend/stream switching that preserves the playback position
//! - Playback modes (queue, shuffle, loop one, related) driven by end of file
//! - Sponsor/intro segment skipping
//! - Throttled watch-progress reporting
//!
//! # Architecture
//!
//! `vireo-playback` owns no decoder and no network stack:
//! - Asset metadata loading is delegated to an [`AssetLoader`]
//! - Decoding and presentation are delegated to a [`Renderer`]
//! - Watch history is delegated to a [`WatchProgressSink`]
//!
//! [`PlayerController`] is the single owner of playback state. Loads and
//! renderers report back through generation-tagged events, so completions of
//! superseded selections are dropped without ad hoc flags.
//!
//! # Example: Stream Selection
//!
//! ```rust
//! use vireo_core::{Resolution, Stream, StreamFormat};
//! use vireo_playback::best_playable;
//! use url::Url;
//!
//! let url = |p: &str| Url::parse(&format!("https://media.example/{p}")).unwrap();
//! let streams = vec![
//!     Stream::progressive(url("720.mp4"), Resolution::HD_720P, StreamFormat::Mp4),
//!     Stream::progressive(url("2160.mp4"), Resolution::UHD_2160P, StreamFormat::Mp4),
//! ];
//!
//! let best = best_playable(&streams, Resolution::FHD_1080P, &[StreamFormat::Mp4]).unwrap();
//! assert_eq!(best.resolution, Some(Resolution::HD_720P));
//! ```
//!
//! # Example: Simulated Playback
//!
//! ```rust
//! use std::time::Duration;
//! use vireo_core::{PlayerQueueItem, Resolution, Stream, StreamFormat, Video};
//! use vireo_playback::sim::{sim_backends, SimAssetLoader};
//! use vireo_playback::{PlayerConfig, PlayerController};
//! use url::Url;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> vireo_playback::Result<()> {
//! let config = PlayerConfig::default();
//! let loader = SimAssetLoader::new();
//! let (backends, platform, _library) = sim_backends(&loader, config.seek_tolerance());
//! let mut player = PlayerController::new(config, backends)?;
//!
//! let stream = Stream::progressive(
//!     Url::parse("https://media.example/v/720.mp4").unwrap(),
//!     Resolution::HD_720P,
//!     StreamFormat::Mp4,
//! );
//! let video = Video::new("v", "Title", "Author")
//!     .with_duration(Duration::from_secs(120))
//!     .with_streams(vec![stream]);
//!
//! player.open(PlayerQueueItem::new(video))?;
//! player.drain_events(Duration::from_millis(10)).await;
//! assert!(platform.is_playing());
//! # Ok(())
//! # }
//! ```

pub mod asset;
pub mod backend;
pub mod composition;
pub mod config;
pub mod controller;
pub mod coordinator;
mod error;
pub mod events;
pub mod generation;
pub mod mode;
pub mod progress;
pub mod queue;
pub mod renderer;
pub mod segments;
pub mod selector;
pub mod sim;

// Public exports
pub use asset::{AssetKind, AssetLoader, LoadedAsset};
pub use backend::{
    BackendCapabilities, BackendState, Backends, LibraryBackend, LoadRequest, PlatformBackend,
    PlaybackBackend, SeekKind, SeekTolerance,
};
pub use composition::{Composition, CompositionBuilder, CompositionTrack, TrackKind};
pub use config::PlayerConfig;
pub use controller::{PlayerCommand, PlayerController, PlayerHandle};
pub use coordinator::{Preserve, ReadyAction, SwitchCoordinator, SwitchRequest};
pub use error::{PlaybackError, Result};
pub use events::{BackendEvent, BackendSignal, EventBus, EventSink, PlayerEvent, PlayerSnapshot};
pub use generation::{Generation, SelectionGuard, SelectionVersion};
pub use mode::{EofAction, PlaybackModeMachine};
pub use progress::{ProgressReporter, WatchProgressSink, WatchUpdate};
pub use queue::PlayerQueue;
pub use renderer::{PreparedItem, Renderer};
pub use segments::SegmentSkipper;
pub use selector::{annotated_candidates, best_playable};
