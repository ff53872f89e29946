//! Vireo Core
//!
//! Platform-agnostic media model for the Vireo player.
//!
//! This crate describes what the metadata layer hands to the playback engine
//! and what the settings layer configures it with. Nothing here performs I/O
//! or owns a runtime.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Media Types**: `Video`, `Stream`, `Segment`, `Resolution`
//! - **Settings Types**: `QualityProfile`, `DeviceConditions`, `PlaybackMode`, `BackendKind`
//! - **Queue Types**: `PlayerQueueItem`
//! - **Error Handling**: `CoreError` and `Result`
//!
//! # Example
//!
//! ```rust
//! use vireo_core::{Resolution, Stream, StreamFormat, Video};
//! use url::Url;
//!
//! let stream = Stream::progressive(
//!     Url::parse("https://media.example/v/720.mp4").unwrap(),
//!     Resolution::HD_720P,
//!     StreamFormat::Mp4,
//! );
//!
//! let video = Video::new("dQw4w9WgXcQ", "Title", "Author").with_streams(vec![stream]);
//! assert_eq!(video.streams.len(), 1);
//! assert!(Resolution::HD_720P < Resolution::FHD_1080P);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod types;

mod secs;

// Re-export commonly used types
pub use error::{CoreError, Result};
pub use types::{
    select_profile, BackendKind, DeviceConditions, NetworkKind, PlaybackMode, PlayerQueueItem,
    ProfileCondition, QualityProfile, QueueItemId, RelatedVideo, Resolution, Segment,
    SegmentCategory, Stream, StreamAssets, StreamFormat, StreamId, StreamKind, Video, VideoId,
};
