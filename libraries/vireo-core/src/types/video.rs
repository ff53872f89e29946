/// Video domain type
use crate::types::{Segment, SegmentCategory, Stream, VideoId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Entry in a video's related list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedVideo {
    pub id: VideoId,
    pub title: String,
    pub author: String,
}

/// A video as produced by the metadata layer
///
/// Immutable once fetched. The engine holds it behind an `Arc` for the
/// duration of playback and never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    /// Service-issued identifier
    pub id: VideoId,

    /// Video title
    pub title: String,

    /// Channel or uploader name
    pub author: String,

    /// Length, when the service reports one
    #[serde(default, with = "crate::secs::option")]
    pub duration: Option<Duration>,

    /// Playable candidates
    #[serde(default)]
    pub streams: Vec<Stream>,

    /// Skip segments, ordered by start time
    #[serde(default)]
    pub segments: Vec<Segment>,

    /// Related videos, if the service supplied any
    #[serde(default)]
    pub related: Option<Vec<RelatedVideo>>,
}

impl Video {
    /// Create a video with no streams or segments
    pub fn new(id: impl Into<String>, title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: VideoId::new(id),
            title: title.into(),
            author: author.into(),
            duration: None,
            streams: Vec::new(),
            segments: Vec::new(),
            related: None,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_streams(mut self, streams: Vec<Stream>) -> Self {
        self.streams = streams;
        self
    }

    /// Set segments, sorted by start time
    pub fn with_segments(mut self, mut segments: Vec<Segment>) -> Self {
        segments.sort_by_key(|s| s.start);
        self.segments = segments;
        self
    }

    pub fn with_related(mut self, related: Vec<RelatedVideo>) -> Self {
        self.related = Some(related);
        self
    }

    /// Earliest segment whose category is in `categories`
    pub fn first_segment(&self, categories: &[SegmentCategory]) -> Option<&Segment> {
        self.segments
            .iter()
            .filter(|s| categories.contains(&s.category))
            .min_by_key(|s| s.start)
    }
}
