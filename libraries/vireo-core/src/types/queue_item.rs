/// Player queue entry
use crate::types::{QueueItemId, Video, VideoId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// A video waiting in (or taken from) the player queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerQueueItem {
    /// Entry identity (the same video may be queued twice)
    #[serde(default = "QueueItemId::generate")]
    pub id: QueueItemId,

    /// Referenced video
    pub video: Arc<Video>,

    /// Saved resume position
    #[serde(default, with = "crate::secs::option")]
    pub playback_time: Option<Duration>,

    /// Whether the entry came from related-video autoplay
    #[serde(default)]
    pub autoplay: bool,
}

impl PlayerQueueItem {
    /// Create a user-queued entry
    pub fn new(video: impl Into<Arc<Video>>) -> Self {
        Self {
            id: QueueItemId::generate(),
            video: video.into(),
            playback_time: None,
            autoplay: false,
        }
    }

    /// Create an autoplay-derived entry
    pub fn autoplay(video: impl Into<Arc<Video>>) -> Self {
        Self {
            autoplay: true,
            ..Self::new(video)
        }
    }

    /// Attach a saved resume position
    pub fn with_playback_time(mut self, time: Duration) -> Self {
        self.playback_time = Some(time);
        self
    }

    pub fn video_id(&self) -> &VideoId {
        &self.video.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_for_same_video_are_distinct() {
        let video = Arc::new(Video::new("v", "Title", "Author"));
        let a = PlayerQueueItem::new(Arc::clone(&video));
        let b = PlayerQueueItem::autoplay(video);

        assert_ne!(a.id, b.id);
        assert_eq!(a.video_id(), b.video_id());
        assert!(!a.autoplay);
        assert!(b.autoplay);
    }
}
