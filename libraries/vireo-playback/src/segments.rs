//! Segment Skip Controller
//!
//! Two kinds of skip:
//! - the initial skip, decided once when a fresh (non-preserving) load
//!   becomes ready: if the first enabled segment starts within the intro
//!   window and nothing was skipped for this video yet this session, jump
//!   to its end before playback starts;
//! - mid-playback skips, checked on every frequent tick.
//!
//! Skips are recorded per video for the session so a reload of the same
//! video never repeats them. A restored segment is never skipped again.

use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, info};
use vireo_core::{Segment, SegmentCategory, Video, VideoId};

#[derive(Debug, Clone)]
pub struct SegmentSkipper {
    intro_window: Duration,
    categories: Vec<SegmentCategory>,
    skipped: HashMap<VideoId, HashSet<String>>,
    restored: HashMap<VideoId, HashSet<String>>,
    last_skipped: Option<(VideoId, Segment)>,
}

impl SegmentSkipper {
    pub fn new(intro_window: Duration, categories: Vec<SegmentCategory>) -> Self {
        Self {
            intro_window,
            categories,
            skipped: HashMap::new(),
            restored: HashMap::new(),
            last_skipped: None,
        }
    }

    /// Segment to jump over before starting playback, if any
    ///
    /// Never skips when the load is restoring a prior position.
    pub fn initial_skip(&mut self, video: &Video, preserving: bool) -> Option<Segment> {
        if preserving {
            debug!(video = %video.id, "Resuming, initial skip suppressed");
            return None;
        }

        let first = video.first_segment(&self.categories)?;
        if first.start > self.intro_window {
            return None;
        }
        if self.skipped.get(&video.id).is_some_and(|ids| !ids.is_empty()) {
            debug!(video = %video.id, "Initial skip already applied this session");
            return None;
        }

        let segment = first.clone();
        self.record(&video.id, &segment);
        info!(
            video = %video.id,
            segment = %segment.id,
            to = ?segment.end,
            "Skipping initial segment"
        );
        Some(segment)
    }

    /// Segment containing `position` that should be jumped over now
    pub fn mid_playback_skip(&mut self, video: &Video, position: Duration) -> Option<Segment> {
        let segment = video
            .segments
            .iter()
            .find(|s| {
                self.categories.contains(&s.category)
                    && s.contains(position)
                    && !Self::has(&self.skipped, &video.id, &s.id)
                    && !Self::has(&self.restored, &video.id, &s.id)
            })?
            .clone();

        self.record(&video.id, &segment);
        info!(
            video = %video.id,
            segment = %segment.id,
            category = %segment.category,
            "Skipping segment"
        );
        Some(segment)
    }

    /// Undo the most recent skip
    ///
    /// Returns the segment to seek back into; it will not be skipped again.
    pub fn restore_last_skipped(&mut self) -> Option<(VideoId, Segment)> {
        let (video_id, segment) = self.last_skipped.take()?;
        self.restored
            .entry(video_id.clone())
            .or_default()
            .insert(segment.id.clone());
        info!(video = %video_id, segment = %segment.id, "Restoring skipped segment");
        Some((video_id, segment))
    }

    /// Most recent skip, if it can still be restored
    pub fn last_skipped(&self) -> Option<&Segment> {
        self.last_skipped.as_ref().map(|(_, segment)| segment)
    }

    pub fn set_categories(&mut self, categories: Vec<SegmentCategory>) {
        self.categories = categories;
    }

    fn record(&mut self, video_id: &VideoId, segment: &Segment) {
        self.skipped
            .entry(video_id.clone())
            .or_default()
            .insert(segment.id.clone());
        self.last_skipped = Some((video_id.clone(), segment.clone()));
    }

    fn has(map: &HashMap<VideoId, HashSet<String>>, video_id: &VideoId, segment_id: &str) -> bool {
        map.get(video_id).is_some_and(|ids| ids.contains(segment_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn video_with(segments: Vec<Segment>) -> Video {
        Video::new("v", "Title", "Author")
            .with_duration(secs(120))
            .with_segments(segments)
    }

    fn segment(id: &str, start: u64, end: u64) -> Segment {
        Segment::new(id, secs(start), secs(end), SegmentCategory::Sponsor).unwrap()
    }

    fn skipper() -> SegmentSkipper {
        SegmentSkipper::new(secs(3), vec![SegmentCategory::Sponsor])
    }

    #[test]
    fn skips_intro_segment_on_fresh_start() {
        let video = video_with(vec![segment("intro", 1, 15)]);
        let mut skipper = skipper();

        let skip = skipper.initial_skip(&video, false).unwrap();
        assert_eq!(skip.end, secs(15));
    }

    #[test]
    fn never_skips_when_preserving() {
        let video = video_with(vec![segment("intro", 1, 15)]);
        let mut skipper = skipper();

        assert!(skipper.initial_skip(&video, true).is_none());
        assert!(skipper.last_skipped().is_none());
    }

    #[test]
    fn ignores_segments_outside_intro_window() {
        let video = video_with(vec![segment("late", 4, 15)]);
        assert!(skipper().initial_skip(&video, false).is_none());
    }

    #[test]
    fn initial_skip_happens_once_per_video() {
        let video = video_with(vec![segment("intro", 0, 10)]);
        let mut skipper = skipper();

        assert!(skipper.initial_skip(&video, false).is_some());
        assert!(skipper.initial_skip(&video, false).is_none());
    }

    #[test]
    fn disabled_categories_are_not_skipped() {
        let intro = Segment::new("intro", secs(0), secs(10), SegmentCategory::Intro).unwrap();
        let video = video_with(vec![intro]);
        assert!(skipper().initial_skip(&video, false).is_none());
    }

    #[test]
    fn mid_playback_skip_once_per_segment() {
        let video = video_with(vec![segment("mid", 40, 55)]);
        let mut skipper = skipper();

        assert!(skipper.mid_playback_skip(&video, secs(39)).is_none());
        assert_eq!(skipper.mid_playback_skip(&video, secs(41)).unwrap().id, "mid");
        assert!(skipper.mid_playback_skip(&video, secs(42)).is_none());
    }

    #[test]
    fn restored_segment_is_not_skipped_again() {
        let video = video_with(vec![segment("mid", 40, 55)]);
        let mut skipper = skipper();
        skipper.mid_playback_skip(&video, secs(41)).unwrap();

        let (video_id, restored) = skipper.restore_last_skipped().unwrap();
        assert_eq!(video_id.as_str(), "v");
        assert_eq!(restored.start, secs(40));
        assert!(skipper.restore_last_skipped().is_none());
        assert!(skipper.mid_playback_skip(&video, secs(41)).is_none());
    }
}
