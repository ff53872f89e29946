//! Watch-progress reporting
//!
//! Position updates go to an external watch-history collaborator no more
//! often than the configured minimum interval per video. Final updates
//! (item finished or replaced) bypass the throttle.

#[cfg(test)]
use mockall::automock;

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;
use vireo_core::VideoId;

/// One "update watch position" call
#[derive(Debug, Clone, PartialEq)]
pub struct WatchUpdate {
    pub video_id: VideoId,
    pub position: Duration,
    pub duration: Option<Duration>,
    /// The item played to its end
    pub finished: bool,
}

/// Watch-history collaborator
#[cfg_attr(test, automock)]
pub trait WatchProgressSink: Send + Sync {
    fn update_watch_position(&self, update: &WatchUpdate);
}

/// Throttles updates to a [`WatchProgressSink`]
pub struct ProgressReporter {
    sink: Option<Arc<dyn WatchProgressSink>>,
    min_interval: Duration,
    last_sent: Option<(VideoId, Instant)>,
}

impl ProgressReporter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            sink: None,
            min_interval,
            last_sent: None,
        }
    }

    pub fn set_sink(&mut self, sink: Arc<dyn WatchProgressSink>) {
        self.sink = Some(sink);
    }

    /// Send `update` unless one for the same video went out too recently
    ///
    /// Returns whether the update was sent.
    pub fn report(&mut self, update: WatchUpdate) -> bool {
        let now = Instant::now();
        if let Some((video_id, at)) = &self.last_sent {
            if *video_id == update.video_id && now.duration_since(*at) < self.min_interval {
                trace!(video = %update.video_id, "Watch update throttled");
                return false;
            }
        }
        self.send(update, now)
    }

    /// Send `update` immediately
    pub fn flush(&mut self, update: WatchUpdate) -> bool {
        self.send(update, Instant::now())
    }

    fn send(&mut self, update: WatchUpdate, now: Instant) -> bool {
        let Some(sink) = &self.sink else {
            return false;
        };
        trace!(
            video = %update.video_id,
            position = ?update.position,
            finished = update.finished,
            "Watch update"
        );
        sink.update_watch_position(&update);
        self.last_sent = Some((update.video_id, now));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(id: &str, secs: u64) -> WatchUpdate {
        WatchUpdate {
            video_id: VideoId::new(id),
            position: Duration::from_secs(secs),
            duration: Some(Duration::from_secs(120)),
            finished: false,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn throttles_per_video() {
        let mut sink = MockWatchProgressSink::new();
        sink.expect_update_watch_position().times(3).return_const(());

        let mut reporter = ProgressReporter::new(Duration::from_secs(2));
        reporter.set_sink(Arc::new(sink));

        assert!(reporter.report(update("a", 1)));
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!reporter.report(update("a", 2)));
        assert!(reporter.report(update("b", 0)));
        tokio::time::advance(Duration::from_millis(2_100)).await;
        assert!(reporter.report(update("b", 2)));
    }

    #[tokio::test(start_paused = true)]
    async fn flush_bypasses_throttle() {
        let mut sink = MockWatchProgressSink::new();
        sink.expect_update_watch_position()
            .withf(|u: &WatchUpdate| u.finished)
            .times(1)
            .return_const(());
        sink.expect_update_watch_position()
            .withf(|u: &WatchUpdate| !u.finished)
            .times(1)
            .return_const(());

        let mut reporter = ProgressReporter::new(Duration::from_secs(2));
        reporter.set_sink(Arc::new(sink));

        assert!(reporter.report(update("a", 1)));
        let mut last = update("a", 120);
        last.finished = true;
        assert!(reporter.flush(last));
    }

    #[test]
    fn without_sink_nothing_is_sent() {
        let mut reporter = ProgressReporter::new(Duration::from_secs(2));
        assert!(!reporter.flush(update("a", 1)));
    }
}
