//! Player controller
//!
//! Single owner of playback state. Commands, backend events and the two
//! periodic ticks are all handled on one task through `&mut self`, so the
//! selected stream, the active backend, the preserved position and the
//! playback-mode outcome are never mutated concurrently.
//!
//! Observers follow along through the [`EventBus`] and the
//! [`PlayerSnapshot`] watch channel.

use crate::backend::{BackendState, Backends, PlaybackBackend, SeekKind};
use crate::config::PlayerConfig;
use crate::coordinator::{Preserve, ReadyAction, SwitchCoordinator, SwitchRequest};
use crate::error::{PlaybackError, Result};
use crate::events::{BackendEvent, BackendSignal, EventBus, EventSink, PlayerEvent, PlayerSnapshot};
use crate::generation::SelectionVersion;
use crate::mode::{EofAction, PlaybackModeMachine};
use crate::progress::{ProgressReporter, WatchProgressSink, WatchUpdate};
use crate::queue::PlayerQueue;
use crate::renderer::PreparedItem;
use crate::segments::SegmentSkipper;
use crate::selector::{annotated_candidates, best_playable};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use vireo_core::{
    select_profile, BackendKind, DeviceConditions, PlaybackMode, PlayerQueueItem, QualityProfile,
    QueueItemId, Resolution, Stream, StreamId, Video,
};

/// Commands accepted by a running player
#[derive(Debug)]
pub enum PlayerCommand {
    /// Open an item now, resuming from its saved time if it has one
    Open(PlayerQueueItem),

    Play,
    Pause,
    TogglePlay,
    Stop,

    /// User seek
    Seek(Duration),

    SetRate(f32),

    /// Switch the current item to another of its streams
    SwitchStream(StreamId),

    /// Re-select the current item on another backend
    SwitchBackend(BackendKind),

    /// Pin a profile by name, `None` for automatic
    SetQualityProfile(Option<String>),

    UpdateConditions(DeviceConditions),

    SetPlaybackMode(PlaybackMode),

    Enqueue(PlayerQueueItem),
    PlayNext(PlayerQueueItem),
    RemoveFromQueue(QueueItemId),
    ClearQueue,

    /// Candidate consulted by related mode at end of file
    SetAutoplayCandidate(Option<PlayerQueueItem>),

    EnterPictureInPicture,
    ExitPictureInPicture,

    RestoreLastSkipped,
    DismissError,

    /// Close the current item
    Close,

    /// Stop the player task
    Shutdown,

    /// Run every queued backend event, then reply
    Sync(oneshot::Sender<()>),
}

#[derive(Debug, Clone)]
struct CurrentItem {
    item: PlayerQueueItem,
    stream: Stream,
}

#[derive(Debug, Default)]
struct PictureInPicture {
    active: bool,
    restore_to: Option<BackendKind>,
}

pub struct PlayerController {
    config: PlayerConfig,
    backends: Backends,
    active: BackendKind,
    pinned_profile: Option<String>,
    applied_profile: Option<String>,
    conditions: DeviceConditions,
    queue: PlayerQueue,
    modes: PlaybackModeMachine,
    autoplay: Option<PlayerQueueItem>,
    current: Option<CurrentItem>,
    coordinator: SwitchCoordinator,
    skipper: SegmentSkipper,
    progress: ProgressReporter,
    pip: PictureInPicture,
    rate: f32,
    error: Option<String>,
    eof_during_seek: bool,
    version: SelectionVersion,
    events_tx: mpsc::UnboundedSender<BackendEvent>,
    events_rx: mpsc::UnboundedReceiver<BackendEvent>,
    bus: EventBus,
    snapshot: watch::Sender<PlayerSnapshot>,
    published_state: (BackendKind, BackendState),
}

impl PlayerController {
    pub fn new(config: PlayerConfig, mut backends: Backends) -> Result<Self> {
        config.validate()?;

        let active = config.default_backend;
        backends.get_mut(active).did_change_to(true);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (snapshot, _) = watch::channel(PlayerSnapshot {
            backend: active,
            mode: config.default_mode,
            rate: 1.0,
            ..PlayerSnapshot::default()
        });

        info!(backend = %active, mode = %config.default_mode, "Player created");

        Ok(Self {
            modes: PlaybackModeMachine::new(config.default_mode),
            skipper: SegmentSkipper::new(
                config.intro_skip_window(),
                config.skip_categories.clone(),
            ),
            progress: ProgressReporter::new(config.watch_update_interval()),
            bus: EventBus::new(config.event_capacity),
            backends,
            active,
            pinned_profile: None,
            applied_profile: None,
            conditions: DeviceConditions::default(),
            queue: PlayerQueue::new(),
            autoplay: None,
            current: None,
            coordinator: SwitchCoordinator::new(),
            pip: PictureInPicture::default(),
            rate: 1.0,
            error: None,
            eof_during_seek: false,
            version: SelectionVersion::new(),
            events_tx,
            events_rx,
            snapshot,
            published_state: (active, BackendState::Idle),
            config,
        })
    }

    /// Report watch progress to `sink`
    #[must_use]
    pub fn with_progress_sink(mut self, sink: Arc<dyn WatchProgressSink>) -> Self {
        self.progress.set_sink(sink);
        self
    }

    // ===== Observation =====

    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.bus.subscribe()
    }

    pub fn watch_snapshot(&self) -> watch::Receiver<PlayerSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn event_bus(&self) -> EventBus {
        self.bus.clone()
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        let backend = self.backends.get(self.active);
        let state = backend.state();
        PlayerSnapshot {
            video_id: self.current.as_ref().map(|c| c.item.video_id().clone()),
            current_time: backend.current_time(),
            duration: backend
                .duration()
                .or_else(|| self.current.as_ref().and_then(|c| c.item.video.duration)),
            playing: state == BackendState::Playing,
            paused: matches!(state, BackendState::Paused | BackendState::Ready),
            loading: state == BackendState::Loading || self.coordinator.shows_loading(),
            stream_description: backend.current_stream().map(Stream::description),
            backend: self.active,
            mode: self.modes.mode(),
            rate: self.rate,
            picture_in_picture: self.pip.active,
            queue_length: self.queue.len(),
            error: self.error.clone(),
        }
    }

    pub fn active_backend(&self) -> BackendKind {
        self.active
    }

    pub fn backend_state(&self) -> BackendState {
        self.backends.get(self.active).state()
    }

    pub fn current_item(&self) -> Option<&PlayerQueueItem> {
        self.current.as_ref().map(|c| &c.item)
    }

    /// Stream selected for the current item
    pub fn current_stream(&self) -> Option<&Stream> {
        self.current.as_ref().map(|c| &c.stream)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn queue(&self) -> &PlayerQueue {
        &self.queue
    }

    pub fn mode(&self) -> PlaybackMode {
        self.modes.mode()
    }

    pub fn preserved_position(&self) -> Option<Duration> {
        self.coordinator.preserved()
    }

    pub fn is_picture_in_picture(&self) -> bool {
        self.pip.active
    }

    /// Profile that applies to the next load
    pub fn active_profile(&self) -> QualityProfile {
        let pinned = self
            .pinned_profile
            .as_ref()
            .and_then(|name| self.config.quality_profiles.iter().find(|p| &p.name == name));
        pinned
            .or_else(|| select_profile(&self.config.quality_profiles, &self.conditions))
            .or_else(|| self.config.quality_profiles.first())
            .cloned()
            .unwrap_or_default()
    }

    // ===== Loading =====

    /// Open `item` now, resuming from its saved time if it has one
    pub fn open(&mut self, item: PlayerQueueItem) -> Result<()> {
        let preserve = item.playback_time.map_or(Preserve::Nothing, Preserve::At);
        self.load_item(item, preserve, true)
    }

    fn load_item(
        &mut self,
        item: PlayerQueueItem,
        preserve: Preserve,
        start_playing: bool,
    ) -> Result<()> {
        self.flush_replaced();

        let profile = self.active_profile();
        let target = self.target_backend(&profile);
        let stream = match self.select_for(&item.video, target, &profile) {
            Ok(stream) => stream,
            Err(err) => {
                self.report_error(&err);
                self.publish_snapshot();
                return Err(err);
            }
        };

        info!(
            video = %item.video_id(),
            profile = %profile.name,
            backend = %target,
            stream = %stream.description(),
            "Opening item"
        );

        self.applied_profile = Some(profile.name);
        self.bus.publish(PlayerEvent::ItemChanged {
            video_id: item.video_id().clone(),
            title: item.video.title.clone(),
        });

        let video = Arc::clone(&item.video);
        self.current = Some(CurrentItem {
            item,
            stream: stream.clone(),
        });
        self.switch_to(target, stream, video, preserve, false, start_playing)
    }

    /// Best stream of `video` that `backend` can play under `profile`
    fn select_for(
        &self,
        video: &Video,
        backend: BackendKind,
        profile: &QualityProfile,
    ) -> Result<Stream> {
        let engine = self.backends.get(backend);
        let playable: Vec<Stream> = video
            .streams
            .iter()
            .filter(|stream| engine.can_play(stream))
            .cloned()
            .collect();

        best_playable(&playable, profile.max_resolution, &profile.formats).ok_or_else(|| {
            warn!(video = %video.id, profile = %profile.name, %backend, "No playable stream");
            PlaybackError::NoPlayableStream {
                video_id: video.id.clone(),
            }
        })
    }

    fn target_backend(&self, profile: &QualityProfile) -> BackendKind {
        if self.pip.active {
            self.backends
                .picture_in_picture_capable()
                .unwrap_or(profile.backend)
        } else {
            profile.backend
        }
    }

    fn switch_to(
        &mut self,
        target: BackendKind,
        stream: Stream,
        video: Arc<Video>,
        preserve: Preserve,
        upgrading: bool,
        start_playing: bool,
    ) -> Result<()> {
        self.error = None;
        self.eof_during_seek = false;
        let generation = self.version.advance();
        let sink = EventSink::new(self.events_tx.clone(), target, self.version.guard());
        let from = self.active;
        let description = stream.description();
        debug!(%generation, %from, to = %target, stream = %description, "Selection advanced");

        let request = SwitchRequest {
            target,
            stream,
            video,
            preserve,
            upgrading,
            start_playing,
        };
        let result = self.coordinator.switch(&mut self.backends, from, request, sink);

        if target != from {
            self.active = target;
            self.backends.get_mut(target).set_rate(self.rate);
            self.bus.publish(PlayerEvent::BackendChanged { from, to: target });
        }

        match result {
            Ok(()) => {
                self.bus.publish(PlayerEvent::StreamChanged {
                    backend: target,
                    description,
                });
                self.publish_snapshot();
                Ok(())
            }
            Err(err) => {
                self.report_error(&err);
                self.publish_snapshot();
                Err(err)
            }
        }
    }

    /// Re-select the current item, preserving its position
    ///
    /// `backend` forces the target backend. No-op when the selection and
    /// backend would not change.
    fn reselect_on(&mut self, backend: Option<BackendKind>) -> Result<()> {
        let Some(current) = self.current.clone() else {
            return Ok(());
        };

        let profile = self.active_profile();
        let target = backend.unwrap_or_else(|| self.target_backend(&profile));
        let stream = match self.select_for(&current.item.video, target, &profile) {
            Ok(stream) => stream,
            Err(err) => {
                self.report_error(&err);
                self.publish_snapshot();
                return Err(err);
            }
        };

        if target == self.active
            && stream.id == current.stream.id
            && self.backend_state() != BackendState::Error
        {
            debug!(stream = %stream.description(), "Selection unchanged");
            return Ok(());
        }

        info!(
            video = %current.item.video_id(),
            profile = %profile.name,
            backend = %target,
            stream = %stream.description(),
            "Re-selecting stream"
        );
        self.applied_profile = Some(profile.name);
        let start_playing = self.is_playing_or_starting();
        if let Some(current) = &mut self.current {
            current.stream = stream.clone();
        }
        self.switch_to(
            target,
            stream,
            current.item.video,
            Preserve::Current,
            true,
            start_playing,
        )
    }

    /// Re-run selection for the current item with the active profile
    pub fn reselect(&mut self) -> Result<()> {
        self.reselect_on(None)
    }

    /// Move the current item to `backend`, keeping its position
    pub fn switch_backend(&mut self, backend: BackendKind) -> Result<()> {
        self.reselect_on(Some(backend))
    }

    /// Play another of the current item's streams, keeping its position
    pub fn switch_stream(&mut self, id: &StreamId) -> Result<()> {
        let Some(current) = self.current.clone() else {
            return Err(PlaybackError::NoItemLoaded);
        };

        let profile = self.active_profile();
        let candidates = annotated_candidates(&current.item.video.streams, Resolution::MAX);
        let stream = candidates
            .into_iter()
            .find(|s| &s.id == id)
            .ok_or_else(|| PlaybackError::NoPlayableStream {
                video_id: current.item.video_id().clone(),
            })?;

        let preferred = self.target_backend(&profile);
        let target = [preferred, self.active, preferred.other()]
            .into_iter()
            .find(|kind| self.backends.get(*kind).can_play(&stream))
            .ok_or_else(|| crate::backend::unsupported(preferred, &stream))?;

        let start_playing = self.is_playing_or_starting();
        if let Some(current) = &mut self.current {
            current.stream = stream.clone();
        }
        info!(stream = %stream.description(), backend = %target, "Switching stream");
        self.switch_to(target, stream, current.item.video, Preserve::Current, true, start_playing)
    }

    /// Pin a quality profile by name, or return to automatic selection
    ///
    /// Applies from the next load; call [`reselect`](Self::reselect) to
    /// apply it to the current item.
    pub fn set_quality_profile(&mut self, name: Option<String>) -> Result<()> {
        if let Some(name) = &name {
            if !self.config.quality_profiles.iter().any(|p| &p.name == name) {
                return Err(PlaybackError::Config(format!("unknown quality profile {name:?}")));
            }
        }
        info!(profile = ?name, "Quality profile pinned");
        self.pinned_profile = name;
        Ok(())
    }

    /// New network/power state; may auto-switch the current item
    pub fn update_conditions(&mut self, conditions: DeviceConditions) -> Result<()> {
        debug!(?conditions, "Device conditions changed");
        self.conditions = conditions;

        let profile = self.active_profile();
        let changed = self.applied_profile.as_deref() != Some(profile.name.as_str());
        if changed && self.config.auto_switch && self.current.is_some() {
            info!(profile = %profile.name, "Quality profile changed, auto-switching");
            return self.reselect();
        }
        Ok(())
    }

    fn is_playing_or_starting(&self) -> bool {
        if self.coordinator.shows_loading() {
            self.coordinator.will_start()
        } else {
            self.backend_state() == BackendState::Playing
        }
    }

    // ===== Playback Control =====

    pub fn play(&mut self) -> Result<()> {
        if self.coordinator.request_start(true) {
            debug!("Play requested while switching");
            return Ok(());
        }
        let was = self.backend_state();
        let result = self.backends.get_mut(self.active).play();
        self.rearm_after_ended(was);
        self.publish_snapshot();
        result
    }

    pub fn pause(&mut self) -> Result<()> {
        if self.coordinator.request_start(false) {
            debug!("Pause requested while switching");
            return Ok(());
        }
        let result = self.backends.get_mut(self.active).pause();
        self.publish_snapshot();
        result
    }

    pub fn toggle_play(&mut self) -> Result<()> {
        if self.coordinator.shows_loading() {
            let start = !self.coordinator.will_start();
            self.coordinator.request_start(start);
            return Ok(());
        }
        let was = self.backend_state();
        let result = self.backends.get_mut(self.active).toggle_play();
        self.rearm_after_ended(was);
        self.publish_snapshot();
        result
    }

    /// Pause and rewind to the start
    pub fn stop(&mut self) -> Result<()> {
        self.coordinator.request_start(false);
        let was = self.backend_state();
        let result = self.backends.get_mut(self.active).stop();
        self.rearm_after_ended(was);
        self.publish_snapshot();
        result
    }

    /// A new play-through begins once the item leaves `Ended`
    fn rearm_after_ended(&mut self, was: BackendState) {
        if was == BackendState::Ended && self.backend_state() != BackendState::Ended {
            debug!("Item left ended state, end of file armed");
            self.modes.arm();
        }
    }

    /// User seek; ignored while another seek is in flight
    pub fn seek(&mut self, to: Duration) -> Result<()> {
        match self.backends.get_mut(self.active).seek(to, SeekKind::User) {
            Ok(()) => Ok(()),
            Err(PlaybackError::SeekRejected) => {
                debug!(target = ?to, "Overlapping seek ignored");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    pub fn set_rate(&mut self, rate: f32) {
        self.rate = rate;
        self.backends.get_mut(self.active).set_rate(rate);
        self.bus.publish(PlayerEvent::RateChanged { rate });
        self.publish_snapshot();
    }

    /// Close the current item
    pub fn close(&mut self) {
        self.flush_replaced();
        self.version.advance();
        self.backends.get_mut(self.active).close_item();
        self.coordinator.reset();
        self.eof_during_seek = false;
        if let Some(current) = self.current.take() {
            info!(video = %current.item.video_id(), "Closing item");
        }
        self.bus.publish(PlayerEvent::Closed);
        self.publish_snapshot();
    }

    // ===== Mode & Queue =====

    /// Change the playback mode; entering shuffle shuffles the queue once
    pub fn set_playback_mode(&mut self, mode: PlaybackMode) {
        if !self.modes.set_mode(mode) {
            return;
        }
        if mode == PlaybackMode::Shuffle {
            self.queue.shuffle();
        }
        self.bus.publish(PlayerEvent::ModeChanged { mode });
        self.publish_snapshot();
    }

    pub fn enqueue(&mut self, item: PlayerQueueItem) {
        self.queue.append(item);
        self.queue_changed();
    }

    pub fn play_next(&mut self, item: PlayerQueueItem) {
        self.queue.play_next(item);
        self.queue_changed();
    }

    pub fn remove_from_queue(&mut self, id: QueueItemId) -> Option<PlayerQueueItem> {
        let removed = self.queue.remove(id);
        if removed.is_some() {
            self.queue_changed();
        }
        removed
    }

    pub fn clear_queue(&mut self) {
        self.queue.clear();
        self.queue_changed();
    }

    pub fn replace_queue(&mut self, items: Vec<PlayerQueueItem>) {
        self.queue.replace(items);
        if self.modes.mode() == PlaybackMode::Shuffle {
            self.queue.shuffle();
        }
        self.queue_changed();
    }

    pub fn set_autoplay_candidate(&mut self, candidate: Option<PlayerQueueItem>) {
        self.autoplay = candidate;
    }

    fn queue_changed(&mut self) {
        self.bus.publish(PlayerEvent::QueueChanged {
            length: self.queue.len(),
        });
        self.publish_snapshot();
    }

    // ===== Picture-in-Picture =====

    /// Move playback to a PiP-capable backend
    pub fn enter_picture_in_picture(&mut self) -> Result<()> {
        if self.pip.active {
            return Ok(());
        }
        let capable = self
            .backends
            .picture_in_picture_capable()
            .ok_or_else(|| {
                PlaybackError::Backend("no backend supports Picture-in-Picture".to_string())
            })?;

        self.pip.active = true;
        self.bus.publish(PlayerEvent::PictureInPictureChanged { active: true });

        if capable != self.active {
            self.pip.restore_to = Some(self.active);
            self.reselect_on(Some(capable))?;
        }
        self.publish_snapshot();
        Ok(())
    }

    /// Return to the backend used before Picture-in-Picture
    pub fn exit_picture_in_picture(&mut self) -> Result<()> {
        if !self.pip.active {
            return Ok(());
        }
        self.pip.active = false;
        self.bus.publish(PlayerEvent::PictureInPictureChanged { active: false });

        if let Some(previous) = self.pip.restore_to.take() {
            if previous != self.active {
                self.reselect_on(Some(previous))?;
            }
        }
        self.publish_snapshot();
        Ok(())
    }

    // ===== Segments & Errors =====

    /// Seek back into the most recently skipped segment
    pub fn restore_last_skipped(&mut self) -> Result<()> {
        let Some((video_id, segment)) = self.skipper.restore_last_skipped() else {
            return Ok(());
        };
        if self.current.as_ref().map(|c| c.item.video_id()) != Some(&video_id) {
            return Ok(());
        }

        self.seek(segment.start)?;
        self.bus.publish(PlayerEvent::SegmentRestored {
            video_id,
            segment_id: segment.id,
        });
        Ok(())
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
        self.publish_snapshot();
    }

    fn report_error(&mut self, err: &PlaybackError) {
        if err.is_user_visible() {
            self.set_error(err.to_string());
        } else {
            debug!(error = %err, "Internal playback error");
        }
    }

    fn set_error(&mut self, message: String) {
        warn!(error = %message, "Playback error");
        self.bus.publish(PlayerEvent::Error {
            message: message.clone(),
        });
        self.error = Some(message);
    }

    // ===== Backend Events =====

    fn sink_for(&self, backend: BackendKind) -> EventSink {
        EventSink::new(self.events_tx.clone(), backend, self.version.guard())
    }

    /// Apply one backend event; stale ones are dropped
    pub fn handle_backend_event(&mut self, event: BackendEvent) {
        if event.backend != self.active || event.generation != self.version.current() {
            debug!(
                backend = %event.backend,
                generation = %event.generation,
                current = %self.version.current(),
                "Discarding stale backend event"
            );
            return;
        }

        match event.signal {
            BackendSignal::Prepared(item) => self.on_prepared(item),
            BackendSignal::LoadFailed(reason) => self.on_load_failed(reason),
            BackendSignal::SeekFinished { kind, success } => self.on_seek_finished(kind, success),
            BackendSignal::PlayedToEnd => self.on_played_to_end(),
            BackendSignal::Failed(reason) => self.on_failed(reason),
        }
        self.publish_snapshot();
    }

    fn on_prepared(&mut self, item: PreparedItem) {
        let sink = self.sink_for(self.active);
        let backend = self.backends.get_mut(self.active);
        if let Err(err) = backend.install(item, sink) {
            warn!(error = %err, "Could not install prepared item");
            let locator = self
                .current
                .as_ref()
                .map(|c| c.stream.description())
                .unwrap_or_default();
            let failure = PlaybackError::LoadFailure {
                locator,
                reason: err.to_string(),
            };
            self.on_load_failed(failure.to_string());
            return;
        }
        self.modes.arm();

        match self.coordinator.on_ready(backend) {
            ReadyAction::AwaitSeek => {}
            ReadyAction::Start {
                start_playing,
                fresh,
            } => self.start_after_ready(start_playing, fresh),
        }
    }

    fn start_after_ready(&mut self, start_playing: bool, fresh: bool) {
        let Some(video) = self.current.as_ref().map(|c| Arc::clone(&c.item.video)) else {
            return;
        };

        if let Some(segment) = self.skipper.initial_skip(&video, !fresh) {
            match self.backends.get_mut(self.active).seek(segment.end, SeekKind::SegmentSkip) {
                Ok(()) => {
                    self.coordinator.await_seek(SeekKind::SegmentSkip, start_playing);
                    self.bus.publish(PlayerEvent::SegmentSkipped {
                        video_id: video.id.clone(),
                        segment_id: segment.id,
                        category: segment.category,
                        to_ms: millis(segment.end),
                    });
                    return;
                }
                Err(err) => warn!(error = %err, "Initial segment skip failed"),
            }
        }

        if start_playing {
            self.start_playback();
        }
    }

    fn start_playback(&mut self) {
        if let Err(err) = self.backends.get_mut(self.active).play() {
            warn!(error = %err, "Could not start playback");
        }
    }

    fn on_seek_finished(&mut self, kind: SeekKind, success: bool) {
        let backend = self.backends.get_mut(self.active);
        backend.on_seek_finished();
        let position = backend.current_time().unwrap_or_default();
        debug!(?kind, success, ?position, "Seek finished");
        self.bus.publish(PlayerEvent::SeekCompleted {
            kind,
            position_ms: millis(position),
            success,
        });

        if kind == SeekKind::LoopRestart {
            if success {
                self.modes.arm();
                self.start_playback();
            } else {
                warn!("Loop restart seek failed, staying ended");
            }
            return;
        }

        if kind == SeekKind::User {
            self.on_user_seek_finished(success, position);
            return;
        }

        if let Some(start_playing) = self.coordinator.on_seek_finished(kind, success) {
            if start_playing {
                self.start_playback();
            }
        }
    }

    /// Settle an end of file that arrived while the user seek was in flight,
    /// or reopen an ended item the user sought back into
    fn on_user_seek_finished(&mut self, success: bool, position: Duration) {
        let backend = self.backends.get_mut(self.active);
        let before_end = !backend.duration().is_some_and(|duration| position >= duration);

        if std::mem::take(&mut self.eof_during_seek) {
            if !success || !before_end {
                debug!("Seek left the item at its end, applying deferred end of file");
                self.on_played_to_end();
            } else if backend.state() == BackendState::Playing {
                debug!(?position, "Resuming renderer stopped during seek");
                self.start_playback();
            }
            return;
        }

        if success && before_end && backend.state() == BackendState::Ended {
            match backend.pause() {
                Ok(()) => self.rearm_after_ended(BackendState::Ended),
                Err(err) => warn!(error = %err, "Could not reopen ended item"),
            }
        }
    }

    fn on_played_to_end(&mut self) {
        let Some(video_id) = self.current.as_ref().map(|c| c.item.video_id().clone()) else {
            return;
        };

        let user_seek = self.backends.get(self.active).seek_in_flight() == Some(SeekKind::User);
        let action = self.modes.on_end_of_file(
            &mut self.queue,
            &mut self.autoplay,
            user_seek,
            self.config.close_on_eof,
        );
        if action == EofAction::Ignored {
            if user_seek {
                self.eof_during_seek = true;
            }
            return;
        }

        if let Err(err) = self.backends.get_mut(self.active).mark_ended() {
            warn!(error = %err, "Could not mark item ended");
        }
        self.bus.publish(PlayerEvent::EndOfFile { video_id });
        self.flush_progress(true);

        match action {
            EofAction::Advance(item) | EofAction::Autoplay(item) => {
                self.queue_changed();
                if let Err(err) = self.load_item(item, Preserve::Nothing, true) {
                    warn!(error = %err, "Could not start next item");
                }
            }
            EofAction::Restart => {
                if let Err(err) = self
                    .backends
                    .get_mut(self.active)
                    .seek(Duration::ZERO, SeekKind::LoopRestart)
                {
                    warn!(error = %err, "Could not restart item");
                }
            }
            EofAction::Close => self.close(),
            EofAction::StayEnded | EofAction::Ignored => {}
            EofAction::NothingToPlay => {
                self.bus.publish(PlayerEvent::NothingToPlay);
                self.set_error(PlaybackError::NothingToPlay.to_string());
            }
        }
    }

    fn on_load_failed(&mut self, reason: String) {
        self.backends.get_mut(self.active).mark_failed(&reason);
        self.coordinator.on_load_failed();
        self.set_error(reason);
    }

    fn on_failed(&mut self, reason: String) {
        self.backends.get_mut(self.active).mark_failed(&reason);
        self.coordinator.on_load_failed();
        self.set_error(PlaybackError::Backend(reason).to_string());
    }

    // ===== Ticks =====

    /// UI-rate tick: mid-playback segment skips and time updates
    pub fn on_frequent_tick(&mut self) {
        let Some(video) = self.current.as_ref().map(|c| Arc::clone(&c.item.video)) else {
            return;
        };
        let backend = self.backends.get(self.active);
        let Some(position) = backend.current_time() else {
            return;
        };
        let duration = backend.duration();
        let can_skip = backend.state() == BackendState::Playing
            && backend.seek_in_flight().is_none()
            && !self.coordinator.shows_loading();

        if can_skip {
            if let Some(segment) = self.skipper.mid_playback_skip(&video, position) {
                match self.backends.get_mut(self.active).seek(segment.end, SeekKind::SegmentSkip) {
                    Ok(()) => self.bus.publish(PlayerEvent::SegmentSkipped {
                        video_id: video.id.clone(),
                        segment_id: segment.id,
                        category: segment.category,
                        to_ms: millis(segment.end),
                    }),
                    Err(err) => debug!(error = %err, "Segment skip not issued"),
                }
            }
        }

        self.bus.publish(PlayerEvent::TimeUpdated {
            position_ms: millis(position),
            duration_ms: duration.map(millis),
        });
        self.publish_snapshot();
    }

    /// Persistence tick: throttled watch-position update
    pub fn on_persistence_tick(&mut self) {
        if let Some(update) = self.watch_update(false) {
            self.progress.report(update);
        }
    }

    /// Final update for an item that is about to be replaced
    ///
    /// Items that played to the end were already flushed as finished.
    fn flush_replaced(&mut self) {
        if self.backend_state() != BackendState::Ended {
            self.flush_progress(false);
        }
    }

    fn flush_progress(&mut self, finished: bool) {
        if let Some(update) = self.watch_update(finished) {
            self.progress.flush(update);
        }
    }

    fn watch_update(&self, finished: bool) -> Option<WatchUpdate> {
        let current = self.current.as_ref()?;
        let backend = self.backends.get(self.active);
        let position = backend.current_time()?;
        Some(WatchUpdate {
            video_id: current.item.video_id().clone(),
            position,
            duration: backend.duration().or(current.item.video.duration),
            finished,
        })
    }

    fn publish_snapshot(&mut self) {
        let state = (self.active, self.backend_state());
        if state != self.published_state {
            self.published_state = state;
            self.bus.publish(PlayerEvent::StateChanged {
                backend: state.0,
                state: state.1,
            });
        }
        self.snapshot.send_replace(self.snapshot());
    }

    // ===== Driving =====

    /// Wait for the next backend event and apply it
    pub async fn process_next_event(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(event) => {
                self.handle_backend_event(event);
                true
            }
            None => false,
        }
    }

    /// Apply backend events until none arrives for `quiet`
    ///
    /// Returns the number of events applied.
    pub async fn drain_events(&mut self, quiet: Duration) -> usize {
        let mut applied = 0;
        while let Ok(Some(event)) = tokio::time::timeout(quiet, self.events_rx.recv()).await {
            self.handle_backend_event(event);
            applied += 1;
        }
        applied
    }

    /// Apply a command, logging failures
    pub fn apply(&mut self, command: PlayerCommand) {
        let result = match command {
            PlayerCommand::Open(item) => self.open(item),
            PlayerCommand::Play => self.play(),
            PlayerCommand::Pause => self.pause(),
            PlayerCommand::TogglePlay => self.toggle_play(),
            PlayerCommand::Stop => self.stop(),
            PlayerCommand::Seek(to) => self.seek(to),
            PlayerCommand::SetRate(rate) => {
                self.set_rate(rate);
                Ok(())
            }
            PlayerCommand::SwitchStream(id) => self.switch_stream(&id),
            PlayerCommand::SwitchBackend(kind) => self.switch_backend(kind),
            PlayerCommand::SetQualityProfile(name) => self.set_quality_profile(name),
            PlayerCommand::UpdateConditions(conditions) => self.update_conditions(conditions),
            PlayerCommand::SetPlaybackMode(mode) => {
                self.set_playback_mode(mode);
                Ok(())
            }
            PlayerCommand::Enqueue(item) => {
                self.enqueue(item);
                Ok(())
            }
            PlayerCommand::PlayNext(item) => {
                self.play_next(item);
                Ok(())
            }
            PlayerCommand::RemoveFromQueue(id) => {
                self.remove_from_queue(id);
                Ok(())
            }
            PlayerCommand::ClearQueue => {
                self.clear_queue();
                Ok(())
            }
            PlayerCommand::SetAutoplayCandidate(candidate) => {
                self.set_autoplay_candidate(candidate);
                Ok(())
            }
            PlayerCommand::EnterPictureInPicture => self.enter_picture_in_picture(),
            PlayerCommand::ExitPictureInPicture => self.exit_picture_in_picture(),
            PlayerCommand::RestoreLastSkipped => self.restore_last_skipped(),
            PlayerCommand::DismissError => {
                self.dismiss_error();
                Ok(())
            }
            PlayerCommand::Close => {
                self.close();
                Ok(())
            }
            PlayerCommand::Shutdown | PlayerCommand::Sync(_) => Ok(()),
        };

        if let Err(err) = result {
            warn!(error = %err, "Command failed");
        }
    }

    /// Serve commands, backend events and ticks until shutdown
    pub async fn run(mut self, mut commands: mpsc::Receiver<PlayerCommand>) {
        let mut frequent = tokio::time::interval(self.config.frequent_tick());
        frequent.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut persistence = tokio::time::interval(self.config.persistence_tick());
        persistence.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Player task started");
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    None | Some(PlayerCommand::Shutdown) => break,
                    Some(PlayerCommand::Sync(reply)) => {
                        while let Ok(event) = self.events_rx.try_recv() {
                            self.handle_backend_event(event);
                        }
                        let _ = reply.send(());
                    }
                    Some(command) => self.apply(command),
                },
                Some(event) = self.events_rx.recv() => self.handle_backend_event(event),
                _ = frequent.tick() => self.on_frequent_tick(),
                _ = persistence.tick() => self.on_persistence_tick(),
            }
        }

        self.close();
        info!("Player task stopped");
    }

    /// Run on a new task
    pub fn spawn(self) -> (PlayerHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(self.config.command_capacity);
        let handle = PlayerHandle {
            commands: tx,
            bus: self.bus.clone(),
            snapshot: self.snapshot.subscribe(),
        };
        (handle, tokio::spawn(self.run(rx)))
    }
}

fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

/// Cloneable front end of a spawned player
#[derive(Clone)]
pub struct PlayerHandle {
    commands: mpsc::Sender<PlayerCommand>,
    bus: EventBus,
    snapshot: watch::Receiver<PlayerSnapshot>,
}

impl PlayerHandle {
    /// Queue a command for the player task
    pub async fn send(&self, command: PlayerCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| PlaybackError::Backend("player task stopped".to_string()))
    }

    /// Wait until the player applied everything sent so far
    pub async fn sync(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(PlayerCommand::Sync(tx)).await?;
        rx.await
            .map_err(|_| PlaybackError::Backend("player task stopped".to_string()))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.bus.subscribe()
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn watch_snapshot(&self) -> watch::Receiver<PlayerSnapshot> {
        self.snapshot.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{AssetKind, LoadedAsset};
    use crate::sim::{sim_backends, SimAssetLoader};
    use url::Url;
    use vireo_core::StreamFormat;

    fn create_item(url: &Url) -> PlayerQueueItem {
        let stream = Stream::progressive(url.clone(), Resolution::HD_720P, StreamFormat::Mp4);
        PlayerQueueItem::new(
            Video::new("clip", "Clip", "Author")
                .with_duration(Duration::from_secs(60))
                .with_streams(vec![stream]),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn install_failure_ends_the_pending_switch() {
        let loader = SimAssetLoader::new();
        let config = PlayerConfig::default();
        let (backends, _platform, _library) = sim_backends(&loader, config.seek_tolerance());
        let mut player = PlayerController::new(config, backends).unwrap();
        let url = Url::parse("https://media.example/clip/720p.mp4").unwrap();

        loader.hold(&url);
        player.open(create_item(&url)).unwrap();
        assert!(player.coordinator.shows_loading());

        // Backend leaves Loading while the selection is still current
        player.backends.get_mut(player.active).cancel_loads();
        player.handle_backend_event(BackendEvent {
            backend: player.active,
            generation: player.version.current(),
            signal: BackendSignal::Prepared(PreparedItem::Asset(LoadedAsset {
                url,
                kind: AssetKind::Progressive,
                duration: Some(Duration::from_secs(60)),
            })),
        });

        assert!(!player.coordinator.shows_loading());
        assert_eq!(player.backend_state(), BackendState::Error);
        assert!(player.error().is_some_and(|e| e.starts_with("Failed to load")));
        assert!(player.play().is_err());
    }
}
