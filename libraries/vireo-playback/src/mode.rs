//! Playback-Mode State Machine
//!
//! Decides what happens when the backend reports end-of-file. The decision
//! fires once per terminal playback event: EOF disarms the machine, and it
//! is re-armed when a new item is installed, when a loop restart completes
//! or when an ended item is played or sought back into. An EOF arriving
//! while a user seek is in flight is ignored here; the controller settles
//! it once the seek lands.

use crate::queue::PlayerQueue;
use tracing::{debug, info};
use vireo_core::{PlaybackMode, PlayerQueueItem};

/// Outcome of one end-of-file
#[derive(Debug, Clone, PartialEq)]
pub enum EofAction {
    /// Duplicate EOF, or EOF during a user seek
    Ignored,
    /// Start the next queued item from zero
    Advance(PlayerQueueItem),
    /// Start the autoplay candidate from zero
    Autoplay(PlayerQueueItem),
    /// Seek to zero and resume the same item
    Restart,
    /// Queue exhausted and close-on-EOF is set
    Close,
    /// Queue exhausted; remain ended
    StayEnded,
    /// Related mode without a candidate
    NothingToPlay,
}

#[derive(Debug, Clone)]
pub struct PlaybackModeMachine {
    mode: PlaybackMode,
    armed: bool,
}

impl PlaybackModeMachine {
    pub fn new(mode: PlaybackMode) -> Self {
        Self { mode, armed: false }
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    /// Returns whether the mode changed
    pub fn set_mode(&mut self, mode: PlaybackMode) -> bool {
        if self.mode == mode {
            return false;
        }
        info!(from = %self.mode, to = %mode, "Playback mode changed");
        self.mode = mode;
        true
    }

    /// Allow the next end-of-file to trigger a transition
    pub fn arm(&mut self) {
        self.armed = true;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn on_end_of_file(
        &mut self,
        queue: &mut PlayerQueue,
        autoplay: &mut Option<PlayerQueueItem>,
        user_seek_in_flight: bool,
        close_on_eof: bool,
    ) -> EofAction {
        if user_seek_in_flight {
            debug!("End of file during user seek, ignoring");
            return EofAction::Ignored;
        }
        if !self.armed {
            debug!("Duplicate end of file, ignoring");
            return EofAction::Ignored;
        }
        self.armed = false;

        let action = match self.mode {
            PlaybackMode::Queue | PlaybackMode::Shuffle => match queue.pop_next() {
                Some(item) => EofAction::Advance(item),
                None if close_on_eof => EofAction::Close,
                None => EofAction::StayEnded,
            },
            PlaybackMode::LoopOne => EofAction::Restart,
            PlaybackMode::Related => match autoplay.take() {
                Some(item) => EofAction::Autoplay(item),
                None => EofAction::NothingToPlay,
            },
        };
        info!(mode = %self.mode, action = action.name(), "End of file");
        action
    }
}

impl EofAction {
    fn name(&self) -> &'static str {
        match self {
            Self::Ignored => "ignored",
            Self::Advance(_) => "advance",
            Self::Autoplay(_) => "autoplay",
            Self::Restart => "restart",
            Self::Close => "close",
            Self::StayEnded => "stay_ended",
            Self::NothingToPlay => "nothing_to_play",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vireo_core::Video;

    fn create_item(id: &str) -> PlayerQueueItem {
        PlayerQueueItem::new(Video::new(id, "Title", "Author"))
    }

    fn armed(mode: PlaybackMode) -> PlaybackModeMachine {
        let mut machine = PlaybackModeMachine::new(mode);
        machine.arm();
        machine
    }

    #[test]
    fn queue_mode_advances() {
        let mut machine = armed(PlaybackMode::Queue);
        let mut queue = PlayerQueue::new();
        queue.append(create_item("next"));

        let action = machine.on_end_of_file(&mut queue, &mut None, false, false);
        assert!(matches!(action, EofAction::Advance(item) if item.video_id().as_str() == "next"));
        assert!(queue.is_empty());
    }

    #[test]
    fn exhausted_queue_honors_close_policy() {
        let mut machine = armed(PlaybackMode::Shuffle);
        let action = machine.on_end_of_file(&mut PlayerQueue::new(), &mut None, false, true);
        assert_eq!(action, EofAction::Close);

        let mut machine = armed(PlaybackMode::Queue);
        let action = machine.on_end_of_file(&mut PlayerQueue::new(), &mut None, false, false);
        assert_eq!(action, EofAction::StayEnded);
    }

    #[test]
    fn second_eof_is_ignored_until_rearmed() {
        let mut machine = armed(PlaybackMode::LoopOne);
        let mut queue = PlayerQueue::new();

        assert_eq!(machine.on_end_of_file(&mut queue, &mut None, false, false), EofAction::Restart);
        assert_eq!(machine.on_end_of_file(&mut queue, &mut None, false, false), EofAction::Ignored);

        machine.arm();
        assert_eq!(machine.on_end_of_file(&mut queue, &mut None, false, false), EofAction::Restart);
    }

    #[test]
    fn loop_one_leaves_queue_alone() {
        let mut machine = armed(PlaybackMode::LoopOne);
        let mut queue = PlayerQueue::new();
        queue.append(create_item("untouched"));

        machine.on_end_of_file(&mut queue, &mut None, false, false);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn related_mode_uses_candidate_once() {
        let mut machine = armed(PlaybackMode::Related);
        let mut queue = PlayerQueue::new();
        let mut candidate = Some(create_item("related"));

        let action = machine.on_end_of_file(&mut queue, &mut candidate, false, false);
        assert!(matches!(action, EofAction::Autoplay(_)));
        assert!(candidate.is_none());

        machine.arm();
        let action = machine.on_end_of_file(&mut queue, &mut candidate, false, false);
        assert_eq!(action, EofAction::NothingToPlay);
    }

    #[test]
    fn user_seek_suppresses_eof_without_disarming() {
        let mut machine = armed(PlaybackMode::Queue);
        let mut queue = PlayerQueue::new();

        assert_eq!(machine.on_end_of_file(&mut queue, &mut None, true, false), EofAction::Ignored);
        assert!(machine.is_armed());
    }

    #[test]
    fn unarmed_machine_ignores_eof() {
        let mut machine = PlaybackModeMachine::new(PlaybackMode::Queue);
        let mut queue = PlayerQueue::new();
        queue.append(create_item("next"));

        assert_eq!(machine.on_end_of_file(&mut queue, &mut None, false, false), EofAction::Ignored);
        assert_eq!(queue.len(), 1);
    }
}
