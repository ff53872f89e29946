/// Playback mode: what happens when the current item finishes
use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// End-of-file policy
///
/// A single authoritative value, changed only by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackMode {
    /// Advance to the next queued item
    #[default]
    Queue,

    /// Advance through a shuffled queue
    Shuffle,

    /// Restart the current item
    LoopOne,

    /// Play the precomputed autoplay candidate
    Related,
}

impl PlaybackMode {
    /// All modes in UI cycling order
    pub const ALL: [PlaybackMode; 4] = [
        PlaybackMode::Queue,
        PlaybackMode::Shuffle,
        PlaybackMode::LoopOne,
        PlaybackMode::Related,
    ];

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queue => "queue",
            Self::Shuffle => "shuffle",
            Self::LoopOne => "loop_one",
            Self::Related => "related",
        }
    }

    /// Next mode in cycling order (for a single mode button)
    pub fn next(&self) -> Self {
        match self {
            Self::Queue => Self::Shuffle,
            Self::Shuffle => Self::LoopOne,
            Self::LoopOne => Self::Related,
            Self::Related => Self::Queue,
        }
    }

    /// Whether end-of-file consumes the upstream queue
    pub fn consumes_queue(&self) -> bool {
        matches!(self, Self::Queue | Self::Shuffle)
    }
}

impl fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PlaybackMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queue" => Ok(Self::Queue),
            "shuffle" => Ok(Self::Shuffle),
            "loop_one" | "loopOne" | "loop-one" => Ok(Self::LoopOne),
            "related" => Ok(Self::Related),
            _ => Err(CoreError::UnknownPlaybackMode(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trip() {
        for mode in PlaybackMode::ALL {
            assert_eq!(mode.as_str().parse::<PlaybackMode>().unwrap(), mode);
        }
        assert_eq!("loopOne".parse::<PlaybackMode>().unwrap(), PlaybackMode::LoopOne);
        assert!("repeat".parse::<PlaybackMode>().is_err());
    }

    #[test]
    fn cycling_visits_every_mode() {
        let mut mode = PlaybackMode::default();
        for _ in 0..PlaybackMode::ALL.len() {
            mode = mode.next();
        }
        assert_eq!(mode, PlaybackMode::Queue);
    }

    #[test]
    fn only_queue_modes_consume_queue() {
        assert!(PlaybackMode::Queue.consumes_queue());
        assert!(PlaybackMode::Shuffle.consumes_queue());
        assert!(!PlaybackMode::LoopOne.consumes_queue());
        assert!(!PlaybackMode::Related.consumes_queue());
    }
}
