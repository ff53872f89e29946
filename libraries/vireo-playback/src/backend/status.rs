//! Backend lifecycle states

use serde::Serialize;
use std::fmt;

/// Lifecycle of one backend instance
///
/// ```text
/// idle -> loading -> ready -> { playing <-> paused } -> ended
/// ```
///
/// `close_item` returns to idle from anywhere. Loading can be re-entered
/// once an item exists (a new stream preempts the current one). A failed
/// load lands in `Error`, which only a fresh load or a close leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendState {
    #[default]
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Ended,
    Error,
}

impl BackendState {
    /// Whether the state machine allows moving from `self` to `next`
    ///
    /// Staying in the same state is always allowed.
    pub fn can_transition_to(self, next: BackendState) -> bool {
        use BackendState::{Ended, Error, Idle, Loading, Paused, Playing, Ready};

        if self == next {
            return true;
        }

        matches!(
            (self, next),
            (_, Idle | Loading)
                | (Loading, Ready)
                | (Ready | Paused | Ended, Playing)
                | (Ready | Playing | Ended, Paused)
                | (Playing | Paused, Ended)
                | (Loading | Ready | Playing | Paused, Error)
        )
    }

    /// An item is attached to the renderer
    pub fn has_item(self) -> bool {
        matches!(self, Self::Ready | Self::Playing | Self::Paused | Self::Ended)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Ended => "ended",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for BackendState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
