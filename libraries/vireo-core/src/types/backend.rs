/// Playback backend selection
use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which playback engine a quality profile binds to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// The operating system's media framework
    #[default]
    Platform,

    /// The embedded playback library
    Library,
}

impl BackendKind {
    /// All backends, in preference order
    pub const ALL: [BackendKind; 2] = [BackendKind::Platform, BackendKind::Library];

    /// Get human-readable name of backend
    pub fn name(&self) -> &'static str {
        match self {
            Self::Platform => "Platform",
            Self::Library => "Library",
        }
    }

    /// Get detailed description of backend
    pub fn description(&self) -> &'static str {
        match self {
            Self::Platform => "System media framework (HLS, Picture-in-Picture, hardware decode)",
            Self::Library => {
                "Embedded playback library (every container, native split audio/video)"
            }
        }
    }

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Platform => "platform",
            Self::Library => "library",
        }
    }

    /// The other backend
    pub fn other(&self) -> Self {
        match self {
            Self::Platform => Self::Library,
            Self::Library => Self::Platform,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "platform" => Ok(Self::Platform),
            "library" => Ok(Self::Library),
            _ => Err(CoreError::UnknownBackend(s.to_string())),
        }
    }
}
