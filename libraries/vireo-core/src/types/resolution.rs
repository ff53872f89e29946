/// Video resolution with a total ordering
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Frame rate assumed when a label carries none (`"720p"`)
const DEFAULT_FPS: u32 = 30;

/// Video resolution: frame size plus frame rate
///
/// Ordered by height first, then frame rate, then width, so that
/// `1080p60 > 1080p30 > 720p60`. The ordering is total, which lets a
/// resolution act as a ceiling (`resolution <= max`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Resolution {
    /// Frame width in pixels
    pub width: u32,

    /// Frame height in pixels
    pub height: u32,

    /// Frames per second
    pub fps: u32,
}

impl Resolution {
    pub const P144: Self = Self::widescreen(144, 30);
    pub const P240: Self = Self::widescreen(240, 30);
    pub const SD_360P: Self = Self::widescreen(360, 30);
    pub const SD_480P: Self = Self::widescreen(480, 30);
    pub const HD_720P: Self = Self::widescreen(720, 30);
    pub const HD_720P60: Self = Self::widescreen(720, 60);
    pub const FHD_1080P: Self = Self::widescreen(1080, 30);
    pub const FHD_1080P60: Self = Self::widescreen(1080, 60);
    pub const QHD_1440P: Self = Self::widescreen(1440, 30);
    pub const QHD_1440P60: Self = Self::widescreen(1440, 60);
    pub const UHD_2160P: Self = Self::widescreen(2160, 30);
    pub const UHD_2160P60: Self = Self::widescreen(2160, 60);
    pub const UHD_4320P60: Self = Self::widescreen(4320, 60);

    /// Highest representable resolution; a ceiling that admits everything
    pub const MAX: Self = Self {
        width: u32::MAX,
        height: u32::MAX,
        fps: u32::MAX,
    };

    /// Create a resolution from explicit dimensions
    pub const fn new(width: u32, height: u32, fps: u32) -> Self {
        Self { width, height, fps }
    }

    /// Create a 16:9 resolution from its height
    pub const fn widescreen(height: u32, fps: u32) -> Self {
        Self {
            width: (height * 16 + 8) / 9,
            height,
            fps,
        }
    }

    /// Short label such as `1080p60` (frame rate omitted at 30 fps)
    pub fn label(&self) -> String {
        if self.fps == DEFAULT_FPS {
            format!("{}p", self.height)
        } else {
            format!("{}p{}", self.height, self.fps)
        }
    }

    /// Whether this resolution fits under `ceiling`
    pub fn fits_within(&self, ceiling: &Resolution) -> bool {
        self <= ceiling
    }
}

impl Ord for Resolution {
    fn cmp(&self, other: &Self) -> Ordering {
        self.height
            .cmp(&other.height)
            .then(self.fps.cmp(&other.fps))
            .then(self.width.cmp(&other.width))
    }
}

impl PartialOrd for Resolution {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::MAX {
            return write!(f, "max");
        }
        write!(f, "{}", self.label())
    }
}

impl FromStr for Resolution {
    type Err = CoreError;

    /// Parse `"1080p60"`, `"720p"` or `"max"`
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().to_ascii_lowercase();
        if trimmed == "max" {
            return Ok(Self::MAX);
        }

        let (height, fps) = trimmed
            .split_once('p')
            .ok_or_else(|| CoreError::InvalidResolution(s.to_string()))?;

        let height: u32 = height
            .parse()
            .map_err(|_| CoreError::InvalidResolution(s.to_string()))?;

        let fps = if fps.is_empty() {
            DEFAULT_FPS
        } else {
            fps.parse()
                .map_err(|_| CoreError::InvalidResolution(s.to_string()))?
        };

        if height == 0 || fps == 0 {
            return Err(CoreError::InvalidResolution(s.to_string()));
        }

        Ok(Self::widescreen(height, fps))
    }
}

impl TryFrom<String> for Resolution {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Resolution> for String {
    fn from(value: Resolution) -> Self {
        value.to_string()
    }
}
