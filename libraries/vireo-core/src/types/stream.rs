/// Stream candidate domain types
use crate::error::{CoreError, Result};
use crate::types::{Resolution, StreamId};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// How a stream is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    /// One muxed file fetched directly
    Progressive,

    /// An adaptive manifest (HLS-like) the backend resolves itself
    Manifest,

    /// Separate audio and video elementary assets
    SplitAdaptive,
}

impl StreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Progressive => "progressive",
            Self::Manifest => "manifest",
            Self::SplitAdaptive => "split_adaptive",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Container/codec tag used for format preference ranking
///
/// `Hls` is reserved for manifest-based candidates; the selector assigns it
/// to every manifest stream it ranks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamFormat {
    Hls,
    /// Generic muxed stream with no specific container
    Stream,
    Mp4,
    Avc1,
    Av1,
    Webm,
    #[serde(other)]
    Unknown,
}

impl StreamFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hls => "hls",
            Self::Stream => "stream",
            Self::Mp4 => "mp4",
            Self::Avc1 => "avc1",
            Self::Av1 => "av1",
            Self::Webm => "webm",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Asset locators backing a stream
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamAssets {
    /// One locator (progressive file or manifest)
    Single { url: Url },

    /// Independent audio and video elementary assets
    Split { video: Url, audio: Url },
}

impl StreamAssets {
    /// Every locator, video first
    pub fn urls(&self) -> Vec<&Url> {
        match self {
            Self::Single { url } => vec![url],
            Self::Split { video, audio } => vec![video, audio],
        }
    }
}

/// A playable candidate for a video
///
/// Immutable once built. Manifest streams usually carry no resolution or
/// bitrate; the selector fills those in when ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stream {
    /// Stable identity, compared by the coordinator to detect superseded loads
    #[serde(default = "StreamId::generate")]
    pub id: StreamId,

    /// Delivery kind
    pub kind: StreamKind,

    /// Frame size and rate (unknown for most manifests)
    #[serde(default)]
    pub resolution: Option<Resolution>,

    /// Bits per second
    #[serde(default)]
    pub bitrate: Option<u64>,

    /// Format tag
    pub format: StreamFormat,

    /// Underlying locators
    pub assets: StreamAssets,
}

impl Stream {
    /// Single muxed file
    pub fn progressive(url: Url, resolution: Resolution, format: StreamFormat) -> Self {
        Self {
            id: StreamId::generate(),
            kind: StreamKind::Progressive,
            resolution: Some(resolution),
            bitrate: None,
            format,
            assets: StreamAssets::Single { url },
        }
    }

    /// Adaptive manifest with unknown fixed resolution
    pub fn manifest(url: Url) -> Self {
        Self {
            id: StreamId::generate(),
            kind: StreamKind::Manifest,
            resolution: None,
            bitrate: None,
            format: StreamFormat::Hls,
            assets: StreamAssets::Single { url },
        }
    }

    /// Separate audio and video assets
    pub fn split(video: Url, audio: Url, resolution: Resolution, format: StreamFormat) -> Self {
        Self {
            id: StreamId::generate(),
            kind: StreamKind::SplitAdaptive,
            resolution: Some(resolution),
            bitrate: None,
            format,
            assets: StreamAssets::Split { video, audio },
        }
    }

    /// Set bitrate
    pub fn with_bitrate(mut self, bitrate: u64) -> Self {
        self.bitrate = Some(bitrate);
        self
    }

    /// Replace the generated id (fixtures and deserialized records)
    pub fn with_id(mut self, id: impl Into<StreamId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn is_manifest(&self) -> bool {
        self.kind == StreamKind::Manifest
    }

    pub fn is_split(&self) -> bool {
        self.kind == StreamKind::SplitAdaptive
    }

    /// Check that kind and assets agree
    pub fn validate(&self) -> Result<()> {
        let split_assets = matches!(self.assets, StreamAssets::Split { .. });
        if split_assets == self.is_split() {
            Ok(())
        } else {
            Err(CoreError::MismatchedAssets {
                kind: self.kind.to_string(),
            })
        }
    }

    /// Diagnostic description, e.g. `split_adaptive 1080p60 webm 2500kbps`
    pub fn description(&self) -> String {
        let resolution = self
            .resolution
            .map_or_else(|| "auto".to_string(), |r| r.to_string());
        let mut description = format!("{} {} {}", self.kind, resolution, self.format);
        if let Some(bitrate) = self.bitrate {
            description.push_str(&format!(" {}kbps", bitrate / 1000));
        }
        description
    }
}
