//! Asset metadata loading
//!
//! Resolving a locator (fetching headers, parsing a manifest, probing a
//! container) is the only long-latency step in starting playback. It is
//! delegated to an [`AssetLoader`] so each platform can plug in its own
//! network and demux stack.

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

/// What a locator is expected to contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// Muxed audio and video in one file
    Progressive,
    /// Adaptive streaming manifest
    Manifest,
    /// Video-only elementary stream
    Video,
    /// Audio-only elementary stream
    Audio,
}

/// A resolved asset, ready to hand to a renderer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedAsset {
    pub url: Url,
    pub kind: AssetKind,
    /// Duration reported by the container, if any
    pub duration: Option<Duration>,
}

/// Loads asset metadata for one locator
///
/// Implementations must be cancel-safe: the engine drops the future when
/// the selection it belongs to is superseded.
#[async_trait]
pub trait AssetLoader: Send + Sync {
    async fn load(&self, url: &Url, kind: AssetKind) -> Result<LoadedAsset>;
}
