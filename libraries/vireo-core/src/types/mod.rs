//! Domain types for Vireo

mod backend;
mod ids;
mod mode;
mod quality;
mod queue_item;
mod resolution;
mod segment;
mod stream;
mod video;

pub use backend::BackendKind;
pub use ids::{QueueItemId, StreamId, VideoId};
pub use mode::PlaybackMode;
pub use quality::{select_profile, DeviceConditions, NetworkKind, ProfileCondition, QualityProfile};
pub use queue_item::PlayerQueueItem;
pub use resolution::Resolution;
pub use segment::{Segment, SegmentCategory};
pub use stream::{Stream, StreamAssets, StreamFormat, StreamKind};
pub use video::{RelatedVideo, Video};
