/// Skip-segment domain type
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Classification of a community-submitted segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentCategory {
    Sponsor,
    Selfpromo,
    Interaction,
    Intro,
    Outro,
    Preview,
    MusicOfftopic,
    Filler,
}

impl SegmentCategory {
    /// Categories skipped when no preference is configured
    pub const DEFAULT_SKIPPED: [SegmentCategory; 1] = [SegmentCategory::Sponsor];

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sponsor => "sponsor",
            Self::Selfpromo => "selfpromo",
            Self::Interaction => "interaction",
            Self::Intro => "intro",
            Self::Outro => "outro",
            Self::Preview => "preview",
            Self::MusicOfftopic => "music_offtopic",
            Self::Filler => "filler",
        }
    }
}

impl fmt::Display for SegmentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A marked time range within a video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Identifier assigned by the segment service
    pub id: String,

    /// Range start
    #[serde(with = "crate::secs")]
    pub start: Duration,

    /// Range end (exclusive)
    #[serde(with = "crate::secs")]
    pub end: Duration,

    /// What the range contains
    pub category: SegmentCategory,
}

impl Segment {
    /// Create a segment, rejecting empty or inverted ranges
    pub fn new(
        id: impl Into<String>,
        start: Duration,
        end: Duration,
        category: SegmentCategory,
    ) -> Result<Self> {
        if end <= start {
            return Err(CoreError::InvalidSegment { start, end });
        }
        Ok(Self {
            id: id.into(),
            start,
            end,
            category,
        })
    }

    /// Whether `time` lies inside the range
    pub fn contains(&self, time: Duration) -> bool {
        time >= self.start && time < self.end
    }

    /// Length of the range
    pub fn duration(&self) -> Duration {
        self.end.saturating_sub(self.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_inverted_range() {
        let result = Segment::new(
            "s1",
            Duration::from_secs(5),
            Duration::from_secs(5),
            SegmentCategory::Sponsor,
        );
        assert!(matches!(result, Err(CoreError::InvalidSegment { .. })));
    }

    #[test]
    fn contains_is_half_open() {
        let segment = Segment::new(
            "s1",
            Duration::from_secs(1),
            Duration::from_secs(10),
            SegmentCategory::Sponsor,
        )
        .unwrap();

        assert!(!segment.contains(Duration::from_millis(999)));
        assert!(segment.contains(Duration::from_secs(1)));
        assert!(segment.contains(Duration::from_millis(9_999)));
        assert!(!segment.contains(Duration::from_secs(10)));
        assert_eq!(segment.duration(), Duration::from_secs(9));
    }

    #[test]
    fn deserializes_fractional_seconds() {
        let json = r#"{"id":"a","start":1.5,"end":42.25,"category":"music_offtopic"}"#;
        let segment: Segment = serde_json::from_str(json).unwrap();
        assert_eq!(segment.start, Duration::from_millis(1_500));
        assert_eq!(segment.end, Duration::from_millis(42_250));
        assert_eq!(segment.category, SegmentCategory::MusicOfftopic);
    }
}
