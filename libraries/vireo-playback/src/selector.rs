//! Stream Selector
//!
//! Picks the best playable candidate for a resolution ceiling and a format
//! preference order. Pure and deterministic: the same inputs always yield
//! the same stream.
//!
//! Manifest streams adapt internally and usually carry no fixed resolution.
//! For ranking they are treated as "as good as the best direct stream":
//! they take the highest resolution and bitrate found among non-manifest
//! candidates within the ceiling, and the `Hls` format tag.

use std::cmp::Reverse;
use vireo_core::{Resolution, Stream, StreamFormat};

/// Candidates after manifest annotation, restricted to the ceiling
///
/// A stream whose resolution is still unknown is kept; it ranks below every
/// known resolution.
pub fn annotated_candidates(streams: &[Stream], max_resolution: Resolution) -> Vec<Stream> {
    let within = |stream: &Stream| {
        stream
            .resolution
            .map_or(true, |r| r.fits_within(&max_resolution))
    };

    let (manifests, direct): (Vec<&Stream>, Vec<&Stream>) =
        streams.iter().partition(|stream| stream.is_manifest());

    let direct_within: Vec<&Stream> = direct.iter().copied().filter(|s| within(*s)).collect();

    let best_by_resolution = direct_within
        .iter()
        .filter(|s| s.resolution.is_some())
        .max_by_key(|s| s.resolution);
    let best_resolution = best_by_resolution.and_then(|s| s.resolution);
    let best_bitrate = direct_within
        .iter()
        .filter_map(|s| s.bitrate)
        .max()
        .or_else(|| best_by_resolution.and_then(|s| s.bitrate));

    let annotated = manifests.into_iter().map(|manifest| Stream {
        resolution: best_resolution,
        bitrate: best_bitrate,
        format: StreamFormat::Hls,
        ..manifest.clone()
    });

    direct
        .into_iter()
        .cloned()
        .chain(annotated)
        .filter(|s| within(s))
        .collect()
}

/// Best candidate: highest resolution, ties broken by format preference
///
/// Formats missing from `formats` rank after every listed one. Returns
/// `None` for an empty candidate list or when nothing fits the ceiling.
pub fn best_playable(
    streams: &[Stream],
    max_resolution: Resolution,
    formats: &[StreamFormat],
) -> Option<Stream> {
    annotated_candidates(streams, max_resolution)
        .into_iter()
        .rev()
        .max_by_key(|s| (s.resolution, Reverse(format_rank(formats, s.format))))
}

fn format_rank(formats: &[StreamFormat], format: StreamFormat) -> usize {
    formats
        .iter()
        .position(|f| *f == format)
        .unwrap_or(formats.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn url(path: &str) -> Url {
        Url::parse(&format!("https://media.example/{path}")).unwrap()
    }

    fn progressive(id: &str, resolution: Resolution, format: StreamFormat) -> Stream {
        Stream::progressive(url(id), resolution, format).with_id(id)
    }

    fn prefs() -> Vec<StreamFormat> {
        vec![StreamFormat::Hls, StreamFormat::Mp4, StreamFormat::Webm]
    }

    #[test]
    fn empty_candidates_select_nothing() {
        assert!(best_playable(&[], Resolution::MAX, &prefs()).is_none());
    }

    #[test]
    fn everything_above_ceiling_selects_nothing() {
        let streams = vec![
            progressive("a", Resolution::FHD_1080P, StreamFormat::Mp4),
            progressive("b", Resolution::UHD_2160P, StreamFormat::Mp4),
        ];
        assert!(best_playable(&streams, Resolution::HD_720P, &prefs()).is_none());
    }

    #[test]
    fn highest_resolution_within_ceiling_wins() {
        let streams = vec![
            progressive("480", Resolution::SD_480P, StreamFormat::Mp4),
            progressive("1080", Resolution::FHD_1080P, StreamFormat::Mp4),
            progressive("2160", Resolution::UHD_2160P, StreamFormat::Mp4),
        ];
        let best = best_playable(&streams, Resolution::FHD_1080P60, &prefs()).unwrap();
        assert_eq!(best.id.as_str(), "1080");
    }

    #[test]
    fn format_preference_breaks_ties() {
        let streams = vec![
            progressive("webm", Resolution::FHD_1080P, StreamFormat::Webm),
            progressive("mp4", Resolution::FHD_1080P, StreamFormat::Mp4),
            progressive("odd", Resolution::FHD_1080P, StreamFormat::Unknown),
        ];
        let best = best_playable(&streams, Resolution::MAX, &prefs()).unwrap();
        assert_eq!(best.id.as_str(), "mp4");

        let reversed = vec![StreamFormat::Webm, StreamFormat::Mp4];
        let best = best_playable(&streams, Resolution::MAX, &reversed).unwrap();
        assert_eq!(best.id.as_str(), "webm");
    }

    #[test]
    fn unknown_format_ranks_lowest() {
        let streams = vec![
            progressive("odd", Resolution::HD_720P, StreamFormat::Unknown),
            progressive("av1", Resolution::HD_720P, StreamFormat::Av1),
        ];
        let best = best_playable(&streams, Resolution::MAX, &[StreamFormat::Av1]).unwrap();
        assert_eq!(best.id.as_str(), "av1");
    }

    #[test]
    fn manifest_is_promoted_to_best_direct_resolution() {
        let streams = vec![
            Stream::manifest(url("master.m3u8")).with_id("hls"),
            progressive("720", Resolution::HD_720P, StreamFormat::Mp4).with_bitrate(2_000_000),
            progressive("1080", Resolution::FHD_1080P, StreamFormat::Mp4).with_bitrate(4_000_000),
            progressive("2160", Resolution::UHD_2160P, StreamFormat::Mp4).with_bitrate(9_000_000),
        ];

        let best = best_playable(&streams, Resolution::FHD_1080P, &prefs()).unwrap();
        assert_eq!(best.id.as_str(), "hls");
        assert_eq!(best.resolution, Some(Resolution::FHD_1080P));
        assert_eq!(best.bitrate, Some(4_000_000));
        assert_eq!(best.format, StreamFormat::Hls);
    }

    #[test]
    fn manifest_loses_when_hls_is_not_preferred() {
        let streams = vec![
            Stream::manifest(url("master.m3u8")).with_id("hls"),
            progressive("1080", Resolution::FHD_1080P, StreamFormat::Mp4),
        ];
        let best = best_playable(&streams, Resolution::MAX, &[StreamFormat::Mp4]).unwrap();
        assert_eq!(best.id.as_str(), "1080");
    }

    #[test]
    fn manifest_bitrate_stays_unknown_without_direct_bitrates() {
        let streams = vec![
            Stream::manifest(url("master.m3u8")).with_id("hls"),
            progressive("720", Resolution::HD_720P, StreamFormat::Mp4),
        ];
        let annotated = annotated_candidates(&streams, Resolution::MAX);
        let manifest = annotated.iter().find(|s| s.is_manifest()).unwrap();
        assert_eq!(manifest.resolution, Some(Resolution::HD_720P));
        assert_eq!(manifest.bitrate, None);
    }

    #[test]
    fn lone_manifest_is_playable() {
        let streams = vec![Stream::manifest(url("master.m3u8")).with_id("hls")];
        let best = best_playable(&streams, Resolution::SD_360P, &prefs()).unwrap();
        assert_eq!(best.id.as_str(), "hls");
        assert_eq!(best.resolution, None);
    }

    #[test]
    fn split_streams_compete_with_progressive() {
        let streams = vec![
            progressive("720", Resolution::HD_720P60, StreamFormat::Mp4),
            Stream::split(url("v"), url("a"), Resolution::FHD_1080P60, StreamFormat::Webm)
                .with_id("split"),
        ];
        let best = best_playable(&streams, Resolution::MAX, &prefs()).unwrap();
        assert_eq!(best.id.as_str(), "split");
    }
}
