//! Property-based tests for stream selection
//!
//! Determinism, ceiling respect and manifest promotion over random
//! candidate sets.

use proptest::prelude::*;
use url::Url;
use vireo_core::{Resolution, Stream, StreamFormat};
use vireo_playback::{annotated_candidates, best_playable};

// ===== Helpers =====

const HEIGHTS: [u32; 7] = [144, 240, 360, 480, 720, 1080, 2160];

const FORMATS: [StreamFormat; 6] = [
    StreamFormat::Stream,
    StreamFormat::Mp4,
    StreamFormat::Avc1,
    StreamFormat::Av1,
    StreamFormat::Webm,
    StreamFormat::Unknown,
];

fn arbitrary_resolution() -> impl Strategy<Value = Resolution> {
    (prop::sample::select(HEIGHTS.to_vec()), prop::sample::select(vec![30u32, 60]))
        .prop_map(|(height, fps)| Resolution::widescreen(height, fps))
}

fn arbitrary_direct(index: usize) -> impl Strategy<Value = Stream> {
    (
        arbitrary_resolution(),
        prop::sample::select(FORMATS.to_vec()),
        proptest::option::of(100_000u64..20_000_000),
        any::<bool>(),
    )
        .prop_map(move |(resolution, format, bitrate, split)| {
            let url = |kind: &str| {
                Url::parse(&format!("https://media.example/{index}/{kind}")).unwrap()
            };
            let stream = if split {
                Stream::split(url("video"), url("audio"), resolution, format)
            } else {
                Stream::progressive(url("file"), resolution, format)
            };
            let stream = stream.with_id(format!("s{index}"));
            match bitrate {
                Some(bitrate) => stream.with_bitrate(bitrate),
                None => stream,
            }
        })
}

fn arbitrary_candidates() -> impl Strategy<Value = Vec<Stream>> {
    (0usize..12, any::<bool>()).prop_flat_map(|(count, manifest)| {
        let direct: Vec<_> = (0..count).map(arbitrary_direct).collect();
        direct.prop_map(move |mut streams| {
            if manifest {
                let url = Url::parse("https://media.example/master.m3u8").unwrap();
                streams.push(Stream::manifest(url).with_id("hls"));
            }
            streams
        })
    })
}

fn arbitrary_formats() -> impl Strategy<Value = Vec<StreamFormat>> {
    Just(FORMATS.to_vec())
        .prop_shuffle()
        .prop_map(|mut formats| {
            formats.insert(0, StreamFormat::Hls);
            formats
        })
}

// ===== Property Tests =====

proptest! {
    /// Property: identical inputs always select the identical stream
    #[test]
    fn selection_is_deterministic(
        streams in arbitrary_candidates(),
        ceiling in arbitrary_resolution(),
        formats in arbitrary_formats(),
    ) {
        let first = best_playable(&streams, ceiling, &formats);
        let second = best_playable(&streams, ceiling, &formats);
        prop_assert_eq!(first, second);
    }

    /// Property: the selected stream never exceeds the ceiling
    #[test]
    fn selection_respects_ceiling(
        streams in arbitrary_candidates(),
        ceiling in arbitrary_resolution(),
        formats in arbitrary_formats(),
    ) {
        if let Some(best) = best_playable(&streams, ceiling, &formats) {
            if let Some(resolution) = best.resolution {
                prop_assert!(
                    resolution.fits_within(&ceiling),
                    "{} exceeds {}",
                    resolution,
                    ceiling
                );
            }
        }
    }

    /// Property: nothing outranks the selection
    #[test]
    fn no_candidate_beats_the_selection(
        streams in arbitrary_candidates(),
        ceiling in arbitrary_resolution(),
        formats in arbitrary_formats(),
    ) {
        let candidates = annotated_candidates(&streams, ceiling);
        let best = best_playable(&streams, ceiling, &formats);
        prop_assert_eq!(best.is_none(), candidates.is_empty());

        if let Some(best) = best {
            for candidate in &candidates {
                prop_assert!(candidate.resolution <= best.resolution);
            }
        }
    }

    /// Property: a manifest takes the best direct resolution within the ceiling
    #[test]
    fn manifest_is_promoted(
        streams in arbitrary_candidates(),
        ceiling in arbitrary_resolution(),
    ) {
        let best_direct = streams
            .iter()
            .filter(|s| !s.is_manifest())
            .filter_map(|s| s.resolution)
            .filter(|r| r.fits_within(&ceiling))
            .max();

        for candidate in annotated_candidates(&streams, ceiling) {
            if candidate.is_manifest() {
                prop_assert_eq!(candidate.resolution, best_direct);
                prop_assert_eq!(candidate.format, StreamFormat::Hls);
            }
        }
    }
}
