use std::path::Path;
use std::time::Duration;

use audiograft::{AudioTrack, Language, MediaInfo, select::select_tracks};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

fn synthetic_info(track_count: usize) -> MediaInfo {
    let tags = ["eng", "jpn", "ger", "spa", "und", "fra", "fre"];
    let audio_tracks = (0..track_count)
        .map(|index| AudioTrack {
            track_index: index,
            stream_index: index + 1,
            codec: "aac".to_string(),
            channels: 2,
            sample_rate: 48_000,
            bit_rate: 128_000,
            language: Some(tags[index % tags.len()].to_string()),
            title: None,
            default: index == 0,
            forced: false,
            duration: Some(Duration::from_secs(3600)),
        })
        .collect();

    MediaInfo {
        video: None,
        audio_tracks,
        subtitle_tracks: vec![],
        duration: Duration::from_secs(3600),
        format: "matroska,webm".to_string(),
    }
}

fn bench_resolve(c: &mut Criterion) {
    c.bench_function("language_resolve_code", |b| {
        b.iter(|| Language::resolve(black_box("fre")))
    });
    c.bench_function("language_resolve_name", |b| {
        b.iter(|| Language::resolve(black_box("Vietnamese")))
    });
}

fn bench_select(c: &mut Criterion) {
    let french = Language::resolve("fre").unwrap();
    let donor = Path::new("donor.mkv");

    let small = synthetic_info(4);
    c.bench_function("select_tracks_4", |b| {
        b.iter(|| select_tracks(black_box(&small), &french, false, donor))
    });

    let large = synthetic_info(64);
    c.bench_function("select_tracks_64", |b| {
        b.iter(|| select_tracks(black_box(&large), &french, false, donor))
    });
}

criterion_group!(benches, bench_resolve, bench_select);
criterion_main!(benches);
