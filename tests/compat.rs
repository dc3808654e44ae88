//! Compatibility check tests.
//!
//! These tests build metadata by hand, so they run without fixtures or
//! FFmpeg.

use std::path::Path;
use std::time::Duration;

use audiograft::{
    AudioTrack, CompatReport, Language, MediaInfo, VideoInfo,
    compat::{check_compatibility, donor_track_duration, duration_delta},
    select::select_tracks,
};

fn audio_track(track_index: usize, language: &str, duration: Option<Duration>) -> AudioTrack {
    AudioTrack {
        track_index,
        stream_index: track_index + 1,
        codec: "ac3".to_string(),
        channels: 6,
        sample_rate: 48_000,
        bit_rate: 384_000,
        language: Some(language.to_string()),
        title: None,
        default: false,
        forced: false,
        duration,
    }
}

fn media_info(
    video: Option<VideoInfo>,
    duration: Duration,
    audio: Vec<AudioTrack>,
) -> MediaInfo {
    MediaInfo {
        video,
        audio_tracks: audio,
        subtitle_tracks: vec![],
        duration,
        format: "matroska,webm".to_string(),
    }
}

fn video_info() -> VideoInfo {
    VideoInfo {
        width: 1920,
        height: 1080,
        frames_per_second: 23.976,
        codec: "h264".to_string(),
    }
}

fn select_french(donor: &MediaInfo) -> audiograft::TrackSelection {
    let french = Language::resolve("fre").unwrap();
    select_tracks(donor, &french, false, Path::new("donor.mkv")).unwrap()
}

#[test]
fn matching_durations_pass_clean() {
    let target = media_info(Some(video_info()), Duration::from_secs(600), vec![]);
    let donor = media_info(
        None,
        Duration::from_secs(600),
        vec![audio_track(0, "fre", Some(Duration::from_secs(600)))],
    );
    let selection = select_french(&donor);

    let report = check_compatibility(&target, &donor, &selection, Duration::from_millis(500));
    assert!(report.is_valid());
    assert!(!report.has_duration_mismatch());
    assert!(report.warnings.is_empty(), "warnings: {:?}", report.warnings);
}

#[test]
fn duration_mismatch_is_a_warning() {
    let target = media_info(Some(video_info()), Duration::from_secs(600), vec![]);
    let donor = media_info(
        None,
        Duration::from_secs(590),
        vec![audio_track(0, "fre", Some(Duration::from_secs(590)))],
    );
    let selection = select_french(&donor);

    let report = check_compatibility(&target, &donor, &selection, Duration::from_millis(500));
    // A mismatch warns but does not invalidate the report.
    assert!(report.is_valid());
    assert!(report.has_duration_mismatch());
}

#[test]
fn mismatch_within_tolerance_is_silent() {
    let target = media_info(Some(video_info()), Duration::from_secs(600), vec![]);
    let donor = media_info(
        None,
        Duration::from_millis(600_300),
        vec![audio_track(0, "fre", Some(Duration::from_millis(600_300)))],
    );
    let selection = select_french(&donor);

    let report = check_compatibility(&target, &donor, &selection, Duration::from_millis(500));
    assert!(!report.has_duration_mismatch());
}

#[test]
fn zero_sample_rate_is_an_error() {
    let mut track = audio_track(0, "fre", None);
    track.sample_rate = 0;
    let target = media_info(Some(video_info()), Duration::from_secs(600), vec![]);
    let donor = media_info(None, Duration::from_secs(600), vec![track]);
    let selection = select_french(&donor);

    let report = check_compatibility(&target, &donor, &selection, Duration::from_millis(500));
    assert!(!report.is_valid());
}

#[test]
fn missing_target_video_warns() {
    let target = media_info(None, Duration::from_secs(600), vec![]);
    let donor = media_info(
        None,
        Duration::from_secs(600),
        vec![audio_track(0, "fre", None)],
    );
    let selection = select_french(&donor);

    let report = check_compatibility(&target, &donor, &selection, Duration::from_millis(500));
    assert!(report.is_valid());
    assert!(
        report.warnings.iter().any(|w| w.contains("no video")),
        "warnings: {:?}",
        report.warnings,
    );
}

#[test]
fn track_duration_falls_back_to_container() {
    let donor = media_info(
        None,
        Duration::from_secs(42),
        vec![audio_track(0, "fre", None)],
    );
    let selection = select_french(&donor);
    assert_eq!(
        donor_track_duration(&donor, &selection),
        Duration::from_secs(42),
    );

    let donor_with_stream_duration = media_info(
        None,
        Duration::from_secs(42),
        vec![audio_track(0, "fre", Some(Duration::from_secs(41)))],
    );
    let selection = select_french(&donor_with_stream_duration);
    assert_eq!(
        donor_track_duration(&donor_with_stream_duration, &selection),
        Duration::from_secs(41),
    );
}

#[test]
fn delta_is_symmetric() {
    let a = Duration::from_secs(10);
    let b = Duration::from_secs(12);
    assert_eq!(duration_delta(a, b), Duration::from_secs(2));
    assert_eq!(duration_delta(b, a), Duration::from_secs(2));
}

#[test]
fn report_display_and_counts() {
    let report = CompatReport {
        info: vec!["some info".to_string()],
        warnings: vec!["some warning".to_string()],
        errors: vec![],
    };
    assert!(report.is_valid());
    assert_eq!(report.issue_count(), 2);

    let display = format!("{report}");
    assert!(display.contains("[INFO]"));
    assert!(display.contains("[WARN]"));

    let bad_report = CompatReport {
        info: vec![],
        warnings: vec![],
        errors: vec!["fatal problem".to_string()],
    };
    assert!(!bad_report.is_valid());
    assert!(format!("{bad_report}").contains("[ERROR]"));

    let empty = CompatReport::default();
    assert!(format!("{empty}").contains("No issues found"));
}
