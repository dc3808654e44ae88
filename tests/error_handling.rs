//! Error handling integration tests.
//!
//! These tests verify that meaningful errors are returned for various
//! failure conditions.

use audiograft::{GraftError, Grafter, Language, MediaSource, TrackMuxer};

#[test]
fn open_nonexistent_file() {
    let result = MediaSource::open("this_file_does_not_exist.mkv");
    assert!(result.is_err());

    let error_message = result.unwrap_err().to_string();
    assert!(
        error_message.contains("Failed to open media file"),
        "Error message should mention file open failure: {error_message}",
    );
}

#[test]
fn open_invalid_file() {
    // Create a temporary file with garbage content.
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let invalid_file_path = temporary_directory.path().join("invalid.mkv");
    std::fs::write(&invalid_file_path, b"this is not a media file")
        .expect("Failed to write invalid file");

    let result = MediaSource::open(&invalid_file_path);
    assert!(result.is_err(), "Expected error for invalid media file");
}

#[test]
fn grafter_requires_existing_inputs() {
    let language = Language::resolve("eng").unwrap();

    let result = Grafter::new("missing_video.mkv", "missing_dub.mkv", language);
    assert!(matches!(result, Err(GraftError::FileOpen { .. })));
}

#[test]
fn grafter_rejects_in_place_output() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let video_path = temporary_directory.path().join("video.mkv");
    let donor_path = temporary_directory.path().join("donor.mkv");
    std::fs::write(&video_path, b"x").expect("Failed to write");
    std::fs::write(&donor_path, b"x").expect("Failed to write");

    let language = Language::resolve("eng").unwrap();
    let grafter = Grafter::new(&video_path, &donor_path, language)
        .expect("Inputs exist, construction should succeed")
        .with_output(&video_path);

    let result = grafter.run();
    assert!(
        matches!(result, Err(GraftError::OutputCollision { .. })),
        "expected OutputCollision, got {result:?}",
    );
}

#[test]
fn default_output_path_next_to_video() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let video_path = temporary_directory.path().join("movie.mkv");
    let donor_path = temporary_directory.path().join("dub.mkv");
    std::fs::write(&video_path, b"x").expect("Failed to write");
    std::fs::write(&donor_path, b"x").expect("Failed to write");

    let language = Language::resolve("eng").unwrap();
    let grafter = Grafter::new(&video_path, &donor_path, language)
        .expect("Inputs exist, construction should succeed");

    assert_eq!(
        grafter.output_path(),
        temporary_directory.path().join("movie-out.mkv"),
    );
}

#[test]
fn muxer_requires_existing_inputs() {
    let language = Language::resolve("eng").unwrap();
    let result = TrackMuxer::new("missing.mkv", "missing.mka", "out.mkv", language);
    assert!(matches!(result, Err(GraftError::FileOpen { .. })));
}

#[test]
fn muxer_rejects_output_collision() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let target_path = temporary_directory.path().join("target.mkv");
    let staged_path = temporary_directory.path().join("staged.mka");
    std::fs::write(&target_path, b"x").expect("Failed to write");
    std::fs::write(&staged_path, b"x").expect("Failed to write");

    let language = Language::resolve("eng").unwrap();
    let result = TrackMuxer::new(&target_path, &staged_path, &target_path, language);
    assert!(matches!(result, Err(GraftError::OutputCollision { .. })));
}

#[test]
fn error_messages_name_the_language() {
    let error = GraftError::NoMatchingTrack {
        language: "fre".to_string(),
        available: "eng, jpn".to_string(),
    };
    let message = error.to_string();
    assert!(message.contains("fre"));
    assert!(message.contains("eng, jpn"));
}

#[test]
fn unknown_language_message() {
    let error = GraftError::UnknownLanguage("klingon".to_string());
    assert!(error.to_string().contains("klingon"));
}
