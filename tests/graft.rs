//! End-to-end graft tests.
//!
//! Tests require fixture files from `tests/fixtures/generate_fixtures.sh`.

use std::path::Path;

use audiograft::{
    GraftOptions, GraftOutcome, Grafter, Language, MediaSource,
};

fn movie_path() -> &'static str {
    "tests/fixtures/sample_movie.mkv"
}

fn dub_path() -> &'static str {
    "tests/fixtures/sample_dub.mkv"
}

fn fixtures_present() -> bool {
    Path::new(movie_path()).exists() && Path::new(dub_path()).exists()
}

#[test]
fn graft_adds_french_track() {
    if !fixtures_present() {
        return;
    }

    let output_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let output_path = output_directory.path().join("movie-out.mkv");

    let french = Language::resolve("fre").unwrap();
    let outcome = Grafter::new(movie_path(), dub_path(), french)
        .expect("Failed to create grafter")
        .with_output(&output_path)
        .run()
        .expect("Graft should succeed");

    let report = match outcome {
        GraftOutcome::Grafted(report) => report,
        GraftOutcome::AlreadyPresent { .. } => panic!("fixture movie should not have French"),
    };
    assert_eq!(report.output, output_path);
    assert!(output_path.exists());
    assert!(!report.fallback_used);

    // The output now carries the original audio plus the grafted track.
    let movie = MediaSource::open(movie_path()).expect("Failed to open fixture");
    let result = MediaSource::open(&output_path).expect("Failed to open output");
    assert_eq!(
        result.info().audio_tracks.len(),
        movie.info().audio_tracks.len() + 1,
    );
    assert!(result.audio_language_present(&french));

    // The grafted track is the only default audio track.
    let defaults: Vec<_> = result
        .info()
        .audio_tracks
        .iter()
        .filter(|track| track.default)
        .collect();
    assert_eq!(defaults.len(), 1, "exactly one default audio track expected");
    assert!(defaults[0].matches_language(&french));

    // Video survived the mux untouched.
    assert!(result.info().video.is_some());
}

#[test]
fn second_graft_is_skipped_without_force() {
    if !fixtures_present() {
        return;
    }

    let output_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let output_path = output_directory.path().join("movie-out.mkv");
    let french = Language::resolve("fre").unwrap();

    Grafter::new(movie_path(), dub_path(), french)
        .expect("Failed to create grafter")
        .with_output(&output_path)
        .run()
        .expect("First graft should succeed");

    // Grafting the same language into the result is a no-op...
    let second_output = output_directory.path().join("movie-out-2.mkv");
    let outcome = Grafter::new(&output_path, dub_path(), french)
        .expect("Failed to create grafter")
        .with_output(&second_output)
        .run()
        .expect("Presence check should not fail");
    assert!(matches!(outcome, GraftOutcome::AlreadyPresent { .. }));
    assert!(!second_output.exists());

    // ...unless forced.
    let outcome = Grafter::new(&output_path, dub_path(), french)
        .expect("Failed to create grafter")
        .with_output(&second_output)
        .with_options(GraftOptions::new().with_force(true))
        .run()
        .expect("Forced graft should succeed");
    assert!(matches!(outcome, GraftOutcome::Grafted(_)));
    assert!(second_output.exists());
}

#[test]
fn undetermined_fallback_retags_the_track() {
    if !fixtures_present() {
        return;
    }

    let output_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let output_path = output_directory.path().join("movie-ger.mkv");

    // The dub fixture has no German track; its und-tagged track is used.
    let german = Language::resolve("ger").unwrap();
    let outcome = Grafter::new(movie_path(), dub_path(), german)
        .expect("Failed to create grafter")
        .with_output(&output_path)
        .with_options(GraftOptions::new().with_assume_undefined(true))
        .run()
        .expect("Fallback graft should succeed");

    let report = match outcome {
        GraftOutcome::Grafted(report) => report,
        GraftOutcome::AlreadyPresent { .. } => panic!("fixture movie should not have German"),
    };
    assert!(report.fallback_used);

    let result = MediaSource::open(&output_path).expect("Failed to open output");
    assert!(
        result.audio_language_present(&german),
        "fallback track should carry the requested tag",
    );
}

#[test]
fn graft_first_reorders_audio() {
    if !fixtures_present() {
        return;
    }

    let output_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let output_path = output_directory.path().join("movie-out.mkv");
    let french = Language::resolve("fre").unwrap();

    Grafter::new(movie_path(), dub_path(), french)
        .expect("Failed to create grafter")
        .with_output(&output_path)
        .with_options(GraftOptions::new().with_graft_first(true))
        .run()
        .expect("Graft should succeed");

    let result = MediaSource::open(&output_path).expect("Failed to open output");
    let first_audio = result
        .info()
        .audio_tracks
        .first()
        .expect("output should have audio");
    assert!(
        first_audio.matches_language(&french),
        "grafted track should come first, got tag {:?}",
        first_audio.language,
    );
}

#[test]
fn missing_language_fails_without_fallback() {
    if !fixtures_present() {
        return;
    }

    let output_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let output_path = output_directory.path().join("movie-ger.mkv");

    let german = Language::resolve("ger").unwrap();
    let result = Grafter::new(movie_path(), dub_path(), german)
        .expect("Failed to create grafter")
        .with_output(&output_path)
        .run();

    assert!(result.is_err());
    let message = result.unwrap_err().to_string();
    assert!(
        message.contains("ger"),
        "error should name the requested language: {message}",
    );
    assert!(!output_path.exists(), "no output on failure");
}

#[test]
fn drop_existing_replaces_matching_audio() {
    if !fixtures_present() {
        return;
    }

    let output_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let first_output = output_directory.path().join("movie-fre.mkv");
    let french = Language::resolve("fre").unwrap();

    Grafter::new(movie_path(), dub_path(), french)
        .expect("Failed to create grafter")
        .with_output(&first_output)
        .run()
        .expect("First graft should succeed");

    // Force-graft again with cleanup: the old French track is replaced, not
    // duplicated.
    let second_output = output_directory.path().join("movie-fre-clean.mkv");
    let outcome = Grafter::new(&first_output, dub_path(), french)
        .expect("Failed to create grafter")
        .with_output(&second_output)
        .with_options(
            GraftOptions::new()
                .with_force(true)
                .with_drop_matching_audio(true),
        )
        .run()
        .expect("Cleanup graft should succeed");

    let report = match outcome {
        GraftOutcome::Grafted(report) => report,
        GraftOutcome::AlreadyPresent { .. } => panic!("forced graft should run"),
    };
    assert_eq!(report.audio_dropped, 1);

    let first = MediaSource::open(&first_output).expect("Failed to open first output");
    let second = MediaSource::open(&second_output).expect("Failed to open second output");
    assert_eq!(
        second.info().audio_tracks.len(),
        first.info().audio_tracks.len(),
        "dropped one, added one",
    );
}
