//! Progress and cancellation integration tests.
//!
//! Fixture-backed tests require files from
//! `tests/fixtures/generate_fixtures.sh`.

use std::path::Path;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use audiograft::{
    CancellationToken, GraftError, GraftOptions, Grafter, Language,
    OperationType, ProgressCallback, ProgressInfo,
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

#[derive(Default)]
struct CountingProgress {
    calls: AtomicU64,
    copy_calls: AtomicU64,
    mux_calls: AtomicU64,
}

impl ProgressCallback for CountingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        match info.operation {
            OperationType::TrackCopy => {
                self.copy_calls.fetch_add(1, Ordering::Relaxed);
            }
            OperationType::Muxing => {
                self.mux_calls.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }
}

#[test]
fn token_starts_clean_and_latches() {
    let token = CancellationToken::new();
    assert!(!token.is_cancelled());
    token.cancel();
    assert!(token.is_cancelled());
    // Cancelling twice is fine.
    token.cancel();
    assert!(token.is_cancelled());
}

#[test]
fn default_token_is_not_cancelled() {
    assert!(!CancellationToken::default().is_cancelled());
}

#[test]
fn progress_fires_for_copy_and_mux() {
    if !fixtures_present() {
        return;
    }

    let output_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let output_path = output_directory.path().join("movie-out.mkv");

    let progress = Arc::new(CountingProgress::default());
    let french = Language::resolve("fre").unwrap();

    Grafter::new(movie_path(), dub_path(), french)
        .expect("Failed to create grafter")
        .with_output(&output_path)
        .with_options(GraftOptions::new().with_progress(progress.clone()))
        .run()
        .expect("Graft should succeed");

    assert!(progress.calls.load(Ordering::Relaxed) > 0);
    assert!(progress.copy_calls.load(Ordering::Relaxed) > 0);
    assert!(progress.mux_calls.load(Ordering::Relaxed) > 0);
}

#[test]
fn pre_cancelled_token_aborts_the_graft() {
    if !fixtures_present() {
        return;
    }

    let output_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let output_path = output_directory.path().join("movie-out.mkv");

    let token = CancellationToken::new();
    token.cancel();

    let french = Language::resolve("fre").unwrap();
    let result = Grafter::new(movie_path(), dub_path(), french)
        .expect("Failed to create grafter")
        .with_output(&output_path)
        .with_options(GraftOptions::new().with_cancellation(token))
        .run();

    assert!(
        matches!(result, Err(GraftError::Cancelled)),
        "expected Cancelled, got {result:?}",
    );
}
