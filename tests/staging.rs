//! Staging cleanup tests.

use std::fs;
use std::path::PathBuf;

use audiograft::StagingArea;

#[test]
fn staged_files_are_deleted_on_drop() {
    let staged_path: PathBuf;
    {
        let staging = StagingArea::new().expect("Failed to create staging area");
        staged_path = staging.file("donor-tracks.mka");
        fs::write(&staged_path, b"payload").expect("Failed to write staged file");
        assert!(staged_path.exists());
    }
    assert!(!staged_path.exists(), "staged file should be gone after drop");
}

#[test]
fn close_deletes_and_reports() {
    let staging = StagingArea::new().expect("Failed to create staging area");
    let directory = staging.path().to_path_buf();
    fs::write(staging.file("a.bin"), b"a").expect("Failed to write");
    fs::write(staging.file("b.bin"), b"b").expect("Failed to write");

    staging.close().expect("close should succeed");
    assert!(!directory.exists());
}

#[test]
fn cleanup_survives_panic() {
    let staged_path = {
        let staging = StagingArea::new().expect("Failed to create staging area");
        let path = staging.file("orphan.mka");
        fs::write(&path, b"payload").expect("Failed to write");

        let result = std::panic::catch_unwind(|| panic!("mid-pipeline failure"));
        assert!(result.is_err());
        // `staging` drops here, after the panic was observed.
        path
    };
    assert!(!staged_path.exists(), "staged file should be gone after panic path");
}

#[test]
fn file_paths_live_inside_the_staging_directory() {
    let staging = StagingArea::new().expect("Failed to create staging area");
    let staged = staging.file("x.mka");
    assert!(staged.starts_with(staging.path()));
}
