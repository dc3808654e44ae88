//! Scoped staging directory for intermediate artifacts.
//!
//! Extracted (and possibly normalized) tracks are written to a temporary
//! directory that is deleted when the [`StagingArea`] goes out of scope —
//! on success, on error, and on panic alike. Callers that want to observe
//! cleanup failures can call [`StagingArea::close`] instead of relying on
//! `Drop`.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::GraftError;

/// A temporary directory that owns every intermediate file of a graft.
///
/// # Example
///
/// ```no_run
/// use audiograft::StagingArea;
///
/// let staging = StagingArea::new()?;
/// let staged = staging.file("donor-tracks.mka");
/// // ... write to `staged` ...
/// staging.close()?; // or just drop it
/// # Ok::<(), audiograft::GraftError>(())
/// ```
pub struct StagingArea {
    directory: TempDir,
}

impl StagingArea {
    /// Create a fresh staging directory under the system temp location.
    pub fn new() -> Result<Self, GraftError> {
        let directory = tempfile::Builder::new()
            .prefix("audiograft-")
            .tempdir()?;
        log::debug!("Created staging directory {}", directory.path().display());
        Ok(Self { directory })
    }

    /// Path of the staging directory itself.
    pub fn path(&self) -> &Path {
        self.directory.path()
    }

    /// Path for a named file inside the staging directory.
    ///
    /// The file is not created; this only joins the path.
    pub fn file(&self, name: &str) -> PathBuf {
        self.directory.path().join(name)
    }

    /// Delete the staging directory now, surfacing any I/O error.
    ///
    /// Dropping the `StagingArea` performs the same cleanup but swallows
    /// errors.
    pub fn close(self) -> Result<(), GraftError> {
        let path = self.directory.path().to_path_buf();
        self.directory.close()?;
        log::debug!("Removed staging directory {}", path.display());
        Ok(())
    }
}
