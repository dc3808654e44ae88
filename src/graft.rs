//! The graft pipeline.
//!
//! [`Grafter`] wires the stages together: check whether the target already
//! has the preferred language, select the donor track, run the compatibility
//! checks, stream-copy the track into staging, optionally normalize it, and
//! mux everything into the output container. Staging artifacts are deleted
//! on every exit path.
//!
//! # Example
//!
//! ```no_run
//! use audiograft::{GraftError, GraftOutcome, Grafter, Language};
//!
//! let language = Language::resolve("fre").ok_or(GraftError::UnknownLanguage("fre".into()))?;
//! match Grafter::new("movie.mkv", "dub.mkv", language)?.run()? {
//!     GraftOutcome::AlreadyPresent { language } => {
//!         println!("{language} audio already present, nothing to do");
//!     }
//!     GraftOutcome::Grafted(report) => {
//!         println!("wrote {}", report.output.display());
//!     }
//! }
//! # Ok::<(), GraftError>(())
//! ```

use std::path::{Path, PathBuf};

use crate::{
    compat,
    error::GraftError,
    extract::TrackExtractor,
    inspect::MediaSource,
    language::Language,
    metadata::AudioTrack,
    mux::TrackMuxer,
    normalize::{self, NormalizationReport},
    options::GraftOptions,
    select,
    staging::StagingArea,
};

/// What a graft run produced.
#[derive(Debug)]
pub enum GraftOutcome {
    /// The target already carries the preferred language and `force` was not
    /// set; nothing was written.
    AlreadyPresent {
        /// The language that was found.
        language: Language,
    },
    /// The graft ran to completion.
    Grafted(GraftReport),
}

/// Summary of a completed graft.
#[derive(Debug)]
pub struct GraftReport {
    /// The output file that was written.
    pub output: PathBuf,
    /// The donor audio track that was grafted.
    pub track: AudioTrack,
    /// Matching donor tracks that were not grafted (rank order).
    pub alternates: Vec<AudioTrack>,
    /// Donor subtitle tracks grafted alongside the audio.
    pub subtitles_added: usize,
    /// Target audio tracks dropped because they matched the language.
    pub audio_dropped: usize,
    /// `true` when the donor track was selected via the undetermined-tag
    /// fallback (its tag was overwritten with the preferred language).
    pub fallback_used: bool,
    /// What the normalization stage did, when it was enabled.
    pub normalization: Option<NormalizationReport>,
    /// Non-fatal issues from the compatibility checks.
    pub warnings: Vec<String>,
}

/// Builder and runner for a single graft operation.
pub struct Grafter {
    video_path: PathBuf,
    donor_path: PathBuf,
    output_path: PathBuf,
    language: Language,
    options: GraftOptions,
}

impl Grafter {
    /// Create a grafter that adds `language` audio from `donor` to `video`.
    ///
    /// The output defaults to `<video stem>-out.<ext>` next to the target;
    /// override it with [`with_output`](Grafter::with_output).
    ///
    /// # Errors
    ///
    /// Returns [`GraftError::FileOpen`] if either input does not exist.
    pub fn new<P1: AsRef<Path>, P2: AsRef<Path>>(
        video: P1,
        donor: P2,
        language: Language,
    ) -> Result<Self, GraftError> {
        let video_path = video.as_ref().to_path_buf();
        let donor_path = donor.as_ref().to_path_buf();

        for path in [&video_path, &donor_path] {
            if !path.exists() {
                return Err(GraftError::FileOpen {
                    path: path.clone(),
                    reason: "File does not exist".to_string(),
                });
            }
        }

        let output_path = derive_output_path(&video_path);

        Ok(Self {
            video_path,
            donor_path,
            output_path,
            language,
            options: GraftOptions::new(),
        })
    }

    /// Replace the default options.
    #[must_use]
    pub fn with_options(mut self, options: GraftOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the output path explicitly.
    #[must_use]
    pub fn with_output<P: AsRef<Path>>(mut self, output: P) -> Self {
        self.output_path = output.as_ref().to_path_buf();
        self
    }

    /// The path the output container will be written to.
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Run the pipeline.
    ///
    /// # Errors
    ///
    /// Any stage error is propagated; see [`GraftError`]. Staging artifacts
    /// are removed even when an error is returned.
    pub fn run(&self) -> Result<GraftOutcome, GraftError> {
        if self.output_path == self.video_path || self.output_path == self.donor_path {
            return Err(GraftError::OutputCollision {
                path: self.output_path.clone(),
            });
        }

        // ── Presence check on the target ───────────────────────────
        let target = MediaSource::open(&self.video_path)?;
        if target.audio_language_present(&self.language) {
            if !self.options.force {
                log::info!(
                    "{} audio already present in {}; skipping (use force to graft anyway)",
                    self.language,
                    self.video_path.display(),
                );
                return Ok(GraftOutcome::AlreadyPresent {
                    language: self.language,
                });
            }
            log::info!(
                "{} audio already present in {}; grafting anyway (forced)",
                self.language,
                self.video_path.display(),
            );
        }

        // ── Donor inspection and selection ─────────────────────────
        let mut donor = MediaSource::open(&self.donor_path)?;
        let selection = select::select_tracks(
            donor.info(),
            &self.language,
            self.options.assume_undefined,
            donor.path(),
        )?;

        // ── Compatibility checks ───────────────────────────────────
        let report = compat::check_compatibility(
            target.info(),
            donor.info(),
            &selection,
            self.options.duration_tolerance,
        );

        if !report.is_valid() {
            return Err(GraftError::MuxError(format!(
                "Compatibility check failed: {}",
                report.errors.join("; "),
            )));
        }

        if self.options.strict_duration && report.has_duration_mismatch() {
            return Err(GraftError::DurationMismatch {
                target: target.info().duration,
                donor: compat::donor_track_duration(donor.info(), &selection),
                tolerance: self.options.duration_tolerance,
            });
        }

        for warning in &report.warnings {
            log::warn!("{warning}");
        }

        let warnings = report.warnings.clone();
        drop(target);

        // ── Staged extraction ──────────────────────────────────────
        let staging = StagingArea::new()?;
        let staged_path = staging.file("donor-tracks.mka");

        TrackExtractor::new(&mut donor, &selection, self.language, &self.options)
            .run(&staged_path, &self.options)?;
        drop(donor);

        // ── Optional loudness normalization ────────────────────────
        let mut mux_input = staged_path.clone();
        let normalization = match &self.options.normalize {
            Some(normalize_options) => {
                let normalized_path = staging.file("donor-tracks-normalized.mka");
                let report = normalize::normalize_staged(
                    &staged_path,
                    &normalized_path,
                    self.language,
                    normalize_options,
                    &self.options,
                )?;
                if report.applied {
                    mux_input = normalized_path;
                }
                Some(report)
            }
            None => None,
        };

        // ── Mux into the output container ──────────────────────────
        let summary = TrackMuxer::new(
            &self.video_path,
            &mux_input,
            &self.output_path,
            self.language,
        )?
        .run(&self.options)?;

        // Error paths above rely on Drop for the same cleanup.
        if let Err(error) = staging.close() {
            log::warn!("Failed to remove staging directory: {error}");
        }

        log::info!(
            "Grafted {} audio into {}",
            self.language,
            self.output_path.display(),
        );

        Ok(GraftOutcome::Grafted(GraftReport {
            output: self.output_path.clone(),
            track: selection.audio,
            alternates: selection.alternates,
            subtitles_added: summary.subtitles_added,
            audio_dropped: summary.audio_dropped,
            fallback_used: selection.fallback_used,
            normalization,
            warnings,
        }))
    }
}

/// Default output path: `<stem>-out.<ext>` next to the target, mirroring the
/// original tool's naming.
pub(crate) fn derive_output_path(video: &Path) -> PathBuf {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let extension = video
        .extension()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mkv".to_string());
    video.with_file_name(format!("{stem}-out.{extension}"))
}
