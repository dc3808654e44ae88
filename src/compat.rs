//! Pre-mux compatibility checks.
//!
//! Before any packet is copied, the grafter compares the selected donor
//! track against the target container and produces a [`CompatReport`]
//! describing what it found. Duration mismatches beyond the configured
//! tolerance are warnings by default and errors under strict mode.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use audiograft::{GraftError, Language, MediaSource, compat, select};
//!
//! let target = MediaSource::open("movie.mkv")?;
//! let donor = MediaSource::open("dub.mkv")?;
//! let language = Language::resolve("fre").ok_or(GraftError::UnknownLanguage("fre".into()))?;
//! let selection = select::select_tracks(donor.info(), &language, false, donor.path())?;
//! let report = compat::check_compatibility(
//!     target.info(),
//!     donor.info(),
//!     &selection,
//!     Duration::from_millis(500),
//! );
//! print!("{report}");
//! # Ok::<(), GraftError>(())
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::Duration;

use crate::metadata::MediaInfo;
use crate::select::TrackSelection;

/// Summary of pre-mux compatibility checks.
///
/// Contains lists of informational notices, warnings, and errors.
#[derive(Debug, Clone, Default)]
pub struct CompatReport {
    /// Informational notices (not problems).
    pub info: Vec<String>,
    /// Non-fatal issues worth surfacing before muxing.
    pub warnings: Vec<String>,
    /// Fatal issues that will prevent a usable graft.
    pub errors: Vec<String>,
}

impl CompatReport {
    /// Returns `true` if no errors were found.
    ///
    /// Warnings do not affect this result — only errors make the report
    /// invalid.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Total number of issues (info + warnings + errors).
    pub fn issue_count(&self) -> usize {
        self.info.len() + self.warnings.len() + self.errors.len()
    }

    /// The duration mismatch warning/error, if one was recorded.
    pub fn has_duration_mismatch(&self) -> bool {
        self.warnings
            .iter()
            .chain(self.errors.iter())
            .any(|issue| issue.contains("Duration mismatch"))
    }
}

impl Display for CompatReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for item in &self.info {
            writeln!(f, "[INFO] {item}")?;
        }
        for item in &self.warnings {
            writeln!(f, "[WARN] {item}")?;
        }
        for item in &self.errors {
            writeln!(f, "[ERROR] {item}")?;
        }
        if self.issue_count() == 0 {
            writeln!(f, "No issues found.")?;
        }
        Ok(())
    }
}

/// The effective duration of the selected donor track: the per-stream value
/// when the container records one, otherwise the donor container duration.
pub fn donor_track_duration(donor: &MediaInfo, selection: &TrackSelection) -> Duration {
    selection.audio.duration.unwrap_or(donor.duration)
}

/// Absolute delta between two durations.
pub fn duration_delta(a: Duration, b: Duration) -> Duration {
    if a > b { a - b } else { b - a }
}

/// Run compatibility checks for grafting `selection` from `donor` into
/// `target`.
pub fn check_compatibility(
    target: &MediaInfo,
    donor: &MediaInfo,
    selection: &TrackSelection,
    tolerance: Duration,
) -> CompatReport {
    let mut report = CompatReport::default();
    let track = &selection.audio;

    // ── Target structure ───────────────────────────────────────────
    if target.video.is_none() {
        report
            .warnings
            .push("Target has no video stream".to_string());
    }

    if target.duration == Duration::ZERO {
        report
            .warnings
            .push("Target duration is zero — the duration check is skipped".to_string());
    }

    // ── Donor track sanity ─────────────────────────────────────────
    if track.sample_rate == 0 {
        report
            .errors
            .push("Selected donor track has a zero sample rate".to_string());
    }

    if track.channels == 0 {
        report
            .errors
            .push("Selected donor track has a zero channel count".to_string());
    }

    // ── Duration check ─────────────────────────────────────────────
    let donor_duration = donor_track_duration(donor, selection);
    if target.duration > Duration::ZERO && donor_duration > Duration::ZERO {
        let delta = duration_delta(target.duration, donor_duration);
        if delta > tolerance {
            report.warnings.push(format!(
                "Duration mismatch: target is {:.3}s, donor track is {:.3}s (Δ {:.3}s > {:.3}s tolerance)",
                target.duration.as_secs_f64(),
                donor_duration.as_secs_f64(),
                delta.as_secs_f64(),
                tolerance.as_secs_f64(),
            ));
        }
    }

    // ── Selection notes ────────────────────────────────────────────
    report.info.push(format!(
        "Grafting audio track {}: {} {}Hz {}ch",
        track.track_index, track.codec, track.sample_rate, track.channels,
    ));

    if selection.fallback_used {
        report.info.push(
            "Donor track language tag was undetermined — it will be retagged".to_string(),
        );
    }

    if !selection.alternates.is_empty() {
        report.info.push(format!(
            "{} other matching audio track(s) left behind",
            selection.alternates.len(),
        ));
    }

    if !selection.subtitles.is_empty() {
        report.info.push(format!(
            "{} matching subtitle track(s) will ride along",
            selection.subtitles.len(),
        ));
    }

    report
}
