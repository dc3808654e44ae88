//! Error types for the `audiograft` crate.
//!
//! This module defines [`GraftError`], the unified error type returned by all
//! fallible operations in the crate. Errors carry enough context (file paths,
//! language tags, upstream messages) to diagnose a failed graft without extra
//! logging at the call site.

use std::{io::Error as IoError, path::PathBuf, time::Duration};

use ffmpeg_next::Error as FfmpegError;
use thiserror::Error;

/// The unified error type for all `audiograft` operations.
///
/// Every public method that can fail returns `Result<T, GraftError>`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GraftError {
    /// The media file could not be opened.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::MediaSource::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The donor file contains no audio tracks at all.
    #[error("No audio tracks found in {path}")]
    NoAudioTracks {
        /// Path of the donor file.
        path: PathBuf,
    },

    /// The preferred-language input could not be resolved to a known language.
    #[error("Language '{0}' not recognized (expected an ISO 639 code or an English language name)")]
    UnknownLanguage(String),

    /// No audio track matched the preferred language.
    #[error("No audio track tagged '{language}' in donor file (tags present: {available})")]
    NoMatchingTrack {
        /// The preferred language that was requested.
        language: String,
        /// Comma-joined list of the language tags actually present.
        available: String,
    },

    /// The output path collides with one of the input paths.
    #[error("Output path {path} would overwrite an input file")]
    OutputCollision {
        /// The offending output path.
        path: PathBuf,
    },

    /// Packet-level stream copy into the staging file failed.
    #[error("Track copy error: {0}")]
    TrackCopyError(String),

    /// Muxing the grafted tracks into the output container failed.
    #[error("Mux error: {0}")]
    MuxError(String),

    /// Audio data could not be decoded (loudness analysis, normalization).
    #[error("Failed to decode audio: {0}")]
    AudioDecodeError(String),

    /// Audio data could not be encoded during normalization.
    #[error("Failed to encode audio: {0}")]
    AudioEncodeError(String),

    /// Loudness analysis failed.
    #[error("Loudness analysis error: {0}")]
    LoudnessError(String),

    /// The donor track and target durations differ beyond the tolerance
    /// and strict duration checking is enabled.
    #[error(
        "Duration mismatch: target is {target:?}, donor track is {donor:?} \
         (tolerance {tolerance:?})"
    )]
    DurationMismatch {
        /// Duration of the target container.
        target: Duration,
        /// Duration of the selected donor track.
        donor: Duration,
        /// The configured tolerance that was exceeded.
        tolerance: Duration,
    },

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// The operation was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,
}

impl From<FfmpegError> for GraftError {
    fn from(error: FfmpegError) -> Self {
        GraftError::FfmpegError(error.to_string())
    }
}
