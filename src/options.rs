//! Graft configuration.
//!
//! [`GraftOptions`] is a builder that threads behavioral flags, progress
//! callbacks, and cancellation tokens through the pipeline without polluting
//! every function signature. [`NormalizeOptions`] configures the optional
//! loudness-normalization stage.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use audiograft::{CancellationToken, GraftOptions, NormalizeOptions};
//!
//! let token = CancellationToken::new();
//! let options = GraftOptions::new()
//!     .with_force(true)
//!     .with_drop_matching_audio(true)
//!     .with_normalization(NormalizeOptions::new().with_target_rms_dbfs(-18.0))
//!     .with_duration_tolerance(Duration::from_secs(2))
//!     .with_cancellation(token.clone());
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;
use std::time::Duration;

use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};

/// Configuration for the loudness-normalization stage.
///
/// Normalization measures the staged track's RMS loudness, then applies a
/// constant gain toward the target. The gain is clamped so the peak sample
/// never exceeds full scale, and gains below
/// [`min_gain_db`](NormalizeOptions::with_min_gain_db) leave the
/// stream-copied original untouched.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeOptions {
    /// Target RMS level in dBFS.
    pub(crate) target_rms_dbfs: f64,
    /// Largest gain (absolute value, dB) normalization will apply.
    pub(crate) max_gain_db: f64,
    /// Gains below this threshold (absolute value, dB) are skipped.
    pub(crate) min_gain_db: f64,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl NormalizeOptions {
    /// Defaults: target −20 dBFS RMS, at most ±20 dB of gain, skip below 0.5 dB.
    pub fn new() -> Self {
        Self {
            target_rms_dbfs: -20.0,
            max_gain_db: 20.0,
            min_gain_db: 0.5,
        }
    }

    /// Set the target RMS level in dBFS.
    #[must_use]
    pub fn with_target_rms_dbfs(mut self, target: f64) -> Self {
        self.target_rms_dbfs = target;
        self
    }

    /// Set the largest gain (absolute value, dB) normalization may apply.
    #[must_use]
    pub fn with_max_gain_db(mut self, max_gain: f64) -> Self {
        self.max_gain_db = max_gain.abs();
        self
    }

    /// Set the threshold (absolute value, dB) below which normalization is
    /// skipped and the stream-copied track is muxed as-is.
    #[must_use]
    pub fn with_min_gain_db(mut self, min_gain: f64) -> Self {
        self.min_gain_db = min_gain.abs();
        self
    }
}

/// Configuration for a graft operation.
///
/// All fields have defaults matching the plain
/// `audiograft graft <video> <donor> --language <lang>` behavior; pass a
/// customized value to [`Grafter::with_options`](crate::Grafter::with_options).
#[derive(Clone)]
pub struct GraftOptions {
    /// Graft even when the target already has the language.
    pub(crate) force: bool,
    /// Fall back to undetermined-tagged donor tracks when nothing matches.
    pub(crate) assume_undefined: bool,
    /// Graft matching donor subtitles alongside the audio.
    pub(crate) include_subtitles: bool,
    /// Drop target audio tracks already tagged with the preferred language.
    pub(crate) drop_matching_audio: bool,
    /// Mark the grafted track as the default audio track.
    pub(crate) set_default: bool,
    /// Place the grafted track ahead of the existing audio tracks.
    pub(crate) graft_first: bool,
    /// Loudness normalization; `None` disables the stage.
    pub(crate) normalize: Option<NormalizeOptions>,
    /// Allowed delta between donor-track and target durations.
    pub(crate) duration_tolerance: Duration,
    /// Treat a duration mismatch as an error instead of a warning.
    pub(crate) strict_duration: bool,
    /// Progress callback. Defaults to a no-op.
    pub(crate) progress: Arc<dyn ProgressCallback>,
    /// Cancellation token. `None` means never cancelled.
    pub(crate) cancellation: Option<CancellationToken>,
    /// How often the progress callback fires (every N packets).
    pub(crate) batch_size: u64,
}

impl Debug for GraftOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("GraftOptions")
            .field("force", &self.force)
            .field("assume_undefined", &self.assume_undefined)
            .field("include_subtitles", &self.include_subtitles)
            .field("drop_matching_audio", &self.drop_matching_audio)
            .field("set_default", &self.set_default)
            .field("graft_first", &self.graft_first)
            .field("normalize", &self.normalize)
            .field("duration_tolerance", &self.duration_tolerance)
            .field("strict_duration", &self.strict_duration)
            .field("has_cancellation", &self.cancellation.is_some())
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl Default for GraftOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl GraftOptions {
    /// Create a new configuration with default settings.
    ///
    /// Defaults: no force, no `und` fallback, subtitles included, existing
    /// tracks kept, grafted track becomes default but is appended after the
    /// existing audio, no normalization, 500 ms duration tolerance (warning
    /// only), no progress callback, batch size 1.
    pub fn new() -> Self {
        Self {
            force: false,
            assume_undefined: false,
            include_subtitles: true,
            drop_matching_audio: false,
            set_default: true,
            graft_first: false,
            normalize: None,
            duration_tolerance: Duration::from_millis(500),
            strict_duration: false,
            progress: Arc::new(NoOpProgress),
            cancellation: None,
            batch_size: 1,
        }
    }

    /// Graft even when the target already carries the preferred language.
    #[must_use]
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// When no donor tag matches, select undetermined-tagged tracks and
    /// overwrite their tag with the preferred language.
    #[must_use]
    pub fn with_assume_undefined(mut self, assume: bool) -> Self {
        self.assume_undefined = assume;
        self
    }

    /// Control whether matching donor subtitles are grafted too.
    /// Defaults to `true`.
    #[must_use]
    pub fn with_subtitles(mut self, include: bool) -> Self {
        self.include_subtitles = include;
        self
    }

    /// Drop target audio tracks already tagged with the preferred language
    /// instead of keeping them demoted.
    #[must_use]
    pub fn with_drop_matching_audio(mut self, drop: bool) -> Self {
        self.drop_matching_audio = drop;
        self
    }

    /// Control whether the grafted track is marked default (existing audio
    /// defaults are demoted either way). Defaults to `true`.
    #[must_use]
    pub fn with_set_default(mut self, set_default: bool) -> Self {
        self.set_default = set_default;
        self
    }

    /// Place the grafted track ahead of the existing audio tracks in the
    /// output instead of appending it after them. Defaults to `false`.
    #[must_use]
    pub fn with_graft_first(mut self, first: bool) -> Self {
        self.graft_first = first;
        self
    }

    /// Enable loudness normalization of the grafted track.
    #[must_use]
    pub fn with_normalization(mut self, normalize: NormalizeOptions) -> Self {
        self.normalize = Some(normalize);
        self
    }

    /// Set the allowed delta between donor-track and target durations.
    #[must_use]
    pub fn with_duration_tolerance(mut self, tolerance: Duration) -> Self {
        self.duration_tolerance = tolerance;
        self
    }

    /// Treat a duration mismatch beyond the tolerance as an error instead of
    /// a warning.
    #[must_use]
    pub fn with_strict_duration(mut self, strict: bool) -> Self {
        self.strict_duration = strict;
        self
    }

    /// Attach a progress callback.
    ///
    /// The callback is invoked every
    /// [`batch_size`](GraftOptions::with_batch_size) packets during the
    /// copy, normalization, and mux stages.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token.
    ///
    /// When the token is cancelled the pipeline stops and returns
    /// [`GraftError::Cancelled`](crate::GraftError::Cancelled).
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Set how often the progress callback fires.
    ///
    /// A value of 1 means every packet; 256 means every 256th. Clamped to a
    /// minimum of 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Returns `true` if cancellation has been requested.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}
