//! # audiograft
//!
//! Graft an audio track in a preferred language from one media file onto
//! another.
//!
//! `audiograft` inspects a *donor* container, picks the audio track whose
//! language tag matches the preferred language, stream-copies it (plus any
//! matching subtitles) into a staging file, optionally normalizes its
//! loudness, and muxes it into a *target* container — powered by FFmpeg via
//! the [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate. Apart
//! from optional normalization, nothing is re-encoded.
//!
//! ## Quick Start
//!
//! ### Graft a track
//!
//! ```no_run
//! use audiograft::{GraftOutcome, Grafter, Language};
//!
//! let french = Language::resolve("fre").unwrap();
//! match Grafter::new("movie.mkv", "french-dub.mkv", french).unwrap().run().unwrap() {
//!     GraftOutcome::AlreadyPresent { .. } => println!("nothing to do"),
//!     GraftOutcome::Grafted(report) => println!("wrote {}", report.output.display()),
//! }
//! ```
//!
//! ### List a file's tracks
//!
//! ```no_run
//! use audiograft::MediaSource;
//!
//! let source = MediaSource::open("movie.mkv").unwrap();
//! for track in &source.info().audio_tracks {
//!     println!("{}: {}", track.track_index, track.language.as_deref().unwrap_or("und"));
//! }
//! ```
//!
//! ### Tune the pipeline
//!
//! ```no_run
//! use audiograft::{GraftOptions, Grafter, Language, NormalizeOptions};
//!
//! let english = Language::resolve("en").unwrap();
//! let options = GraftOptions::new()
//!     .with_force(true)
//!     .with_drop_matching_audio(true)
//!     .with_normalization(NormalizeOptions::new().with_target_rms_dbfs(-18.0));
//!
//! Grafter::new("movie.mkv", "dub.mkv", english)
//!     .unwrap()
//!     .with_options(options)
//!     .with_output("movie-eng.mkv")
//!     .run()
//!     .unwrap();
//! ```
//!
//! ## Features
//!
//! - **Track selection** — exact ISO 639-2 tag matches rank first, container
//!   order breaks ties, with an explicit opt-in fallback to
//!   undetermined-tagged tracks
//! - **Lossless grafting** — packet-level stream copy in the donor track's
//!   native codec
//! - **Track flags** — existing audio defaults are demoted, the grafted
//!   track becomes default, forced-subtitle defaults follow the target
//! - **Track cleanup** — optionally drop target audio already tagged with
//!   the preferred language
//! - **Loudness normalization** — optional constant-gain adjustment toward a
//!   target RMS level, clamped by peak headroom
//! - **Duration checks** — donor/target duration deltas surface as warnings
//!   or, in strict mode, errors
//! - **Scoped staging** — intermediate files live in a temp directory that
//!   is deleted on success, error, and panic alike
//! - **Progress & cancellation** — cooperative callbacks and
//!   `CancellationToken` for long-running stages
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod compat;
pub mod error;
pub mod extract;
pub mod ffmpeg;
pub mod graft;
pub mod inspect;
pub mod language;
pub mod loudness;
pub mod metadata;
pub mod mux;
pub mod normalize;
pub mod options;
pub mod progress;
pub mod select;
pub mod staging;

pub use compat::CompatReport;
pub use error::GraftError;
pub use extract::TrackExtractor;
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use graft::{GraftOutcome, GraftReport, Grafter};
pub use inspect::MediaSource;
pub use language::{Language, is_undetermined};
pub use loudness::LoudnessStats;
pub use metadata::{AudioTrack, MediaInfo, SubtitleTrack, VideoInfo};
pub use mux::{MuxSummary, TrackMuxer};
pub use normalize::NormalizationReport;
pub use options::{GraftOptions, NormalizeOptions};
pub use progress::{CancellationToken, OperationType, ProgressCallback, ProgressInfo};
pub use select::TrackSelection;
pub use staging::StagingArea;
