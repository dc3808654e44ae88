//! Container inspection.
//!
//! [`MediaSource`] is the entry point for reading a media file. It opens the
//! demuxer, walks every stream once, and caches the resulting [`MediaInfo`]
//! — including per-track language tags and default/forced flags, which drive
//! track selection and the skip-if-already-present check.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{
    codec::context::Context as CodecContext,
    format::context::Input,
    format::stream::Disposition,
    media::Type,
};

use crate::{
    error::GraftError,
    language::Language,
    metadata::{AudioTrack, MediaInfo, SubtitleTrack, VideoInfo},
};

/// An opened media file with cached stream metadata.
///
/// # Example
///
/// ```no_run
/// use audiograft::MediaSource;
///
/// let source = MediaSource::open("dub.mkv")?;
/// for track in &source.info().audio_tracks {
///     println!(
///         "track {}: {} [{}]",
///         track.track_index,
///         track.codec,
///         track.language.as_deref().unwrap_or("und"),
///     );
/// }
/// # Ok::<(), audiograft::GraftError>(())
/// ```
pub struct MediaSource {
    /// The opened FFmpeg input (demuxer) context.
    pub(crate) input: Input,
    /// Cached metadata extracted at open time.
    pub(crate) info: MediaInfo,
    /// Path to the opened media file (kept for error messages).
    pub(crate) file_path: PathBuf,
}

impl Debug for MediaSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("MediaSource")
            .field("info", &self.info)
            .field("file_path", &self.file_path)
            .finish_non_exhaustive()
    }
}

impl MediaSource {
    /// Open a media file and cache its stream metadata.
    ///
    /// Initializes FFmpeg (idempotent), opens the demuxer, and walks every
    /// stream to collect video, audio, and subtitle metadata.
    ///
    /// # Errors
    ///
    /// Returns [`GraftError::FileOpen`] if the file cannot be opened, is not
    /// recognisable as a media file, or carries codec parameters FFmpeg
    /// cannot interpret.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GraftError> {
        let path = path.as_ref();
        let file_path = path.to_path_buf();

        log::debug!("Opening media file: {}", file_path.display());

        // Initialise ffmpeg (safe to call multiple times).
        ffmpeg_next::init().map_err(|error| GraftError::FileOpen {
            path: file_path.clone(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        let input = ffmpeg_next::format::input(&path).map_err(|error| GraftError::FileOpen {
            path: file_path.clone(),
            reason: error.to_string(),
        })?;

        let duration_microseconds = input.duration();
        let duration = if duration_microseconds > 0 {
            Duration::from_micros(duration_microseconds as u64)
        } else {
            Duration::ZERO
        };

        let format = input.format().name().to_string();

        let video = read_video_info(&input, &file_path)?;
        let audio_tracks = read_audio_tracks(&input, &file_path)?;
        let subtitle_tracks = read_subtitle_tracks(&input);

        let info = MediaInfo {
            video,
            audio_tracks,
            subtitle_tracks,
            duration,
            format,
        };

        Ok(Self {
            input,
            info,
            file_path,
        })
    }

    /// Get a reference to the cached metadata.
    ///
    /// Metadata is extracted once during [`open`](MediaSource::open) and does
    /// not require additional decoding.
    pub fn info(&self) -> &MediaInfo {
        &self.info
    }

    /// Path this source was opened from.
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Does any audio track carry a tag denoting `language`?
    ///
    /// Used by the grafter to skip files that already have the preferred
    /// language (unless forced).
    pub fn audio_language_present(&self, language: &Language) -> bool {
        self.info.has_audio_language(language)
    }
}

/// Read metadata for the best video stream, if any.
fn read_video_info(input: &Input, file_path: &Path) -> Result<Option<VideoInfo>, GraftError> {
    let Some(stream) = input.streams().best(Type::Video) else {
        return Ok(None);
    };

    let decoder_context =
        CodecContext::from_parameters(stream.parameters()).map_err(|error| {
            GraftError::FileOpen {
                path: file_path.to_path_buf(),
                reason: format!("Failed to read video codec parameters: {error}"),
            }
        })?;
    let decoder = decoder_context
        .decoder()
        .video()
        .map_err(|error| GraftError::FileOpen {
            path: file_path.to_path_buf(),
            reason: format!("Failed to create video decoder: {error}"),
        })?;

    let frame_rate = stream.avg_frame_rate();
    let frames_per_second = if frame_rate.denominator() != 0 {
        frame_rate.numerator() as f64 / frame_rate.denominator() as f64
    } else {
        let rate = stream.rate();
        if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        }
    };

    let codec = decoder
        .codec()
        .map(|codec| codec.name().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    Ok(Some(VideoInfo {
        width: decoder.width(),
        height: decoder.height(),
        frames_per_second,
        codec,
    }))
}

/// Read metadata for every audio stream, in container order.
fn read_audio_tracks(input: &Input, file_path: &Path) -> Result<Vec<AudioTrack>, GraftError> {
    let mut tracks = Vec::new();

    for stream in input.streams() {
        if stream.parameters().medium() != Type::Audio {
            continue;
        }

        let stream_index = stream.index();
        let track_index = tracks.len();

        let decoder_context =
            CodecContext::from_parameters(stream.parameters()).map_err(|error| {
                GraftError::FileOpen {
                    path: file_path.to_path_buf(),
                    reason: format!(
                        "Failed to read audio codec parameters for stream {stream_index}: {error}"
                    ),
                }
            })?;
        let decoder = decoder_context
            .decoder()
            .audio()
            .map_err(|error| GraftError::FileOpen {
                path: file_path.to_path_buf(),
                reason: format!(
                    "Failed to create audio decoder for stream {stream_index}: {error}"
                ),
            })?;

        let codec = decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let language = stream.metadata().get("language").map(|s| s.to_string());
        let title = stream.metadata().get("title").map(|s| s.to_string());

        let disposition = stream.disposition();

        // Per-stream duration, when the container records one.
        let time_base = stream.time_base();
        let stream_duration = stream.duration();
        let duration = if stream_duration > 0 && time_base.denominator() != 0 {
            let seconds = stream_duration as f64 * time_base.numerator() as f64
                / time_base.denominator() as f64;
            Some(Duration::from_secs_f64(seconds))
        } else {
            None
        };

        tracks.push(AudioTrack {
            track_index,
            stream_index,
            codec,
            channels: decoder.channels(),
            sample_rate: decoder.rate(),
            bit_rate: decoder.bit_rate() as u64,
            language,
            title,
            default: disposition.contains(Disposition::DEFAULT),
            forced: disposition.contains(Disposition::FORCED),
            duration,
        });
    }

    Ok(tracks)
}

/// Read metadata for every subtitle stream, in container order.
///
/// Subtitle metadata is best-effort: a codec FFmpeg cannot name is reported
/// as `"unknown"` rather than failing the open.
fn read_subtitle_tracks(input: &Input) -> Vec<SubtitleTrack> {
    let mut tracks = Vec::new();

    for stream in input.streams() {
        if stream.parameters().medium() != Type::Subtitle {
            continue;
        }

        let stream_index = stream.index();
        let track_index = tracks.len();

        let codec = CodecContext::from_parameters(stream.parameters())
            .ok()
            .and_then(|context| {
                let name = context.id().name();
                if name.is_empty() {
                    None
                } else {
                    Some(name.to_string())
                }
            })
            .unwrap_or_else(|| "unknown".to_string());

        let language = stream.metadata().get("language").map(|s| s.to_string());
        let disposition = stream.disposition();

        tracks.push(SubtitleTrack {
            track_index,
            stream_index,
            codec,
            language,
            default: disposition.contains(Disposition::DEFAULT),
            forced: disposition.contains(Disposition::FORCED),
        });
    }

    tracks
}
