//! Audio loudness analysis.
//!
//! Decodes an audio track to mono f32 and computes peak amplitude, RMS
//! loudness, and their dBFS equivalents. The grafter uses these statistics to
//! decide whether (and by how much) to adjust the level of the staged track;
//! the CLI exposes them directly via `audiograft loudness`.
//!
//! # Example
//!
//! ```no_run
//! use audiograft::loudness;
//!
//! let stats = loudness::analyze("input.mkv", None)?;
//! println!("Peak: {:.2} dBFS, RMS: {:.2} dBFS", stats.peak_dbfs, stats.rms_dbfs);
//! # Ok::<(), audiograft::GraftError>(())
//! ```

use std::path::Path;
use std::time::Duration;

use ffmpeg_next::ChannelLayout;
use ffmpeg_next::codec::context::Context as CodecContext;
use ffmpeg_next::format::{Sample, sample::Type as SampleType};
use ffmpeg_next::frame::Audio as AudioFrame;
use ffmpeg_next::media::Type;
use ffmpeg_next::software::resampling::Context as ResamplingContext;

use crate::error::GraftError;
use crate::inspect::MediaSource;

/// Audio loudness statistics.
#[derive(Debug, Clone, Copy)]
pub struct LoudnessStats {
    /// Peak sample amplitude (linear, 0.0–1.0).
    pub peak: f32,
    /// Peak in dBFS (decibels relative to full scale). 0.0 dBFS = maximum.
    pub peak_dbfs: f64,
    /// Root-mean-square amplitude (linear).
    pub rms: f32,
    /// RMS in dBFS.
    pub rms_dbfs: f64,
    /// Duration of the analyzed audio.
    pub duration: Duration,
    /// Total number of mono samples analyzed.
    pub total_samples: u64,
}

impl LoudnessStats {
    /// Gain in dB that would move the RMS level to `target_rms_dbfs`,
    /// clamped so the peak cannot exceed full scale.
    ///
    /// Returns `0.0` for silent audio (no headroom math is meaningful).
    pub fn gain_toward(&self, target_rms_dbfs: f64) -> f64 {
        if self.rms <= 0.0 || self.peak <= 0.0 {
            return 0.0;
        }
        let wanted = target_rms_dbfs - self.rms_dbfs;
        let headroom = -self.peak_dbfs;
        wanted.min(headroom)
    }
}

/// Analyze the loudness of an audio track in `path`.
///
/// `track` is the zero-based audio track index; `None` analyzes the first
/// audio track.
///
/// # Errors
///
/// - [`GraftError::NoAudioTracks`] when the file has no audio or the track
///   index is out of range.
/// - [`GraftError::LoudnessError`] when decoding fails.
pub fn analyze<P: AsRef<Path>>(
    path: P,
    track: Option<usize>,
) -> Result<LoudnessStats, GraftError> {
    let mut source = MediaSource::open(path.as_ref())?;
    let track_index = track.unwrap_or(0);
    let stream_index = source
        .info
        .audio_tracks
        .get(track_index)
        .map(|t| t.stream_index)
        .ok_or_else(|| GraftError::NoAudioTracks {
            path: path.as_ref().to_path_buf(),
        })?;
    analyze_stream(&mut source, stream_index)
}

/// Decode one audio stream to mono f32 and compute loudness statistics.
pub(crate) fn analyze_stream(
    source: &mut MediaSource,
    audio_stream_index: usize,
) -> Result<LoudnessStats, GraftError> {
    log::debug!("Analyzing loudness (stream={audio_stream_index})");
    let stream = source
        .input
        .stream(audio_stream_index)
        .filter(|s| s.parameters().medium() == Type::Audio)
        .ok_or_else(|| GraftError::NoAudioTracks {
            path: source.file_path.clone(),
        })?;

    let decoder_context = CodecContext::from_parameters(stream.parameters())?;
    let mut decoder = decoder_context.decoder().audio().map_err(|e| {
        GraftError::LoudnessError(format!("Failed to create audio decoder: {e}"))
    })?;

    let sample_rate = decoder.rate();

    let mut resampler = ResamplingContext::get(
        decoder.format(),
        decoder.channel_layout(),
        sample_rate,
        Sample::F32(SampleType::Packed),
        ChannelLayout::MONO,
        sample_rate,
    )
    .map_err(|e| GraftError::LoudnessError(format!("Failed to create resampler: {e}")))?;

    let mut peak: f32 = 0.0;
    let mut sum_sq: f64 = 0.0;
    let mut total_samples: u64 = 0;
    let mut decoded_frame = AudioFrame::empty();
    let mut resampled_frame = AudioFrame::empty();

    for (stream, packet) in source.input.packets() {
        if stream.index() != audio_stream_index {
            continue;
        }

        decoder
            .send_packet(&packet)
            .map_err(|e| GraftError::LoudnessError(format!("Audio decode error: {e}")))?;

        while decoder.receive_frame(&mut decoded_frame).is_ok() {
            let _ = resampler
                .run(&decoded_frame, &mut resampled_frame)
                .map_err(|e| GraftError::LoudnessError(format!("Resample error: {e}")))?;

            let data = resampled_frame.data(0);
            let sample_count = resampled_frame.samples();
            let float_samples: &[f32] = unsafe {
                std::slice::from_raw_parts(data.as_ptr() as *const f32, sample_count)
            };

            for &s in float_samples {
                let abs = s.abs();
                if abs > peak {
                    peak = abs;
                }
                sum_sq += (s as f64) * (s as f64);
            }
            total_samples += sample_count as u64;
        }
    }

    let rms = if total_samples > 0 {
        (sum_sq / total_samples as f64).sqrt() as f32
    } else {
        0.0
    };

    let peak_dbfs = if peak > 0.0 {
        20.0 * (peak as f64).log10()
    } else {
        f64::NEG_INFINITY
    };

    let rms_dbfs = if rms > 0.0 {
        20.0 * (rms as f64).log10()
    } else {
        f64::NEG_INFINITY
    };

    let duration = Duration::from_secs_f64(total_samples as f64 / sample_rate.max(1) as f64);

    Ok(LoudnessStats {
        peak,
        peak_dbfs,
        rms,
        rms_dbfs,
        duration,
        total_samples,
    })
}
