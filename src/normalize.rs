//! Loudness normalization of the staged track.
//!
//! When normalization is enabled, the grafter measures the staged track's
//! loudness and — if the level is materially off target — re-encodes it with
//! a constant gain applied: decode, scale the f32 samples, encode to FLAC.
//! Subtitle streams riding along in the staging file are stream-copied
//! through unchanged. When the computed gain is below the configured
//! threshold, the stream-copied original is muxed as-is and no re-encode
//! happens.

use std::path::Path;

use ffmpeg_next::{
    Dictionary, Packet, Rational,
    codec::{Id, context::Context as CodecContext},
    format::{Sample, sample::Type as SampleType},
    frame::Audio as AudioFrame,
    media::Type,
    software::resampling::Context as ResamplingContext,
};

use crate::{
    error::GraftError,
    language::Language,
    loudness::{self, LoudnessStats},
    options::{GraftOptions, NormalizeOptions},
    progress::{OperationType, ProgressTracker},
};

/// What the normalization stage did.
#[derive(Debug, Clone, Copy)]
pub struct NormalizationReport {
    /// Loudness of the staged track before any adjustment.
    pub measured: LoudnessStats,
    /// The gain that was applied, in dB. `0.0` when nothing was applied.
    pub gain_db: f64,
    /// `true` when the track was re-encoded with the gain applied.
    pub applied: bool,
}

/// Compute the gain normalization would apply for `stats`.
///
/// The gain toward the target RMS is clamped to `±max_gain_db` and by the
/// peak headroom; anything below `min_gain_db` collapses to `0.0` (skip).
pub fn plan_gain(stats: &LoudnessStats, options: &NormalizeOptions) -> f64 {
    let gain = stats
        .gain_toward(options.target_rms_dbfs)
        .clamp(-options.max_gain_db, options.max_gain_db);
    if gain.abs() < options.min_gain_db {
        0.0
    } else {
        gain
    }
}

/// Measure the staged track and, when warranted, write a gain-adjusted copy
/// to `normalized_path`.
///
/// Returns the report; `applied == false` means `normalized_path` was not
/// written and the caller should keep muxing the original staged file.
pub(crate) fn normalize_staged(
    staged_path: &Path,
    normalized_path: &Path,
    language: Language,
    normalize_options: &NormalizeOptions,
    options: &GraftOptions,
) -> Result<NormalizationReport, GraftError> {
    let measured = loudness::analyze(staged_path, Some(0))?;
    let gain_db = plan_gain(&measured, normalize_options);

    if gain_db == 0.0 {
        log::info!(
            "Normalization skipped: RMS {:.2} dBFS already within {:.1} dB of target",
            measured.rms_dbfs,
            normalize_options.min_gain_db,
        );
        return Ok(NormalizationReport {
            measured,
            gain_db: 0.0,
            applied: false,
        });
    }

    log::info!(
        "Normalizing staged track: RMS {:.2} dBFS, applying {gain_db:+.2} dB",
        measured.rms_dbfs,
    );
    apply_gain(staged_path, normalized_path, gain_db, language, options)?;

    Ok(NormalizationReport {
        measured,
        gain_db,
        applied: true,
    })
}

/// Re-encode the staged audio with a constant gain, copying other streams.
fn apply_gain(
    staged_path: &Path,
    normalized_path: &Path,
    gain_db: f64,
    language: Language,
    options: &GraftOptions,
) -> Result<(), GraftError> {
    let gain = 10f32.powf(gain_db as f32 / 20.0);

    let mut input = ffmpeg_next::format::input(&staged_path).map_err(|error| {
        GraftError::FileOpen {
            path: staged_path.to_path_buf(),
            reason: error.to_string(),
        }
    })?;

    let audio_stream_index = input
        .streams()
        .best(Type::Audio)
        .map(|stream| stream.index())
        .ok_or_else(|| GraftError::NoAudioTracks {
            path: staged_path.to_path_buf(),
        })?;

    let mut decoder = {
        let stream = input
            .stream(audio_stream_index)
            .ok_or_else(|| GraftError::NoAudioTracks {
                path: staged_path.to_path_buf(),
            })?;
        CodecContext::from_parameters(stream.parameters())?
            .decoder()
            .audio()
            .map_err(|error| GraftError::AudioDecodeError(error.to_string()))?
    };

    let sample_rate = decoder.rate();
    let channel_layout = decoder.channel_layout();

    // FLAC keeps the adjusted track lossless and fits any Matroska muxer.
    let output_codec = ffmpeg_next::encoder::find(Id::FLAC)
        .ok_or_else(|| GraftError::AudioEncodeError("FLAC encoder unavailable".to_string()))?;

    let encoder_sample_format = output_codec
        .audio()
        .ok()
        .and_then(|audio_codec| audio_codec.formats())
        .and_then(|mut formats| formats.next())
        .unwrap_or(Sample::I16(SampleType::Packed));

    let mut encoder_context = CodecContext::new()
        .encoder()
        .audio()
        .map_err(|error| GraftError::AudioEncodeError(error.to_string()))?;
    encoder_context.set_rate(sample_rate as i32);
    encoder_context.set_channel_layout(channel_layout);
    encoder_context.set_format(encoder_sample_format);
    encoder_context.set_time_base(Rational(1, sample_rate as i32));

    let mut encoder = encoder_context
        .open_as(output_codec)
        .map_err(|error| GraftError::AudioEncodeError(error.to_string()))?;
    let encoder_time_base = Rational(1, sample_rate as i32);

    // Two-stage conversion: decoder format → f32 (where the gain is applied)
    // → encoder format.
    let f32_format = Sample::F32(SampleType::Packed);
    let mut to_f32 = ResamplingContext::get(
        decoder.format(),
        channel_layout,
        sample_rate,
        f32_format,
        channel_layout,
        sample_rate,
    )
    .map_err(|error| GraftError::AudioEncodeError(error.to_string()))?;
    let mut from_f32 = ResamplingContext::get(
        f32_format,
        channel_layout,
        sample_rate,
        encoder_sample_format,
        channel_layout,
        sample_rate,
    )
    .map_err(|error| GraftError::AudioEncodeError(error.to_string()))?;

    let mut output =
        ffmpeg_next::format::output_as(&normalized_path, "matroska").map_err(|error| {
            GraftError::AudioEncodeError(format!(
                "Failed to create normalized staging file {}: {error}",
                normalized_path.display(),
            ))
        })?;

    // input_stream_index → output_stream_index; the audio stream is
    // re-encoded, every other staged stream is copied through.
    let input_stream_count = input.streams().count();
    let mut stream_map: Vec<Option<usize>> = vec![None; input_stream_count];
    let mut next_output_index = 0usize;

    {
        let mut out_stream = output.add_stream(output_codec)?;
        out_stream.set_parameters(&encoder);
        out_stream.set_time_base(encoder_time_base);
        let mut metadata = Dictionary::new();
        metadata.set("language", language.code());
        out_stream.set_metadata(metadata);
        stream_map[audio_stream_index] = Some(next_output_index);
        next_output_index += 1;
    }

    for stream in input.streams() {
        if stream.index() == audio_stream_index {
            continue;
        }
        let mut out_stream = output.add_stream(ffmpeg_next::encoder::find(Id::None))?;
        out_stream.set_parameters(stream.parameters());
        unsafe {
            (*out_stream.parameters().as_mut_ptr()).codec_tag = 0;
        }
        let mut metadata = Dictionary::new();
        metadata.set("language", language.code());
        out_stream.set_metadata(metadata);
        stream_map[stream.index()] = Some(next_output_index);
        next_output_index += 1;
    }

    output
        .write_header()
        .map_err(|error| GraftError::AudioEncodeError(format!("Failed to write header: {error}")))?;

    let output_time_bases: Vec<_> = output.streams().map(|s| s.time_base()).collect();
    let audio_output_time_base = output_time_bases[0];

    let mut tracker = ProgressTracker::new(
        options.progress.clone(),
        OperationType::Normalization,
        None,
        options.batch_size,
    );

    let mut decoded_frame = AudioFrame::empty();
    let mut f32_frame = AudioFrame::empty();
    let mut encoded_frame = AudioFrame::empty();
    let mut encoded_packet = Packet::empty();
    let mut samples_written: i64 = 0;

    for (stream, mut packet) in input.packets() {
        if options.is_cancelled() {
            return Err(GraftError::Cancelled);
        }

        let Some(output_index) = stream_map.get(stream.index()).copied().flatten() else {
            continue;
        };

        if stream.index() == audio_stream_index {
            decoder
                .send_packet(&packet)
                .map_err(|error| GraftError::AudioDecodeError(error.to_string()))?;
            while decoder.receive_frame(&mut decoded_frame).is_ok() {
                scale_encode_write(
                    &mut to_f32,
                    &mut from_f32,
                    &mut encoder,
                    gain,
                    &decoded_frame,
                    &mut f32_frame,
                    &mut encoded_frame,
                    &mut encoded_packet,
                    &mut samples_written,
                    encoder_time_base,
                    audio_output_time_base,
                    &mut output,
                )?;
            }
        } else {
            let input_time_base = stream.time_base();
            packet.set_stream(output_index);
            packet.rescale_ts(input_time_base, output_time_bases[output_index]);
            packet.set_position(-1);
            packet
                .write_interleaved(&mut output)
                .map_err(|error| GraftError::AudioEncodeError(error.to_string()))?;
        }

        tracker.advance(None);
    }

    // Flush the decoder.
    let _ = decoder.send_eof();
    while decoder.receive_frame(&mut decoded_frame).is_ok() {
        scale_encode_write(
            &mut to_f32,
            &mut from_f32,
            &mut encoder,
            gain,
            &decoded_frame,
            &mut f32_frame,
            &mut encoded_frame,
            &mut encoded_packet,
            &mut samples_written,
            encoder_time_base,
            audio_output_time_base,
            &mut output,
        )?;
    }

    // Flush the encoder.
    let _ = encoder.send_eof();
    while encoder.receive_packet(&mut encoded_packet).is_ok() {
        encoded_packet.set_stream(0);
        encoded_packet.rescale_ts(encoder_time_base, audio_output_time_base);
        encoded_packet
            .write_interleaved(&mut output)
            .map_err(|error| GraftError::AudioEncodeError(error.to_string()))?;
    }

    output
        .write_trailer()
        .map_err(|error| GraftError::AudioEncodeError(error.to_string()))?;

    tracker.finish();
    Ok(())
}

/// Convert one decoded frame to f32, apply the gain, convert to the encoder
/// format, encode, and write the resulting packets.
#[allow(clippy::too_many_arguments)]
fn scale_encode_write(
    to_f32: &mut ResamplingContext,
    from_f32: &mut ResamplingContext,
    encoder: &mut ffmpeg_next::encoder::Audio,
    gain: f32,
    decoded_frame: &AudioFrame,
    f32_frame: &mut AudioFrame,
    encoded_frame: &mut AudioFrame,
    encoded_packet: &mut Packet,
    samples_written: &mut i64,
    encoder_time_base: Rational,
    output_time_base: Rational,
    output: &mut ffmpeg_next::format::context::Output,
) -> Result<(), GraftError> {
    let _ = to_f32
        .run(decoded_frame, f32_frame)
        .map_err(|error| GraftError::AudioEncodeError(error.to_string()))?;

    // Packed f32: plane 0 holds samples × channels interleaved values.
    let value_count = f32_frame.samples() * f32_frame.channels() as usize;
    let data = f32_frame.data_mut(0);
    let samples: &mut [f32] =
        unsafe { std::slice::from_raw_parts_mut(data.as_mut_ptr() as *mut f32, value_count) };
    for sample in samples.iter_mut() {
        *sample = (*sample * gain).clamp(-1.0, 1.0);
    }

    let _ = from_f32
        .run(f32_frame, encoded_frame)
        .map_err(|error| GraftError::AudioEncodeError(error.to_string()))?;

    encoded_frame.set_pts(Some(*samples_written));
    *samples_written += encoded_frame.samples() as i64;

    encoder
        .send_frame(encoded_frame)
        .map_err(|error| GraftError::AudioEncodeError(error.to_string()))?;

    while encoder.receive_packet(encoded_packet).is_ok() {
        encoded_packet.set_stream(0);
        encoded_packet.rescale_ts(encoder_time_base, output_time_base);
        encoded_packet
            .write_interleaved(output)
            .map_err(|error| GraftError::AudioEncodeError(error.to_string()))?;
    }

    Ok(())
}
