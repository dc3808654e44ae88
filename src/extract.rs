//! Staged track extraction (packet-level stream copy).
//!
//! [`TrackExtractor`] copies the selected donor streams into a Matroska
//! staging file without re-encoding — the audio keeps its native codec and
//! every packet is passed through untouched apart from timestamp rescaling.
//! The staged streams are tagged with the preferred language, which also
//! realizes the tag override when the undetermined-track fallback was used.

use std::path::Path;
use std::time::Duration;

use ffmpeg_next::{Dictionary, codec::Id};

use crate::{
    error::GraftError,
    inspect::MediaSource,
    language::Language,
    options::GraftOptions,
    progress::{OperationType, ProgressTracker},
    select::TrackSelection,
};

/// Copies selected donor streams into a staging container.
///
/// Consumes the donor's packet stream; the donor [`MediaSource`] should not
/// be reused for packet-level work afterwards.
pub struct TrackExtractor<'a> {
    donor: &'a mut MediaSource,
    audio_stream_index: usize,
    subtitle_stream_indices: Vec<usize>,
    language: Language,
}

impl<'a> TrackExtractor<'a> {
    /// Create an extractor for the streams picked by `selection`.
    ///
    /// Subtitles are included only when `options` asks for them.
    pub fn new(
        donor: &'a mut MediaSource,
        selection: &TrackSelection,
        language: Language,
        options: &GraftOptions,
    ) -> Self {
        let subtitle_stream_indices = if options.include_subtitles {
            selection
                .subtitles
                .iter()
                .map(|track| track.stream_index)
                .collect()
        } else {
            Vec::new()
        };

        Self {
            donor,
            audio_stream_index: selection.audio.stream_index,
            subtitle_stream_indices,
            language,
        }
    }

    /// Copy the selected streams into a Matroska file at `output_path`.
    ///
    /// The audio stream always lands at output index 0, subtitles follow in
    /// container order.
    ///
    /// # Errors
    ///
    /// Returns [`GraftError::TrackCopyError`] when the staging container
    /// cannot be created or written, and [`GraftError::Cancelled`] on
    /// cooperative cancellation.
    pub fn run(&mut self, output_path: &Path, options: &GraftOptions) -> Result<(), GraftError> {
        log::debug!(
            "Copying stream {} (+{} subtitle streams) from {} to {}",
            self.audio_stream_index,
            self.subtitle_stream_indices.len(),
            self.donor.path().display(),
            output_path.display(),
        );

        let mut output =
            ffmpeg_next::format::output_as(&output_path, "matroska").map_err(|error| {
                GraftError::TrackCopyError(format!(
                    "Failed to create staging file {}: {error}",
                    output_path.display(),
                ))
            })?;

        // Selected donor streams, audio first.
        let mut selected = Vec::with_capacity(1 + self.subtitle_stream_indices.len());
        selected.push(self.audio_stream_index);
        selected.extend(self.subtitle_stream_indices.iter().copied());

        // input_stream_index → output_stream_index.
        let input_stream_count = self.donor.input.streams().count();
        let mut stream_map: Vec<Option<usize>> = vec![None; input_stream_count];

        for (output_index, &input_index) in selected.iter().enumerate() {
            let stream = self
                .donor
                .input
                .stream(input_index)
                .ok_or_else(|| {
                    GraftError::TrackCopyError(format!(
                        "Donor stream {input_index} disappeared during extraction"
                    ))
                })?;

            let title = stream.metadata().get("title").map(|s| s.to_string());

            let mut out_stream = output.add_stream(ffmpeg_next::encoder::find(Id::None))?;
            out_stream.set_parameters(stream.parameters());
            // Reset codec tag to let the muxer choose.
            unsafe {
                (*out_stream.parameters().as_mut_ptr()).codec_tag = 0;
            }

            let mut metadata = Dictionary::new();
            metadata.set("language", self.language.code());
            if let Some(title) = title.as_deref() {
                metadata.set("title", title);
            }
            out_stream.set_metadata(metadata);

            stream_map[input_index] = Some(output_index);
        }

        output
            .write_header()
            .map_err(|error| GraftError::TrackCopyError(format!("Failed to write staging header: {error}")))?;

        let output_time_bases: Vec<_> = output.streams().map(|s| s.time_base()).collect();

        let mut tracker = ProgressTracker::new(
            options.progress.clone(),
            OperationType::TrackCopy,
            None,
            options.batch_size,
        );

        for (stream, mut packet) in self.donor.input.packets() {
            if options.is_cancelled() {
                return Err(GraftError::Cancelled);
            }

            let Some(output_index) = stream_map.get(stream.index()).copied().flatten() else {
                continue;
            };

            let input_time_base = stream.time_base();
            let output_time_base = output_time_bases[output_index];

            let position = packet.dts().or(packet.pts()).map(|ts| {
                Duration::from_secs_f64(
                    (ts.max(0) as f64 * input_time_base.numerator() as f64
                        / input_time_base.denominator() as f64)
                        .max(0.0),
                )
            });

            packet.set_stream(output_index);
            packet.rescale_ts(input_time_base, output_time_base);
            packet.set_position(-1);
            packet
                .write_interleaved(&mut output)
                .map_err(|error| GraftError::TrackCopyError(format!("Failed to write packet: {error}")))?;

            tracker.advance(position);
        }

        output
            .write_trailer()
            .map_err(|error| GraftError::TrackCopyError(format!("Failed to finalize staging file: {error}")))?;

        tracker.finish();
        Ok(())
    }
}
