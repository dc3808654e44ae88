//! Merging the staged tracks into the target container.
//!
//! [`TrackMuxer`] reads the target file and the staged donor tracks, maps
//! both into a fresh output container, and writes their packets interleaved
//! in decode-timestamp order. No stream is re-encoded. Along the way it
//! applies the track-flag policy: existing audio defaults are demoted, the
//! grafted track can become the new default, target audio already tagged
//! with the preferred language can be dropped, and forced subtitles keep (or
//! gain) the default flag.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ffmpeg_next::{
    Dictionary, Packet, Rational,
    codec::Id,
    format::context::Input,
    format::stream::Disposition,
    media::Type,
};
use ffmpeg_sys_next::{AV_DISPOSITION_DEFAULT, AV_DISPOSITION_FORCED};

use crate::{
    error::GraftError,
    language::Language,
    options::GraftOptions,
    progress::{OperationType, ProgressTracker},
};

// AVStream.disposition is a c_int.
#[allow(clippy::unnecessary_cast)]
const DISPOSITION_DEFAULT: i32 = AV_DISPOSITION_DEFAULT as i32;
#[allow(clippy::unnecessary_cast)]
const DISPOSITION_FORCED: i32 = AV_DISPOSITION_FORCED as i32;

/// Counts of what the mux actually wrote.
#[derive(Debug, Clone, Copy)]
pub struct MuxSummary {
    /// Streams written to the output container.
    pub streams_written: usize,
    /// Target audio tracks dropped because they matched the language.
    pub audio_dropped: usize,
    /// Donor subtitle tracks added.
    pub subtitles_added: usize,
}

/// Which input a planned output stream comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Target,
    Staged,
}

/// One stream of the output container, before it is created.
struct PlannedStream {
    origin: Origin,
    input_index: usize,
    disposition: i32,
    language: Option<String>,
    title: Option<String>,
}

/// Merges the target container and the staged donor tracks into the output.
///
/// # Example
///
/// ```no_run
/// use audiograft::{GraftError, GraftOptions, Language, TrackMuxer};
///
/// let language = Language::resolve("eng").ok_or(GraftError::UnknownLanguage("eng".into()))?;
/// TrackMuxer::new("movie.mkv", "staged.mka", "movie-out.mkv", language)?
///     .run(&GraftOptions::new())?;
/// # Ok::<(), GraftError>(())
/// ```
pub struct TrackMuxer {
    target_path: PathBuf,
    staged_path: PathBuf,
    output_path: PathBuf,
    language: Language,
}

impl TrackMuxer {
    /// Create a muxer from a target file and a staged donor-tracks file.
    ///
    /// The output container format is inferred from `output`'s extension.
    ///
    /// # Errors
    ///
    /// - [`GraftError::FileOpen`] if either input does not exist.
    /// - [`GraftError::OutputCollision`] if `output` equals either input.
    pub fn new<P1: AsRef<Path>, P2: AsRef<Path>, P3: AsRef<Path>>(
        target: P1,
        staged: P2,
        output: P3,
        language: Language,
    ) -> Result<Self, GraftError> {
        let target_path = target.as_ref().to_path_buf();
        let staged_path = staged.as_ref().to_path_buf();
        let output_path = output.as_ref().to_path_buf();

        ffmpeg_next::init().map_err(|error| GraftError::FileOpen {
            path: target_path.clone(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        for path in [&target_path, &staged_path] {
            if !path.exists() {
                return Err(GraftError::FileOpen {
                    path: path.clone(),
                    reason: "File does not exist".to_string(),
                });
            }
        }

        if output_path == target_path || output_path == staged_path {
            return Err(GraftError::OutputCollision { path: output_path });
        }

        Ok(Self {
            target_path,
            staged_path,
            output_path,
            language,
        })
    }

    /// Execute the merge.
    ///
    /// # Errors
    ///
    /// Returns [`GraftError::MuxError`] when the output cannot be created or
    /// written, and [`GraftError::Cancelled`] on cooperative cancellation.
    pub fn run(&self, options: &GraftOptions) -> Result<MuxSummary, GraftError> {
        log::debug!(
            "Muxing {} + {} -> {}",
            self.target_path.display(),
            self.staged_path.display(),
            self.output_path.display(),
        );

        let mut target =
            ffmpeg_next::format::input(&self.target_path).map_err(|error| GraftError::FileOpen {
                path: self.target_path.clone(),
                reason: error.to_string(),
            })?;
        let mut staged =
            ffmpeg_next::format::input(&self.staged_path).map_err(|error| GraftError::FileOpen {
                path: self.staged_path.clone(),
                reason: error.to_string(),
            })?;

        let (planned, audio_dropped, subtitles_added) = self.plan_streams(&target, &staged, options);

        if planned.is_empty() {
            return Err(GraftError::MuxError(
                "Nothing to write: no stream survived the mux plan".to_string(),
            ));
        }

        let mut output = ffmpeg_next::format::output(&self.output_path).map_err(|error| {
            GraftError::MuxError(format!(
                "Failed to create output {}: {error}",
                self.output_path.display(),
            ))
        })?;

        // input_stream_index → output_stream_index, one map per input.
        let mut target_map: Vec<Option<usize>> = vec![None; target.streams().count()];
        let mut staged_map: Vec<Option<usize>> = vec![None; staged.streams().count()];

        for (output_index, plan) in planned.iter().enumerate() {
            let input = match plan.origin {
                Origin::Target => &target,
                Origin::Staged => &staged,
            };
            let stream = input.stream(plan.input_index).ok_or_else(|| {
                GraftError::MuxError(format!(
                    "Input stream {} disappeared during muxing",
                    plan.input_index,
                ))
            })?;

            let mut out_stream = output.add_stream(ffmpeg_next::encoder::find(Id::None))?;
            out_stream.set_parameters(stream.parameters());
            // Reset codec tag to let the muxer choose.
            unsafe {
                (*out_stream.parameters().as_mut_ptr()).codec_tag = 0;
            }

            let mut metadata = Dictionary::new();
            if let Some(language) = plan.language.as_deref() {
                metadata.set("language", language);
            }
            if let Some(title) = plan.title.as_deref() {
                metadata.set("title", title);
            }
            out_stream.set_metadata(metadata);

            match plan.origin {
                Origin::Target => target_map[plan.input_index] = Some(output_index),
                Origin::Staged => staged_map[plan.input_index] = Some(output_index),
            }
        }

        // Track-flag policy is carried in the container header, so the
        // dispositions must be in place before it is written.
        for (output_index, plan) in planned.iter().enumerate() {
            if let Some(mut out_stream) = output.stream_mut(output_index) {
                unsafe {
                    (*out_stream.as_mut_ptr()).disposition = plan.disposition;
                }
            }
        }

        output
            .write_header()
            .map_err(|error| GraftError::MuxError(format!("Failed to write header: {error}")))?;

        let output_time_bases: Vec<Rational> = output.streams().map(|s| s.time_base()).collect();

        let mut tracker = ProgressTracker::new(
            options.progress.clone(),
            OperationType::Muxing,
            None,
            options.batch_size,
        );

        self.merge_packets(
            &mut target,
            &mut staged,
            &target_map,
            &staged_map,
            &output_time_bases,
            &mut output,
            options,
            &mut tracker,
        )?;

        output
            .write_trailer()
            .map_err(|error| GraftError::MuxError(format!("Failed to write trailer: {error}")))?;

        tracker.finish();

        Ok(MuxSummary {
            streams_written: planned.len(),
            audio_dropped,
            subtitles_added,
        })
    }

    /// Decide which streams reach the output, in which order, and with
    /// which flags.
    ///
    /// Returns the plan plus the dropped-audio and added-subtitle counts.
    fn plan_streams(
        &self,
        target: &Input,
        staged: &Input,
        options: &GraftOptions,
    ) -> (Vec<PlannedStream>, usize, usize) {
        let mut target_video = Vec::new();
        let mut target_rest = Vec::new();
        let mut staged_audio = Vec::new();
        let mut staged_subtitles = Vec::new();
        let mut audio_dropped = 0usize;
        let mut subtitles_added = 0usize;
        let mut found_forced_sub = false;

        for stream in target.streams() {
            let medium = stream.parameters().medium();
            let language = stream.metadata().get("language").map(|s| s.to_string());
            let title = stream.metadata().get("title").map(|s| s.to_string());
            let tag_matches = language
                .as_deref()
                .is_some_and(|tag| self.language.matches_tag(tag));
            let mut disposition = stream.disposition().bits();

            match medium {
                Type::Video => {}
                Type::Audio => {
                    if options.drop_matching_audio && tag_matches {
                        audio_dropped += 1;
                        continue;
                    }
                    // Existing audio loses the default flag to the graft.
                    disposition &= !DISPOSITION_DEFAULT;
                }
                Type::Subtitle => {
                    let forced = stream.disposition().contains(Disposition::FORCED);
                    if tag_matches && forced {
                        disposition |= DISPOSITION_DEFAULT;
                        found_forced_sub = true;
                    } else {
                        disposition &= !DISPOSITION_DEFAULT;
                    }
                }
                _ => continue,
            }

            let plan = PlannedStream {
                origin: Origin::Target,
                input_index: stream.index(),
                disposition,
                language,
                title,
            };
            if medium == Type::Video {
                target_video.push(plan);
            } else {
                target_rest.push(plan);
            }
        }

        for stream in staged.streams() {
            let medium = stream.parameters().medium();
            let language = stream.metadata().get("language").map(|s| s.to_string());
            let title = stream.metadata().get("title").map(|s| s.to_string());
            let mut disposition = stream.disposition().bits() & !DISPOSITION_DEFAULT;

            let plan_list = match medium {
                Type::Audio => {
                    if options.set_default {
                        disposition |= DISPOSITION_DEFAULT;
                    }
                    &mut staged_audio
                }
                Type::Subtitle => {
                    let forced = disposition & DISPOSITION_FORCED != 0;
                    if forced && !found_forced_sub {
                        disposition |= DISPOSITION_DEFAULT;
                        found_forced_sub = true;
                    }
                    subtitles_added += 1;
                    &mut staged_subtitles
                }
                _ => continue,
            };

            plan_list.push(PlannedStream {
                origin: Origin::Staged,
                input_index: stream.index(),
                disposition,
                language,
                title,
            });
        }

        // `graft_first` reorders the grafted audio ahead of the existing
        // tracks; otherwise it is appended after them.
        let mut planned = target_video;
        if options.graft_first {
            planned.extend(staged_audio);
            planned.extend(target_rest);
        } else {
            planned.extend(target_rest);
            planned.extend(staged_audio);
        }
        planned.extend(staged_subtitles);

        (planned, audio_dropped, subtitles_added)
    }

    /// Write packets from both inputs in decode-timestamp order.
    #[allow(clippy::too_many_arguments)]
    fn merge_packets(
        &self,
        target: &mut Input,
        staged: &mut Input,
        target_map: &[Option<usize>],
        staged_map: &[Option<usize>],
        output_time_bases: &[Rational],
        output: &mut ffmpeg_next::format::context::Output,
        options: &GraftOptions,
        tracker: &mut ProgressTracker,
    ) -> Result<(), GraftError> {
        let mut target_iter = target.packets();
        let mut staged_iter = staged.packets();

        // Timestamps within each input are (near-)monotonic, so a two-way
        // merge on the head packets keeps the output in global dts order.
        let mut pending_target = next_mapped(&mut target_iter, target_map);
        let mut pending_staged = next_mapped(&mut staged_iter, staged_map);
        let mut last_target_seconds = 0.0f64;
        let mut last_staged_seconds = 0.0f64;

        loop {
            if options.is_cancelled() {
                return Err(GraftError::Cancelled);
            }

            let take_target = match (&pending_target, &pending_staged) {
                (None, None) => break,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (Some(a), Some(b)) => {
                    let a_seconds = a.seconds.unwrap_or(last_target_seconds);
                    let b_seconds = b.seconds.unwrap_or(last_staged_seconds);
                    a_seconds <= b_seconds
                }
            };

            let pending = if take_target {
                let pending = pending_target.take();
                pending_target = next_mapped(&mut target_iter, target_map);
                pending
            } else {
                let pending = pending_staged.take();
                pending_staged = next_mapped(&mut staged_iter, staged_map);
                pending
            };

            let Some(mut pending) = pending else { break };

            if let Some(seconds) = pending.seconds {
                if take_target {
                    last_target_seconds = seconds;
                } else {
                    last_staged_seconds = seconds;
                }
            }

            let position = pending
                .seconds
                .filter(|s| *s >= 0.0)
                .map(Duration::from_secs_f64);

            pending.packet.set_stream(pending.output_index);
            pending
                .packet
                .rescale_ts(pending.time_base, output_time_bases[pending.output_index]);
            pending.packet.set_position(-1);
            pending
                .packet
                .write_interleaved(output)
                .map_err(|error| GraftError::MuxError(format!("Failed to write packet: {error}")))?;

            tracker.advance(position);
        }

        Ok(())
    }
}

/// A packet pulled off one input, ready to be written.
struct PendingPacket {
    output_index: usize,
    time_base: Rational,
    seconds: Option<f64>,
    packet: Packet,
}

/// Pull the next packet that maps to an output stream, skipping the rest.
fn next_mapped(
    iter: &mut ffmpeg_next::format::context::input::PacketIter<'_>,
    stream_map: &[Option<usize>],
) -> Option<PendingPacket> {
    for (stream, packet) in iter.by_ref() {
        let Some(output_index) = stream_map.get(stream.index()).copied().flatten() else {
            continue;
        };

        let time_base = stream.time_base();
        let seconds = packet.dts().or(packet.pts()).map(|ts| {
            ts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
        });

        return Some(PendingPacket {
            output_index,
            time_base,
            seconds,
            packet,
        });
    }
    None
}
