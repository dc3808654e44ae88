//! Track selection policy.
//!
//! Given the donor's cached metadata and a preferred [`Language`], this
//! module decides which audio track gets grafted. Candidates whose tag is the
//! exact bibliographic ISO 639-2 code rank ahead of other alias matches
//! (`fra`, `fr`, `fr-CA` for French); within a rank, container order wins.
//! When nothing matches, the caller either gets a clear error naming the tags
//! that *are* present, or — with the explicit `assume_undefined` opt-in —
//! the first undetermined-tagged track, whose tag is then overwritten with
//! the preferred language downstream.

use std::path::Path;

use crate::{
    error::GraftError,
    language::Language,
    metadata::{AudioTrack, MediaInfo, SubtitleTrack},
};

/// The outcome of track selection on a donor file.
#[derive(Debug, Clone)]
#[must_use]
pub struct TrackSelection {
    /// The audio track to graft.
    pub audio: AudioTrack,
    /// Remaining candidates that also matched, in rank order. Informational:
    /// exactly one track is grafted.
    pub alternates: Vec<AudioTrack>,
    /// Subtitle tracks matching the language, in container order. Grafted
    /// alongside the audio unless disabled.
    pub subtitles: Vec<SubtitleTrack>,
    /// `true` when no tag matched and an undetermined-tagged track was
    /// selected instead.
    pub fallback_used: bool,
}

/// Select the donor tracks to graft.
///
/// `assume_undefined` enables the fallback to undetermined-tagged tracks
/// when no tag matches the preferred language.
///
/// # Errors
///
/// - [`GraftError::NoAudioTracks`] when the donor has no audio at all.
/// - [`GraftError::NoMatchingTrack`] when no tag matches and the fallback is
///   disabled or finds nothing, listing the tags actually present.
pub fn select_tracks(
    info: &MediaInfo,
    language: &Language,
    assume_undefined: bool,
    donor_path: &Path,
) -> Result<TrackSelection, GraftError> {
    if info.audio_tracks.is_empty() {
        return Err(GraftError::NoAudioTracks {
            path: donor_path.to_path_buf(),
        });
    }

    let mut ranked = rank_candidates(&info.audio_tracks, language);
    let mut fallback_used = false;

    if ranked.is_empty() && assume_undefined {
        log::debug!(
            "No audio track tagged '{}'; falling back to undetermined-tagged tracks",
            language.code(),
        );
        ranked = info
            .audio_tracks
            .iter()
            .filter(|track| track.is_untagged())
            .cloned()
            .collect();
        fallback_used = !ranked.is_empty();
    }

    if ranked.is_empty() {
        return Err(GraftError::NoMatchingTrack {
            language: language.code().to_string(),
            available: describe_tags(info),
        });
    }

    let audio = ranked.remove(0);
    let subtitles = matching_subtitles(info, language);

    log::info!(
        "Selected audio track {} ({}, {} ch) for '{}'{}",
        audio.track_index,
        audio.codec,
        audio.channels,
        language.code(),
        if fallback_used { " via und fallback" } else { "" },
    );

    Ok(TrackSelection {
        audio,
        alternates: ranked,
        subtitles,
        fallback_used,
    })
}

/// Subtitle tracks in the donor matching the language, container order.
pub fn matching_subtitles(info: &MediaInfo, language: &Language) -> Vec<SubtitleTrack> {
    info.subtitle_tracks
        .iter()
        .filter(|track| track.matches_language(language))
        .cloned()
        .collect()
}

/// Matching audio tracks, exact-code matches first, container order within
/// each rank.
fn rank_candidates(tracks: &[AudioTrack], language: &Language) -> Vec<AudioTrack> {
    let mut exact = Vec::new();
    let mut aliased = Vec::new();

    for track in tracks {
        let Some(tag) = track.language.as_deref() else {
            continue;
        };
        if language.is_exact_code(tag) {
            exact.push(track.clone());
        } else if language.matches_tag(tag) {
            aliased.push(track.clone());
        }
    }

    exact.extend(aliased);
    exact
}

/// Comma-joined list of audio language tags for the no-match error.
fn describe_tags(info: &MediaInfo) -> String {
    let tags = info.audio_language_tags();
    if tags.is_empty() {
        "none".to_string()
    } else {
        tags.join(", ")
    }
}
