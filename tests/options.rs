//! Option builder and normalization planning tests.

use std::time::Duration;

use audiograft::{
    CancellationToken, GraftOptions, LoudnessStats, NormalizeOptions,
    normalize::plan_gain,
};

fn stats(rms_dbfs: f64, peak_dbfs: f64) -> LoudnessStats {
    LoudnessStats {
        peak: 10f64.powf(peak_dbfs / 20.0) as f32,
        peak_dbfs,
        rms: 10f64.powf(rms_dbfs / 20.0) as f32,
        rms_dbfs,
        duration: Duration::from_secs(60),
        total_samples: 2_880_000,
    }
}

#[test]
fn options_builder_chains() {
    let options = GraftOptions::new()
        .with_force(true)
        .with_assume_undefined(true)
        .with_subtitles(false)
        .with_drop_matching_audio(true)
        .with_set_default(false)
        .with_duration_tolerance(Duration::from_secs(2))
        .with_strict_duration(true)
        .with_batch_size(0);

    // Builder values survive into Debug output; batch size clamps to 1.
    let debug = format!("{options:?}");
    assert!(debug.contains("force: true"));
    assert!(debug.contains("assume_undefined: true"));
    assert!(debug.contains("include_subtitles: false"));
    assert!(debug.contains("drop_matching_audio: true"));
    assert!(debug.contains("set_default: false"));
    assert!(debug.contains("strict_duration: true"));
    assert!(debug.contains("batch_size: 1"));
}

#[test]
fn normalize_options_defaults() {
    let options = GraftOptions::new().with_normalization(NormalizeOptions::new());
    let debug = format!("{options:?}");
    assert!(debug.contains("target_rms_dbfs: -20.0"));
}

#[test]
fn cancellation_token_propagates_to_clones() {
    let token = CancellationToken::new();
    let clone = token.clone();
    assert!(!clone.is_cancelled());
    token.cancel();
    assert!(clone.is_cancelled());
}

#[test]
fn gain_moves_rms_toward_target() {
    // Quiet track with plenty of headroom: full correction applies.
    let quiet = stats(-30.0, -12.0);
    let gain = plan_gain(&quiet, &NormalizeOptions::new());
    assert!((gain - 10.0).abs() < 1e-9, "gain was {gain}");
}

#[test]
fn gain_is_clamped_by_peak_headroom() {
    // Needs +10 dB but only 3 dB of headroom before clipping.
    let hot = stats(-30.0, -3.0);
    let gain = plan_gain(&hot, &NormalizeOptions::new());
    assert!((gain - 3.0).abs() < 1e-9, "gain was {gain}");
}

#[test]
fn gain_is_clamped_by_max_gain() {
    let very_quiet = stats(-60.0, -45.0);
    let gain = plan_gain(
        &very_quiet,
        &NormalizeOptions::new().with_max_gain_db(12.0),
    );
    assert!((gain - 12.0).abs() < 1e-9, "gain was {gain}");
}

#[test]
fn small_gains_are_skipped() {
    let on_target = stats(-20.2, -6.0);
    let gain = plan_gain(&on_target, &NormalizeOptions::new());
    assert_eq!(gain, 0.0);
}

#[test]
fn negative_gain_attenuates_loud_tracks() {
    let loud = stats(-12.0, -1.0);
    let gain = plan_gain(&loud, &NormalizeOptions::new());
    assert!((gain + 8.0).abs() < 1e-9, "gain was {gain}");
}

#[test]
fn silent_audio_gets_no_gain() {
    let silent = LoudnessStats {
        peak: 0.0,
        peak_dbfs: f64::NEG_INFINITY,
        rms: 0.0,
        rms_dbfs: f64::NEG_INFINITY,
        duration: Duration::ZERO,
        total_samples: 0,
    };
    assert_eq!(plan_gain(&silent, &NormalizeOptions::new()), 0.0);
}
