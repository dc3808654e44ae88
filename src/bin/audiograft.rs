use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use audiograft::{
    FfmpegLogLevel, GraftOptions, GraftOutcome, Grafter, Language, MediaSource,
    NormalizeOptions, ProgressCallback, ProgressInfo, compat, loudness, select,
};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  audiograft graft movie.mkv french-dub.mkv --language fre\n  audiograft graft movie.mkv dub.mkv -l en --out movie-eng.mkv --normalize --progress\n  audiograft tracks movie.mkv --json\n  audiograft check movie.mkv --language fre\n  audiograft completions zsh > _audiograft";

#[derive(Debug, Parser)]
#[command(
    name = "audiograft",
    version,
    about = "Graft a preferred-language audio track from one media file onto another",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show additional logging output.
    #[arg(long)]
    verbose: bool,

    /// Show a progress bar where supported.
    #[arg(long)]
    progress: bool,

    /// Allow overwriting existing output files.
    #[arg(long)]
    overwrite: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Graft an audio track from a donor file into a video file.
    #[command(
        about = "Graft a preferred-language audio track",
        after_help = "Examples:\n  audiograft graft movie.mkv dub.mkv --language fre\n  audiograft graft movie.mkv dub.mkv -l en --drop-existing --strict-duration"
    )]
    Graft {
        /// Target video file the track is added to.
        video: PathBuf,
        /// Donor file the track is taken from.
        donor: PathBuf,
        /// Preferred language (ISO 639 code or English name).
        #[arg(short, long)]
        language: String,
        /// Output file path (defaults to `<video stem>-out.<ext>`).
        #[arg(long)]
        out: Option<PathBuf>,
        /// Graft even if the language is already present in the video.
        #[arg(short, long)]
        force: bool,
        /// Fall back to undetermined-tagged donor tracks when nothing matches.
        #[arg(long)]
        assume_undefined: bool,
        /// Do not mark the grafted track as the default audio track.
        #[arg(long)]
        no_default: bool,
        /// Drop existing video audio tracks already tagged with the language.
        #[arg(long)]
        drop_existing: bool,
        /// Place the grafted track ahead of the existing audio tracks.
        #[arg(long)]
        first: bool,
        /// Do not graft matching donor subtitles.
        #[arg(long)]
        no_subtitles: bool,
        /// Normalize the grafted track's loudness.
        #[arg(long)]
        normalize: bool,
        /// Target RMS level in dBFS for --normalize.
        #[arg(long, default_value_t = -20.0, allow_negative_numbers = true)]
        target_rms: f64,
        /// Allowed donor/target duration delta in seconds.
        #[arg(long, default_value = "0.5")]
        tolerance: String,
        /// Treat a duration mismatch beyond the tolerance as an error.
        #[arg(long)]
        strict_duration: bool,
    },

    /// List audio and subtitle tracks of a media file (alias: probe).
    #[command(
        about = "List tracks with language tags",
        visible_alias = "probe",
        visible_alias = "info",
        after_help = "Examples:\n  audiograft tracks movie.mkv\n  audiograft tracks movie.mkv --json"
    )]
    Tracks {
        /// Input media path.
        input: PathBuf,
        /// Output track metadata as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Check whether a video already has audio in a language.
    #[command(
        about = "Check for audio in a language",
        after_help = "Exit code 0 when the language is present, 1 when absent."
    )]
    Check {
        /// Input media path.
        video: PathBuf,
        /// Language to look for (ISO 639 code or English name).
        #[arg(short, long)]
        language: String,
    },

    /// Run the pre-mux compatibility checks and print the report.
    #[command(about = "Report graft compatibility")]
    Compat {
        /// Target video file.
        video: PathBuf,
        /// Donor file.
        donor: PathBuf,
        /// Preferred language (ISO 639 code or English name).
        #[arg(short, long)]
        language: String,
        /// Allowed donor/target duration delta in seconds.
        #[arg(long, default_value = "0.5")]
        tolerance: String,
        /// Fall back to undetermined-tagged donor tracks when nothing matches.
        #[arg(long)]
        assume_undefined: bool,
    },

    /// Analyze audio loudness.
    #[command(about = "Analyze audio loudness")]
    Loudness {
        /// Input media path.
        input: PathBuf,
        /// Zero-based audio track index (defaults to the first track).
        #[arg(long)]
        track: Option<usize>,
        /// Output as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn resolve_language(value: &str) -> Result<Language, Box<dyn std::error::Error>> {
    Language::resolve(value)
        .ok_or_else(|| format!("language '{value}' not recognized (ISO 639 code or English name)").into())
}

fn parse_seconds(value: &str) -> Result<Duration, Box<dyn std::error::Error>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("duration value cannot be empty".into());
    }
    let seconds = trimmed.parse::<f64>()?;
    if seconds < 0.0 || !seconds.is_finite() {
        return Err(format!("invalid duration: {trimmed}").into());
    }
    Ok(Duration::from_secs_f64(seconds))
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        if overwrite {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("overwriting {}", path.display()).yellow()
            );
        } else {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(level) = &global.log_level {
        let parsed: FfmpegLogLevel = level.parse().map_err(|e| format!("--log-level: {e}"))?;
        audiograft::set_ffmpeg_log_level(parsed);
    }
    Ok(())
}

/// Bridges library progress callbacks onto an indicatif spinner.
struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.green} {pos} packets {msg}")?;
        bar.set_style(style);
        Ok(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_with_message("done");
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.bar.set_position(info.current);
        let mut message = format!("{:?}", info.operation);
        if let Some(position) = info.position {
            message.push_str(&format!(" @ {:.1}s", position.as_secs_f64()));
        }
        self.bar.set_message(message);
    }
}

fn track_language(language: &Option<String>) -> &str {
    language.as_deref().unwrap_or("und")
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global)?;

    match cli.command {
        Commands::Graft {
            video,
            donor,
            language,
            out,
            force,
            assume_undefined,
            no_default,
            drop_existing,
            first,
            no_subtitles,
            normalize,
            target_rms,
            tolerance,
            strict_duration,
        } => {
            let language = resolve_language(&language)?;
            let tolerance = parse_seconds(&tolerance)?;

            let mut options = GraftOptions::new()
                .with_force(force)
                .with_assume_undefined(assume_undefined)
                .with_set_default(!no_default)
                .with_drop_matching_audio(drop_existing)
                .with_graft_first(first)
                .with_subtitles(!no_subtitles)
                .with_duration_tolerance(tolerance)
                .with_strict_duration(strict_duration);

            if normalize {
                options = options.with_normalization(
                    NormalizeOptions::new().with_target_rms_dbfs(target_rms),
                );
            }

            let progress = if cli.global.progress {
                let progress = Arc::new(TerminalProgress::new()?);
                options = options
                    .with_progress(progress.clone())
                    .with_batch_size(256);
                Some(progress)
            } else {
                None
            };

            let mut grafter = Grafter::new(&video, &donor, language)?.with_options(options);
            if let Some(out) = out {
                grafter = grafter.with_output(out);
            }

            ensure_writable_path(grafter.output_path(), cli.global.overwrite)?;

            let outcome = grafter.run()?;
            if let Some(progress) = &progress {
                progress.finish();
            }

            match outcome {
                GraftOutcome::AlreadyPresent { language } => {
                    println!(
                        "{} {}",
                        "skipped:".yellow().bold(),
                        format!("{language} audio already present (use --force to graft anyway)")
                            .yellow()
                    );
                }
                GraftOutcome::Grafted(report) => {
                    for warning in &report.warnings {
                        eprintln!("{} {}", "warning:".yellow().bold(), warning.yellow());
                    }
                    if cli.global.verbose {
                        eprintln!(
                            "grafted track {}: {} {}Hz {}ch{}",
                            report.track.track_index,
                            report.track.codec,
                            report.track.sample_rate,
                            report.track.channels,
                            if report.fallback_used {
                                " (und fallback)"
                            } else {
                                ""
                            },
                        );
                        if let Some(normalization) = &report.normalization {
                            if normalization.applied {
                                eprintln!(
                                    "normalized: {:+.2} dB (was {:.2} dBFS RMS)",
                                    normalization.gain_db, normalization.measured.rms_dbfs,
                                );
                            } else {
                                eprintln!(
                                    "normalization skipped: {:.2} dBFS RMS already on target",
                                    normalization.measured.rms_dbfs,
                                );
                            }
                        }
                        if report.subtitles_added > 0 {
                            eprintln!("subtitles added: {}", report.subtitles_added);
                        }
                        if report.audio_dropped > 0 {
                            eprintln!("existing audio tracks dropped: {}", report.audio_dropped);
                        }
                    }
                    println!(
                        "{} {}",
                        "saved".green().bold(),
                        report.output.display()
                    );
                }
            }
        }
        Commands::Tracks { input, json } => {
            let source = MediaSource::open(&input)?;
            let info = source.info();
            if json {
                let payload = json!({
                    "format": info.format,
                    "duration_seconds": info.duration.as_secs_f64(),
                    "video": info.video.as_ref().map(|video| json!({
                        "width": video.width,
                        "height": video.height,
                        "fps": video.frames_per_second,
                        "codec": video.codec,
                    })),
                    "audio_tracks": info.audio_tracks.iter().map(|track| json!({
                        "track": track.track_index,
                        "codec": track.codec,
                        "channels": track.channels,
                        "sample_rate": track.sample_rate,
                        "bit_rate": track.bit_rate,
                        "language": track.language,
                        "title": track.title,
                        "default": track.default,
                        "forced": track.forced,
                    })).collect::<Vec<_>>(),
                    "subtitle_tracks": info.subtitle_tracks.iter().map(|track| json!({
                        "track": track.track_index,
                        "codec": track.codec,
                        "language": track.language,
                        "default": track.default,
                        "forced": track.forced,
                    })).collect::<Vec<_>>(),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("Format: {}", info.format);
                println!("Duration: {:.3}s", info.duration.as_secs_f64());
                if let Some(video) = &info.video {
                    println!(
                        "Video: {}x{} @ {:.2} fps [{}]",
                        video.width, video.height, video.frames_per_second, video.codec,
                    );
                }
                for track in &info.audio_tracks {
                    println!(
                        "Audio {}: {} {} Hz {} ch [{}]{}{}",
                        track.track_index,
                        track.codec,
                        track.sample_rate,
                        track.channels,
                        track_language(&track.language),
                        if track.default { " default" } else { "" },
                        if track.forced { " forced" } else { "" },
                    );
                }
                for track in &info.subtitle_tracks {
                    println!(
                        "Subtitle {}: {} [{}]{}{}",
                        track.track_index,
                        track.codec,
                        track_language(&track.language),
                        if track.default { " default" } else { "" },
                        if track.forced { " forced" } else { "" },
                    );
                }
            }
        }
        Commands::Check { video, language } => {
            let language = resolve_language(&language)?;
            let source = MediaSource::open(&video)?;
            if source.audio_language_present(&language) {
                println!(
                    "{} {}",
                    "present:".green().bold(),
                    format!("{language} audio found in {}", video.display()).green()
                );
            } else {
                println!(
                    "{} {}",
                    "absent:".yellow().bold(),
                    format!("no {language} audio in {}", video.display()).yellow()
                );
                std::process::exit(1);
            }
        }
        Commands::Compat {
            video,
            donor,
            language,
            tolerance,
            assume_undefined,
        } => {
            let language = resolve_language(&language)?;
            let tolerance = parse_seconds(&tolerance)?;
            let target = MediaSource::open(&video)?;
            let donor_source = MediaSource::open(&donor)?;
            let selection = select::select_tracks(
                donor_source.info(),
                &language,
                assume_undefined,
                donor_source.path(),
            )?;
            let report = compat::check_compatibility(
                target.info(),
                donor_source.info(),
                &selection,
                tolerance,
            );
            print!("{report}");
            if !report.is_valid() {
                std::process::exit(1);
            }
        }
        Commands::Loudness { input, track, json } => {
            let stats = loudness::analyze(&input, track)?;
            if json {
                let payload = json!({
                    "peak": stats.peak,
                    "peak_dbfs": stats.peak_dbfs,
                    "rms": stats.rms,
                    "rms_dbfs": stats.rms_dbfs,
                    "duration_seconds": stats.duration.as_secs_f64(),
                    "total_samples": stats.total_samples,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("Peak: {:.2} dBFS", stats.peak_dbfs);
                println!("RMS: {:.2} dBFS", stats.rms_dbfs);
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "audiograft", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_seconds, resolve_language};

    #[test]
    fn parse_seconds_values() {
        assert_eq!(parse_seconds("0.5").unwrap().as_millis(), 500);
        assert_eq!(parse_seconds("2").unwrap().as_secs(), 2);
        assert!(parse_seconds("-1").is_err());
        assert!(parse_seconds("abc").is_err());
        assert!(parse_seconds("").is_err());
    }

    #[test]
    fn resolve_language_aliases() {
        assert!(resolve_language("fre").is_ok());
        assert!(resolve_language("fra").is_ok());
        assert!(resolve_language("fr").is_ok());
        assert!(resolve_language("French").is_ok());
        assert!(resolve_language("klingon").is_err());
    }
}
