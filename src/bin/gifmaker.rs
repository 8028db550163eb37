use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};

use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use colored::Colorize;
use env_logger::Env;
use gifmaker::{
    DEFAULT_SCRATCH_DIR, DecimationFactor, Dimensions, FailurePolicy, FfmpegLogLevel,
    GifmakerError, Gravity, MediaToolkit, Pipeline, PipelineConfig, PipelineReport, ProgressCallback,
    ProgressInfo, Stage,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  gifmaker -s 200 clip.mp4 clip.gif\n  gifmaker -s 480x270 -f 12 -x 3 -r -d 8 -g North clip.mp4 loop.gif\n  gifmaker -s 320x180 --progress --verbose clip.mp4 clip.gif\n  gifmaker --completions zsh > _gifmaker";

#[derive(Debug, Parser)]
#[command(
    name = "gifmaker",
    version,
    about = "Turn a video clip into a looping animated GIF",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    /// Input video path.
    #[arg(required_unless_present = "completions")]
    source: Option<PathBuf>,

    /// Output GIF path.
    #[arg(required_unless_present = "completions")]
    dest: Option<PathBuf>,

    /// Output size: N for an NxN square, or WxH.
    #[arg(short, long, value_name = "DIMENSION", required_unless_present = "completions")]
    size: Option<Dimensions>,

    /// Output frame rate. 0 keeps the source rate.
    #[arg(short = 'f', long = "framerate", value_name = "FPS", default_value_t = 0.0)]
    frame_rate: f64,

    /// Append reversed playback for a ping-pong loop.
    #[arg(short, long)]
    reverse: bool,

    /// Drop 1 in every N frames. 0 disables decimation.
    #[arg(short = 'x', long, value_name = "N", default_value_t = 0)]
    decimate: u32,

    /// Per-frame delay in hundredths of a second.
    #[arg(short, long, default_value_t = 0)]
    delay: u16,

    /// Crop anchor (NorthWest, North, NorthEast, West, Center, East, SouthWest, South, SouthEast).
    #[arg(short, long, default_value_t = Gravity::Center)]
    gravity: Gravity,

    /// JPEG quality for intermediate stills (0-100).
    #[arg(short, long, default_value_t = 100)]
    quality: u8,

    /// Directory holding the numbered frames.
    #[arg(long, default_value = DEFAULT_SCRATCH_DIR)]
    scratch_dir: PathBuf,

    /// Keep going when a stage fails; the output may be empty or corrupt.
    #[arg(long)]
    best_effort: bool,

    /// Fail any stage that runs longer than this many seconds.
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Do not clean the scratch directory first.
    #[arg(long)]
    keep_stale: bool,

    /// Show stage-level logging output.
    #[arg(long)]
    verbose: bool,

    /// Show a progress bar for each stage.
    #[arg(long)]
    progress: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<FfmpegLogLevel>,

    /// Print a machine-readable JSON summary.
    #[arg(long)]
    json: bool,

    /// Print shell completions and exit.
    #[arg(long, value_name = "SHELL", exclusive = true)]
    completions: Option<Shell>,
}

/// Renders one indicatif bar per stage.
struct TerminalProgress {
    current: Mutex<Option<(Stage, ProgressBar)>>,
}

impl TerminalProgress {
    fn new() -> Self {
        Self {
            current: Mutex::new(None),
        }
    }

    fn start_bar(stage: Stage, total: Option<u64>) -> ProgressBar {
        let bar = match total {
            Some(total) => {
                let bar = ProgressBar::new(total);
                if let Ok(style) = ProgressStyle::with_template(
                    "{spinner:.green} {msg:>20} {bar:40.cyan/blue} {pos}/{len}",
                ) {
                    bar.set_style(style.progress_chars("##-"));
                }
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg:>20} {pos}")
                {
                    bar.set_style(style);
                }
                bar
            }
        };
        bar.set_message(stage.to_string());
        bar
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        let Ok(mut current) = self.current.lock() else {
            return;
        };

        let same_stage = matches!(current.as_ref(), Some((stage, _)) if *stage == info.stage);
        if !same_stage {
            if let Some((_, bar)) = current.take() {
                bar.finish();
            }
            *current = Some((info.stage, Self::start_bar(info.stage, info.total)));
        }

        if let Some((_, bar)) = current.as_ref() {
            bar.set_position(info.current);
            if info.current_frame.is_none() {
                bar.finish();
            }
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn build_config(cli: &Cli, size: Dimensions) -> Result<PipelineConfig, GifmakerError> {
    let mut config = PipelineConfig::new(size)
        .with_gravity(cli.gravity)
        .with_reverse(cli.reverse)
        .with_delay(cli.delay)
        .with_quality(cli.quality)
        .with_scratch_dir(&cli.scratch_dir);

    if cli.frame_rate != 0.0 {
        config = config.with_frame_rate(cli.frame_rate);
    }
    if let Some(factor) = DecimationFactor::optional(cli.decimate)? {
        config = config.with_decimation(factor);
    }
    if cli.best_effort {
        config = config.with_failure_policy(FailurePolicy::BestEffort);
    }
    if let Some(seconds) = cli.timeout {
        config = config.with_stage_timeout(Duration::from_secs(seconds));
    }
    if cli.progress {
        config = config.with_progress(Arc::new(TerminalProgress::new()));
    }

    config.validate()?;
    Ok(config)
}

fn print_summary(report: &PipelineReport, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        let payload = json!({
            "output": report.output.display().to_string(),
            "source_frame_rate": report.source_frame_rate,
            "decoded_frames": report.decoded_frames,
            "final_sequence": report.final_sequence,
            "intermediate_frames": report.intermediate_frames,
            "assembled_frames": report.assembled_frames,
            "stages": report.stages.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "failures": report.failures.iter().map(|failure| json!({
                "stage": failure.stage.to_string(),
                "message": failure.message,
            })).collect::<Vec<_>>(),
            "elapsed_seconds": report.elapsed.as_secs_f64(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    for failure in &report.failures {
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            format!("{}: {}", failure.stage, failure.message).yellow()
        );
    }
    println!(
        "{} {}",
        "success:".green().bold(),
        format!(
            "Wrote {} frame(s) to {}",
            report.assembled_frames,
            report.output.display()
        )
        .green()
    );
    Ok(())
}

/// Resolve the source, then clear stale frames unless asked to keep them.
fn prepare_run<T: MediaToolkit>(
    pipeline: &Pipeline<T>,
    source: &Path,
    keep_stale: bool,
) -> Result<PathBuf, GifmakerError> {
    let source = pipeline.resolve_source(source)?;
    if !keep_stale {
        let removed = pipeline.frame_store().clean()?;
        if removed > 0 {
            log::info!(
                "Removed {removed} stale frame(s) from {}",
                pipeline.frame_store().root().display()
            );
        }
    }
    Ok(source)
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        let mut command = Cli::command();
        clap_complete::generate(shell, &mut command, "gifmaker", &mut std::io::stdout());
        return Ok(());
    }

    init_logging(cli.verbose);
    gifmaker::set_ffmpeg_log_level(cli.log_level.unwrap_or(FfmpegLogLevel::Error));

    let (Some(source), Some(dest), Some(size)) = (&cli.source, &cli.dest, cli.size) else {
        return Err("SOURCE, DEST and --size are required".into());
    };

    let config = build_config(&cli, size)?;
    let pipeline = Pipeline::new(config)?;
    let source = prepare_run(&pipeline, source, cli.keep_stale)?;

    let report = pipeline.run(&source, dest)?;
    print_summary(&report, cli.json)?;
    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}
