//! The assembly driver.
//!
//! [`Pipeline::run`] walks a fixed, linear sequence of stages:
//!
//! ```text
//! Init -> FramesExtracted -> [Decimated] -> [Reversed] -> Resized
//!      -> IntermediateEncoded -> Assembled -> Done
//! ```
//!
//! Bracketed stages run only when configured. Every stage finishes with all
//! frames before the next starts, and resizing always comes after the last
//! stage that changes the frame count. The driver owns the numbering
//! contract: stills are numbered from 1 by the decoder, renumbered only by
//! the sequence transforms, and the assembler consumes intermediates in
//! ascending numeric order.
//!
//! # Example
//!
//! ```no_run
//! use gifmaker::{Dimensions, Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::new("480x270".parse::<Dimensions>()?).with_reverse(true);
//! let pipeline = Pipeline::new(config)?;
//! let source = pipeline.resolve_source("clip.mp4")?;
//! pipeline.frame_store().clean()?;
//! let report = pipeline.run(&source, "clip.gif")?;
//! println!("{} frames", report.final_sequence.len());
//! # Ok::<(), gifmaker::GifmakerError>(())
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::configuration::{FailurePolicy, PipelineConfig};
use crate::error::GifmakerError;
use crate::frame_store::{FrameKind, FrameStore};
use crate::sequence;
use crate::toolkit::{FfmpegToolkit, MediaToolkit, StageContext};

/// Pipeline states, in the only order they can occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Init,
    FramesExtracted,
    Decimated,
    Reversed,
    Resized,
    IntermediateEncoded,
    Assembled,
    Done,
}

impl Stage {
    /// Short name of the work that produces this state.
    pub fn name(self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::FramesExtracted => "extract frames",
            Stage::Decimated => "decimate",
            Stage::Reversed => "reverse",
            Stage::Resized => "resize",
            Stage::IntermediateEncoded => "encode intermediate",
            Stage::Assembled => "assemble",
            Stage::Done => "done",
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.name())
    }
}

/// A collaborator failure swallowed by a best-effort run.
#[derive(Debug, Clone)]
pub struct StageFailure {
    /// Stage that failed.
    pub stage: Stage,
    /// Rendered error message.
    pub message: String,
}

/// Outcome of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// States reached, in order, starting with [`Stage::Init`].
    pub stages: Vec<Stage>,
    /// Source frame rate, if it could be probed.
    pub source_frame_rate: Option<f64>,
    /// Stills written by the decoder.
    pub decoded_frames: u64,
    /// Still indices present after the last sequence transform.
    pub final_sequence: Vec<u64>,
    /// Intermediate units written.
    pub intermediate_frames: u64,
    /// Frames in the assembled animation.
    pub assembled_frames: u64,
    /// Failures skipped under [`FailurePolicy::BestEffort`].
    pub failures: Vec<StageFailure>,
    /// Where the animation was written.
    pub output: PathBuf,
    /// Wall-clock time for the whole run.
    pub elapsed: Duration,
}

impl PipelineReport {
    fn new(output: PathBuf) -> Self {
        Self {
            stages: vec![Stage::Init],
            source_frame_rate: None,
            decoded_frames: 0,
            final_sequence: Vec::new(),
            intermediate_frames: 0,
            assembled_frames: 0,
            failures: Vec::new(),
            output,
            elapsed: Duration::ZERO,
        }
    }

    /// Returns `true` when no stage failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Last state reached.
    pub fn last_stage(&self) -> Stage {
        self.stages.last().copied().unwrap_or(Stage::Init)
    }
}

/// Video-to-GIF pipeline bound to a configuration and a media toolkit.
#[derive(Debug)]
pub struct Pipeline<T: MediaToolkit = FfmpegToolkit> {
    config: PipelineConfig,
    store: FrameStore,
    toolkit: T,
}

impl Pipeline<FfmpegToolkit> {
    /// Create a pipeline using FFmpeg for decoding.
    ///
    /// # Errors
    ///
    /// Validation errors from [`PipelineConfig::validate`], or
    /// [`GifmakerError::Scratch`] if the scratch directory cannot be created.
    pub fn new(config: PipelineConfig) -> Result<Self, GifmakerError> {
        Self::with_toolkit(config, FfmpegToolkit)
    }
}

impl<T: MediaToolkit> Pipeline<T> {
    /// Create a pipeline with a custom toolkit.
    pub fn with_toolkit(config: PipelineConfig, toolkit: T) -> Result<Self, GifmakerError> {
        config.validate()?;
        let store = FrameStore::open(config.scratch_dir.clone())?;
        Ok(Self {
            config,
            store,
            toolkit,
        })
    }

    /// The frame store this pipeline reads and writes.
    pub fn frame_store(&self) -> &FrameStore {
        &self.store
    }

    /// The configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Expand a leading `~` in `source` and canonicalise it.
    ///
    /// [`run`](Pipeline::run) does this first. Callers that clean the frame
    /// store before a run should resolve the source before cleaning, so that
    /// a bad path leaves the previous frames in place.
    ///
    /// # Errors
    ///
    /// [`GifmakerError::UnresolvablePath`] if the path does not exist.
    pub fn resolve_source<P: AsRef<Path>>(&self, source: P) -> Result<PathBuf, GifmakerError> {
        resolve_input(source.as_ref())
    }

    /// Convert `source` into a looping animation at `output`.
    ///
    /// The frame store must be empty; call
    /// [`FrameStore::clean`] first. Frames are left in the store afterwards.
    ///
    /// # Errors
    ///
    /// - [`GifmakerError::UnresolvablePath`] if `source` does not resolve.
    /// - [`GifmakerError::StaleFrames`] if the store is not empty.
    /// - [`GifmakerError::StageFailed`] / [`GifmakerError::StageTimeout`]
    ///   on the first collaborator failure under [`FailurePolicy::Abort`].
    /// - [`GifmakerError::Scratch`] on scratch directory I/O failure.
    /// - [`GifmakerError::Cancelled`] if the token fires between stages.
    pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        source: P,
        output: Q,
    ) -> Result<PipelineReport, GifmakerError> {
        let started = Instant::now();
        let source = self.resolve_source(source)?;
        let output = output.as_ref().to_path_buf();
        let mut report = PipelineReport::new(output.clone());

        let stale = self.store.count(FrameKind::Still)? + self.store.count(FrameKind::Intermediate)?;
        if stale > 0 {
            return Err(GifmakerError::StaleFrames { count: stale });
        }

        log::info!(
            "Converting {} -> {} at {} ({})",
            source.display(),
            output.display(),
            self.config.size,
            self.config.gravity
        );
        report.source_frame_rate = match self.toolkit.probe_framerate(&source) {
            Ok(rate) => rate,
            Err(error) => {
                log::debug!("Frame-rate probe failed: {error}");
                None
            }
        };
        match report.source_frame_rate {
            Some(fps) => log::info!("Source frame rate: {fps:.2} fps"),
            None => log::info!("Source frame rate: unknown"),
        }

        log::info!("Extract frames...");
        match self.run_stage(Stage::FramesExtracted, None, &mut report, |context| {
            self.toolkit.decode(
                &source,
                self.config.frame_rate,
                self.config.quality,
                &self.store,
                context,
            )
        })? {
            Some(count) => report.decoded_frames = count,
            None => report.decoded_frames = self.store.count(FrameKind::Still)? as u64,
        }
        self.advance(&mut report, Stage::FramesExtracted)?;

        if let Some(factor) = self.config.decimation {
            report.final_sequence = sequence::decimate(&self.store, factor)?;
            self.advance(&mut report, Stage::Decimated)?;
        }

        if self.config.reverse {
            report.final_sequence = sequence::append_reversed(&self.store)?;
            self.advance(&mut report, Stage::Reversed)?;
        }

        report.final_sequence = self.store.enumerate(FrameKind::Still)?;
        let frame_total = Some(report.final_sequence.len() as u64);

        log::info!("Resize and crop stills to {}...", self.config.size);
        self.run_stage(Stage::Resized, frame_total, &mut report, |context| {
            self.toolkit.resize_then_crop(
                &self.store,
                self.config.size,
                self.config.gravity,
                self.config.quality,
                context,
            )
        })?;
        self.advance(&mut report, Stage::Resized)?;

        log::info!("Encode intermediate frames...");
        if let Some(count) =
            self.run_stage(Stage::IntermediateEncoded, frame_total, &mut report, |context| {
                self.toolkit.encode_intermediate(&self.store, context)
            })?
        {
            report.intermediate_frames = count;
        }
        self.advance(&mut report, Stage::IntermediateEncoded)?;

        log::info!("Assemble animated GIF...");
        let intermediate_total = Some(self.store.count(FrameKind::Intermediate)? as u64);
        if let Some(count) =
            self.run_stage(Stage::Assembled, intermediate_total, &mut report, |context| {
                self.toolkit
                    .assemble(&self.store, self.config.delay, &output, context)
            })?
        {
            report.assembled_frames = count;
        }
        report.stages.push(Stage::Assembled);
        report.stages.push(Stage::Done);

        report.elapsed = started.elapsed();
        log::info!(
            "Done: {} frame(s) in {:.2}s",
            report.assembled_frames,
            report.elapsed.as_secs_f64()
        );
        Ok(report)
    }

    /// Run one collaborator stage under the failure policy.
    ///
    /// Returns `Ok(None)` when a best-effort run swallowed the failure.
    fn run_stage<F>(
        &self,
        stage: Stage,
        total: Option<u64>,
        report: &mut PipelineReport,
        work: F,
    ) -> Result<Option<u64>, GifmakerError>
    where
        F: FnOnce(&mut StageContext) -> Result<u64, GifmakerError>,
    {
        let mut context =
            StageContext::new(stage).with_progress(self.config.progress.clone(), total);
        if let Some(limit) = self.config.stage_timeout {
            context = context.with_timeout(limit);
        }

        let outcome = work(&mut context);
        context.finish();

        match outcome {
            Ok(count) => Ok(Some(count)),
            Err(error) if error.is_collaborator_failure() => {
                let error = match error {
                    GifmakerError::StageTimeout { .. } | GifmakerError::StageFailed { .. } => error,
                    other => GifmakerError::StageFailed {
                        stage,
                        source: Box::new(other),
                    },
                };
                match self.config.failure_policy {
                    FailurePolicy::Abort => Err(error),
                    FailurePolicy::BestEffort => {
                        log::warn!("{error}; continuing (best effort)");
                        report.failures.push(StageFailure {
                            stage,
                            message: error.to_string(),
                        });
                        Ok(None)
                    }
                }
            }
            Err(error) => Err(error),
        }
    }

    /// Record `stage` as reached and honour cancellation before the next.
    fn advance(&self, report: &mut PipelineReport, stage: Stage) -> Result<(), GifmakerError> {
        report.stages.push(stage);
        if self.config.is_cancelled() {
            log::info!("Cancelled after {stage}");
            return Err(GifmakerError::Cancelled { after: stage });
        }
        Ok(())
    }
}

/// Expand a leading `~` and canonicalise `path`.
fn resolve_input(path: &Path) -> Result<PathBuf, GifmakerError> {
    let expanded = match path.strip_prefix("~") {
        Ok(rest) => match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    };

    expanded
        .canonicalize()
        .map_err(|error| GifmakerError::UnresolvablePath {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })
}
