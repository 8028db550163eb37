//! # gifmaker
//!
//! Turn a video clip into a looping animated GIF.
//!
//! `gifmaker` decodes a video with FFmpeg (via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate) into numbered
//! JPEG stills in a scratch directory, reshapes that sequence, and assembles
//! the result into an infinitely-looping GIF.
//!
//! ## Quick Start
//!
//! ```no_run
//! use gifmaker::{DecimationFactor, Dimensions, Gravity, Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::new("320x180".parse::<Dimensions>()?)
//!     .with_gravity(Gravity::North)
//!     .with_frame_rate(15.0)
//!     .with_decimation(DecimationFactor::new(3)?)
//!     .with_reverse(true)
//!     .with_delay(6);
//!
//! let pipeline = Pipeline::new(config)?;
//! pipeline.frame_store().clean()?;
//! let report = pipeline.run("clip.mp4", "clip.gif")?;
//! println!("wrote {} frames", report.assembled_frames);
//! # Ok::<(), gifmaker::GifmakerError>(())
//! ```
//!
//! ## Stages
//!
//! - **Extract frames**: decode the best video stream into stills `1..=N`,
//!   optionally resampled to a fixed frame rate
//! - **Decimate**: drop one still in every `n`
//! - **Reverse**: append the mirrored interior for a ping-pong loop
//! - **Resize**: scale by height, then crop to the exact target at a
//!   compass-point gravity
//! - **Encode intermediate**: quantise each still into a single-frame GIF
//! - **Assemble**: concatenate the units in index order with a fixed delay
//!
//! Media work goes through the [`MediaToolkit`] trait, so the frame-sequence
//! logic can be driven by a synthetic decoder in tests.
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod configuration;
pub mod decode;
pub mod error;
pub mod ffmpeg;
pub mod frame_store;
pub mod geometry;
pub mod gif;
pub mod pipeline;
pub mod probe;
pub mod progress;
pub mod sequence;
pub mod toolkit;

pub use configuration::{
    DEFAULT_SCRATCH_DIR, DecimationFactor, Dimensions, FailurePolicy, Gravity, PipelineConfig,
};
pub use decode::ResampleClock;
pub use error::GifmakerError;
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use frame_store::{FrameKind, FrameStore, frame_path};
pub use geometry::ResizePlan;
pub use pipeline::{Pipeline, PipelineReport, Stage, StageFailure};
pub use progress::{CancellationToken, ProgressCallback, ProgressInfo};
pub use toolkit::{FfmpegToolkit, MediaToolkit, StageContext, decode_still, encode_still};
