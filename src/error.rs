//! Error types for the `gifmaker` crate.
//!
//! This module defines [`GifmakerError`], the unified error type returned by
//! every fallible operation in the crate. Variants fall into four groups:
//! validation problems caught before any media work starts, collaborator
//! failures raised while decoding, resizing, or encoding frames, scratch
//! directory I/O failures, and run-control outcomes such as timeouts and
//! cancellation.

use std::{io::Error as IoError, path::PathBuf, time::Duration};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

use crate::pipeline::Stage;

/// The unified error type for all `gifmaker` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GifmakerError {
    /// The size token could not be parsed as `N` or `WxH`.
    #[error("Invalid size {token:?}: {reason}")]
    InvalidDimensions {
        /// The token as supplied by the caller.
        token: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A decimation factor below 2 was supplied.
    #[error("Decimation factor must be at least 2 (got {0})")]
    InvalidDecimation(u32),

    /// Quality outside 0–100.
    #[error("Quality must be between 0 and 100 (got {0})")]
    InvalidQuality(u8),

    /// A non-positive or non-finite output frame rate.
    #[error("Frame rate must be a positive number (got {0})")]
    InvalidFrameRate(f64),

    /// Unknown crop anchor name.
    #[error("Unknown gravity {0:?} (expected one of NorthWest, North, NorthEast, West, Center, East, SouthWest, South, SouthEast)")]
    InvalidGravity(String),

    /// The source video path could not be resolved.
    #[error("Cannot resolve input path {path}: {reason}")]
    UnresolvablePath {
        /// Path as supplied.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// The source file has no video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// A video frame could not be decoded.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An error from the `image` crate while decoding, resizing, or encoding
    /// a still.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// GIF encoding failed.
    #[error("GIF encoding error: {0}")]
    GifEncodeError(String),

    /// An intermediate unit could not be read back.
    #[error("GIF decoding error: {0}")]
    GifDecodeError(String),

    /// A stage found no frames to work on.
    #[error("No {0} frames in the scratch directory")]
    EmptySequence(&'static str),

    /// A collaborator call failed during the named stage.
    #[error("{stage} stage failed: {source}")]
    StageFailed {
        /// The stage that was running.
        stage: Stage,
        /// The collaborator error.
        #[source]
        source: Box<GifmakerError>,
    },

    /// A stage ran past its configured time limit.
    #[error("{stage} stage timed out after {limit:?}")]
    StageTimeout {
        /// The stage that was running.
        stage: Stage,
        /// The configured limit.
        limit: Duration,
    },

    /// The scratch directory could not be created, read, or written.
    #[error("Scratch directory error at {path}: {source}")]
    Scratch {
        /// The file or directory involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: IoError,
    },

    /// The frame store still holds frames from an earlier run.
    #[error("Scratch directory holds {count} stale frame(s); clean it before running")]
    StaleFrames {
        /// How many stills and intermediates were found.
        count: usize,
    },

    /// The run was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Pipeline cancelled after the {after} stage")]
    Cancelled {
        /// The last stage that completed.
        after: Stage,
    },

    /// An I/O error outside the scratch directory (e.g. the output file).
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),
}

impl GifmakerError {
    /// Returns `true` for failures raised by a media collaborator (decode,
    /// resize, encode, assemble), including timeouts.
    ///
    /// These are the only errors a best-effort run will swallow.
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(
            self,
            GifmakerError::NoVideoStream
                | GifmakerError::VideoDecodeError(_)
                | GifmakerError::FfmpegError(_)
                | GifmakerError::ImageError(_)
                | GifmakerError::GifEncodeError(_)
                | GifmakerError::GifDecodeError(_)
                | GifmakerError::EmptySequence(_)
                | GifmakerError::IoError(_)
                | GifmakerError::StageFailed { .. }
                | GifmakerError::StageTimeout { .. }
        )
    }

    pub(crate) fn scratch(path: impl Into<PathBuf>, source: IoError) -> Self {
        GifmakerError::Scratch {
            path: path.into(),
            source,
        }
    }
}

impl From<FfmpegError> for GifmakerError {
    fn from(error: FfmpegError) -> Self {
        GifmakerError::FfmpegError(error.to_string())
    }
}

impl From<::gif::EncodingError> for GifmakerError {
    fn from(error: ::gif::EncodingError) -> Self {
        GifmakerError::GifEncodeError(error.to_string())
    }
}

impl From<::gif::DecodingError> for GifmakerError {
    fn from(error: ::gif::DecodingError) -> Self {
        GifmakerError::GifDecodeError(error.to_string())
    }
}
