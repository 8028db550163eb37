//! Progress reporting and cancellation support.
//!
//! [`ProgressCallback`] receives a [`ProgressInfo`] snapshot as each stage
//! works through its frames. [`CancellationToken`] lets another thread ask
//! the pipeline to stop; the driver honours it between stages, never in the
//! middle of one.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use gifmaker::{Dimensions, PipelineConfig, ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(pct) = info.percentage {
//!             println!("[{}] {pct:.1}% complete", info.stage);
//!         }
//!     }
//! }
//!
//! let config = PipelineConfig::new(Dimensions::square(200)?)
//!     .with_progress(Arc::new(PrintProgress));
//! # Ok::<(), gifmaker::GifmakerError>(())
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

use crate::pipeline::Stage;

/// A snapshot of progress within one stage.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// The stage doing the work.
    pub stage: Stage,
    /// Frames processed so far in this stage.
    pub current: u64,
    /// Frames expected, when known ahead of time (unknown while decoding).
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time since the stage started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on current throughput.
    pub estimated_remaining: Option<Duration>,
    /// Frame-store index of the frame just processed.
    pub current_frame: Option<u64>,
}

/// Trait for receiving progress updates.
///
/// Callbacks observe but cannot halt a run; use [`CancellationToken`] for
/// that.
pub trait ProgressCallback: Send + Sync {
    /// Called after each frame of a stage, and once more when the stage ends.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications. The default.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// ```
/// use gifmaker::CancellationToken;
///
/// let token = CancellationToken::new();
/// let remote = token.clone();
/// remote.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. Every clone observes it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks timing for one stage and emits callbacks.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    stage: Stage,
    total: Option<u64>,
    current: u64,
    start_time: Instant,
}

impl ProgressTracker {
    pub(crate) fn new(callback: Arc<dyn ProgressCallback>, stage: Stage, total: Option<u64>) -> Self {
        Self {
            callback,
            stage,
            total,
            current: 0,
            start_time: Instant::now(),
        }
    }

    /// Record one processed frame.
    pub(crate) fn advance(&mut self, frame_index: Option<u64>) {
        self.current += 1;
        self.report(frame_index);
    }

    /// Emit a final report for the stage.
    pub(crate) fn finish(&mut self) {
        self.report(None);
    }

    pub(crate) fn current(&self) -> u64 {
        self.current
    }

    fn report(&self, frame_index: Option<u64>) {
        let elapsed = self.start_time.elapsed();

        let percentage = self
            .total
            .filter(|&t| t > 0)
            .map(|t| (self.current as f32 / t as f32) * 100.0);

        let estimated_remaining = if self.current > 0 {
            self.total.map(|t| {
                let remaining = t.saturating_sub(self.current);
                elapsed.mul_f64(remaining as f64 / self.current as f64)
            })
        } else {
            None
        };

        self.callback.on_progress(&ProgressInfo {
            stage: self.stage,
            current: self.current,
            total: self.total,
            percentage,
            elapsed,
            estimated_remaining,
            current_frame: frame_index,
        });
    }
}
