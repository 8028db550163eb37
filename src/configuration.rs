//! Pipeline configuration.
//!
//! [`PipelineConfig`] is a builder that threads every user-facing knob
//! (target size, crop anchor, frame-rate, decimation, reversal, delay,
//! quality) together with operational settings (scratch directory, failure
//! policy, stage timeout, progress callback, cancellation token) through the
//! [`Pipeline`](crate::Pipeline) without process-wide state.
//!
//! # Example
//!
//! ```no_run
//! use gifmaker::{Dimensions, Gravity, PipelineConfig};
//!
//! let config = PipelineConfig::new("320x240".parse::<Dimensions>()?)
//!     .with_gravity(Gravity::North)
//!     .with_frame_rate(12.0)
//!     .with_reverse(true)
//!     .with_delay(8);
//! # Ok::<(), gifmaker::GifmakerError>(())
//! ```

use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::error::GifmakerError;
use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};

/// Default scratch directory name, relative to the working directory.
pub const DEFAULT_SCRATCH_DIR: &str = "frame-output";

/// Largest side a GIF logical screen can describe.
const MAX_SIDE: u32 = u16::MAX as u32;

/// Target output size in pixels.
///
/// Parsed from a size token: `"N"` means an N×N square, `"WxH"` (or `"WXH"`)
/// gives both sides explicitly.
///
/// ```
/// use gifmaker::Dimensions;
///
/// let square: Dimensions = "200".parse()?;
/// assert_eq!((square.width, square.height), (200, 200));
///
/// let wide: Dimensions = "640x360".parse()?;
/// assert_eq!((wide.width, wide.height), (640, 360));
/// # Ok::<(), gifmaker::GifmakerError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Create dimensions, rejecting zero or oversized sides.
    pub fn new(width: u32, height: u32) -> Result<Self, GifmakerError> {
        let token = format!("{width}x{height}");
        for side in [width, height] {
            if side == 0 {
                return Err(GifmakerError::InvalidDimensions {
                    token,
                    reason: "sides must be positive".to_string(),
                });
            }
            if side > MAX_SIDE {
                return Err(GifmakerError::InvalidDimensions {
                    token,
                    reason: format!("sides must not exceed {MAX_SIDE}"),
                });
            }
        }
        Ok(Self { width, height })
    }

    /// Create an N×N square.
    pub fn square(side: u32) -> Result<Self, GifmakerError> {
        Self::new(side, side)
    }

    /// Returns `true` when width equals height.
    pub fn is_square(&self) -> bool {
        self.width == self.height
    }
}

impl FromStr for Dimensions {
    type Err = GifmakerError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| GifmakerError::InvalidDimensions {
            token: token.to_string(),
            reason: reason.to_string(),
        };
        let parse_side = |side: &str| {
            side
                .trim()
                .parse::<u32>()
                .map_err(|_| invalid("expected N or WxH with positive integers"))
        };

        let parts: Vec<&str> = token.trim().split(['x', 'X']).collect();
        match *parts.as_slice() {
            [side] => Self::square(parse_side(side)?),
            [width, height] => Self::new(parse_side(width)?, parse_side(height)?),
            _ => Err(invalid("expected N or WxH")),
        }
    }
}

impl Display for Dimensions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Crop anchor.
///
/// Only affects which part of an over-sized resized frame survives the crop;
/// it has no effect on the resize itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Gravity {
    NorthWest,
    North,
    NorthEast,
    West,
    /// The default anchor.
    #[default]
    Center,
    East,
    SouthWest,
    South,
    SouthEast,
}

/// Position of a crop window along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Anchor {
    Start,
    Middle,
    End,
}

impl Anchor {
    /// Offset of a `window`-long span inside `extent`.
    pub(crate) fn offset(self, extent: u32, window: u32) -> u32 {
        let slack = extent.saturating_sub(window);
        match self {
            Anchor::Start => 0,
            Anchor::Middle => slack / 2,
            Anchor::End => slack,
        }
    }
}

impl Gravity {
    /// All nine anchors in reading order.
    pub const ALL: [Gravity; 9] = [
        Gravity::NorthWest,
        Gravity::North,
        Gravity::NorthEast,
        Gravity::West,
        Gravity::Center,
        Gravity::East,
        Gravity::SouthWest,
        Gravity::South,
        Gravity::SouthEast,
    ];

    /// Canonical compass name.
    pub fn name(self) -> &'static str {
        match self {
            Gravity::NorthWest => "NorthWest",
            Gravity::North => "North",
            Gravity::NorthEast => "NorthEast",
            Gravity::West => "West",
            Gravity::Center => "Center",
            Gravity::East => "East",
            Gravity::SouthWest => "SouthWest",
            Gravity::South => "South",
            Gravity::SouthEast => "SouthEast",
        }
    }

    pub(crate) fn horizontal(self) -> Anchor {
        match self {
            Gravity::NorthWest | Gravity::West | Gravity::SouthWest => Anchor::Start,
            Gravity::North | Gravity::Center | Gravity::South => Anchor::Middle,
            Gravity::NorthEast | Gravity::East | Gravity::SouthEast => Anchor::End,
        }
    }

    pub(crate) fn vertical(self) -> Anchor {
        match self {
            Gravity::NorthWest | Gravity::North | Gravity::NorthEast => Anchor::Start,
            Gravity::West | Gravity::Center | Gravity::East => Anchor::Middle,
            Gravity::SouthWest | Gravity::South | Gravity::SouthEast => Anchor::End,
        }
    }
}

impl FromStr for Gravity {
    type Err = GifmakerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim();
        Gravity::ALL
            .into_iter()
            .find(|gravity| gravity.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| GifmakerError::InvalidGravity(value.to_string()))
    }
}

impl Display for Gravity {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.name())
    }
}

/// Drop one frame out of every `n`.
///
/// Always at least 2: a factor of 1 would remove every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecimationFactor(u32);

impl DecimationFactor {
    /// Validate and wrap a factor.
    ///
    /// # Errors
    ///
    /// [`GifmakerError::InvalidDecimation`] when `n < 2`.
    pub fn new(n: u32) -> Result<Self, GifmakerError> {
        if n < 2 {
            return Err(GifmakerError::InvalidDecimation(n));
        }
        Ok(Self(n))
    }

    /// Interpret a user-facing value where `0` means "disabled".
    pub fn optional(n: u32) -> Result<Option<Self>, GifmakerError> {
        if n == 0 { Ok(None) } else { Self::new(n).map(Some) }
    }

    /// The raw factor.
    pub fn get(self) -> u32 {
        self.0
    }
}

/// What the driver does when a media collaborator fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop at the first failure and report which stage failed.
    #[default]
    Abort,
    /// Log the failure, record it in the report, and carry on with whatever
    /// partial state exists. The final animation may be empty or corrupt.
    BestEffort,
}

/// Configuration for a pipeline run.
///
/// All fields except the target size have defaults: centre gravity, source
/// frame rate, no decimation, no reversal, zero delay, quality 100, scratch
/// directory `frame-output` under the current directory, abort on failure,
/// no timeout.
#[derive(Clone)]
pub struct PipelineConfig {
    pub(crate) size: Dimensions,
    pub(crate) gravity: Gravity,
    pub(crate) frame_rate: Option<f64>,
    pub(crate) decimation: Option<DecimationFactor>,
    pub(crate) reverse: bool,
    /// Per-frame delay in hundredths of a second.
    pub(crate) delay: u16,
    pub(crate) quality: u8,
    pub(crate) scratch_dir: PathBuf,
    pub(crate) failure_policy: FailurePolicy,
    pub(crate) stage_timeout: Option<Duration>,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) cancellation: Option<CancellationToken>,
}

impl Debug for PipelineConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("PipelineConfig")
            .field("size", &self.size)
            .field("gravity", &self.gravity)
            .field("frame_rate", &self.frame_rate)
            .field("decimation", &self.decimation.map(DecimationFactor::get))
            .field("reverse", &self.reverse)
            .field("delay", &self.delay)
            .field("quality", &self.quality)
            .field("scratch_dir", &self.scratch_dir)
            .field("failure_policy", &self.failure_policy)
            .field("stage_timeout", &self.stage_timeout)
            .field("has_cancellation", &self.cancellation.is_some())
            .finish()
    }
}

impl PipelineConfig {
    /// Create a configuration for the given output size with defaults for
    /// everything else.
    pub fn new(size: Dimensions) -> Self {
        Self {
            size,
            gravity: Gravity::default(),
            frame_rate: None,
            decimation: None,
            reverse: false,
            delay: 0,
            quality: 100,
            scratch_dir: PathBuf::from(DEFAULT_SCRATCH_DIR),
            failure_policy: FailurePolicy::default(),
            stage_timeout: None,
            progress: Arc::new(NoOpProgress),
            cancellation: None,
        }
    }

    /// Set the crop anchor.
    #[must_use]
    pub fn with_gravity(mut self, gravity: Gravity) -> Self {
        self.gravity = gravity;
        self
    }

    /// Resample the decoded video to this many frames per second.
    #[must_use]
    pub fn with_frame_rate(mut self, frames_per_second: f64) -> Self {
        self.frame_rate = Some(frames_per_second);
        self
    }

    /// Drop one frame in every `factor`.
    #[must_use]
    pub fn with_decimation(mut self, factor: DecimationFactor) -> Self {
        self.decimation = Some(factor);
        self
    }

    /// Append the mirrored interior for a ping-pong loop.
    #[must_use]
    pub fn with_reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    /// Set the per-frame delay in hundredths of a second.
    #[must_use]
    pub fn with_delay(mut self, delay: u16) -> Self {
        self.delay = delay;
        self
    }

    /// Set the JPEG quality used for stills (0–100).
    #[must_use]
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    /// Use a different scratch directory.
    #[must_use]
    pub fn with_scratch_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.scratch_dir = path.into();
        self
    }

    /// Set the failure policy.
    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Bound every stage by `limit`.
    #[must_use]
    pub fn with_stage_timeout(mut self, limit: Duration) -> Self {
        self.stage_timeout = Some(limit);
        self
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token, checked between stages.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Target output size.
    pub fn size(&self) -> Dimensions {
        self.size
    }

    /// Crop anchor.
    pub fn gravity(&self) -> Gravity {
        self.gravity
    }

    /// Scratch directory holding the frame store.
    pub fn scratch_dir(&self) -> &PathBuf {
        &self.scratch_dir
    }

    /// Failure policy.
    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Check every value that can be wrong before media work starts.
    ///
    /// # Errors
    ///
    /// [`GifmakerError::InvalidQuality`] or
    /// [`GifmakerError::InvalidFrameRate`].
    pub fn validate(&self) -> Result<(), GifmakerError> {
        if self.quality > 100 {
            return Err(GifmakerError::InvalidQuality(self.quality));
        }
        if let Some(rate) = self.frame_rate {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(GifmakerError::InvalidFrameRate(rate));
            }
        }
        Ok(())
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}
