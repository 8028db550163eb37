//! The media collaborators behind the pipeline.
//!
//! [`MediaToolkit`] is the seam between the frame-sequence logic and the
//! actual media work. It exposes the five capabilities the driver needs:
//! probe a frame rate, decode a video into stills, resize+crop stills in
//! place, encode each still into an intermediate unit, and assemble the
//! units into the final animation.
//!
//! Only decoding and probing need a video library, so those two are the
//! required methods. The image-side steps have default implementations built
//! on the `image` and `gif` crates. [`FfmpegToolkit`] is the production
//! implementation. Tests can swap in a synthetic decoder and keep the rest.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use image::{DynamicImage, ExtendedColorType, codecs::jpeg::JpegEncoder};

use crate::configuration::{Dimensions, Gravity};
use crate::error::GifmakerError;
use crate::frame_store::{FrameKind, FrameStore};
use crate::geometry;
use crate::pipeline::Stage;
use crate::progress::{NoOpProgress, ProgressCallback, ProgressTracker};

/// Per-stage context handed to every collaborator call.
///
/// Carries the stage deadline and the progress tracker. Collaborators call
/// [`frame_done`](StageContext::frame_done) after each frame; that both
/// reports progress and enforces the deadline.
pub struct StageContext {
    stage: Stage,
    started: Instant,
    limit: Option<Duration>,
    tracker: ProgressTracker,
}

impl StageContext {
    /// A context with no deadline and no progress reporting.
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            started: Instant::now(),
            limit: None,
            tracker: ProgressTracker::new(Arc::new(NoOpProgress), stage, None),
        }
    }

    /// Fail the stage once `limit` has elapsed.
    #[must_use]
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Report progress to `callback`; `total` is the expected frame count.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>, total: Option<u64>) -> Self {
        self.tracker = ProgressTracker::new(callback, self.stage, total);
        self
    }

    /// The stage this context belongs to.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Frames reported done so far.
    pub fn processed(&self) -> u64 {
        self.tracker.current()
    }

    /// Return [`GifmakerError::StageTimeout`] if the deadline has passed.
    pub fn check_deadline(&self) -> Result<(), GifmakerError> {
        match self.limit {
            Some(limit) if self.started.elapsed() > limit => Err(GifmakerError::StageTimeout {
                stage: self.stage,
                limit,
            }),
            _ => Ok(()),
        }
    }

    /// Record that frame `index` is finished, then check the deadline.
    pub fn frame_done(&mut self, index: u64) -> Result<(), GifmakerError> {
        self.tracker.advance(Some(index));
        self.check_deadline()
    }

    pub(crate) fn finish(&mut self) {
        self.tracker.finish();
    }
}

/// Media collaborators consumed by the [`Pipeline`](crate::Pipeline).
///
/// Every method reads from or writes to the [`FrameStore`] rather than
/// passing images around, so each stage sees exactly the frames that exist
/// on disk when it starts.
pub trait MediaToolkit {
    /// Frames per second of `source`, or `None` when unknown.
    fn probe_framerate(&self, source: &Path) -> Result<Option<f64>, GifmakerError>;

    /// Decode `source` into stills `1..=N`, resampled to `frame_rate` when
    /// given. Returns `N`.
    fn decode(
        &self,
        source: &Path,
        frame_rate: Option<f64>,
        quality: u8,
        store: &FrameStore,
        context: &mut StageContext,
    ) -> Result<u64, GifmakerError>;

    /// Resize and crop every still in place. Returns the number of stills.
    fn resize_then_crop(
        &self,
        store: &FrameStore,
        target: Dimensions,
        gravity: Gravity,
        quality: u8,
        context: &mut StageContext,
    ) -> Result<u64, GifmakerError> {
        geometry::resize_stills(store, target, gravity, quality, context)
    }

    /// Encode one intermediate unit per still, keeping indices. Returns the
    /// number of units written.
    fn encode_intermediate(
        &self,
        store: &FrameStore,
        context: &mut StageContext,
    ) -> Result<u64, GifmakerError> {
        crate::gif::encode_intermediates(store, context)
    }

    /// Assemble every intermediate unit, in index order, into an
    /// infinitely-looping animation at `output`. Returns the frame count.
    fn assemble(
        &self,
        store: &FrameStore,
        delay: u16,
        output: &Path,
        context: &mut StageContext,
    ) -> Result<u64, GifmakerError> {
        crate::gif::assemble(store, delay, output, context)
    }
}

/// Production toolkit: FFmpeg for decoding and probing, `image` and `gif`
/// for everything else.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegToolkit;

impl MediaToolkit for FfmpegToolkit {
    fn probe_framerate(&self, source: &Path) -> Result<Option<f64>, GifmakerError> {
        crate::probe::probe_framerate(source)
    }

    fn decode(
        &self,
        source: &Path,
        frame_rate: Option<f64>,
        quality: u8,
        store: &FrameStore,
        context: &mut StageContext,
    ) -> Result<u64, GifmakerError> {
        crate::decode::decode_to_stills(source, frame_rate, quality, store, context)
    }
}

/// Encode `image` as a JPEG still at `quality` (clamped to 1–100).
pub fn encode_still(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, GifmakerError> {
    let rgb = image.to_rgb8();
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
        encoder.encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)?;
    }
    Ok(buffer.into_inner())
}

/// Decode a still previously written with [`encode_still`].
pub fn decode_still(bytes: &[u8]) -> Result<DynamicImage, GifmakerError> {
    Ok(image::load_from_memory(bytes)?)
}

/// Shared loop for stages that rewrite every frame of one kind into another
/// (or the same) kind.
pub(crate) fn for_each_frame<F>(
    store: &FrameStore,
    kind: FrameKind,
    context: &mut StageContext,
    mut handler: F,
) -> Result<u64, GifmakerError>
where
    F: FnMut(u64, Vec<u8>) -> Result<(), GifmakerError>,
{
    let sequence = store.enumerate(kind)?;
    if sequence.is_empty() {
        return Err(GifmakerError::EmptySequence(kind.label()));
    }

    for index in sequence {
        let content = store.read(kind, index)?;
        handler(index, content)?;
        context.frame_done(index)?;
    }

    Ok(context.processed())
}
