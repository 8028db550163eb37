//! Lightweight frame-rate probing.
//!
//! [`probe_framerate`] opens a media file just long enough to read the best
//! video stream's frame rate. The driver uses it for diagnostics only: an
//! unknown rate never stops a run.

use std::path::Path;

use ffmpeg_next::media::Type;

use crate::decode::rational_to_f64;
use crate::error::GifmakerError;

/// Frames per second of the best video stream in `path`.
///
/// Prefers the stream's average frame rate and falls back to its nominal
/// rate. Returns `Ok(None)` when neither is known.
///
/// # Errors
///
/// [`GifmakerError::VideoDecodeError`] if the file cannot be opened, or
/// [`GifmakerError::NoVideoStream`] if it has no video.
///
/// # Example
///
/// ```no_run
/// match gifmaker::probe::probe_framerate("clip.mp4".as_ref())? {
///     Some(fps) => println!("{fps:.2} fps"),
///     None => println!("unknown frame rate"),
/// }
/// # Ok::<(), gifmaker::GifmakerError>(())
/// ```
pub fn probe_framerate(path: &Path) -> Result<Option<f64>, GifmakerError> {
    ffmpeg_next::init()?;

    let input_context = ffmpeg_next::format::input(&path).map_err(|error| {
        GifmakerError::VideoDecodeError(format!("cannot open {}: {error}", path.display()))
    })?;
    let stream = input_context
        .streams()
        .best(Type::Video)
        .ok_or(GifmakerError::NoVideoStream)?;

    let frames_per_second =
        rational_to_f64(stream.avg_frame_rate()).or_else(|| rational_to_f64(stream.rate()));
    log::debug!("Probed {}: {frames_per_second:?} fps", path.display());
    Ok(frames_per_second)
}
