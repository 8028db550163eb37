//! Video decoding into numbered stills.
//!
//! [`decode_to_stills`] opens the source with FFmpeg, decodes the best video
//! stream from start to end, converts every frame to RGB, and writes it to
//! the [`FrameStore`] as a JPEG still numbered from 1.
//!
//! When an output frame rate is requested, a [`ResampleClock`] maps decoded
//! frames onto output slots: slot `k` (at `k / rate` seconds from the first
//! frame) receives the latest decoded frame whose presentation time is at or
//! before the slot time. Frames are dropped when the source is faster than
//! the target and repeated when it is slower.

use std::path::Path;

use ffmpeg_next::{
    Rational,
    codec::context::Context as CodecContext,
    format::Pixel,
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::{DynamicImage, RgbImage};

use crate::error::GifmakerError;
use crate::frame_store::{FrameKind, FrameStore};
use crate::toolkit::{StageContext, encode_still};

/// Tolerance when comparing frame times with slot times.
const TIME_EPSILON: f64 = 1e-9;

/// Assigns decoded frames to fixed-rate output slots.
#[derive(Debug, Clone)]
pub struct ResampleClock {
    frames_per_second: f64,
    next_slot: u64,
}

impl ResampleClock {
    /// A clock emitting `frames_per_second` slots per second.
    pub fn new(frames_per_second: f64) -> Self {
        Self {
            frames_per_second,
            next_slot: 0,
        }
    }

    fn slot_time(&self, slot: u64) -> f64 {
        slot as f64 / self.frames_per_second
    }

    /// Claim every unclaimed slot strictly before `seconds`.
    ///
    /// Called with the time of a newly decoded frame; the claimed slots
    /// belong to the frame decoded before it.
    pub fn claim_before(&mut self, seconds: f64) -> u64 {
        let start = self.next_slot;
        while self.slot_time(self.next_slot) < seconds - TIME_EPSILON {
            self.next_slot += 1;
        }
        self.next_slot - start
    }

    /// Claim every unclaimed slot at or before `seconds`.
    ///
    /// Called once with the time of the final frame.
    pub fn claim_through(&mut self, seconds: f64) -> u64 {
        let start = self.next_slot;
        while self.slot_time(self.next_slot) <= seconds + TIME_EPSILON {
            self.next_slot += 1;
        }
        self.next_slot - start
    }

    /// Slots claimed so far.
    pub fn claimed(&self) -> u64 {
        self.next_slot
    }
}

/// Source frame chosen for each output slot, given source frame times.
///
/// ```
/// use gifmaker::decode::resample_schedule;
///
/// // 30 fps down to 10 fps keeps every third frame.
/// let times: Vec<f64> = (0..9).map(|n| n as f64 / 30.0).collect();
/// assert_eq!(resample_schedule(&times, 10.0), vec![0, 3, 6]);
/// ```
pub fn resample_schedule(timestamps: &[f64], frames_per_second: f64) -> Vec<usize> {
    let mut clock = ResampleClock::new(frames_per_second);
    let mut schedule = Vec::new();
    let Some(&origin) = timestamps.first() else {
        return schedule;
    };

    for (position, window) in timestamps.windows(2).enumerate() {
        let slots = clock.claim_before(window[1] - origin);
        schedule.extend(std::iter::repeat_n(position, slots as usize));
    }

    let last = timestamps.len() - 1;
    let mut slots = clock.claim_through(timestamps[last] - origin);
    if clock.claimed() == 0 {
        slots = 1;
    }
    schedule.extend(std::iter::repeat_n(last, slots as usize));
    schedule
}

/// Writes decoded images into the store, applying the resample clock.
struct StillWriter<'a> {
    store: &'a FrameStore,
    quality: u8,
    clock: Option<ResampleClock>,
    next_index: u64,
    origin: Option<f64>,
    pending: Option<(Vec<u8>, f64)>,
}

impl<'a> StillWriter<'a> {
    fn new(store: &'a FrameStore, quality: u8, frame_rate: Option<f64>) -> Self {
        Self {
            store,
            quality,
            clock: frame_rate.map(ResampleClock::new),
            next_index: 1,
            origin: None,
            pending: None,
        }
    }

    fn written(&self) -> u64 {
        self.next_index - 1
    }

    fn emit(
        &mut self,
        content: &[u8],
        copies: u64,
        context: &mut StageContext,
    ) -> Result<(), GifmakerError> {
        for _ in 0..copies {
            self.store.write(FrameKind::Still, self.next_index, content)?;
            context.frame_done(self.next_index)?;
            self.next_index += 1;
        }
        Ok(())
    }

    fn push(
        &mut self,
        image: &DynamicImage,
        seconds: f64,
        context: &mut StageContext,
    ) -> Result<(), GifmakerError> {
        let content = encode_still(image, self.quality)?;
        let Some(clock) = self.clock.as_mut() else {
            return self.emit(&content, 1, context);
        };

        let origin = *self.origin.get_or_insert(seconds);
        let relative = (seconds - origin).max(0.0);
        let copies = clock.claim_before(relative);
        if let Some((previous, _)) = self.pending.take() {
            self.emit(&previous, copies, context)?;
        }
        self.pending = Some((content, relative));
        Ok(())
    }

    fn finish(&mut self, context: &mut StageContext) -> Result<(), GifmakerError> {
        let Some((content, relative)) = self.pending.take() else {
            return Ok(());
        };
        let Some(clock) = self.clock.as_mut() else {
            return Ok(());
        };
        let mut copies = clock.claim_through(relative);
        if clock.claimed() == 0 {
            copies = 1;
        }
        self.emit(&content, copies, context)
    }
}

/// Decode every frame of `source` into stills `1..=N` and return `N`.
///
/// # Errors
///
/// - [`GifmakerError::VideoDecodeError`] if the file cannot be opened or
///   yields no frames.
/// - [`GifmakerError::NoVideoStream`] if it has no video stream.
/// - [`GifmakerError::FfmpegError`] for decoder or scaler failures.
/// - [`GifmakerError::StageTimeout`] if the stage deadline passes.
pub fn decode_to_stills(
    source: &Path,
    frame_rate: Option<f64>,
    quality: u8,
    store: &FrameStore,
    context: &mut StageContext,
) -> Result<u64, GifmakerError> {
    ffmpeg_next::init()?;

    log::debug!("Decoding {} (frame_rate={frame_rate:?})", source.display());
    let mut input_context = ffmpeg_next::format::input(&source).map_err(|error| {
        GifmakerError::VideoDecodeError(format!("cannot open {}: {error}", source.display()))
    })?;

    let (video_stream_index, time_base, source_fps, mut decoder) = {
        let stream = input_context
            .streams()
            .best(Type::Video)
            .ok_or(GifmakerError::NoVideoStream)?;
        let decoder_context = CodecContext::from_parameters(stream.parameters())?;
        (
            stream.index(),
            stream.time_base(),
            rational_to_f64(stream.avg_frame_rate()),
            decoder_context.decoder().video()?,
        )
    };

    let width = decoder.width();
    let height = decoder.height();
    let mut scaler = ScalingContext::get(
        decoder.format(),
        width,
        height,
        Pixel::RGB24,
        width,
        height,
        ScalingFlags::BILINEAR,
    )?;

    let mut writer = StillWriter::new(store, quality, frame_rate);
    let mut decoded_frame = VideoFrame::empty();
    let mut rgb_frame = VideoFrame::empty();
    let mut decoded_count: u64 = 0;

    let mut drain = |decoder: &mut ffmpeg_next::decoder::Video,
                     writer: &mut StillWriter<'_>,
                     context: &mut StageContext|
     -> Result<(), GifmakerError> {
        while decoder.receive_frame(&mut decoded_frame).is_ok() {
            scaler.run(&decoded_frame, &mut rgb_frame)?;
            let image = convert_frame_to_image(&rgb_frame, width, height)?;

            let seconds = match decoded_frame.timestamp().or(decoded_frame.pts()) {
                Some(pts) => pts_to_seconds(pts, time_base),
                None => decoded_count as f64 / source_fps.unwrap_or(1.0),
            };
            decoded_count += 1;
            writer.push(&image, seconds, context)?;
        }
        Ok(())
    };

    for (stream, packet) in input_context.packets() {
        if stream.index() != video_stream_index {
            continue;
        }
        context.check_deadline()?;
        decoder.send_packet(&packet)?;
        drain(&mut decoder, &mut writer, context)?;
    }

    decoder.send_eof()?;
    drain(&mut decoder, &mut writer, context)?;
    writer.finish(context)?;

    let written = writer.written();
    if written == 0 {
        return Err(GifmakerError::VideoDecodeError(format!(
            "no frames decoded from {}",
            source.display()
        )));
    }
    log::debug!("Decoded {written} still(s) from {}", source.display());
    Ok(written)
}

/// Positive rational as `f64`, or `None` for 0/0 and friends.
pub(crate) fn rational_to_f64(rational: Rational) -> Option<f64> {
    if rational.numerator() > 0 && rational.denominator() > 0 {
        Some(rational.numerator() as f64 / rational.denominator() as f64)
    } else {
        None
    }
}

/// Rescale a PTS value from stream time base to seconds.
fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    pts as f64 * time_base.numerator() as f64 / time_base.denominator().max(1) as f64
}

/// Convert a scaled RGB24 video frame to a [`DynamicImage`], stripping any
/// per-row padding FFmpeg left in the plane.
fn convert_frame_to_image(
    rgb_frame: &VideoFrame,
    width: u32,
    height: u32,
) -> Result<DynamicImage, GifmakerError> {
    let stride = rgb_frame.stride(0);
    let row_length = (width as usize) * 3;
    let data = rgb_frame.data(0);

    let buffer = if stride == row_length {
        data[..row_length * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_length * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + row_length]);
        }
        buffer
    };

    let rgb_image = RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
        GifmakerError::VideoDecodeError(
            "Failed to construct RGB image from decoded frame data".to_string(),
        )
    })?;
    Ok(DynamicImage::ImageRgb8(rgb_image))
}
