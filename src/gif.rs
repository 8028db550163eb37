//! Intermediate GIF units and final animation assembly.
//!
//! Each still is quantised on its own into a single-frame GIF (the
//! intermediate unit). Assembly then reads the units back in index order and
//! re-emits their frames, each with its own local palette, into one
//! infinitely-looping animation with a fixed per-frame delay.

use std::fs::{self, File};
use std::io::{BufWriter, Cursor, Write};
use std::path::{Path, PathBuf};

use ::gif::{ColorOutput, DecodeOptions, Encoder, Frame, Repeat};
use image::DynamicImage;

use crate::error::GifmakerError;
use crate::frame_store::{FrameKind, FrameStore};
use crate::toolkit::{StageContext, decode_still, for_each_frame};

/// Quantiser speed passed to [`Frame::from_rgba_speed`] (1 = best, 30 = fastest).
const QUANTIZE_SPEED: i32 = 10;

/// Encode `image` as a single-frame GIF.
pub fn encode_unit(image: &DynamicImage) -> Result<Vec<u8>, GifmakerError> {
    let (width, height) = gif_size(image.width(), image.height())?;
    let mut pixels = image.to_rgba8().into_raw();
    let frame = Frame::from_rgba_speed(width, height, &mut pixels, QUANTIZE_SPEED);

    let mut buffer = Vec::new();
    {
        let mut encoder = Encoder::new(&mut buffer, width, height, &[])?;
        encoder.write_frame(&frame)?;
    }
    Ok(buffer)
}

/// Read the single frame of an intermediate unit.
///
/// The frame keeps its local palette; if the unit only carries a global
/// palette, that palette is moved onto the frame so it survives assembly.
pub fn decode_unit(bytes: &[u8]) -> Result<Frame<'static>, GifmakerError> {
    let mut options = DecodeOptions::new();
    options.set_color_output(ColorOutput::Indexed);
    let mut decoder = options.read_info(Cursor::new(bytes))?;
    let global_palette = decoder.global_palette().map(<[u8]>::to_vec);

    let mut frame = decoder
        .read_next_frame()?
        .ok_or_else(|| GifmakerError::GifDecodeError("intermediate unit has no frame".to_string()))?
        .clone();
    if frame.palette.is_none() {
        frame.palette = global_palette;
    }
    Ok(frame)
}

/// Write one intermediate unit for every still, keeping indices.
pub fn encode_intermediates(
    store: &FrameStore,
    context: &mut StageContext,
) -> Result<u64, GifmakerError> {
    log::debug!("Encoding intermediate units in {}", store.root().display());
    for_each_frame(store, FrameKind::Still, context, |index, content| {
        let image = decode_still(&content)?;
        store.write(FrameKind::Intermediate, index, &encode_unit(&image)?)
    })
}

/// Assemble every intermediate unit in `store`, in ascending index order,
/// into an infinitely-looping GIF at `output`.
///
/// `delay` is in hundredths of a second. All units must share the size of
/// the first one. Frames go to the sibling [`partial_path`] file, which is
/// renamed over `output` once every frame is in. On failure nothing is left
/// at `output` and an existing file there is untouched.
pub fn assemble(
    store: &FrameStore,
    delay: u16,
    output: &Path,
    context: &mut StageContext,
) -> Result<u64, GifmakerError> {
    let sequence = store.enumerate(FrameKind::Intermediate)?;
    if sequence.is_empty() {
        return Err(GifmakerError::EmptySequence(FrameKind::Intermediate.label()));
    }
    log::debug!(
        "Assembling {} frames into {} (delay={delay})",
        sequence.len(),
        output.display()
    );

    let partial = partial_path(output);
    match write_animation(store, &sequence, delay, &partial, context) {
        Ok(frames) => {
            fs::rename(&partial, output)?;
            Ok(frames)
        }
        Err(error) => {
            if let Err(cleanup) = fs::remove_file(&partial) {
                log::debug!("Could not remove {}: {cleanup}", partial.display());
            }
            Err(error)
        }
    }
}

/// Path next to `output` used while the animation is being written.
pub fn partial_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

fn write_animation(
    store: &FrameStore,
    sequence: &[u64],
    delay: u16,
    path: &Path,
    context: &mut StageContext,
) -> Result<u64, GifmakerError> {
    let Some(&first) = sequence.first() else {
        return Err(GifmakerError::EmptySequence(FrameKind::Intermediate.label()));
    };
    let first_frame = decode_unit(&store.read(FrameKind::Intermediate, first)?)?;
    let (width, height) = (first_frame.width, first_frame.height);

    let file = File::create(path)?;
    let mut encoder = Encoder::new(BufWriter::new(file), width, height, &[])?;
    encoder.set_repeat(Repeat::Infinite)?;

    for &index in sequence {
        let mut frame = if index == first {
            first_frame.clone()
        } else {
            decode_unit(&store.read(FrameKind::Intermediate, index)?)?
        };
        if frame.width != width || frame.height != height {
            return Err(GifmakerError::GifEncodeError(format!(
                "intermediate {index} is {}x{}, expected {width}x{height}",
                frame.width, frame.height
            )));
        }
        frame.delay = delay;
        encoder.write_frame(&frame)?;
        context.frame_done(index)?;
    }

    let mut writer = encoder.into_inner()?;
    writer.flush()?;

    Ok(context.processed())
}

fn gif_size(width: u32, height: u32) -> Result<(u16, u16), GifmakerError> {
    match (u16::try_from(width), u16::try_from(height)) {
        (Ok(width), Ok(height)) => Ok((width, height)),
        _ => Err(GifmakerError::GifEncodeError(format!(
            "{width}x{height} exceeds the GIF size limit"
        ))),
    }
}
