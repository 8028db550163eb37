//! Resize-then-crop geometry.
//!
//! Every still is first scaled, keeping its aspect ratio, so that its height
//! equals the target height, and then cropped to the exact target box at
//! the configured [`Gravity`]. Resizing straight to the box would distort the
//! frame before the crop. When the height-matched frame would be narrower
//! than the box (a portrait source going into a landscape target), the
//! frame is matched on width instead, so the crop always yields the exact
//! target size.

use image::{DynamicImage, imageops::FilterType};

use crate::configuration::{Dimensions, Gravity};
use crate::error::GifmakerError;
use crate::frame_store::{FrameKind, FrameStore};
use crate::toolkit::{StageContext, decode_still, encode_still, for_each_frame};

/// Scaled size and crop window for one source frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizePlan {
    /// Size after the aspect-preserving resize.
    pub scaled_width: u32,
    /// Size after the aspect-preserving resize.
    pub scaled_height: u32,
    /// Left edge of the crop window in the scaled frame.
    pub crop_x: u32,
    /// Top edge of the crop window in the scaled frame.
    pub crop_y: u32,
    /// Final output size.
    pub target: Dimensions,
}

impl ResizePlan {
    /// Plan the resize and crop of a `source_width`×`source_height` frame.
    ///
    /// ```
    /// use gifmaker::{Dimensions, Gravity, ResizePlan};
    ///
    /// let plan = ResizePlan::compute(1920, 1080, Dimensions::square(500)?, Gravity::Center);
    /// assert_eq!((plan.scaled_width, plan.scaled_height), (889, 500));
    /// assert_eq!((plan.crop_x, plan.crop_y), (194, 0));
    /// # Ok::<(), gifmaker::GifmakerError>(())
    /// ```
    pub fn compute(
        source_width: u32,
        source_height: u32,
        target: Dimensions,
        gravity: Gravity,
    ) -> Self {
        let source_width = source_width.max(1);
        let source_height = source_height.max(1);

        let by_height = scale_side(source_width, target.height, source_height);
        let (scaled_width, scaled_height) = if by_height >= target.width {
            (by_height, target.height)
        } else {
            let by_width = scale_side(source_height, target.width, source_width);
            (target.width, by_width.max(target.height))
        };

        Self {
            scaled_width,
            scaled_height,
            crop_x: gravity.horizontal().offset(scaled_width, target.width),
            crop_y: gravity.vertical().offset(scaled_height, target.height),
            target,
        }
    }

    /// Returns `true` when the resize step leaves the frame untouched.
    pub fn is_identity_resize(&self, source_width: u32, source_height: u32) -> bool {
        self.scaled_width == source_width && self.scaled_height == source_height
    }
}

/// `side * numerator / denominator`, rounded, at least 1.
fn scale_side(side: u32, numerator: u32, denominator: u32) -> u32 {
    let scaled = (side as f64 * numerator as f64 / denominator as f64).round() as u32;
    scaled.max(1)
}

/// Resize `image` by height and crop it to exactly `target` at `gravity`.
pub fn resize_then_crop(image: &DynamicImage, target: Dimensions, gravity: Gravity) -> DynamicImage {
    let plan = ResizePlan::compute(image.width(), image.height(), target, gravity);
    log::trace!(
        "Resize {}x{} -> {}x{}, crop {} at +{}+{}",
        image.width(),
        image.height(),
        plan.scaled_width,
        plan.scaled_height,
        target,
        plan.crop_x,
        plan.crop_y
    );

    let scaled = if plan.is_identity_resize(image.width(), image.height()) {
        image.clone()
    } else {
        image.resize_exact(plan.scaled_width, plan.scaled_height, FilterType::Lanczos3)
    };

    scaled.crop_imm(plan.crop_x, plan.crop_y, target.width, target.height)
}

/// Resize and crop every still in `store` in place, re-encoding at
/// `quality`. Returns the number of stills processed.
pub fn resize_stills(
    store: &FrameStore,
    target: Dimensions,
    gravity: Gravity,
    quality: u8,
    context: &mut StageContext,
) -> Result<u64, GifmakerError> {
    log::debug!("Resizing stills in {} to {target} ({gravity})", store.root().display());
    for_each_frame(store, FrameKind::Still, context, |index, content| {
        let image = decode_still(&content)?;
        let cropped = resize_then_crop(&image, target, gravity);
        store.write(FrameKind::Still, index, &encode_still(&cropped, quality)?)
    })
}
