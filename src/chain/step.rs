//! Chain steps.
//!
//! Each step carries every parameter it needs, including the resize mode and
//! quality that were the chain defaults when it was appended. Changing the
//! defaults later never affects steps already in the chain.

use crate::error::Result;
use crate::raster::{validate_dimensions, Color, RasterImage};
use crate::transform::{
    calculate_dimensions, crop_into, flip, normalize_degrees, pad_into, padded_dimensions,
    padded_layout, rotate_in_place, rotate_into, rotated_bounds, rotated_layout, scale_into,
    validate_target, CropRegion, ExifOrientation, FlipAxis, Padding, Quality, ResizeMode,
};
use crate::watermark::Watermark;

use super::scratch::ScratchBuffer;

/// One transform in an [`OperationChain`](super::OperationChain).
#[derive(Debug, Clone)]
pub enum Step {
    Resize {
        width: u32,
        height: u32,
        mode: ResizeMode,
        quality: Quality,
    },
    Crop(CropRegion),
    /// Centered crop, clamped to the image. Used after a `Fill` resize.
    CenterCrop { width: u32, height: u32 },
    Rotate {
        degrees: f64,
        background: Option<Color>,
    },
    Pad {
        padding: Padding,
        background: Option<Color>,
    },
    Flip(FlipAxis),
    AutoOrient(ExifOrientation),
    Watermark(Watermark),
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Resize { .. } => "resize",
            Step::Crop(_) => "crop",
            Step::CenterCrop { .. } => "center-crop",
            Step::Rotate { .. } => "rotate",
            Step::Pad { .. } => "pad",
            Step::Flip(FlipAxis::Horizontal) => "flip-horizontal",
            Step::Flip(FlipAxis::Vertical) => "flip-vertical",
            Step::AutoOrient(_) => "auto-orient",
            Step::Watermark(_) => "watermark",
        }
    }

    /// Checks that do not need pixel data.
    pub fn validate(&self) -> Result<()> {
        match self {
            Step::Resize { width, height, .. } | Step::CenterCrop { width, height } => {
                validate_target(*width, *height)
            }
            Step::Crop(region) => CropRegion::new(region.x, region.y, region.width, region.height)
                .map(|_| ()),
            Step::Rotate { degrees, .. } => normalize_degrees(*degrees).map(|_| ()),
            Step::Watermark(watermark) => watermark.validate(),
            Step::Pad { .. } | Step::Flip(_) | Step::AutoOrient(_) => Ok(()),
        }
    }

    /// Run the step. When a new buffer is produced, `input` is parked in `scratch`.
    pub(crate) fn apply(
        &self,
        input: RasterImage,
        scratch: &mut ScratchBuffer,
    ) -> Result<RasterImage> {
        match self {
            Step::Resize {
                width,
                height,
                mode,
                quality,
            } => {
                let (w, h) =
                    calculate_dimensions(input.width(), input.height(), *width, *height, *mode);
                if (w, h) == (input.width(), input.height()) {
                    return Ok(input);
                }
                validate_dimensions(w, h)?;
                let dest = scratch.lend(w, h, input.layout());
                let output = scale_into(&input, w, h, *quality, dest);
                release(input, output, scratch)
            }
            Step::Crop(region) => {
                region.check_bounds(input.width(), input.height())?;
                crop_region(input, *region, scratch)
            }
            Step::CenterCrop { width, height } => {
                let region = CropRegion::centered(
                    input.width(),
                    input.height(),
                    (*width).min(input.width()),
                    (*height).min(input.height()),
                )?;
                crop_region(input, region, scratch)
            }
            Step::Rotate {
                degrees,
                background,
            } => rotate_step(input, *degrees, *background, scratch),
            Step::Pad {
                padding,
                background,
            } => {
                if padding.is_zero() {
                    return Ok(input);
                }
                let (w, h) = padded_dimensions(input.width(), input.height(), *padding)?;
                validate_dimensions(w, h)?;
                let dest = scratch.lend(w, h, padded_layout(input.layout(), *background));
                let output = pad_into(&input, *padding, *background, dest);
                release(input, output, scratch)
            }
            Step::Flip(axis) => Ok(flip(input, *axis)),
            Step::AutoOrient(orientation) => {
                if orientation.is_identity() {
                    return Ok(input);
                }
                // Rotate through the scratch slot, then flip the result in place
                let rotated = rotate_step(input, orientation.rotation() as f64, None, scratch)?;
                let upright = match orientation.flip() {
                    Some(axis) => flip(rotated, axis),
                    None => rotated,
                };
                Ok(upright)
            }
            Step::Watermark(watermark) => {
                let mut canvas = input;
                watermark.apply(&mut canvas)?;
                Ok(canvas)
            }
        }
    }
}

fn crop_region(
    input: RasterImage,
    region: CropRegion,
    scratch: &mut ScratchBuffer,
) -> Result<RasterImage> {
    if region.covers(input.width(), input.height()) {
        return Ok(input);
    }
    let dest = scratch.lend(region.width, region.height, input.layout());
    let output = crop_into(&input, region, dest);
    release(input, output, scratch)
}

fn rotate_step(
    mut input: RasterImage,
    degrees: f64,
    background: Option<Color>,
    scratch: &mut ScratchBuffer,
) -> Result<RasterImage> {
    let degrees = normalize_degrees(degrees)?;
    if degrees == 0.0 {
        return Ok(input);
    }
    // Same-shape right angles rewrite a working buffer in place
    if scratch.is_working_buffer(&input) && rotate_in_place(&mut input, degrees)? {
        return Ok(input);
    }
    let (w, h) = rotated_bounds(input.width(), input.height(), degrees);
    validate_dimensions(w, h)?;
    let layout = rotated_layout(input.layout(), degrees, background);
    let dest = scratch.lend(w, h, layout);
    let output = rotate_into(&input, degrees, background, dest);
    release(input, output, scratch)
}

/// Hand the consumed input back to the scratch slot once the output exists.
fn release(
    input: RasterImage,
    output: Result<RasterImage>,
    scratch: &mut ScratchBuffer,
) -> Result<RasterImage> {
    let output = output?;
    scratch.recycle(input);
    Ok(output)
}
