//! Resize engine: dimension math per mode plus interpolated scaling.
//!
//! Dimension rules:
//! - `Exact` returns the target verbatim (may distort).
//! - `Fit` scales uniformly so the result fits inside the target box.
//! - `Fill` scales uniformly so the result covers the target box; one axis may
//!   exceed the target and nothing is cropped.
//! - `Automatic` is `Fit`.
//!
//! Every dimension is clamped to at least 1 pixel.

use fast_image_resize::{FilterType, Image, MulDiv, PixelType, ResizeAlg, Resizer};
use image::RgbaImage;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::str::FromStr;

use super::reuse_or_allocate;
use crate::error::{ChainError, Result};
use crate::raster::RasterImage;

/// How source dimensions map onto a target box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMode {
    /// Use the target dimensions verbatim.
    Exact,
    /// Fit inside the target box, preserving aspect ratio.
    #[default]
    Fit,
    /// Cover the target box, preserving aspect ratio.
    Fill,
    /// Same as `Fit`.
    Automatic,
}

impl FromStr for ResizeMode {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "exact" => Ok(ResizeMode::Exact),
            "fit" => Ok(ResizeMode::Fit),
            "fill" => Ok(ResizeMode::Fill),
            "automatic" | "auto" => Ok(ResizeMode::Automatic),
            _ => Err(ChainError::invalid_param(
                "mode",
                format!("unknown resize mode: {}", s),
            )),
        }
    }
}

/// Interpolation quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Nearest neighbour.
    Low,
    /// Bilinear.
    Medium,
    /// Bicubic.
    #[default]
    High,
    /// Bicubic.
    Ultra,
}

impl Quality {
    fn algorithm(self) -> ResizeAlg {
        match self {
            Quality::Low => ResizeAlg::Nearest,
            Quality::Medium => ResizeAlg::Convolution(FilterType::Bilinear),
            Quality::High | Quality::Ultra => ResizeAlg::Convolution(FilterType::CatmullRom),
        }
    }
}

impl FromStr for Quality {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Quality::Low),
            "medium" => Ok(Quality::Medium),
            "high" => Ok(Quality::High),
            "ultra" => Ok(Quality::Ultra),
            _ => Err(ChainError::invalid_param(
                "quality",
                format!("unknown quality: {}", s),
            )),
        }
    }
}

/// Check that a resize target is usable.
pub fn validate_target(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(ChainError::invalid_param(
            "dimensions",
            format!("target {}x{} must be positive in both axes", width, height),
        ));
    }
    Ok(())
}

/// Calculate output dimensions for a resize.
///
/// ```
/// use rasterchain::transform::{calculate_dimensions, ResizeMode};
///
/// // 200x100 into a 150x150 box is height-bound
/// assert_eq!(calculate_dimensions(200, 100, 150, 150, ResizeMode::Fit), (150, 75));
/// assert_eq!(calculate_dimensions(200, 100, 150, 150, ResizeMode::Fill), (300, 150));
/// ```
pub fn calculate_dimensions(
    src_w: u32,
    src_h: u32,
    target_w: u32,
    target_h: u32,
    mode: ResizeMode,
) -> (u32, u32) {
    if src_w == 0 || src_h == 0 {
        return (target_w.max(1), target_h.max(1));
    }

    // Compare aspect ratios without dividing: src_w/src_h vs target_w/target_h
    let source_wider = src_w as u64 * target_h as u64 > src_h as u64 * target_w as u64;
    let scaled_h = |w: u32| (w as f64 * src_h as f64 / src_w as f64).round() as u32;
    let scaled_w = |h: u32| (h as f64 * src_w as f64 / src_h as f64).round() as u32;

    let (w, h) = match mode {
        ResizeMode::Exact => (target_w, target_h),
        ResizeMode::Fit | ResizeMode::Automatic => {
            if source_wider {
                // Width is the limiting axis
                (target_w, scaled_h(target_w).min(target_h))
            } else {
                (scaled_w(target_h).min(target_w), target_h)
            }
        }
        ResizeMode::Fill => {
            if source_wider {
                // Height matches, width overflows
                (scaled_w(target_h).max(target_w), target_h)
            } else {
                (target_w, scaled_h(target_w).max(target_h))
            }
        }
    };

    (w.max(1), h.max(1))
}

/// Resize per mode, returning the source unchanged when dimensions already match.
pub fn resize(
    image: RasterImage,
    target_w: u32,
    target_h: u32,
    mode: ResizeMode,
    quality: Quality,
) -> Result<RasterImage> {
    validate_target(target_w, target_h)?;
    let (w, h) = calculate_dimensions(image.width(), image.height(), target_w, target_h, mode);
    if (w, h) == (image.width(), image.height()) {
        return Ok(image);
    }
    scale(&image, w, h, quality)
}

/// Scale to exactly `width` x `height` into a new buffer.
pub fn scale(image: &RasterImage, width: u32, height: u32, quality: Quality) -> Result<RasterImage> {
    scale_into(image, width, height, quality, None)
}

/// Scale to exactly `width` x `height`, writing into `dest` when its shape matches.
pub fn scale_into(
    image: &RasterImage,
    width: u32,
    height: u32,
    quality: Quality,
    dest: Option<RasterImage>,
) -> Result<RasterImage> {
    validate_target(width, height)?;

    let src_width = NonZeroU32::new(image.width())
        .ok_or_else(|| ChainError::processing("Source width is 0"))?;
    let src_height = NonZeroU32::new(image.height())
        .ok_or_else(|| ChainError::processing("Source height is 0"))?;
    let dst_width = NonZeroU32::new(width)
        .ok_or_else(|| ChainError::invalid_param("width", "Target width is 0"))?;
    let dst_height = NonZeroU32::new(height)
        .ok_or_else(|| ChainError::invalid_param("height", "Target height is 0"))?;

    let layout = image.layout();
    let (id, _, buffer) = reuse_or_allocate(dest, width, height, layout)?.disassemble();

    let mut src_image = Image::from_vec_u8(
        src_width,
        src_height,
        image.as_raw().to_vec(),
        PixelType::U8x4,
    )
    .map_err(|e| ChainError::processing(format!("Failed to create source image: {:?}", e)))?;

    let mut dst_image = Image::from_vec_u8(dst_width, dst_height, buffer.into_raw(), PixelType::U8x4)
        .map_err(|e| {
            ChainError::processing(format!("Failed to wrap destination buffer: {:?}", e))
        })?;

    // Premultiply so transparent pixels do not bleed color into their neighbours
    let mul_div = MulDiv::default();
    if layout.has_alpha() {
        mul_div
            .multiply_alpha_inplace(&mut src_image.view_mut())
            .map_err(|e| ChainError::processing(format!("Alpha premultiply failed: {:?}", e)))?;
    }

    let mut resizer = Resizer::new(quality.algorithm());
    resizer
        .resize(&src_image.view(), &mut dst_image.view_mut())
        .map_err(|e| ChainError::processing(format!("Resize operation failed: {:?}", e)))?;

    if layout.has_alpha() {
        mul_div
            .divide_alpha_inplace(&mut dst_image.view_mut())
            .map_err(|e| ChainError::processing(format!("Alpha unpremultiply failed: {:?}", e)))?;
    }

    let pixels = RgbaImage::from_raw(width, height, dst_image.into_vec())
        .ok_or_else(|| ChainError::processing("Failed to create output image buffer"))?;

    Ok(RasterImage::reassemble(id, layout, pixels))
}
