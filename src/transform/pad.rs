//! Pad engine: grow the canvas and place the source at (left, top).

use image::imageops;

use super::reuse_or_allocate;
use crate::error::{ChainError, Result};
use crate::raster::{Color, PixelLayout, RasterImage};

/// Padding in pixels per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Padding {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl Padding {
    pub const fn new(top: u32, right: u32, bottom: u32, left: u32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Same padding on all four sides.
    pub const fn uniform(amount: u32) -> Self {
        Self::new(amount, amount, amount, amount)
    }

    /// Horizontal and vertical padding.
    pub const fn symmetric(horizontal: u32, vertical: u32) -> Self {
        Self::new(vertical, horizontal, vertical, horizontal)
    }

    pub fn is_zero(&self) -> bool {
        self.top == 0 && self.right == 0 && self.bottom == 0 && self.left == 0
    }
}

impl From<u32> for Padding {
    fn from(amount: u32) -> Self {
        Padding::uniform(amount)
    }
}

/// Output dimensions after padding, with overflow checking.
///
/// ```
/// use rasterchain::transform::{padded_dimensions, Padding};
///
/// assert_eq!(padded_dimensions(100, 50, Padding::uniform(10)).unwrap(), (120, 70));
/// assert!(padded_dimensions(u32::MAX, 1, Padding::uniform(1)).is_err());
/// ```
pub fn padded_dimensions(width: u32, height: u32, padding: Padding) -> Result<(u32, u32)> {
    let overflow = || {
        ChainError::invalid_param(
            "padding",
            format!("padding {:?} overflows a {}x{} image", padding, width, height),
        )
    };
    let new_w = width
        .checked_add(padding.left)
        .and_then(|w| w.checked_add(padding.right))
        .ok_or_else(overflow)?;
    let new_h = height
        .checked_add(padding.top)
        .and_then(|h| h.checked_add(padding.bottom))
        .ok_or_else(overflow)?;

    if new_w == 0 || new_h == 0 {
        return Err(ChainError::invalid_param(
            "padding",
            format!("padded image would be {}x{}", new_w, new_h),
        ));
    }
    Ok((new_w, new_h))
}

/// Layout of a padded result: opaque only when the fill is opaque.
pub fn padded_layout(layout: PixelLayout, background: Option<Color>) -> PixelLayout {
    match background {
        Some(color) if color.is_opaque() => layout,
        _ => PixelLayout::Rgba8,
    }
}

/// Pad the image. Zero padding returns the source unchanged.
///
/// The new area takes `background`, or is transparent when none is given.
pub fn pad(image: RasterImage, padding: Padding, background: Option<Color>) -> Result<RasterImage> {
    if padding.is_zero() {
        return Ok(image);
    }
    pad_into(&image, padding, background, None)
}

/// Pad the image, writing into `dest` when its shape matches.
pub fn pad_into(
    src: &RasterImage,
    padding: Padding,
    background: Option<Color>,
    dest: Option<RasterImage>,
) -> Result<RasterImage> {
    let (new_w, new_h) = padded_dimensions(src.width(), src.height(), padding)?;

    let layout = padded_layout(src.layout(), background);
    let mut canvas = reuse_or_allocate(dest, new_w, new_h, layout)?;
    canvas.fill(background.unwrap_or_else(Color::transparent));
    imageops::replace(
        canvas.pixels_mut(),
        src.pixels(),
        padding.left as i64,
        padding.top as i64,
    );
    Ok(canvas)
}
