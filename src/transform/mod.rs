//! Geometric transform engines.
//!
//! | Engine | Module | Shape change |
//! |---|---|---|
//! | **Resize** | [`resize`] | per [`ResizeMode`] |
//! | **Rotate** | [`rotate`] | swap for 90/270, bounding box otherwise |
//! | **Pad** | [`pad`] | grows by the padding |
//! | **Crop** | [`crop`] | shrinks to the region |
//! | **Flip / orientation** | [`orientation`] | none, or swap for EXIF 5-8 |
//!
//! Every engine has a plain form that takes the image by value and returns
//! it untouched when the operation is an identity, and a buffer-aware
//! `*_into` form that writes into an optional destination buffer. The
//! destination is reused only when its (width, height, layout) already match
//! the output; otherwise it is dropped and a fresh buffer is allocated.

pub mod crop;
pub mod orientation;
pub mod pad;
pub mod resize;
pub mod rotate;

pub use crop::{center_crop, center_crop_into, crop, crop_into, CropRegion};
pub use pad::{pad, pad_into, padded_dimensions, padded_layout, Padding};
pub use orientation::{apply_orientation, flip, ExifOrientation, FlipAxis};
pub use resize::{
    calculate_dimensions, resize, scale, scale_into, validate_target, Quality, ResizeMode,
};
pub use rotate::{
    normalize_degrees, rotate, rotate_in_place, rotate_into, rotated_bounds, rotated_layout,
};

use crate::error::Result;
use crate::raster::{PixelLayout, RasterImage};

/// Hand back `dest` if it already has the requested shape, otherwise allocate.
///
/// The returned buffer's contents are unspecified; engines overwrite every pixel.
///
/// # Errors
///
/// Returns a validation error when a fresh buffer of this shape would exceed
/// [`crate::raster::MAX_PIXELS`].
pub fn reuse_or_allocate(
    dest: Option<RasterImage>,
    width: u32,
    height: u32,
    layout: PixelLayout,
) -> Result<RasterImage> {
    match dest {
        Some(buffer) if buffer.matches_shape(width, height, layout) => Ok(buffer),
        _ => RasterImage::try_new(width, height, layout),
    }
}
