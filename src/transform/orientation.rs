//! Flips and EXIF orientation correction.

use image::imageops;
use std::fmt;

use super::rotate::rotate;
use crate::error::{ChainError, Result};
use crate::raster::RasterImage;

/// Mirror axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipAxis {
    /// Mirror left to right.
    Horizontal,
    /// Mirror top to bottom.
    Vertical,
}

/// Mirror the image in place. The allocation is kept.
pub fn flip(mut image: RasterImage, axis: FlipAxis) -> RasterImage {
    match axis {
        FlipAxis::Horizontal => imageops::flip_horizontal_in_place(image.pixels_mut()),
        FlipAxis::Vertical => imageops::flip_vertical_in_place(image.pixels_mut()),
    }
    image
}

/// The eight EXIF orientation values.
///
/// Each value is corrected by a clockwise rotation followed by an optional flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExifOrientation {
    #[default]
    Normal,
    FlipHorizontal,
    Rotate180,
    FlipVertical,
    Transpose,
    Rotate90,
    Transverse,
    Rotate270,
}

impl ExifOrientation {
    /// Map an EXIF tag value (1..=8).
    pub fn from_tag(tag: u32) -> Result<Self> {
        Ok(match tag {
            1 => ExifOrientation::Normal,
            2 => ExifOrientation::FlipHorizontal,
            3 => ExifOrientation::Rotate180,
            4 => ExifOrientation::FlipVertical,
            5 => ExifOrientation::Transpose,
            6 => ExifOrientation::Rotate90,
            7 => ExifOrientation::Transverse,
            8 => ExifOrientation::Rotate270,
            other => {
                return Err(ChainError::invalid_param(
                    "orientation",
                    format!("EXIF orientation must be 1-8, got {}", other),
                ))
            }
        })
    }

    /// Like [`from_tag`](Self::from_tag) but treats unknown values as `Normal`.
    pub fn from_tag_lossy(tag: u32) -> Self {
        Self::from_tag(tag).unwrap_or_default()
    }

    pub fn tag(self) -> u32 {
        match self {
            ExifOrientation::Normal => 1,
            ExifOrientation::FlipHorizontal => 2,
            ExifOrientation::Rotate180 => 3,
            ExifOrientation::FlipVertical => 4,
            ExifOrientation::Transpose => 5,
            ExifOrientation::Rotate90 => 6,
            ExifOrientation::Transverse => 7,
            ExifOrientation::Rotate270 => 8,
        }
    }

    /// Clockwise correction in degrees, applied before the flip.
    pub fn rotation(self) -> u32 {
        match self {
            ExifOrientation::Rotate180 => 180,
            ExifOrientation::Transpose | ExifOrientation::Rotate90 => 90,
            ExifOrientation::Transverse | ExifOrientation::Rotate270 => 270,
            _ => 0,
        }
    }

    /// Flip applied after the rotation, if any.
    pub fn flip(self) -> Option<FlipAxis> {
        match self {
            ExifOrientation::FlipHorizontal
            | ExifOrientation::Transpose
            | ExifOrientation::Transverse => Some(FlipAxis::Horizontal),
            ExifOrientation::FlipVertical => Some(FlipAxis::Vertical),
            _ => None,
        }
    }

    pub fn is_identity(self) -> bool {
        self == ExifOrientation::Normal
    }
}

impl fmt::Display for ExifOrientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "orientation {}", self.tag())
    }
}

/// Bring an image stored with `orientation` upright.
pub fn apply_orientation(image: RasterImage, orientation: ExifOrientation) -> Result<RasterImage> {
    let rotated = rotate(image, orientation.rotation() as f64, None)?;
    Ok(match orientation.flip() {
        Some(axis) => flip(rotated, axis),
        None => rotated,
    })
}
