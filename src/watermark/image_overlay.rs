//! Image watermarks.

use std::borrow::Cow;

use crate::error::{ChainError, Result};
use crate::raster::{Dimensions, RasterImage};
use crate::transform::{scale, Quality};

/// An overlay image, scaled relative to its own native size.
#[derive(Debug, Clone)]
pub struct ImageWatermark {
    pub image: RasterImage,
    pub scale: f32,
}

impl ImageWatermark {
    pub fn new(image: RasterImage) -> Self {
        Self { image, scale: 1.0 }
    }

    pub fn scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.scale.is_finite() || self.scale <= 0.0 || self.scale > 1.0 {
            return Err(ChainError::invalid_param(
                "scale",
                format!("scale must be in (0, 1], got {}", self.scale),
            ));
        }
        if self.image.is_empty() {
            return Err(ChainError::invalid_param("image", "watermark image is empty"));
        }
        Ok(())
    }

    /// Size after applying the scale factor, at least 1x1.
    pub fn scaled_dimensions(&self) -> Dimensions {
        let scaled = |v: u32| ((v as f64 * self.scale as f64).round() as u32).max(1);
        Dimensions::new(scaled(self.image.width()), scaled(self.image.height()))
    }

    /// The overlay at its placed size. Borrows the original when no scaling is needed.
    pub fn prepared(&self) -> Result<Cow<'_, RasterImage>> {
        let target = self.scaled_dimensions();
        if target == self.image.dimensions() {
            return Ok(Cow::Borrowed(&self.image));
        }
        scale(&self.image, target.width, target.height, Quality::High).map(Cow::Owned)
    }
}
