//! Rectangular crops.

use super::reuse_or_allocate;
use crate::error::{ChainError, Result};
use crate::raster::RasterImage;

/// Region to keep, in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRegion {
    /// Create a region. Zero-sized regions are rejected.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ChainError::invalid_param(
                "crop",
                format!("crop size {}x{} must be positive", width, height),
            ));
        }
        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }

    /// Centered region of the given size inside a `src_w` x `src_h` image.
    pub fn centered(src_w: u32, src_h: u32, width: u32, height: u32) -> Result<Self> {
        let region = Self::new(0, 0, width, height)?;
        Ok(Self {
            x: src_w.saturating_sub(width) / 2,
            y: src_h.saturating_sub(height) / 2,
            ..region
        })
    }

    /// Check the region against real image dimensions.
    pub fn check_bounds(&self, src_w: u32, src_h: u32) -> Result<()> {
        let right = self.x as u64 + self.width as u64;
        let bottom = self.y as u64 + self.height as u64;
        if right > src_w as u64 || bottom > src_h as u64 {
            return Err(ChainError::invalid_param(
                "crop",
                format!(
                    "region {}x{}+{}+{} exceeds source {}x{}",
                    self.width, self.height, self.x, self.y, src_w, src_h
                ),
            ));
        }
        Ok(())
    }

    pub fn covers(&self, src_w: u32, src_h: u32) -> bool {
        self.x == 0 && self.y == 0 && self.width == src_w && self.height == src_h
    }
}

/// Crop to `region`. A region covering the whole image returns the source unchanged.
pub fn crop(image: RasterImage, region: CropRegion) -> Result<RasterImage> {
    region.check_bounds(image.width(), image.height())?;
    if region.covers(image.width(), image.height()) {
        return Ok(image);
    }
    crop_into(&image, region, None)
}

/// Crop to `region`, writing into `dest` when its shape matches.
pub fn crop_into(
    src: &RasterImage,
    region: CropRegion,
    dest: Option<RasterImage>,
) -> Result<RasterImage> {
    region.check_bounds(src.width(), src.height())?;

    let (id, layout, mut pixels) =
        reuse_or_allocate(dest, region.width, region.height, src.layout())?.disassemble();

    let stride = src.width() as usize * 4;
    let row_len = region.width as usize * 4;
    let source = src.as_raw();
    for (row, out_row) in pixels.chunks_exact_mut(row_len).enumerate() {
        let start = (region.y as usize + row) * stride + region.x as usize * 4;
        out_row.copy_from_slice(&source[start..start + row_len]);
    }

    Ok(RasterImage::reassemble(id, layout, pixels))
}

/// Crop a centered `width` x `height` region.
///
/// The requested size is clamped to the image so a cover-resized image can be
/// trimmed without knowing which axis overflowed.
pub fn center_crop(image: RasterImage, width: u32, height: u32) -> Result<RasterImage> {
    let region = centered_region(&image, width, height)?;
    crop(image, region)
}

/// Buffer-aware form of [`center_crop`].
pub fn center_crop_into(
    src: &RasterImage,
    width: u32,
    height: u32,
    dest: Option<RasterImage>,
) -> Result<RasterImage> {
    let region = centered_region(src, width, height)?;
    crop_into(src, region, dest)
}

fn centered_region(image: &RasterImage, width: u32, height: u32) -> Result<CropRegion> {
    CropRegion::centered(
        image.width(),
        image.height(),
        width.min(image.width()),
        height.min(image.height()),
    )
}
