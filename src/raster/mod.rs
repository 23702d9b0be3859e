//! In-memory raster images.
//!
//! A [`RasterImage`] is an owned RGBA8 pixel store tagged with a
//! [`PixelLayout`] and a process-unique [`BufferId`]. Every allocation gets a
//! fresh id, so two images with the same id share the same pixel buffer.
//! The chain uses this to prove that identity shortcuts and scratch reuse do
//! not allocate.

pub mod color;

pub use color::{parse_hex_color, Color};

use image::{DynamicImage, Rgba, RgbaImage};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{ChainError, Result};

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

/// Largest pixel count any allocated image may have (16384 x 16384).
pub const MAX_PIXELS: u64 = 16384 * 16384;

const BYTES_PER_PIXEL: u64 = 4;

/// Check that an image of `width` x `height` can be allocated.
///
/// Rejects empty shapes, pixel counts above [`MAX_PIXELS`] and byte sizes
/// that do not fit in `usize` on this platform.
pub fn validate_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(ChainError::invalid_param(
            "dimensions",
            format!("{}x{} has no pixels", width, height),
        ));
    }

    let total_pixels = width as u64 * height as u64;
    if total_pixels > MAX_PIXELS {
        return Err(ChainError::invalid_param(
            "dimensions",
            format!(
                "{}x{} ({} pixels) exceeds the limit of {} pixels",
                width, height, total_pixels, MAX_PIXELS
            ),
        ));
    }

    let fits = total_pixels
        .checked_mul(BYTES_PER_PIXEL)
        .and_then(|bytes| usize::try_from(bytes).ok())
        .is_some();
    if !fits {
        return Err(ChainError::invalid_param(
            "dimensions",
            format!("{}x{} does not fit in addressable memory", width, height),
        ));
    }

    Ok(())
}

/// Identity of one pixel allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(u64);

impl BufferId {
    fn next() -> Self {
        Self(NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buf#{}", self.0)
    }
}

/// Channel layout of a raster image.
///
/// Pixels are always stored as RGBA8; for `Rgb8` the alpha channel is kept
/// at 255 and carries no information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelLayout {
    Rgb8,
    #[default]
    Rgba8,
}

impl PixelLayout {
    pub fn has_alpha(self) -> bool {
        matches!(self, PixelLayout::Rgba8)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PixelLayout::Rgb8 => "rgb8",
            PixelLayout::Rgba8 => "rgba8",
        }
    }
}

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn area(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl From<(u32, u32)> for Dimensions {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

/// Mutable 2D pixel buffer owned by whichever pipeline stage holds it.
pub struct RasterImage {
    id: BufferId,
    layout: PixelLayout,
    pixels: RgbaImage,
}

impl RasterImage {
    /// Allocate a zero-filled (fully transparent) image.
    ///
    /// Panics if the buffer size overflows; use [`RasterImage::try_new`] for
    /// dimensions that are not known to be small.
    pub fn new(width: u32, height: u32, layout: PixelLayout) -> Self {
        Self::from_rgba(RgbaImage::new(width, height), layout)
    }

    /// Allocate a zero-filled image after checking the shape against [`MAX_PIXELS`].
    pub fn try_new(width: u32, height: u32, layout: PixelLayout) -> Result<Self> {
        validate_dimensions(width, height)?;
        Ok(Self::new(width, height, layout))
    }

    /// Allocate an image filled with a single color.
    pub fn filled(width: u32, height: u32, layout: PixelLayout, color: Color) -> Self {
        let fill = match layout {
            PixelLayout::Rgb8 => color.opaque(),
            PixelLayout::Rgba8 => color,
        };
        Self::from_rgba(RgbaImage::from_pixel(width, height, fill.into()), layout)
    }

    /// Wrap an existing RGBA buffer. For `Rgb8` the alpha channel is forced opaque.
    pub fn from_rgba(mut pixels: RgbaImage, layout: PixelLayout) -> Self {
        if layout == PixelLayout::Rgb8 {
            for pixel in pixels.pixels_mut() {
                pixel[3] = 255;
            }
        }
        Self {
            id: BufferId::next(),
            layout,
            pixels,
        }
    }

    /// Convert a decoded image, keeping track of whether it carries alpha.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        let layout = if image.color().has_alpha() {
            PixelLayout::Rgba8
        } else {
            PixelLayout::Rgb8
        };
        let pixels = match image {
            DynamicImage::ImageRgba8(rgba) => rgba,
            other => other.to_rgba8(),
        };
        Self {
            id: BufferId::next(),
            layout,
            pixels,
        }
    }

    /// Rebuild an image around a recycled allocation, keeping its identity.
    pub(crate) fn reassemble(id: BufferId, layout: PixelLayout, pixels: RgbaImage) -> Self {
        Self { id, layout, pixels }
    }

    /// Split into identity, layout and pixels so an engine can write into the buffer.
    pub(crate) fn disassemble(self) -> (BufferId, PixelLayout, RgbaImage) {
        (self.id, self.layout, self.pixels)
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width(), self.height())
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    pub fn has_alpha(&self) -> bool {
        self.layout.has_alpha()
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Whether this buffer can hold an image of the given shape without reallocating.
    pub fn matches_shape(&self, width: u32, height: u32, layout: PixelLayout) -> bool {
        self.width() == width && self.height() == height && self.layout == layout
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.pixels.get_pixel(x, y)
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, pixel: Rgba<u8>) {
        let pixel = match self.layout {
            PixelLayout::Rgb8 => Rgba([pixel[0], pixel[1], pixel[2], 255]),
            PixelLayout::Rgba8 => pixel,
        };
        self.pixels.put_pixel(x, y, pixel);
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Direct pixel access for engines. Writers must keep alpha at 255 on `Rgb8` buffers.
    pub(crate) fn pixels_mut(&mut self) -> &mut RgbaImage {
        &mut self.pixels
    }

    /// Raw RGBA bytes, row-major.
    pub fn as_raw(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    /// Overwrite every pixel with `color`, keeping the allocation.
    pub fn fill(&mut self, color: Color) {
        let fill: Rgba<u8> = match self.layout {
            PixelLayout::Rgb8 => color.opaque().into(),
            PixelLayout::Rgba8 => color.into(),
        };
        for pixel in self.pixels.pixels_mut() {
            *pixel = fill;
        }
    }

    /// Change the layout tag. Switching to `Rgb8` flattens alpha to opaque.
    pub fn set_layout(&mut self, layout: PixelLayout) {
        if layout == PixelLayout::Rgb8 && self.layout != PixelLayout::Rgb8 {
            for pixel in self.pixels.pixels_mut() {
                pixel[3] = 255;
            }
        }
        self.layout = layout;
    }

    pub fn into_rgba(self) -> RgbaImage {
        self.pixels
    }

    /// Convert to a `DynamicImage` matching the layout, for encoding.
    pub fn into_dynamic(self) -> DynamicImage {
        match self.layout {
            PixelLayout::Rgba8 => DynamicImage::ImageRgba8(self.pixels),
            PixelLayout::Rgb8 => {
                DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(self.pixels).into_rgb8())
            }
        }
    }

    pub fn to_dynamic(&self) -> DynamicImage {
        self.clone().into_dynamic()
    }
}

impl Clone for RasterImage {
    /// Cloning copies the pixels into a new allocation with a new id.
    fn clone(&self) -> Self {
        Self {
            id: BufferId::next(),
            layout: self.layout,
            pixels: self.pixels.clone(),
        }
    }
}

impl fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterImage")
            .field("id", &self.id)
            .field("dimensions", &(self.width(), self.height()))
            .field("layout", &self.layout)
            .finish()
    }
}

impl From<DynamicImage> for RasterImage {
    fn from(image: DynamicImage) -> Self {
        Self::from_dynamic(image)
    }
}

impl From<RgbaImage> for RasterImage {
    fn from(pixels: RgbaImage) -> Self {
        Self::from_rgba(pixels, PixelLayout::Rgba8)
    }
}
