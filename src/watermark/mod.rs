//! Text and image watermarks.
//!
//! A [`Watermark`] is a closed set of overlay kinds sharing a [`Placement`]:
//! a grid cell, an opacity and a margin. Applying one measures the content,
//! computes its anchor with [`calculate_position`] and alpha-blends it onto
//! the canvas with clipping.
//!
//! # Example
//!
//! ```
//! use rasterchain::raster::{Color, PixelLayout, RasterImage};
//! use rasterchain::watermark::{GridPosition, TextWatermark, Watermark};
//!
//! let mut canvas = RasterImage::filled(200, 100, PixelLayout::Rgb8, Color::white());
//! let mark = Watermark::text(TextWatermark::new("(c) 2026").font_size(16.0))
//!     .position(GridPosition::BottomRight)
//!     .opacity(0.5)
//!     .margin(8);
//!
//! mark.validate().unwrap();
//! mark.apply(&mut canvas).unwrap();
//! ```

pub mod compositor;
pub mod image_overlay;
pub mod position;
pub mod text_renderer;

pub use compositor::{blend_layer, blend_pixels};
pub use image_overlay::ImageWatermark;
pub use position::{
    calculate_position, is_visible, Anchor, GridPosition, HorizontalAlign, VerticalAlign,
};
pub use text_renderer::{FontHandle, Gradient, Shadow, TextMetrics, TextWatermark};

use tracing::debug;

use crate::error::{ChainError, Result};
use crate::raster::RasterImage;

/// Where and how strongly an overlay is placed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: GridPosition,
    pub opacity: f32,
    pub margin: u32,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            position: GridPosition::BottomRight,
            opacity: 0.5,
            margin: 10,
        }
    }
}

impl Placement {
    pub fn validate(&self) -> Result<()> {
        if !self.opacity.is_finite() || !(0.0..=1.0).contains(&self.opacity) {
            return Err(ChainError::invalid_param(
                "opacity",
                format!("opacity must be between 0.0 and 1.0, got {}", self.opacity),
            ));
        }
        Ok(())
    }
}

/// Overlay kinds.
#[derive(Debug, Clone)]
pub enum Watermark {
    Text(TextWatermark, Placement),
    Image(ImageWatermark, Placement),
}

impl Watermark {
    pub fn text(text: TextWatermark) -> Self {
        Watermark::Text(text, Placement::default())
    }

    pub fn image(image: ImageWatermark) -> Self {
        Watermark::Image(image, Placement::default())
    }

    pub fn placement(&self) -> &Placement {
        match self {
            Watermark::Text(_, placement) | Watermark::Image(_, placement) => placement,
        }
    }

    fn placement_mut(&mut self) -> &mut Placement {
        match self {
            Watermark::Text(_, placement) | Watermark::Image(_, placement) => placement,
        }
    }

    pub fn position(mut self, position: GridPosition) -> Self {
        self.placement_mut().position = position;
        self
    }

    pub fn opacity(mut self, opacity: f32) -> Self {
        self.placement_mut().opacity = opacity;
        self
    }

    pub fn margin(mut self, margin: u32) -> Self {
        self.placement_mut().margin = margin;
        self
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Watermark::Text(..) => "text",
            Watermark::Image(..) => "image",
        }
    }

    /// Check every parameter that does not need the canvas.
    pub fn validate(&self) -> Result<()> {
        self.placement().validate()?;
        match self {
            Watermark::Text(text, _) => text.validate(),
            Watermark::Image(image, _) => image.validate(),
        }
    }

    /// Composite onto `canvas` in place.
    pub fn apply(&self, canvas: &mut RasterImage) -> Result<()> {
        let placement = *self.placement();
        match self {
            Watermark::Text(text, _) => {
                let metrics = text.measure()?;
                let anchor = calculate_position(
                    placement.position,
                    canvas.dimensions(),
                    metrics.dimensions(),
                    placement.margin,
                );
                debug!(
                    kind = "text",
                    position = %placement.position,
                    x = anchor.x,
                    y = anchor.y,
                    width = metrics.width,
                    height = metrics.height,
                    "Placing watermark"
                );
                text.draw(canvas, anchor, &metrics, placement.margin, placement.opacity)
            }
            Watermark::Image(image, _) => {
                let overlay = image.prepared()?;
                let anchor = calculate_position(
                    placement.position,
                    canvas.dimensions(),
                    overlay.dimensions(),
                    placement.margin,
                );
                debug!(
                    kind = "image",
                    position = %placement.position,
                    x = anchor.x,
                    y = anchor.y,
                    width = overlay.width(),
                    height = overlay.height(),
                    "Placing watermark"
                );
                blend_layer(canvas, overlay.pixels(), anchor, placement.opacity);
                Ok(())
            }
        }
    }
}
