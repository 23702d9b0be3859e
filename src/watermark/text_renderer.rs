//! Text watermark rendering.
//!
//! Glyphs are rasterised with `ab_glyph` and blended straight onto the
//! canvas, so no intermediate text image is allocated. The content box used
//! for placement is measured from font metrics:
//!
//! - width: sum of horizontal advances plus kerning, rounded up
//! - height: ascent minus descent, rounded up
//!
//! The baseline sits at `anchor.y + ceil(ascent)`.

use ab_glyph::{point, Font, FontArc, GlyphId, PxScale, ScaleFont};
use image::Rgba;
use std::fmt;
use std::sync::{Arc, OnceLock};

use super::compositor::{blend_at, fill_rect};
use super::position::Anchor;
use crate::error::{ChainError, Result};
use crate::raster::{Color, Dimensions, RasterImage};

/// Embedded default font (DejaVu Sans Mono, see `fonts/LICENSE-DejaVu.txt`).
const EMBEDDED_FONT_DATA: &[u8] = include_bytes!("fonts/DejaVuSansMono.ttf");

static DEFAULT_FONT: OnceLock<Option<FontArc>> = OnceLock::new();

fn default_font() -> Result<FontArc> {
    DEFAULT_FONT
        .get_or_init(|| FontArc::try_from_slice(EMBEDDED_FONT_DATA).ok())
        .clone()
        .ok_or_else(|| ChainError::processing("embedded font failed to load"))
}

/// Shared handle to a parsed font.
#[derive(Clone)]
pub struct FontHandle {
    font: FontArc,
    name: Arc<str>,
}

impl FontHandle {
    /// The embedded DejaVu Sans Mono.
    pub fn embedded() -> Result<Self> {
        Ok(Self {
            font: default_font()?,
            name: Arc::from("DejaVu Sans Mono"),
        })
    }

    /// Parse caller-supplied TrueType or OpenType bytes.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let name = name.into();
        let font = FontArc::try_from_vec(bytes).map_err(|e| {
            ChainError::invalid_param("font", format!("cannot parse font '{}': {}", name, e))
        })?;
        Ok(Self {
            font,
            name: Arc::from(name),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn font(&self) -> &FontArc {
        &self.font
    }
}

impl fmt::Debug for FontHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontHandle").field("name", &self.name).finish()
    }
}

/// Drop shadow drawn beneath the text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shadow {
    pub offset_x: i32,
    pub offset_y: i32,
    pub color: Color,
}

/// Horizontal gradient replacing the fill color, left to right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gradient {
    pub start: Color,
    pub end: Color,
}

/// Measured layout of a run of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextMetrics {
    pub width: u32,
    pub height: u32,
    pub ascent: f32,
}

impl TextMetrics {
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    /// Offset from the top of the box to the baseline.
    pub fn baseline_offset(&self) -> i32 {
        self.ascent.ceil() as i32
    }
}

/// Text overlay settings.
#[derive(Debug, Clone)]
pub struct TextWatermark {
    pub text: String,
    pub font: Option<FontHandle>,
    pub font_size: f32,
    pub color: Color,
    pub background: Option<Color>,
    pub shadow: Option<Shadow>,
    pub gradient: Option<Gradient>,
}

impl TextWatermark {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font: None,
            font_size: 24.0,
            color: Color::white(),
            background: None,
            shadow: None,
            gradient: None,
        }
    }

    pub fn font(mut self, font: FontHandle) -> Self {
        self.font = Some(font);
        self
    }

    pub fn font_size(mut self, size: f32) -> Self {
        self.font_size = size;
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }

    pub fn shadow(mut self, shadow: Shadow) -> Self {
        self.shadow = Some(shadow);
        self
    }

    pub fn gradient(mut self, start: Color, end: Color) -> Self {
        self.gradient = Some(Gradient { start, end });
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.text.is_empty() {
            return Err(ChainError::invalid_param("text", "watermark text is empty"));
        }
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(ChainError::invalid_param(
                "font_size",
                format!("font size must be positive, got {}", self.font_size),
            ));
        }
        Ok(())
    }

    fn resolve_font(&self) -> Result<FontArc> {
        match &self.font {
            Some(handle) => Ok(handle.font().clone()),
            None => default_font(),
        }
    }

    /// Measure the text box from font metrics.
    pub fn measure(&self) -> Result<TextMetrics> {
        let font = self.resolve_font()?;
        Ok(measure_with(&font, &self.text, self.font_size))
    }

    /// Draw onto `canvas` with the text box's top-left at `anchor`.
    pub fn draw(
        &self,
        canvas: &mut RasterImage,
        anchor: Anchor,
        metrics: &TextMetrics,
        margin: u32,
        opacity: f32,
    ) -> Result<()> {
        let font = self.resolve_font()?;

        if let Some(background) = self.background {
            let m = margin as i64;
            fill_rect(
                canvas,
                anchor.x as i64 - m,
                anchor.y as i64 - m,
                metrics.width.saturating_add(margin.saturating_mul(2)),
                metrics.height.saturating_add(margin.saturating_mul(2)),
                background,
                opacity,
            );
        }

        if let Some(shadow) = self.shadow {
            let shadow_anchor = anchor.offset(shadow.offset_x, shadow.offset_y);
            self.draw_glyphs(canvas, &font, shadow_anchor, metrics, opacity, |_| shadow.color);
        }

        match self.gradient {
            Some(gradient) => {
                let span = metrics.width.max(1) as f32;
                self.draw_glyphs(canvas, &font, anchor, metrics, opacity, |dx| {
                    gradient.start.lerp(gradient.end, dx as f32 / span)
                })
            }
            None => self.draw_glyphs(canvas, &font, anchor, metrics, opacity, |_| self.color),
        }

        Ok(())
    }

    /// Rasterise every glyph, coloring each pixel by its x offset from the anchor.
    fn draw_glyphs<F>(
        &self,
        canvas: &mut RasterImage,
        font: &FontArc,
        anchor: Anchor,
        metrics: &TextMetrics,
        opacity: f32,
        color_at: F,
    ) where
        F: Fn(i64) -> Color,
    {
        let scale = PxScale::from(self.font_size);
        let scaled_font = font.as_scaled(scale);
        let baseline_y = anchor.y as f32 + metrics.baseline_offset() as f32;

        let mut cursor_x = anchor.x as f32;
        let mut prev_glyph: Option<GlyphId> = None;

        for c in self.text.chars() {
            let glyph_id = scaled_font.glyph_id(c);
            if let Some(prev) = prev_glyph {
                cursor_x += scaled_font.kern(prev, glyph_id);
            }

            let glyph = glyph_id.with_scale_and_position(scale, point(cursor_x, baseline_y));
            if let Some(outlined) = font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                outlined.draw(|px, py, coverage| {
                    let x = px as i64 + bounds.min.x as i64;
                    let y = py as i64 + bounds.min.y as i64;
                    let color = color_at(x - anchor.x as i64);
                    let alpha = (coverage.clamp(0.0, 1.0) * color.a as f32).round() as u8;
                    blend_at(canvas, x, y, Rgba([color.r, color.g, color.b, alpha]), opacity);
                });
            }

            cursor_x += scaled_font.h_advance(glyph_id);
            prev_glyph = Some(glyph_id);
        }
    }
}

fn measure_with(font: &FontArc, text: &str, font_size: f32) -> TextMetrics {
    let scaled_font = font.as_scaled(PxScale::from(font_size));

    let mut width = 0.0f32;
    let mut prev_glyph: Option<GlyphId> = None;
    for c in text.chars() {
        let glyph_id = scaled_font.glyph_id(c);
        if let Some(prev) = prev_glyph {
            width += scaled_font.kern(prev, glyph_id);
        }
        width += scaled_font.h_advance(glyph_id);
        prev_glyph = Some(glyph_id);
    }

    // descent is negative below the baseline
    let height = scaled_font.ascent() - scaled_font.descent();

    TextMetrics {
        width: (width.ceil() as u32).max(1),
        height: (height.ceil() as u32).max(1),
        ascent: scaled_font.ascent(),
    }
}
