//! Alpha compositing of overlays onto a canvas.
//!
//! Everything here clips to the canvas, so anchors may be negative or lie
//! entirely off-canvas without error.

use image::{Rgba, RgbaImage};

use super::position::Anchor;
use crate::raster::{Color, RasterImage};

/// Blend `overlay` onto `target` with its top-left corner at `anchor`.
pub fn blend_layer(target: &mut RasterImage, overlay: &RgbaImage, anchor: Anchor, opacity: f32) {
    let target_width = target.width() as i64;
    let target_height = target.height() as i64;

    // Visible region, clamped to target bounds
    let x_start = (anchor.x as i64).max(0);
    let y_start = (anchor.y as i64).max(0);
    let x_end = (anchor.x as i64 + overlay.width() as i64).min(target_width);
    let y_end = (anchor.y as i64 + overlay.height() as i64).min(target_height);

    for ty in y_start..y_end {
        for tx in x_start..x_end {
            let ox = (tx - anchor.x as i64) as u32;
            let oy = (ty - anchor.y as i64) as u32;
            blend_at(target, tx, ty, *overlay.get_pixel(ox, oy), opacity);
        }
    }
}

/// Blend a solid rectangle onto `target`. The rectangle may extend past the canvas.
pub fn fill_rect(
    target: &mut RasterImage,
    x: i64,
    y: i64,
    width: u32,
    height: u32,
    color: Color,
    opacity: f32,
) {
    let x_start = x.max(0);
    let y_start = y.max(0);
    let x_end = (x + width as i64).min(target.width() as i64);
    let y_end = (y + height as i64).min(target.height() as i64);
    let pixel: Rgba<u8> = color.into();

    for ty in y_start..y_end {
        for tx in x_start..x_end {
            blend_at(target, tx, ty, pixel, opacity);
        }
    }
}

/// Blend one foreground pixel at canvas coordinates. Off-canvas writes are dropped.
pub fn blend_at(target: &mut RasterImage, x: i64, y: i64, foreground: Rgba<u8>, opacity: f32) {
    if x < 0 || y < 0 || x >= target.width() as i64 || y >= target.height() as i64 {
        return;
    }
    let (x, y) = (x as u32, y as u32);
    let background = target.pixel(x, y);
    target.put_pixel(x, y, blend_pixels(background, foreground, opacity));
}

/// Porter-Duff "over" with an extra opacity factor on the foreground.
pub fn blend_pixels(background: Rgba<u8>, foreground: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let fg_alpha = (foreground[3] as f32 / 255.0) * opacity.clamp(0.0, 1.0);
    if fg_alpha <= 0.0 {
        return background;
    }
    let bg_alpha = background[3] as f32 / 255.0;

    let out_alpha = fg_alpha + bg_alpha * (1.0 - fg_alpha);

    if out_alpha < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend_channel = |fg: u8, bg: u8| -> u8 {
        let fg_f = fg as f32 / 255.0;
        let bg_f = bg as f32 / 255.0;
        let result = (fg_f * fg_alpha + bg_f * bg_alpha * (1.0 - fg_alpha)) / out_alpha;
        (result * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend_channel(foreground[0], background[0]),
        blend_channel(foreground[1], background[1]),
        blend_channel(foreground[2], background[2]),
        (out_alpha * 255.0).round() as u8,
    ])
}
