//! Rotation engine.
//!
//! Angles are in degrees, clockwise, normalized into `[0, 360)`. Multiples of
//! 90 are lossless pixel remaps; every other angle is resampled bilinearly
//! into the bounding box of the rotated rectangle.

use image::{imageops, Rgba};

use super::reuse_or_allocate;
use crate::error::{ChainError, Result};
use crate::raster::{Color, PixelLayout, RasterImage};

/// Normalize an angle into `[0, 360)`. Non-finite angles are rejected.
pub fn normalize_degrees(degrees: f64) -> Result<f64> {
    if !degrees.is_finite() {
        return Err(ChainError::invalid_param(
            "degrees",
            format!("rotation angle must be finite, got {}", degrees),
        ));
    }
    let normalized = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    Ok(if normalized >= 360.0 { 0.0 } else { normalized })
}

/// Output dimensions of a rotation by `degrees` (already normalized).
///
/// ```
/// use rasterchain::transform::rotated_bounds;
///
/// assert_eq!(rotated_bounds(200, 100, 90.0), (100, 200));
/// assert_eq!(rotated_bounds(100, 100, 45.0), (141, 141));
/// ```
pub fn rotated_bounds(width: u32, height: u32, degrees: f64) -> (u32, u32) {
    if degrees == 90.0 || degrees == 270.0 {
        return (height, width);
    }
    if degrees == 0.0 || degrees == 180.0 {
        return (width, height);
    }
    let radians = degrees.to_radians();
    let (sin, cos) = (radians.sin().abs(), radians.cos().abs());
    let w = width as f64 * cos + height as f64 * sin;
    let h = width as f64 * sin + height as f64 * cos;
    // Truncate toward zero, never below one pixel
    ((w as u32).max(1), (h as u32).max(1))
}

/// Layout of a rotation result.
///
/// Right angles keep the source layout. Other angles expose corners that are
/// only opaque when an opaque background is supplied.
pub fn rotated_layout(layout: PixelLayout, degrees: f64, background: Option<Color>) -> PixelLayout {
    if degrees % 90.0 == 0.0 {
        return layout;
    }
    match background {
        Some(color) if color.is_opaque() => layout,
        _ => PixelLayout::Rgba8,
    }
}

/// Rotate clockwise by `degrees`. A zero rotation returns the source untouched.
///
/// For non-right angles the uncovered corners take `background`, or become
/// transparent when no background is given.
pub fn rotate(image: RasterImage, degrees: f64, background: Option<Color>) -> Result<RasterImage> {
    let degrees = normalize_degrees(degrees)?;
    if degrees == 0.0 {
        return Ok(image);
    }
    rotate_into(&image, degrees, background, None)
}

/// Rotate clockwise by `degrees`, writing into `dest` when its shape matches.
pub fn rotate_into(
    src: &RasterImage,
    degrees: f64,
    background: Option<Color>,
    dest: Option<RasterImage>,
) -> Result<RasterImage> {
    let degrees = normalize_degrees(degrees)?;
    let (w, h) = (src.width(), src.height());

    if degrees == 0.0 {
        let mut out = reuse_or_allocate(dest, w, h, src.layout())?;
        out.pixels_mut().copy_from_slice(src.as_raw());
        return Ok(out);
    }

    if degrees == 90.0 || degrees == 180.0 || degrees == 270.0 {
        let (out_w, out_h) = rotated_bounds(w, h, degrees);
        let (id, layout, mut pixels) =
            reuse_or_allocate(dest, out_w, out_h, src.layout())?.disassemble();
        let source = src.pixels();
        for (x, y, pixel) in source.enumerate_pixels() {
            let (dx, dy) = match degrees as u32 {
                90 => (h - 1 - y, x),
                180 => (w - 1 - x, h - 1 - y),
                _ => (y, w - 1 - x),
            };
            pixels.put_pixel(dx, dy, *pixel);
        }
        return Ok(RasterImage::reassemble(id, layout, pixels));
    }

    rotate_arbitrary(src, degrees, background, dest)
}

/// Rotate a right angle without leaving the buffer.
///
/// Works for 180 on any image and for 90/270 on square images, where the
/// output has the same shape as the input. Returns `false` and leaves the
/// image untouched for every other rotation.
pub fn rotate_in_place(image: &mut RasterImage, degrees: f64) -> Result<bool> {
    let degrees = normalize_degrees(degrees)?;
    let square = image.width() == image.height();

    if degrees == 0.0 {
        return Ok(true);
    }
    if degrees == 180.0 {
        imageops::rotate180_in_place(image.pixels_mut());
        return Ok(true);
    }
    if square && degrees == 90.0 {
        transpose_square(image);
        imageops::flip_horizontal_in_place(image.pixels_mut());
        return Ok(true);
    }
    if square && degrees == 270.0 {
        transpose_square(image);
        imageops::flip_vertical_in_place(image.pixels_mut());
        return Ok(true);
    }
    Ok(false)
}

/// Mirror a square image across its main diagonal.
fn transpose_square(image: &mut RasterImage) {
    let pixels = image.pixels_mut();
    let side = pixels.width();
    for y in 0..side {
        for x in (y + 1)..side {
            let upper = *pixels.get_pixel(x, y);
            let lower = *pixels.get_pixel(y, x);
            pixels.put_pixel(x, y, lower);
            pixels.put_pixel(y, x, upper);
        }
    }
}

fn rotate_arbitrary(
    src: &RasterImage,
    degrees: f64,
    background: Option<Color>,
    dest: Option<RasterImage>,
) -> Result<RasterImage> {
    if src.is_empty() {
        return Err(ChainError::processing("cannot rotate an empty image"));
    }

    let (w, h) = (src.width(), src.height());
    let (out_w, out_h) = rotated_bounds(w, h, degrees);

    let layout = rotated_layout(src.layout(), degrees, background);
    let fill = background.unwrap_or_else(Color::transparent);

    let (id, layout, mut pixels) = reuse_or_allocate(dest, out_w, out_h, layout)?.disassemble();

    let radians = degrees.to_radians();
    let (sin, cos) = radians.sin_cos();
    let (src_cx, src_cy) = (w as f64 / 2.0, h as f64 / 2.0);
    let (dst_cx, dst_cy) = (out_w as f64 / 2.0, out_h as f64 / 2.0);

    for (x, y, out) in pixels.enumerate_pixels_mut() {
        let dx = x as f64 + 0.5 - dst_cx;
        let dy = y as f64 + 0.5 - dst_cy;
        // Inverse of the clockwise rotation
        let sx = dx * cos + dy * sin + src_cx - 0.5;
        let sy = -dx * sin + dy * cos + src_cy - 0.5;
        *out = sample_bilinear(src, sx, sy, fill);
    }

    Ok(RasterImage::reassemble(id, layout, pixels))
}

/// Bilinear sample at fractional source coordinates. Neighbours outside the
/// image contribute `fill`. Interpolation runs on premultiplied values so
/// transparent neighbours do not darken edges.
fn sample_bilinear(src: &RasterImage, sx: f64, sy: f64, fill: Color) -> Rgba<u8> {
    let x0 = sx.floor();
    let y0 = sy.floor();
    let fx = sx - x0;
    let fy = sy - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let fetch = |x: i64, y: i64| -> [f64; 4] {
        let p = if x >= 0 && y >= 0 && (x as u32) < src.width() && (y as u32) < src.height() {
            src.pixel(x as u32, y as u32)
        } else {
            fill.into()
        };
        let a = p[3] as f64 / 255.0;
        [p[0] as f64 * a, p[1] as f64 * a, p[2] as f64 * a, p[3] as f64]
    };

    let p00 = fetch(x0, y0);
    let p10 = fetch(x0 + 1, y0);
    let p01 = fetch(x0, y0 + 1);
    let p11 = fetch(x0 + 1, y0 + 1);

    let mut acc = [0.0f64; 4];
    for c in 0..4 {
        let top = p00[c] * (1.0 - fx) + p10[c] * fx;
        let bottom = p01[c] * (1.0 - fx) + p11[c] * fx;
        acc[c] = top * (1.0 - fy) + bottom * fy;
    }

    let alpha = acc[3];
    if alpha <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }
    let unmul = |v: f64| (v * 255.0 / alpha).round().clamp(0.0, 255.0) as u8;
    Rgba([
        unmul(acc[0]),
        unmul(acc[1]),
        unmul(acc[2]),
        alpha.round().clamp(0.0, 255.0) as u8,
    ])
}
