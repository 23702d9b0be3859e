//! RGBA colors and hex parsing.

use crate::error::ChainError;
use image::Rgba;
use serde::{Deserialize, Deserializer};

/// RGBA color, 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// White color.
    pub const fn white() -> Self {
        Self::rgb(255, 255, 255)
    }

    /// Black color.
    pub const fn black() -> Self {
        Self::rgb(0, 0, 0)
    }

    pub const fn transparent() -> Self {
        Self::rgba(0, 0, 0, 0)
    }

    pub fn is_opaque(self) -> bool {
        self.a == 255
    }

    pub fn opaque(self) -> Self {
        Self { a: 255, ..self }
    }

    /// Linear interpolation between two colors, `t` in [0, 1].
    pub fn lerp(self, other: Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| -> u8 { (a as f32 + (b as f32 - a as f32) * t).round() as u8 };
        Color::rgba(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
            mix(self.a, other.a),
        )
    }
}

impl From<Color> for Rgba<u8> {
    fn from(c: Color) -> Self {
        Rgba([c.r, c.g, c.b, c.a])
    }
}

impl From<Rgba<u8>> for Color {
    fn from(p: Rgba<u8>) -> Self {
        Color::rgba(p[0], p[1], p[2], p[3])
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        parse_hex_color(&hex).map_err(serde::de::Error::custom)
    }
}

/// Parse a hex color string.
///
/// Supports `#RGB`, `#RRGGBB` and `#RRGGBBAA`.
///
/// ```
/// use rasterchain::raster::{parse_hex_color, Color};
///
/// assert_eq!(parse_hex_color("#FFF").unwrap(), Color::white());
/// assert_eq!(parse_hex_color("#FF000080").unwrap(), Color::rgba(255, 0, 0, 128));
/// ```
pub fn parse_hex_color(hex: &str) -> Result<Color, ChainError> {
    let digits = hex
        .strip_prefix('#')
        .ok_or_else(|| ChainError::invalid_param("color", "color must start with '#'"))?;

    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ChainError::invalid_param(
            "color",
            format!("invalid hex digit in '{}'", hex),
        ));
    }

    let byte = |s: &str| -> Result<u8, ChainError> {
        u8::from_str_radix(s, 16)
            .map_err(|_| ChainError::invalid_param("color", format!("invalid hex '{}'", s)))
    };

    match digits.len() {
        3 => {
            // each digit doubled: 0xF -> 0xFF
            let r = byte(&digits[0..1])?;
            let g = byte(&digits[1..2])?;
            let b = byte(&digits[2..3])?;
            Ok(Color::rgb(r * 17, g * 17, b * 17))
        }
        6 => Ok(Color::rgb(
            byte(&digits[0..2])?,
            byte(&digits[2..4])?,
            byte(&digits[4..6])?,
        )),
        8 => Ok(Color::rgba(
            byte(&digits[0..2])?,
            byte(&digits[2..4])?,
            byte(&digits[4..6])?,
            byte(&digits[6..8])?,
        )),
        n => Err(ChainError::invalid_param(
            "color",
            format!("color must be #RGB, #RRGGBB or #RRGGBBAA, got {} digits", n),
        )),
    }
}
