//! Anchor calculation for watermark placement on a nine-cell grid.
//!
//! # Example
//!
//! ```
//! use rasterchain::raster::Dimensions;
//! use rasterchain::watermark::{calculate_position, Anchor, GridPosition};
//!
//! let canvas = Dimensions::new(800, 600);
//! let content = Dimensions::new(100, 50);
//!
//! let anchor = calculate_position(GridPosition::BottomRight, canvas, content, 10);
//! assert_eq!(anchor, Anchor::new(690, 540)); // 800 - 100 - 10, 600 - 50 - 10
//! ```

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::error::ChainError;
use crate::raster::Dimensions;

/// Column of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalAlign {
    Left,
    Center,
    Right,
}

/// Row of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAlign {
    Top,
    Middle,
    Bottom,
}

/// One of the nine placement cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GridPosition {
    TopLeft,
    TopCenter,
    TopRight,
    #[serde(alias = "center-left")]
    MiddleLeft,
    #[serde(alias = "center")]
    MiddleCenter,
    #[serde(alias = "center-right")]
    MiddleRight,
    BottomLeft,
    BottomCenter,
    #[default]
    BottomRight,
}

impl GridPosition {
    pub const ALL: [GridPosition; 9] = [
        GridPosition::TopLeft,
        GridPosition::TopCenter,
        GridPosition::TopRight,
        GridPosition::MiddleLeft,
        GridPosition::MiddleCenter,
        GridPosition::MiddleRight,
        GridPosition::BottomLeft,
        GridPosition::BottomCenter,
        GridPosition::BottomRight,
    ];

    pub fn horizontal(self) -> HorizontalAlign {
        match self {
            GridPosition::TopLeft | GridPosition::MiddleLeft | GridPosition::BottomLeft => {
                HorizontalAlign::Left
            }
            GridPosition::TopCenter | GridPosition::MiddleCenter | GridPosition::BottomCenter => {
                HorizontalAlign::Center
            }
            GridPosition::TopRight | GridPosition::MiddleRight | GridPosition::BottomRight => {
                HorizontalAlign::Right
            }
        }
    }

    pub fn vertical(self) -> VerticalAlign {
        match self {
            GridPosition::TopLeft | GridPosition::TopCenter | GridPosition::TopRight => {
                VerticalAlign::Top
            }
            GridPosition::MiddleLeft | GridPosition::MiddleCenter | GridPosition::MiddleRight => {
                VerticalAlign::Middle
            }
            GridPosition::BottomLeft | GridPosition::BottomCenter | GridPosition::BottomRight => {
                VerticalAlign::Bottom
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GridPosition::TopLeft => "top-left",
            GridPosition::TopCenter => "top-center",
            GridPosition::TopRight => "top-right",
            GridPosition::MiddleLeft => "middle-left",
            GridPosition::MiddleCenter => "middle-center",
            GridPosition::MiddleRight => "middle-right",
            GridPosition::BottomLeft => "bottom-left",
            GridPosition::BottomCenter => "bottom-center",
            GridPosition::BottomRight => "bottom-right",
        }
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GridPosition {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        match normalized.as_str() {
            "center" => Ok(GridPosition::MiddleCenter),
            "center-left" => Ok(GridPosition::MiddleLeft),
            "center-right" => Ok(GridPosition::MiddleRight),
            other => GridPosition::ALL
                .into_iter()
                .find(|p| p.as_str() == other)
                .ok_or_else(|| {
                    ChainError::invalid_param("position", format!("unknown position: {}", s))
                }),
        }
    }
}

/// Top-left corner of placed content. May be negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Anchor {
    pub x: i32,
    pub y: i32,
}

impl Anchor {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }
}

fn to_i32(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Calculate where content of size `content` lands on `canvas`.
///
/// Centered axes use truncating integer division. The result is negative
/// when the content is larger than the canvas; compositing clips it.
pub fn calculate_position(
    position: GridPosition,
    canvas: Dimensions,
    content: Dimensions,
    margin: u32,
) -> Anchor {
    let (w, h) = (canvas.width as i64, canvas.height as i64);
    let (cw, ch) = (content.width as i64, content.height as i64);
    let m = margin as i64;

    let x = match position.horizontal() {
        HorizontalAlign::Left => m,
        HorizontalAlign::Center => (w - cw) / 2,
        HorizontalAlign::Right => w - cw - m,
    };
    let y = match position.vertical() {
        VerticalAlign::Top => m,
        VerticalAlign::Middle => (h - ch) / 2,
        VerticalAlign::Bottom => h - ch - m,
    };

    Anchor::new(to_i32(x), to_i32(y))
}

/// Whether any part of the content would land on the canvas.
pub fn is_visible(anchor: Anchor, canvas: Dimensions, content: Dimensions) -> bool {
    let right = anchor.x as i64 + content.width as i64;
    let bottom = anchor.y as i64 + content.height as i64;

    (anchor.x as i64) < canvas.width as i64
        && (anchor.y as i64) < canvas.height as i64
        && right > 0
        && bottom > 0
}
