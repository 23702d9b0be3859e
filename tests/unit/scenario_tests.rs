// End-to-end scenarios over the chain builder and the position calculator

use image::Rgba;
use rasterchain::chain::OperationChain;
use rasterchain::raster::{Color, Dimensions, PixelLayout, RasterImage};
use rasterchain::transform::ResizeMode;
use rasterchain::watermark::{calculate_position, Anchor, GridPosition};

fn source(width: u32, height: u32) -> RasterImage {
    RasterImage::filled(width, height, PixelLayout::Rgb8, Color::rgb(40, 120, 200))
}

#[test]
fn test_fit_resize_to_matching_aspect() {
    let out = OperationChain::new(source(200, 100))
        .unwrap()
        .resize_with(100, 50, ResizeMode::Fit)
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(out.dimensions(), Dimensions::new(100, 50));
}

#[test]
fn test_fit_resize_is_height_bound() {
    let out = OperationChain::new(source(200, 100))
        .unwrap()
        .resize_with(150, 150, ResizeMode::Fit)
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(out.dimensions(), Dimensions::new(150, 75));
}

#[test]
fn test_pad_with_color_grows_each_side() {
    let out = OperationChain::new(source(100, 50))
        .unwrap()
        .pad_with_color(10, Color::black())
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(out.dimensions(), Dimensions::new(120, 70));
    assert_eq!(out.layout(), PixelLayout::Rgb8);
    assert_eq!(out.pixel(0, 0), Rgba::from(Color::black()));
    assert_eq!(out.pixel(10, 10), Rgba::from(Color::rgb(40, 120, 200)));
}

#[test]
fn test_rotate_quarter_turn_swaps_dimensions() {
    let out = OperationChain::new(source(100, 50))
        .unwrap()
        .rotate(90.0)
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(out.dimensions(), Dimensions::new(50, 100));
}

#[test]
fn test_watermark_anchor_corners() {
    let canvas = Dimensions::new(100, 100);
    let content = Dimensions::new(20, 10);
    assert_eq!(
        calculate_position(GridPosition::TopLeft, canvas, content, 5),
        Anchor::new(5, 5)
    );
    assert_eq!(
        calculate_position(GridPosition::BottomRight, canvas, content, 5),
        Anchor::new(75, 85)
    );
}
