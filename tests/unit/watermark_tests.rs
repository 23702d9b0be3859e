// Watermarks applied through the chain

use image::Rgba;
use rasterchain::chain::OperationChain;
use rasterchain::raster::{Color, Dimensions, PixelLayout, RasterImage};
use rasterchain::watermark::{
    calculate_position, Anchor, FontHandle, GridPosition, ImageWatermark, TextWatermark,
    Watermark,
};
use rstest::rstest;

fn canvas() -> RasterImage {
    RasterImage::filled(120, 80, PixelLayout::Rgb8, Color::white())
}

#[rstest]
#[case(GridPosition::TopLeft, 4, 4)]
#[case(GridPosition::TopCenter, 50, 4)]
#[case(GridPosition::TopRight, 96, 4)]
#[case(GridPosition::MiddleLeft, 4, 35)]
#[case(GridPosition::MiddleCenter, 50, 35)]
#[case(GridPosition::MiddleRight, 96, 35)]
#[case(GridPosition::BottomLeft, 4, 66)]
#[case(GridPosition::BottomCenter, 50, 66)]
#[case(GridPosition::BottomRight, 96, 66)]
fn test_grid_anchors(#[case] position: GridPosition, #[case] x: i32, #[case] y: i32) {
    let anchor = calculate_position(
        position,
        Dimensions::new(120, 80),
        Dimensions::new(20, 10),
        4,
    );
    assert_eq!(anchor, Anchor::new(x, y));
}

#[test]
fn test_position_names_parse() {
    assert_eq!("center".parse::<GridPosition>().unwrap(), GridPosition::MiddleCenter);
    assert_eq!("top_left".parse::<GridPosition>().unwrap(), GridPosition::TopLeft);
    assert!("upper-left".parse::<GridPosition>().is_err());
}

#[test]
fn test_image_watermark_step_in_chain() {
    let logo = RasterImage::filled(10, 10, PixelLayout::Rgba8, Color::rgb(0, 0, 255));
    let out = OperationChain::new(canvas())
        .unwrap()
        .watermark(
            Watermark::image(ImageWatermark::new(logo))
                .position(GridPosition::TopRight)
                .margin(2)
                .opacity(1.0),
        )
        .unwrap()
        .build()
        .unwrap();

    // anchor (108, 2)
    assert_eq!(out.pixel(108, 2), Rgba([0, 0, 255, 255]));
    assert_eq!(out.pixel(117, 11), Rgba([0, 0, 255, 255]));
    assert_eq!(out.pixel(118, 2), Rgba([255, 255, 255, 255]));
    assert_eq!(out.pixel(107, 2), Rgba([255, 255, 255, 255]));
}

#[test]
fn test_half_opacity_blends() {
    let logo = RasterImage::filled(4, 4, PixelLayout::Rgba8, Color::black());
    let out = OperationChain::new(canvas())
        .unwrap()
        .watermark(
            Watermark::image(ImageWatermark::new(logo))
                .position(GridPosition::TopLeft)
                .margin(0)
                .opacity(0.5),
        )
        .unwrap()
        .build()
        .unwrap();
    let px = out.pixel(1, 1);
    assert!((126..=129).contains(&px[0]), "got {:?}", px);
    assert_eq!(px[3], 255);
}

#[test]
fn test_zero_opacity_leaves_canvas() {
    let before = canvas();
    let expected = before.as_raw().to_vec();
    let out = OperationChain::new(before)
        .unwrap()
        .watermark(Watermark::text(TextWatermark::new("hidden").color(Color::black())).opacity(0.0))
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(out.as_raw(), expected.as_slice());
}

#[test]
fn test_text_background_covers_margin() {
    let out = OperationChain::new(canvas())
        .unwrap()
        .watermark(
            Watermark::text(
                TextWatermark::new("id")
                    .font_size(12.0)
                    .background(Color::rgb(200, 0, 0)),
            )
            .position(GridPosition::TopLeft)
            .margin(6)
            .opacity(1.0),
        )
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(out.pixel(0, 0), Rgba([200, 0, 0, 255]));
    assert_eq!(out.pixel(119, 79), Rgba([255, 255, 255, 255]));
}

#[test]
fn test_invalid_watermarks_rejected_at_append() {
    let empty = Watermark::text(TextWatermark::new(""));
    assert!(OperationChain::new(canvas())
        .unwrap()
        .watermark(empty)
        .unwrap_err()
        .is_validation());

    let opacity = Watermark::text(TextWatermark::new("x")).opacity(2.0);
    assert!(OperationChain::new(canvas())
        .unwrap()
        .watermark(opacity)
        .unwrap_err()
        .is_validation());

    let logo = RasterImage::filled(4, 4, PixelLayout::Rgba8, Color::black());
    let scale = Watermark::image(ImageWatermark::new(logo).scale(1.5));
    assert!(OperationChain::new(canvas())
        .unwrap()
        .watermark(scale)
        .unwrap_err()
        .is_validation());
}

#[test]
fn test_bad_font_bytes() {
    let err = FontHandle::from_bytes("broken", vec![0, 1, 2, 3]).unwrap_err();
    assert!(err.is_validation());
}
