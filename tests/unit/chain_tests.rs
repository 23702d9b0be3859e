// Chain properties: resize geometry, identities, lossless right angles and scratch reuse

use image::Rgba;
use proptest::prelude::*;
use rasterchain::chain::{BufferUse, OperationChain};
use rasterchain::raster::{Color, Dimensions, PixelLayout, RasterImage};
use rasterchain::transform::{calculate_dimensions, flip, FlipAxis, Padding, ResizeMode};

/// Image whose every pixel is distinct, so any misplaced pixel shows up.
fn gradient(width: u32, height: u32) -> RasterImage {
    let mut img = RasterImage::new(width, height, PixelLayout::Rgba8);
    for y in 0..height {
        for x in 0..width {
            img.put_pixel(x, y, Rgba([x as u8, y as u8, (x * 7 + y * 3) as u8, 255]));
        }
    }
    img
}

proptest! {
    #[test]
    fn prop_fit_stays_inside_target_and_keeps_aspect(
        src_w in 1u32..3000,
        src_h in 1u32..3000,
        target_w in 1u32..3000,
        target_h in 1u32..3000,
    ) {
        let (w, h) = calculate_dimensions(src_w, src_h, target_w, target_h, ResizeMode::Fit);
        prop_assert!(w >= 1 && h >= 1);
        prop_assert!(w <= target_w && h <= target_h);
        // at least one side touches the box
        prop_assert!(w == target_w || h == target_h);

        let skew = (w as i128 * src_h as i128 - h as i128 * src_w as i128).abs();
        prop_assert!(skew <= src_w.max(src_h) as i128);
    }

    #[test]
    fn prop_exact_is_always_target(
        src_w in 1u32..3000,
        src_h in 1u32..3000,
        target_w in 1u32..3000,
        target_h in 1u32..3000,
    ) {
        let dims = calculate_dimensions(src_w, src_h, target_w, target_h, ResizeMode::Exact);
        prop_assert_eq!(dims, (target_w, target_h));
    }
}

#[test]
fn test_exact_resize_through_chain() {
    let out = OperationChain::new(gradient(31, 17))
        .unwrap()
        .resize_with(64, 9, ResizeMode::Exact)
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(out.dimensions(), Dimensions::new(64, 9));
}

#[test]
fn test_rotate_zero_returns_same_buffer() {
    let img = gradient(8, 5);
    let id = img.id();
    let output = OperationChain::new(img)
        .unwrap()
        .rotate(0.0)
        .unwrap()
        .rotate(360.0)
        .unwrap()
        .execute()
        .unwrap();
    assert_eq!(output.image.id(), id);
    assert!(output
        .trace
        .steps
        .iter()
        .all(|s| s.buffer_use == BufferUse::InPlace));
    assert_eq!(output.trace.allocations, 0);
}

#[test]
fn test_four_quarter_turns_are_lossless() {
    let img = gradient(13, 7);
    let expected = img.as_raw().to_vec();

    let out = OperationChain::new(img)
        .unwrap()
        .rotate(90.0)
        .unwrap()
        .rotate(90.0)
        .unwrap()
        .rotate(90.0)
        .unwrap()
        .rotate(90.0)
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(out.dimensions(), Dimensions::new(13, 7));
    assert_eq!(out.as_raw(), expected.as_slice());
}

#[test]
fn test_zero_padding_returns_same_buffer() {
    let img = gradient(6, 6);
    let id = img.id();
    let out = OperationChain::new(img)
        .unwrap()
        .pad(Padding::new(0, 0, 0, 0))
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(out.id(), id);
}

#[test]
fn test_same_shape_steps_share_one_buffer() {
    let img = gradient(10, 6);
    let source_id = img.id();
    let output = OperationChain::new(img)
        .unwrap()
        .rotate(180.0)
        .unwrap()
        .rotate(180.0)
        .unwrap()
        .rotate(180.0)
        .unwrap()
        .rotate(180.0)
        .unwrap()
        .execute()
        .unwrap();

    let ids = output.trace.buffers();
    assert_eq!(ids.len(), 4);
    assert_ne!(ids[0], source_id);
    assert!(ids.iter().all(|id| *id == ids[0]));
    assert_eq!(output.trace.allocations, 1);
    assert_eq!(output.trace.reuses, 0);
    assert!(output.trace.steps[1..]
        .iter()
        .all(|s| s.buffer_use == BufferUse::InPlace));
}

#[test]
fn test_square_quarter_turns_stay_on_one_buffer() {
    let img = gradient(9, 9);
    let expected = img.as_raw().to_vec();
    let output = OperationChain::new(img)
        .unwrap()
        .rotate(90.0)
        .unwrap()
        .rotate(270.0)
        .unwrap()
        .rotate(90.0)
        .unwrap()
        .rotate(-90.0)
        .unwrap()
        .execute()
        .unwrap();

    let ids = output.trace.buffers();
    assert!(ids.iter().all(|id| *id == ids[0]));
    assert_eq!(output.trace.allocations, 1);
    assert_eq!(output.image.as_raw(), expected.as_slice());
}

#[test]
fn test_shape_round_trip_reuses_parked_buffer() {
    let output = OperationChain::new(gradient(10, 6))
        .unwrap()
        .rotate(90.0)
        .unwrap()
        .rotate(90.0)
        .unwrap()
        .rotate(90.0)
        .unwrap()
        .execute()
        .unwrap();

    let steps = &output.trace.steps;
    assert_eq!(steps[0].buffer_use, BufferUse::Allocated);
    assert_eq!(steps[1].buffer_use, BufferUse::Allocated);
    // the 6x10 buffer from step 0 was parked and fits step 2 again
    assert_eq!(steps[2].buffer_use, BufferUse::Reused);
    assert_eq!(steps[2].buffer, steps[0].buffer);
}

#[test]
fn test_huge_resize_fails_at_build() {
    let chain = OperationChain::new(gradient(8, 8))
        .unwrap()
        .resize_with(u32::MAX, u32::MAX, ResizeMode::Exact)
        .unwrap();
    let err = chain.build().unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn test_huge_padding_fails_at_build() {
    let side = u32::MAX / 2 - 10;
    let err = OperationChain::new(gradient(8, 8))
        .unwrap()
        .pad(Padding::new(side, side, side, side))
        .unwrap()
        .build()
        .unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn test_shape_change_allocates() {
    let output = OperationChain::new(gradient(10, 6))
        .unwrap()
        .rotate(180.0)
        .unwrap()
        .rotate(180.0)
        .unwrap()
        .rotate(90.0)
        .unwrap()
        .execute()
        .unwrap();

    let steps = &output.trace.steps;
    assert_eq!(steps[2].dimensions, Dimensions::new(6, 10));
    assert_eq!(steps[2].buffer_use, BufferUse::Allocated);
    assert!(!output.trace.buffers()[..2].contains(&steps[2].buffer));
}

#[test]
fn test_vertical_flip_then_half_turn_mirrors() {
    let img = gradient(4, 4);
    let mirrored = flip(img.clone(), FlipAxis::Horizontal);
    let out = OperationChain::new(img)
        .unwrap()
        .flip_vertical()
        .unwrap()
        .rotate(180.0)
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(out.as_raw(), mirrored.as_raw());
    assert_eq!(out.pixel(0, 0), Rgba([3, 0, 21, 255]));
}

#[test]
fn test_cover_then_crop_exact_box() {
    let out = OperationChain::new(gradient(120, 40))
        .unwrap()
        .cover(50, 50)
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(out.dimensions(), Dimensions::new(50, 50));
}

#[test]
fn test_fill_without_crop_overflows() {
    let out = OperationChain::new(gradient(120, 40))
        .unwrap()
        .resize_with(50, 50, ResizeMode::Fill)
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(out.dimensions(), Dimensions::new(150, 50));
}

#[test]
fn test_transparent_rotation_background() {
    let img = RasterImage::filled(20, 20, PixelLayout::Rgb8, Color::white());
    let out = OperationChain::new(img)
        .unwrap()
        .rotate(45.0)
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(out.layout(), PixelLayout::Rgba8);
    assert_eq!(out.pixel(0, 0)[3], 0);
}

#[tokio::test]
async fn test_build_async_matches_build() {
    let chain = || {
        OperationChain::new(gradient(16, 9))
            .unwrap()
            .resize(8, 8)
            .unwrap()
    };
    let sync = chain().build().unwrap();
    let async_out = chain().build_async().await.unwrap();
    assert_eq!(sync.dimensions(), async_out.dimensions());
    assert_eq!(sync.as_raw(), async_out.as_raw());
}
