#[allow(dead_code)]
mod common;

use image::{Rgb, RgbImage};

use moment_core::binarize::{binarize, composite_minimum, BinarizeConfig, MorphologyOrder};
use moment_core::error::MomentError;
use moment_core::frame::{BinaryMask, Orientation, PixelFormat, RawFrame, WorkingRegion};

use common::disk_frame;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn no_morphology(threshold: f32) -> BinarizeConfig {
    BinarizeConfig {
        threshold,
        morphology_radius: 0,
        ..BinarizeConfig::default()
    }
}

fn mask_to_rgb(mask: &BinaryMask) -> RgbImage {
    RgbImage::from_fn(mask.width() as u32, mask.height() as u32, |x, y| {
        let v = if mask.get(x as usize, y as usize) { 255 } else { 0 };
        Rgb([v, v, v])
    })
}

// ---------------------------------------------------------------------------
// Grayscale + threshold
// ---------------------------------------------------------------------------

#[test]
fn test_max_channel_keeps_saturated_color() {
    // Pure red has low luminance but a bright maximum channel.
    let image = RgbImage::from_fn(4, 1, |x, _| match x {
        0 => Rgb([200, 0, 0]),
        1 => Rgb([0, 0, 60]),
        2 => Rgb([40, 40, 40]),
        _ => Rgb([0, 255, 0]),
    });
    let mask = binarize(&image, &no_morphology(0.2)).unwrap();
    let bits: Vec<bool> = (0..4).map(|x| mask.get(x, 0)).collect();
    assert_eq!(bits, vec![true, true, false, true]);
}

#[test]
fn test_threshold_zero_selects_everything() {
    let image = RgbImage::new(8, 8);
    let mask = binarize(&image, &no_morphology(0.0)).unwrap();
    assert_eq!(mask.count(), 64);
}

#[test]
fn test_threshold_one_selects_only_white() {
    let image = RgbImage::from_fn(2, 1, |x, _| {
        if x == 0 { Rgb([254, 254, 254]) } else { Rgb([255, 0, 0]) }
    });
    let mask = binarize(&image, &no_morphology(1.0)).unwrap();
    assert!(!mask.get(0, 0));
    assert!(mask.get(1, 0));
}

// ---------------------------------------------------------------------------
// Morphology
// ---------------------------------------------------------------------------

#[test]
fn test_speckle_is_removed() {
    let mut image = RgbImage::new(128, 128);
    for y in 60..64 {
        for x in 60..64 {
            image.put_pixel(x, y, Rgb([255, 255, 255]));
        }
    }
    let mask = binarize(&image, &BinarizeConfig::default()).unwrap();
    assert_eq!(mask.count(), 0);
}

#[test]
fn test_large_disk_survives() {
    let frame = disk_frame(200, 200, 100, 100, 50, 255);
    let mask = binarize(&frame.to_rgb(), &BinarizeConfig::default()).unwrap();
    assert!(mask.get(100, 100));
    assert!(mask.get(100, 52));
    assert!(!mask.get(100, 40));
    let disk_area = std::f64::consts::PI * 50.0 * 50.0;
    let ratio = mask.count() as f64 / disk_area;
    assert!((0.95..1.03).contains(&ratio), "area ratio {ratio}");
}

#[test]
fn test_binarize_is_idempotent_inside_margin() {
    let config = BinarizeConfig::default();
    let frame = disk_frame(256, 256, 128, 120, 60, 180);
    let once = binarize(&frame.to_rgb(), &config).unwrap();
    let twice = binarize(&mask_to_rgb(&once), &config).unwrap();

    let margin = 2 * config.morphology_radius;
    let interior = WorkingRegion {
        x: margin,
        y: margin,
        width: 256 - 2 * margin,
        height: 256 - 2 * margin,
    };
    assert_eq!(once.crop(&interior).unwrap(), twice.crop(&interior).unwrap());
}

#[test]
fn test_dilate_first_fills_small_gap() {
    let mut image = RgbImage::from_pixel(96, 96, Rgb([255, 255, 255]));
    image.put_pixel(48, 48, Rgb([0, 0, 0]));
    let config = BinarizeConfig {
        morphology_radius: 3,
        morphology_order: MorphologyOrder::DilateFirst,
        ..BinarizeConfig::default()
    };
    let mask = binarize(&image, &config).unwrap();
    assert!(mask.get(48, 48));
}

#[test]
fn test_border_within_radius_is_background() {
    let image = RgbImage::from_pixel(64, 64, Rgb([255, 255, 255]));
    let mask = binarize(&image, &BinarizeConfig::default()).unwrap();
    // Erosion pulls the foreground back from the border; dilation only
    // partly restores it.
    assert!(mask.get(32, 32));
    assert!(!mask.get(0, 0));
}

#[test]
fn test_radius_scales_with_height() {
    let config = BinarizeConfig::default();
    assert_eq!(config.radius_for_height(480), 10);
    assert_eq!(config.radius_for_height(960), 20);
    assert_eq!(config.radius_for_height(1080), 23);
    assert_eq!(config.radius_for_height(10), 1);
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn test_empty_frame_is_unavailable() {
    let result = binarize(&RgbImage::new(0, 0), &BinarizeConfig::default());
    assert!(matches!(result, Err(MomentError::FilterUnavailable(_))));
}

#[test]
fn test_nan_threshold_is_unavailable() {
    let result = binarize(&RgbImage::new(4, 4), &no_morphology(f32::NAN));
    assert!(matches!(result, Err(MomentError::FilterUnavailable(_))));
}

#[test]
fn test_buffer_format_mismatch() {
    let result = RawFrame::new(vec![0u8; 10], 4, 4, PixelFormat::Rgb8);
    assert!(matches!(result, Err(MomentError::FilterUnavailable(_))));
    let result = RawFrame::new(Vec::new(), 0, 4, PixelFormat::Gray8);
    assert!(matches!(result, Err(MomentError::InvalidDimensions { .. })));
}

// ---------------------------------------------------------------------------
// Frame decoding, orientation and compositing
// ---------------------------------------------------------------------------

#[test]
fn test_nv12_neutral_chroma_is_gray() {
    // 2x2 luma + one CbCr pair
    let frame = RawFrame::new(vec![200, 200, 10, 10, 128, 128], 2, 2, PixelFormat::Nv12).unwrap();
    let rgb = frame.to_rgb();
    assert_eq!(rgb.get_pixel(1, 0), &Rgb([200, 200, 200]));
    assert_eq!(rgb.get_pixel(0, 1), &Rgb([10, 10, 10]));
}

#[test]
fn test_orientation_right_rotates_clockwise() {
    let image = RgbImage::from_fn(3, 2, |x, y| Rgb([(x + 10 * y) as u8, 0, 0]));
    let rotated = Orientation::Right.apply(&image);
    assert_eq!(rotated.dimensions(), (2, 3));
    // Top-left of the source ends up top-right.
    assert_eq!(rotated.get_pixel(1, 0)[0], 0);
    assert_eq!(rotated.get_pixel(0, 0)[0], 10);
    assert_eq!(Orientation::Right.oriented_dims(640, 480), (480, 640));
}

#[test]
fn test_composite_matches_mask() {
    let frame = disk_frame(96, 96, 48, 48, 30, 150);
    let rgb = frame.to_rgb();
    let mask = binarize(&rgb, &BinarizeConfig::default()).unwrap();
    let out = composite_minimum(&rgb, &mask).unwrap();
    assert_eq!(out.get_pixel(48, 48), &Rgb([150, 150, 150]));
    assert_eq!(out.get_pixel(2, 2), &Rgb([0, 0, 0]));
}
