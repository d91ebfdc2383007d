use moment_core::compute::cpu::CpuBackend;
use moment_core::compute::ComputeBackend;
use moment_core::frame::BinaryMask;
use moment_core::moments::{aggregate, Centroid, Moments, TileGeometry, TilePartialSum, YAxis};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn reduce(mask: &BinaryMask) -> Vec<TilePartialSum> {
    let geometry =
        TileGeometry::new(32, 1024, mask.width() as u32, mask.height() as u32).unwrap();
    CpuBackend::new().reduce_tiles(mask, &geometry).unwrap()
}

// ---------------------------------------------------------------------------
// Empty and trivial masks
// ---------------------------------------------------------------------------

#[test]
fn test_empty_mask_has_no_centroid() {
    let tiles = reduce(&BinaryMask::zeros(64, 64));
    assert_eq!(aggregate(&tiles, 64, YAxis::Down), None);
    assert_eq!(Moments::from_tiles(&tiles), Moments::default());
}

#[test]
fn test_single_pixel_is_exact() {
    let mask = BinaryMask::from_fn(96, 64, |x, y| x == 70 && y == 45);
    let tiles = reduce(&mask);
    assert_eq!(
        aggregate(&tiles, 64, YAxis::Down),
        Some(Centroid { x: 70, y: 45 })
    );
}

#[test]
fn test_three_by_three_block_at_origin() {
    let mask = BinaryMask::from_fn(32, 32, |x, y| x < 3 && y < 3);
    let tiles = reduce(&mask);
    let moments = Moments::from_tiles(&tiles);
    assert_eq!(moments, Moments { m00: 9, m10: 9, m01: 9 });
    assert_eq!(
        aggregate(&tiles, 32, YAxis::Down),
        Some(Centroid { x: 1, y: 1 })
    );
}

#[test]
fn test_two_by_two_block_truncates() {
    let mask = BinaryMask::from_fn(32, 32, |x, y| x < 2 && y < 2);
    assert_eq!(
        aggregate(&reduce(&mask), 32, YAxis::Down),
        Some(Centroid { x: 0, y: 0 })
    );
}

// ---------------------------------------------------------------------------
// Order independence
// ---------------------------------------------------------------------------

#[test]
fn test_tile_order_does_not_matter() {
    let mask = BinaryMask::from_fn(128, 128, |x, y| (x * 3 + y * 5) % 7 < 3 && x > 10);
    let tiles = reduce(&mask);
    let expected = aggregate(&tiles, 128, YAxis::Down);
    assert!(expected.is_some());

    let mut reversed = tiles.clone();
    reversed.reverse();
    assert_eq!(aggregate(&reversed, 128, YAxis::Down), expected);

    let mut rotated = tiles.clone();
    rotated.rotate_left(5);
    assert_eq!(aggregate(&rotated, 128, YAxis::Down), expected);
}

// ---------------------------------------------------------------------------
// Y axis
// ---------------------------------------------------------------------------

#[test]
fn test_y_up_flips_with_region_height() {
    let mask = BinaryMask::from_fn(64, 96, |x, y| x == 10 && y == 20);
    let tiles = reduce(&mask);
    assert_eq!(
        aggregate(&tiles, 96, YAxis::Up),
        Some(Centroid { x: 10, y: 76 })
    );
}

#[test]
fn test_y_up_empty_is_still_absent() {
    let tiles = reduce(&BinaryMask::zeros(32, 32));
    assert_eq!(aggregate(&tiles, 32, YAxis::Up), None);
}

// ---------------------------------------------------------------------------
// Large sums stay exact in u64
// ---------------------------------------------------------------------------

#[test]
fn test_full_region_moments() {
    let (w, h) = (448u64, 448u64);
    let mask = BinaryMask::from_fn(w as usize, h as usize, |_, _| true);
    let moments = Moments::from_tiles(&reduce(&mask));
    assert_eq!(moments.m00, w * h);
    assert_eq!(moments.m10, h * w * (w - 1) / 2);
    assert_eq!(moments.m01, w * h * (h - 1) / 2);
    assert_eq!(moments.centroid(), Some(Centroid { x: 223, y: 223 }));
}
