use std::sync::Arc;

use moment_core::compute::cpu::CpuBackend;
use moment_core::compute::{create_backend, ComputeBackend, DeviceCapabilities, DevicePreference};
use moment_core::error::{MomentError, Result};
use moment_core::frame::BinaryMask;
use moment_core::moments::{Moments, MomentReducer, TileGeometry, TilePartialSum};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A device without subgroup support. Dispatching to it is a bug.
struct NoSubgroupBackend;

impl ComputeBackend for NoSubgroupBackend {
    fn name(&self) -> &str {
        "no-subgroups"
    }

    fn is_gpu(&self) -> bool {
        true
    }

    fn capabilities(&self) -> DeviceCapabilities {
        DeviceCapabilities {
            subgroup_reduce: false,
            max_group_invocations: 1024,
        }
    }

    fn reduce_tiles(&self, _: &BinaryMask, _: &TileGeometry) -> Result<Vec<TilePartialSum>> {
        panic!("reduction dispatched to a device without subgroup support");
    }
}

fn speckled_mask(w: usize, h: usize) -> BinaryMask {
    BinaryMask::from_fn(w, h, |x, y| (x * 31 + y * 17) % 13 < 5)
}

fn direct_moments(mask: &BinaryMask) -> Moments {
    let mut m = Moments::default();
    for y in 0..mask.height() {
        for x in 0..mask.width() {
            if mask.get(x, y) {
                m.m00 += 1;
                m.m10 += x as u64;
                m.m01 += y as u64;
            }
        }
    }
    m
}

// ---------------------------------------------------------------------------
// Tiling
// ---------------------------------------------------------------------------

#[test]
fn test_tiled_sums_match_direct_sums() {
    let mask = speckled_mask(448, 448);
    let reducer = MomentReducer::new(Arc::new(CpuBackend::new()), 32);
    let reduction = reducer.reduce(&mask).unwrap();
    assert_eq!(reduction.tiles.len(), 14 * 14);
    assert_eq!(Moments::from_tiles(&reduction.tiles), direct_moments(&mask));
}

#[test]
fn test_tile_height_follows_group_size() {
    let mask = speckled_mask(256, 200);
    let small = MomentReducer::new(Arc::new(CpuBackend::with_group_invocations(256)), 32);
    let large = MomentReducer::new(Arc::new(CpuBackend::new()), 32);

    let a = small.reduce(&mask).unwrap();
    let b = large.reduce(&mask).unwrap();
    assert_eq!(a.geometry.tile_height, 8);
    assert_eq!(b.geometry.tile_height, 32);
    // 200 rows leave a partial trailing row of 32-row tiles.
    assert_eq!(b.geometry.tiles_y(), 7);
    assert_eq!(
        Moments::from_tiles(&a.tiles),
        Moments::from_tiles(&b.tiles)
    );
}

#[test]
fn test_each_tile_holds_only_its_pixels() {
    let mask = BinaryMask::from_fn(128, 64, |x, y| x == 100 && y == 40);
    let reducer = MomentReducer::new(Arc::new(CpuBackend::new()), 32);
    let reduction = reducer.reduce(&mask).unwrap();
    let index = reduction.geometry.tile_index(100, 40);
    for (i, tile) in reduction.tiles.iter().enumerate() {
        if i == index {
            assert_eq!(tile.pixel_count, 1);
            assert_eq!((tile.sum_x, tile.sum_y), (100, 40));
        } else {
            assert_eq!(*tile, TilePartialSum::default());
        }
    }
}

#[test]
fn test_unaligned_mask_is_rejected() {
    let reducer = MomentReducer::new(Arc::new(CpuBackend::new()), 32);
    let result = reducer.reduce(&BinaryMask::zeros(100, 64));
    assert!(matches!(result, Err(MomentError::InvalidConfig(_))));
}

// ---------------------------------------------------------------------------
// Capability gate
// ---------------------------------------------------------------------------

#[test]
fn test_unsupported_device_never_dispatches() {
    let reducer = MomentReducer::new(Arc::new(NoSubgroupBackend), 32);
    assert!(!reducer.is_runnable());
    for _ in 0..3 {
        let result = reducer.reduce(&speckled_mask(64, 64));
        assert!(matches!(result, Err(MomentError::ReducerUnavailable(_))));
    }
}

#[test]
fn test_cpu_backend_is_runnable() {
    let backend = create_backend(&DevicePreference::Cpu).unwrap();
    assert!(!backend.is_gpu());
    assert_eq!(backend.name(), "CPU/Rayon");
    let reducer = MomentReducer::new(backend, 32);
    assert!(reducer.is_runnable());
    assert_eq!(reducer.capabilities().max_group_invocations, 1024);
}

#[test]
fn test_auto_preference_always_yields_a_backend() {
    let backend = create_backend(&DevicePreference::Auto).unwrap();
    assert!(backend.capabilities().subgroup_reduce);
}

// ---------------------------------------------------------------------------
// GPU tile reduction (requires `gpu` feature)
// ---------------------------------------------------------------------------

#[cfg(feature = "gpu")]
#[test]
fn test_gpu_tiles_match_cpu_tiles() {
    use moment_core::compute::wgpu_backend::WgpuBackend;

    let Ok(gpu) = WgpuBackend::new() else {
        return; // skip if no GPU available
    };
    let caps = gpu.capabilities();
    let mask = speckled_mask(448, 448);
    let geometry = TileGeometry::new(32, caps.max_group_invocations, 448, 448).unwrap();

    if !caps.subgroup_reduce {
        let result = gpu.reduce_tiles(&mask, &geometry);
        assert!(matches!(result, Err(MomentError::ReducerUnavailable(_))));
        return;
    }

    let cpu = CpuBackend::with_group_invocations(caps.max_group_invocations);
    let expected = cpu.reduce_tiles(&mask, &geometry).unwrap();
    let actual = gpu.reduce_tiles(&mask, &geometry).unwrap();
    assert_eq!(actual, expected);

    // Buffers are cached per geometry; a second frame must not see the first.
    let empty = gpu.reduce_tiles(&BinaryMask::zeros(448, 448), &geometry).unwrap();
    assert!(empty.iter().all(|t| *t == TilePartialSum::default()));
}
