use rayon::prelude::*;

use crate::consts::{CPU_MAX_GROUP_INVOCATIONS, PARALLEL_TILE_THRESHOLD};
use crate::error::{MomentError, Result};
use crate::frame::BinaryMask;
use crate::moments::tiles::{TileGeometry, TilePartialSum};

use super::{ComputeBackend, DeviceCapabilities};

/// CPU backend using Rayon for parallelism.
///
/// Runs the same tiling as the GPU kernel, one task per tile, so per-tile
/// sums are bit-identical to the device path.
pub struct CpuBackend {
    max_group_invocations: u32,
}

impl CpuBackend {
    pub fn new() -> Self {
        Self {
            max_group_invocations: CPU_MAX_GROUP_INVOCATIONS,
        }
    }

    /// Emulate a device with a different workgroup size (and so tile height).
    pub fn with_group_invocations(max_group_invocations: u32) -> Self {
        Self {
            max_group_invocations,
        }
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeBackend for CpuBackend {
    fn name(&self) -> &str {
        "CPU/Rayon"
    }

    fn capabilities(&self) -> DeviceCapabilities {
        DeviceCapabilities {
            subgroup_reduce: true,
            max_group_invocations: self.max_group_invocations,
        }
    }

    fn reduce_tiles(
        &self,
        mask: &BinaryMask,
        geometry: &TileGeometry,
    ) -> Result<Vec<TilePartialSum>> {
        if mask.width() != geometry.region_width as usize
            || mask.height() != geometry.region_height as usize
        {
            return Err(MomentError::InvalidDimensions {
                width: mask.width() as u32,
                height: mask.height() as u32,
            });
        }

        let count = geometry.tile_count();
        let tiles = if count >= PARALLEL_TILE_THRESHOLD {
            (0..count)
                .into_par_iter()
                .map(|i| reduce_tile(mask, geometry, i))
                .collect()
        } else {
            (0..count).map(|i| reduce_tile(mask, geometry, i)).collect()
        };
        Ok(tiles)
    }
}

/// Partial moments of tile `index`, skipping lanes past the region edge.
fn reduce_tile(mask: &BinaryMask, geometry: &TileGeometry, index: usize) -> TilePartialSum {
    let tiles_x = geometry.tiles_x() as usize;
    let x0 = (index % tiles_x) * geometry.tile_width as usize;
    let y0 = (index / tiles_x) * geometry.tile_height as usize;
    let x1 = x0 + geometry.tile_width as usize;
    let y1 = (y0 + geometry.tile_height as usize).min(mask.height());

    let pixels = mask.as_slice();
    let stride = mask.width();
    let mut sum = TilePartialSum::default();
    for y in y0..y1 {
        let row = &pixels[y * stride + x0..y * stride + x1];
        for (dx, &v) in row.iter().enumerate() {
            let v = v as u32;
            sum.pixel_count += v;
            sum.sum_x += v * (x0 + dx) as u32;
            sum.sum_y += v * y as u32;
        }
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_pixel_lands_in_its_tile() {
        let mask = BinaryMask::from_fn(64, 64, |x, y| x == 40 && y == 7);
        let geometry = TileGeometry::new(32, 1024, 64, 64).unwrap();
        let tiles = CpuBackend::new().reduce_tiles(&mask, &geometry).unwrap();
        assert_eq!(tiles.len(), 4);
        assert_eq!(
            tiles[1],
            TilePartialSum {
                pixel_count: 1,
                sum_x: 40,
                sum_y: 7
            }
        );
        assert_eq!(tiles[0], TilePartialSum::default());
    }

    #[test]
    fn test_rejects_mask_geometry_mismatch() {
        let mask = BinaryMask::zeros(32, 32);
        let geometry = TileGeometry::new(32, 1024, 64, 64).unwrap();
        assert!(CpuBackend::new().reduce_tiles(&mask, &geometry).is_err());
    }
}
