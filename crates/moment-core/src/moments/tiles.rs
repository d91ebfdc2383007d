use crate::error::{MomentError, Result};

/// Partial raw moments of one tile. Layout matches the WGSL `TileSum` struct.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "gpu", derive(bytemuck::Pod, bytemuck::Zeroable))]
pub struct TilePartialSum {
    /// Foreground pixels in the tile (m00 contribution).
    pub pixel_count: u32,
    /// Sum of region x over foreground pixels (m10 contribution).
    pub sum_x: u32,
    /// Sum of region y over foreground pixels (m01 contribution).
    pub sum_y: u32,
}

/// How a region is partitioned into reduction tiles.
///
/// One tile maps to one workgroup: `tile_width` lanes across, `tile_height`
/// rows down, with `tile_width * tile_height` equal to the device's maximum
/// invocations per workgroup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileGeometry {
    pub tile_width: u32,
    pub tile_height: u32,
    pub region_width: u32,
    pub region_height: u32,
}

impl TileGeometry {
    /// Build the tiling for a region.
    ///
    /// The region width must be a multiple of `tile_width`. A trailing
    /// partial row of tiles is allowed; its out-of-range lanes contribute
    /// zero.
    pub fn new(
        tile_width: u32,
        max_group_invocations: u32,
        region_width: u32,
        region_height: u32,
    ) -> Result<Self> {
        if tile_width == 0 || max_group_invocations < tile_width {
            return Err(MomentError::InvalidConfig(format!(
                "tile width {tile_width} does not fit a workgroup of {max_group_invocations} invocations"
            )));
        }
        if region_width == 0 || region_height == 0 {
            return Err(MomentError::InvalidDimensions {
                width: region_width,
                height: region_height,
            });
        }
        if region_width % tile_width != 0 {
            return Err(MomentError::InvalidConfig(format!(
                "region width {region_width} is not a multiple of the tile width {tile_width}"
            )));
        }
        let tile_height = max_group_invocations / tile_width;

        // Worst case per tile: every pixel set at the largest coordinate.
        let tile_pixels = tile_width as u64 * tile_height as u64;
        let max_coord = region_width.max(region_height) as u64;
        if tile_pixels * max_coord > u32::MAX as u64 {
            return Err(MomentError::InvalidConfig(format!(
                "{tile_width}x{tile_height} tiles over a {region_width}x{region_height} region overflow 32-bit partial sums"
            )));
        }

        Ok(Self {
            tile_width,
            tile_height,
            region_width,
            region_height,
        })
    }

    pub fn tiles_x(&self) -> u32 {
        self.region_width / self.tile_width
    }

    pub fn tiles_y(&self) -> u32 {
        self.region_height.div_ceil(self.tile_height)
    }

    pub fn tile_count(&self) -> usize {
        self.tiles_x() as usize * self.tiles_y() as usize
    }

    /// Row-major index of the tile containing region pixel `(x, y)`.
    pub fn tile_index(&self, x: u32, y: u32) -> usize {
        (y / self.tile_height) as usize * self.tiles_x() as usize + (x / self.tile_width) as usize
    }
}

impl std::fmt::Display for TileGeometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{} tiles of {}x{}",
            self.tiles_x(),
            self.tiles_y(),
            self.tile_width,
            self.tile_height
        )
    }
}

/// Output of one reduction dispatch: one record per tile, row-major.
#[derive(Clone, Debug)]
pub struct TileReduction {
    pub geometry: TileGeometry,
    pub tiles: Vec<TilePartialSum>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_geometry() {
        let g = TileGeometry::new(32, 1024, 448, 448).unwrap();
        assert_eq!(g.tile_height, 32);
        assert_eq!(g.tile_count(), 14 * 14);
    }

    #[test]
    fn test_default_wgpu_limits_geometry() {
        let g = TileGeometry::new(32, 256, 448, 448).unwrap();
        assert_eq!(g.tile_height, 8);
        assert_eq!((g.tiles_x(), g.tiles_y()), (14, 56));
    }

    #[test]
    fn test_partial_tile_row() {
        let g = TileGeometry::new(32, 1024, 64, 40).unwrap();
        assert_eq!(g.tiles_y(), 2);
        assert_eq!(g.tile_index(33, 39), 3);
    }

    #[test]
    fn test_rejects_unaligned_width() {
        assert!(matches!(
            TileGeometry::new(32, 1024, 450, 448),
            Err(MomentError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_overflowing_sums() {
        assert!(TileGeometry::new(32, 1024, 4_194_304, 32).is_err());
    }
}
