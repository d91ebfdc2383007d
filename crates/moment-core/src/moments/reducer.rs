use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::compute::{ComputeBackend, DeviceCapabilities};
use crate::error::{MomentError, Result};
use crate::frame::BinaryMask;

use super::tiles::{TileGeometry, TileReduction};

/// Tiled moment reduction bound to one compute backend.
///
/// Capabilities are probed once at construction. A backend without subgroup
/// reductions leaves the reducer in degraded mode: it stays constructible,
/// but every [`reduce`](Self::reduce) fails without touching the device.
pub struct MomentReducer {
    backend: Arc<dyn ComputeBackend>,
    tile_width: u32,
    capabilities: DeviceCapabilities,
    runnable: bool,
}

impl MomentReducer {
    pub fn new(backend: Arc<dyn ComputeBackend>, tile_width: u32) -> Self {
        let capabilities = backend.capabilities();
        let runnable = capabilities.subgroup_reduce;
        if runnable {
            info!(
                backend = backend.name(),
                tile_width,
                max_group_invocations = capabilities.max_group_invocations,
                "Moment reducer ready"
            );
        } else {
            warn!(
                backend = backend.name(),
                "Device lacks subgroup reductions; centroids will not be computed"
            );
        }
        Self {
            backend,
            tile_width,
            capabilities,
            runnable,
        }
    }

    pub fn is_runnable(&self) -> bool {
        self.runnable
    }

    pub fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities
    }

    pub fn backend(&self) -> &Arc<dyn ComputeBackend> {
        &self.backend
    }

    pub fn tile_width(&self) -> u32 {
        self.tile_width
    }

    /// Tile layout this reducer uses for a region of the given size.
    pub fn geometry(&self, region_width: u32, region_height: u32) -> Result<TileGeometry> {
        TileGeometry::new(
            self.tile_width,
            self.capabilities.max_group_invocations,
            region_width,
            region_height,
        )
    }

    /// Reduce a cropped mask to per-tile partial moments.
    pub fn reduce(&self, mask: &BinaryMask) -> Result<TileReduction> {
        if !self.runnable {
            return Err(MomentError::ReducerUnavailable(format!(
                "{} does not support subgroup reductions",
                self.backend.name()
            )));
        }
        let geometry = self.geometry(mask.width() as u32, mask.height() as u32)?;
        let tiles = self.backend.reduce_tiles(mask, &geometry)?;
        if tiles.len() != geometry.tile_count() {
            return Err(MomentError::DeviceExecutionFailure(format!(
                "expected {} tile records, got {}",
                geometry.tile_count(),
                tiles.len()
            )));
        }
        debug!(%geometry, backend = self.backend.name(), "Reduced mask");
        Ok(TileReduction { geometry, tiles })
    }
}
