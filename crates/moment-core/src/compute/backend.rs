use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::frame::BinaryMask;
use crate::moments::tiles::{TileGeometry, TilePartialSum};

use super::cpu::CpuBackend;

/// Which compute device to run the moment reduction on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DevicePreference {
    /// GPU when one with subgroup support is available, CPU otherwise.
    #[default]
    Auto,
    Cpu,
    /// GPU only. Failing to find any adapter is a startup error.
    Gpu,
}

impl std::fmt::Display for DevicePreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "Auto"),
            Self::Cpu => write!(f, "CPU"),
            Self::Gpu => write!(f, "GPU"),
        }
    }
}

/// What the device can do, probed once at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceCapabilities {
    /// Cross-lane (subgroup) add reductions are available.
    pub subgroup_reduce: bool,
    /// Maximum invocations in one workgroup; sets the tile height.
    pub max_group_invocations: u32,
}

/// A device that can run the tiled moment reduction.
pub trait ComputeBackend: Send + Sync {
    fn name(&self) -> &str;

    fn is_gpu(&self) -> bool {
        false
    }

    fn capabilities(&self) -> DeviceCapabilities;

    /// Reduce `mask` to one partial-sum record per tile of `geometry`.
    ///
    /// Blocks until the device has finished and the results are on the host.
    /// Callers must check [`DeviceCapabilities::subgroup_reduce`] first.
    fn reduce_tiles(
        &self,
        mask: &BinaryMask,
        geometry: &TileGeometry,
    ) -> Result<Vec<TilePartialSum>>;
}

/// Create the compute backend for a device preference.
///
/// Only [`DevicePreference::Gpu`] without any usable adapter is an error;
/// a GPU lacking subgroup support is still returned so the reducer can run
/// in degraded mode.
pub fn create_backend(preference: &DevicePreference) -> Result<Arc<dyn ComputeBackend>> {
    match preference {
        DevicePreference::Cpu => Ok(Arc::new(CpuBackend::new())),
        DevicePreference::Gpu => create_gpu_backend(),
        DevicePreference::Auto => match create_gpu_backend() {
            Ok(gpu) if gpu.capabilities().subgroup_reduce => Ok(gpu),
            Ok(gpu) => {
                warn!(
                    adapter = gpu.name(),
                    "GPU lacks subgroup reductions, using CPU backend"
                );
                Ok(Arc::new(CpuBackend::new()))
            }
            Err(e) => {
                info!("GPU unavailable ({e}), using CPU backend");
                Ok(Arc::new(CpuBackend::new()))
            }
        },
    }
}

#[cfg(feature = "gpu")]
fn create_gpu_backend() -> Result<Arc<dyn ComputeBackend>> {
    let backend = super::wgpu_backend::WgpuBackend::new()?;
    Ok(Arc::new(backend))
}

#[cfg(not(feature = "gpu"))]
fn create_gpu_backend() -> Result<Arc<dyn ComputeBackend>> {
    Err(crate::error::MomentError::NoComputeDevice(
        "built without the `gpu` feature".into(),
    ))
}
