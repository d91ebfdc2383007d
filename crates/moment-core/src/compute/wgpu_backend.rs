//! wgpu-based GPU compute backend (Metal / Vulkan / DX12).
//!
//! The tile reduction needs subgroup (cross-lane) adds. Adapters without
//! `Features::SUBGROUP` still produce a backend, but it reports
//! `subgroup_reduce = false` and refuses every dispatch.

use std::sync::{Arc, Mutex};

use bytemuck::{Pod, Zeroable};
use tracing::{debug, info, warn};
use wgpu::util::DeviceExt;

use crate::error::{MomentError, Result};
use crate::frame::BinaryMask;
use crate::moments::tiles::{TileGeometry, TilePartialSum};

use super::{ComputeBackend, DeviceCapabilities};

// ---------------------------------------------------------------------------
// Tile reduction shader
// ---------------------------------------------------------------------------

/// `INVOCATIONS`, `TILE_W`, `TILE_H` and `MAX_SUBGROUPS` are substituted before compilation
/// since workgroup sizes and workgroup array lengths must be constant.
const TILE_REDUCE_WGSL: &str = r"
struct Params { region_w: u32, region_h: u32, tiles_x: u32, pad: u32 }
struct TileSum { pixel_count: u32, sum_x: u32, sum_y: u32 }
@group(0) @binding(0) var<storage, read>       mask:   array<u32>;
@group(0) @binding(1) var<storage, read_write> tiles:  array<TileSum>;
@group(0) @binding(2) var<uniform>             params: Params;

var<workgroup> part_count: array<u32, MAX_SUBGROUPS>;
var<workgroup> part_x:     array<u32, MAX_SUBGROUPS>;
var<workgroup> part_y:     array<u32, MAX_SUBGROUPS>;

// One byte per pixel, four pixels per word.
fn mask_at(x: u32, y: u32) -> u32 {
    if x >= params.region_w || y >= params.region_h { return 0u; }
    let i = y * params.region_w + x;
    return (mask[i >> 2u] >> ((i & 3u) * 8u)) & 0xffu;
}

@compute @workgroup_size(INVOCATIONS)
fn main(
    @builtin(workgroup_id) wid: vec3<u32>,
    @builtin(local_invocation_index) local_index: u32,
    @builtin(subgroup_id) sg_id: u32,
    @builtin(num_subgroups) sg_count: u32,
    @builtin(subgroup_invocation_id) lane: u32,
) {
    // Subgroup ids are only defined for one-dimensional workgroups, so the
    // tile is walked row-major from the flat lane index.
    let x = wid.x * TILE_W + local_index % TILE_W;
    let y = wid.y * TILE_H + local_index / TILE_W;
    let v = mask_at(x, y);
    let c = subgroupAdd(v);
    let sx = subgroupAdd(v * x);
    let sy = subgroupAdd(v * y);
    if lane == 0u {
        part_count[sg_id] = c;
        part_x[sg_id] = sx;
        part_y[sg_id] = sy;
    }
    workgroupBarrier();
    if local_index == 0u {
        var total = TileSum(0u, 0u, 0u);
        for (var i = 0u; i < sg_count; i++) {
            total.pixel_count += part_count[i];
            total.sum_x += part_x[i];
            total.sum_y += part_y[i];
        }
        tiles[wid.y * params.tiles_x + wid.x] = total;
    }
}
";

/// Smallest subgroup size WebGPU allows.
const MIN_SUBGROUP_SIZE: u32 = 4;

/// Cap on invocations per workgroup, matching the largest tile the CPU emulates.
const MAX_GROUP_INVOCATIONS: u32 = 1024;

fn tile_reduce_source(geometry: &TileGeometry) -> String {
    let invocations = geometry.tile_width * geometry.tile_height;
    let max_subgroups = (invocations / MIN_SUBGROUP_SIZE).max(1);
    TILE_REDUCE_WGSL
        .replace("INVOCATIONS", &format!("{invocations}u"))
        .replace("MAX_SUBGROUPS", &format!("{max_subgroups}u"))
        .replace("TILE_W", &format!("{}u", geometry.tile_width))
        .replace("TILE_H", &format!("{}u", geometry.tile_height))
}

// ---------------------------------------------------------------------------
// Uniform parameter struct (must match WGSL layout exactly)
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct ReduceParams {
    region_w: u32,
    region_h: u32,
    tiles_x: u32,
    pad: u32,
}

/// Device objects for one tile geometry, reused across frames.
struct ReductionState {
    geometry: TileGeometry,
    pipeline: wgpu::ComputePipeline,
    bind_group: wgpu::BindGroup,
    mask_buf: wgpu::Buffer,
    tiles_buf: wgpu::Buffer,
    staging: wgpu::Buffer,
}

// ---------------------------------------------------------------------------
// WgpuBackend
// ---------------------------------------------------------------------------

pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    adapter_name: String,
    capabilities: DeviceCapabilities,
    max_workgroup_size_x: u32,
    // Buffers are rewritten on every dispatch, so one frame at a time.
    state: Mutex<Option<ReductionState>>,
}

impl WgpuBackend {
    pub fn new() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| MomentError::NoComputeDevice(format!("No suitable GPU adapter found: {e}")))?;

        let adapter_name = adapter.get_info().name.clone();
        let subgroup_reduce = adapter.features().contains(wgpu::Features::SUBGROUP);
        let adapter_limits = adapter.limits();
        info!(adapter = %adapter_name, subgroup_reduce, "GPU adapter");

        let required_features = if subgroup_reduce {
            wgpu::Features::SUBGROUP
        } else {
            wgpu::Features::empty()
        };
        let required_limits = wgpu::Limits {
            max_compute_invocations_per_workgroup: adapter_limits
                .max_compute_invocations_per_workgroup
                .min(MAX_GROUP_INVOCATIONS),
            max_compute_workgroup_size_x: adapter_limits.max_compute_workgroup_size_x,
            ..wgpu::Limits::default()
        };

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("moment"),
                required_features,
                required_limits: required_limits.clone(),
                ..Default::default()
            },
        ))
        .map_err(|e| MomentError::NoComputeDevice(format!("Failed to create GPU device: {e}")))?;

        if !subgroup_reduce {
            warn!(
                adapter = %adapter_name,
                "Subgroup reductions unsupported; moment computation disabled on this device"
            );
        }

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter_name,
            capabilities: DeviceCapabilities {
                subgroup_reduce,
                max_group_invocations: required_limits.max_compute_invocations_per_workgroup,
            },
            max_workgroup_size_x: required_limits.max_compute_workgroup_size_x,
            state: Mutex::new(None),
        })
    }

    fn build_state(&self, geometry: &TileGeometry) -> Result<ReductionState> {
        let invocations = geometry.tile_width * geometry.tile_height;
        let max_x = self.max_workgroup_size_x.min(self.capabilities.max_group_invocations);
        if invocations > max_x {
            return Err(MomentError::ReducerUnavailable(format!(
                "{invocations}-lane workgroups exceed the device limit of {max_x}"
            )));
        }

        // Kernel rejections become per-frame errors.
        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("tile_reduce"),
                source: wgpu::ShaderSource::Wgsl(tile_reduce_source(geometry).into()),
            });
        let pipeline = self
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("tile_reduce"),
                layout: None,
                module: &module,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                cache: None,
            });
        if let Some(err) = pollster::block_on(scope.pop()) {
            return Err(MomentError::ReducerUnavailable(format!(
                "Tile reduction kernel rejected by device: {err}"
            )));
        }

        let pixel_count = geometry.region_width as u64 * geometry.region_height as u64;
        let mask_buf = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("mask"),
            size: padded_len(pixel_count),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let tiles_size =
            geometry.tile_count() as u64 * std::mem::size_of::<TilePartialSum>() as u64;
        let tiles_buf = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tile_sums"),
            size: tiles_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tile_sums_staging"),
            size: tiles_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let params = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("reduce_params"),
                contents: bytemuck::bytes_of(&ReduceParams {
                    region_w: geometry.region_width,
                    region_h: geometry.region_height,
                    tiles_x: geometry.tiles_x(),
                    pad: 0,
                }),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        let layout = pipeline.get_bind_group_layout(0);
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tile_reduce"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: mask_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: tiles_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: params.as_entire_binding(),
                },
            ],
        });

        debug!(%geometry, "Allocated GPU reduction buffers");
        Ok(ReductionState {
            geometry: *geometry,
            pipeline,
            bind_group,
            mask_buf,
            tiles_buf,
            staging,
        })
    }

    /// Submit the reduction and block until the tile sums are mapped back.
    fn dispatch(&self, state: &ReductionState, mask: &BinaryMask) -> Result<Vec<TilePartialSum>> {
        let geometry = &state.geometry;
        self.queue.write_buffer(&state.mask_buf, 0, &pack_mask(mask));

        let mut enc = self.device.create_command_encoder(&Default::default());
        {
            let mut pass = enc.begin_compute_pass(&Default::default());
            pass.set_pipeline(&state.pipeline);
            pass.set_bind_group(0, &state.bind_group, &[]);
            pass.dispatch_workgroups(geometry.tiles_x(), geometry.tiles_y(), 1);
        }
        enc.copy_buffer_to_buffer(&state.tiles_buf, 0, &state.staging, 0, state.staging.size());
        self.queue.submit(std::iter::once(enc.finish()));

        let slice = state.staging.slice(..);
        let (tx, rx) = std::sync::mpsc::sync_channel(1);
        slice.map_async(wgpu::MapMode::Read, move |r| {
            tx.send(r).ok();
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| MomentError::DeviceExecutionFailure(format!("GPU poll failed: {e}")))?;
        rx.recv()
            .map_err(|_| MomentError::DeviceExecutionFailure("GPU channel closed".into()))?
            .map_err(|e| MomentError::DeviceExecutionFailure(format!("Buffer mapping failed: {e}")))?;

        let data = slice.get_mapped_range();
        let tiles: Vec<TilePartialSum> = bytemuck::cast_slice(&data).to_vec();
        drop(data);
        state.staging.unmap();
        Ok(tiles)
    }
}

impl ComputeBackend for WgpuBackend {
    fn name(&self) -> &str {
        &self.adapter_name
    }

    fn is_gpu(&self) -> bool {
        true
    }

    fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities
    }

    fn reduce_tiles(
        &self,
        mask: &BinaryMask,
        geometry: &TileGeometry,
    ) -> Result<Vec<TilePartialSum>> {
        if !self.capabilities.subgroup_reduce {
            return Err(MomentError::ReducerUnavailable(format!(
                "{} does not support subgroup reductions",
                self.adapter_name
            )));
        }
        if mask.width() != geometry.region_width as usize
            || mask.height() != geometry.region_height as usize
        {
            return Err(MomentError::InvalidDimensions {
                width: mask.width() as u32,
                height: mask.height() as u32,
            });
        }

        let mut guard = self
            .state
            .lock()
            .map_err(|_| MomentError::DeviceExecutionFailure("GPU state lock poisoned".into()))?;
        if !matches!(guard.as_ref(), Some(s) if s.geometry == *geometry) {
            *guard = Some(self.build_state(geometry)?);
        }
        match guard.as_ref() {
            Some(state) => self.dispatch(state, mask),
            None => Err(MomentError::ReducerUnavailable(
                "GPU reduction state missing".into(),
            )),
        }
    }
}

/// Buffer writes must be a multiple of 4 bytes.
fn padded_len(bytes: u64) -> u64 {
    bytes.div_ceil(wgpu::COPY_BUFFER_ALIGNMENT) * wgpu::COPY_BUFFER_ALIGNMENT
}

fn pack_mask(mask: &BinaryMask) -> Vec<u8> {
    let pixels = mask.as_slice();
    let mut bytes = Vec::with_capacity(padded_len(pixels.len() as u64) as usize);
    bytes.extend_from_slice(pixels);
    bytes.resize(padded_len(pixels.len() as u64) as usize, 0);
    bytes
}
