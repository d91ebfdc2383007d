/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Minimum tile count to reduce tiles in parallel on the CPU backend.
pub const PARALLEL_TILE_THRESHOLD: usize = 16;

/// Reduction tile width: one subgroup-sized row of lanes per tile row.
pub const DEFAULT_TILE_WIDTH: u32 = 32;

/// Largest tile width accepted by configuration validation.
pub const MAX_TILE_WIDTH: u32 = 256;

/// Threads per workgroup the CPU backend emulates (32x32 tiles).
pub const CPU_MAX_GROUP_INVOCATIONS: u32 = 1024;

/// Default binarization threshold, as a fraction of the maximum channel value.
pub const DEFAULT_BINARIZE_THRESHOLD: f32 = 0.2;

/// Step the threshold is quantised to when set from an interactive control.
pub const THRESHOLD_STEP: f32 = 0.1;

/// Morphology radius (pixels) tuned for the reference resolution.
pub const DEFAULT_MORPHOLOGY_RADIUS: u32 = 10;

/// Frame height the default morphology radius was tuned for.
pub const REFERENCE_FRAME_HEIGHT: u32 = 480;

/// Pixels cropped from every edge of the binarized frame. Twice the margin
/// must stay a multiple of the tile width for the reference 480-line sensor.
pub const DEFAULT_REGION_MARGIN: u32 = 16;

/// Maximum 8-bit channel value.
pub const MAX_CHANNEL_VALUE: f32 = 255.0;

/// Default replay rate for recorded sources, in frames per second.
pub const DEFAULT_REPLAY_FPS: f32 = 30.0;

/// Default capacity of the bounded frame feed.
pub const DEFAULT_FEED_CAPACITY: usize = 1;
