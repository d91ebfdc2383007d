use std::time::Duration;

use image::RgbImage;

use crate::frame::{BinaryMask, WorkingRegion};
use crate::moments::{Centroid, Moments};

/// Per-frame pipeline state, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    Binarizing,
    Reducing,
    Aggregating,
    Done,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Binarizing => write!(f, "Binarizing"),
            Self::Reducing => write!(f, "Reducing moments"),
            Self::Aggregating => write!(f, "Aggregating"),
            Self::Done => write!(f, "Done"),
        }
    }
}

/// A stage that could not produce output for one frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageFailure {
    pub stage: PipelineStage,
    pub message: String,
}

impl std::fmt::Display for StageFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.stage, self.message)
    }
}

/// Wall-clock time spent in each stage of one frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct StageTimings {
    pub binarize: Duration,
    pub reduce: Duration,
    pub aggregate: Duration,
}

impl StageTimings {
    pub fn total(&self) -> Duration {
        self.binarize + self.reduce + self.aggregate
    }
}

/// Everything produced for one processed frame. Immutable once emitted.
#[derive(Clone, Debug)]
pub struct PipelineResult {
    pub frame_index: usize,
    pub timestamp_us: Option<u64>,
    /// Working region in oriented frame coordinates, when it could be resolved.
    pub region: Option<WorkingRegion>,
    /// Absent when the mask is empty or a stage failed.
    pub centroid: Option<Centroid>,
    pub moments: Option<Moments>,
    /// Minimum composite of the region, or the raw region after a failure.
    pub composite: Option<RgbImage>,
    /// Cropped binary mask that was reduced, once binarization succeeded.
    pub mask: Option<BinaryMask>,
    pub failure: Option<StageFailure>,
    pub timings: StageTimings,
}

impl PipelineResult {
    pub fn is_detection(&self) -> bool {
        self.centroid.is_some()
    }

    /// Centroid in oriented frame coordinates.
    pub fn frame_centroid(&self) -> Option<Centroid> {
        Some(self.centroid?.to_frame(&self.region?))
    }
}

/// What happened to a frame offered to the pipeline.
#[derive(Clone, Debug)]
#[allow(clippy::large_enum_variant)]
pub enum FrameOutcome {
    Processed(PipelineResult),
    /// Another frame held the in-flight permit; this one was discarded.
    Skipped { frame_index: usize },
}

impl FrameOutcome {
    pub fn result(&self) -> Option<&PipelineResult> {
        match self {
            Self::Processed(result) => Some(result),
            Self::Skipped { .. } => None,
        }
    }
}

/// Thread-safe per-frame stage reporting.
///
/// All methods have default no-op implementations.
pub trait StageReporter: Send + Sync {
    /// Frame `frame_index` entered `stage`.
    fn enter_stage(&self, _frame_index: usize, _stage: PipelineStage) {}

    /// The frame finished, successfully or not.
    fn frame_done(&self, _result: &PipelineResult) {}
}

/// No-op reporter used when none is attached.
pub(super) struct NoOpReporter;
impl StageReporter for NoOpReporter {}
