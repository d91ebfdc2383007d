pub mod config;
pub mod feed;
mod gate;
mod orchestrator;
mod threshold;
mod types;
mod worker;

pub use config::{PipelineConfig, RegionConfig};
pub use feed::{frame_channel, FeedStats, FrameReceiver, FrameSender, Offer};
pub use gate::{InFlightGate, InFlightPermit};
pub use orchestrator::FramePipeline;
pub use threshold::ThresholdHandle;
pub use types::{
    FrameOutcome, PipelineResult, PipelineStage, StageFailure, StageReporter, StageTimings,
};
pub use worker::{spawn_pipeline_worker, WorkerSummary};
