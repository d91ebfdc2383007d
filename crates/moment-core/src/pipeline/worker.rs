use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, info};

use super::feed::FrameReceiver;
use super::orchestrator::FramePipeline;
use super::threshold::ThresholdHandle;
use super::types::{FrameOutcome, PipelineResult};

/// Totals reported by a pipeline worker when its feed closes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub detections: usize,
}

/// Run `pipeline` on a dedicated thread, fed by `frames`.
///
/// The threshold is sampled once per frame. Results go to `results`; the
/// worker exits when the feed closes or the result receiver is dropped.
pub fn spawn_pipeline_worker(
    pipeline: Arc<FramePipeline>,
    frames: FrameReceiver,
    threshold: ThresholdHandle,
    results: Sender<PipelineResult>,
) -> std::io::Result<JoinHandle<WorkerSummary>> {
    thread::Builder::new()
        .name("moment-worker".into())
        .spawn(move || {
            let mut summary = WorkerSummary::default();
            while let Some(frame) = frames.recv_latest() {
                match pipeline.process(frame, threshold.get()) {
                    FrameOutcome::Processed(result) => {
                        summary.processed += 1;
                        summary.failed += usize::from(result.failure.is_some());
                        summary.detections += usize::from(result.is_detection());
                        if results.send(result).is_err() {
                            debug!("Result receiver closed, stopping worker");
                            break;
                        }
                    }
                    FrameOutcome::Skipped { .. } => summary.skipped += 1,
                }
            }
            info!(
                processed = summary.processed,
                skipped = summary.skipped,
                failed = summary.failed,
                "Pipeline worker finished"
            );
            summary
        })
}
