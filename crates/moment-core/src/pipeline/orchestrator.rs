use std::sync::Arc;
use std::time::Instant;

use image::{imageops, RgbImage};
use tracing::{debug, info, warn};

use crate::binarize::{binarize, composite_minimum, BinarizeConfig};
use crate::compute::ComputeBackend;
use crate::error::{MomentError, Result};
use crate::frame::{BinaryMask, RawFrame, WorkingRegion};
use crate::moments::{aggregate, MomentReducer, Moments};

use super::config::PipelineConfig;
use super::gate::{InFlightGate, InFlightPermit};
use super::types::{
    FrameOutcome, NoOpReporter, PipelineResult, PipelineStage, StageFailure, StageReporter,
    StageTimings,
};

/// Frame orchestrator: binarize, reduce, aggregate, one frame at a time.
///
/// Per-frame failures never escape; they are recorded in the result and the
/// next frame starts from a clean state.
pub struct FramePipeline {
    config: PipelineConfig,
    reducer: MomentReducer,
    gate: InFlightGate,
    reporter: Arc<dyn StageReporter>,
}

impl FramePipeline {
    pub fn new(config: PipelineConfig, backend: Arc<dyn ComputeBackend>) -> Result<Self> {
        config.validate()?;
        let reducer = MomentReducer::new(backend, config.tile_width);
        info!(
            device = reducer.backend().name(),
            runnable = reducer.is_runnable(),
            orientation = %config.orientation,
            "Frame pipeline ready"
        );
        Ok(Self {
            config,
            reducer,
            gate: InFlightGate::new(),
            reporter: Arc::new(NoOpReporter),
        })
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn StageReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn reducer(&self) -> &MomentReducer {
        &self.reducer
    }

    /// Process `frame` if no other frame is in flight, otherwise drop it.
    pub fn process(&self, frame: RawFrame, threshold: f32) -> FrameOutcome {
        match self.gate.try_acquire() {
            Some(permit) => FrameOutcome::Processed(self.run(frame, threshold, permit)),
            None => {
                debug!(frame = frame.index, "Pipeline busy, dropping frame");
                FrameOutcome::Skipped {
                    frame_index: frame.index,
                }
            }
        }
    }

    /// Process `frame`, waiting for any in-flight frame to finish first.
    pub fn process_blocking(&self, frame: RawFrame, threshold: f32) -> PipelineResult {
        let permit = self.gate.acquire();
        self.run(frame, threshold, permit)
    }

    fn run(&self, frame: RawFrame, threshold: f32, _permit: InFlightPermit<'_>) -> PipelineResult {
        let mut result = PipelineResult {
            frame_index: frame.index,
            timestamp_us: frame.timestamp_us,
            region: None,
            centroid: None,
            moments: None,
            composite: None,
            mask: None,
            failure: None,
            timings: StageTimings::default(),
        };

        // Binarizing
        self.reporter
            .enter_stage(frame.index, PipelineStage::Binarizing);
        let t = Instant::now();
        let oriented = self.config.orientation.apply(&frame.to_rgb());
        drop(frame);
        let region = match self
            .config
            .resolve_region(oriented.width(), oriented.height())
        {
            Ok(region) => region,
            Err(e) => return self.fail(result, PipelineStage::Binarizing, e, None),
        };
        result.region = Some(region);
        let region_rgb = imageops::crop_imm(&oriented, region.x, region.y, region.width, region.height)
            .to_image();
        let mask = match self.binarize_region(&oriented, &region, threshold) {
            Ok(mask) => mask,
            Err(e) => {
                return self.fail(result, PipelineStage::Binarizing, e, Some(region_rgb));
            }
        };
        result.timings.binarize = t.elapsed();

        // Reducing
        self.reporter
            .enter_stage(result.frame_index, PipelineStage::Reducing);
        let t = Instant::now();
        let reduction = match self.reducer.reduce(&mask) {
            Ok(reduction) => reduction,
            Err(e) => {
                result.mask = Some(mask);
                return self.fail(result, PipelineStage::Reducing, e, Some(region_rgb));
            }
        };
        result.timings.reduce = t.elapsed();

        // Aggregating
        self.reporter
            .enter_stage(result.frame_index, PipelineStage::Aggregating);
        let t = Instant::now();
        result.moments = Some(Moments::from_tiles(&reduction.tiles));
        result.centroid = aggregate(&reduction.tiles, region.height, self.config.y_axis);
        result.timings.aggregate = t.elapsed();

        if self.config.composite {
            match composite_minimum(&region_rgb, &mask) {
                Ok(image) => result.composite = Some(image),
                Err(e) => warn!(frame = result.frame_index, "Compositing failed: {e}"),
            }
        }
        result.mask = Some(mask);

        debug!(
            frame = result.frame_index,
            centroid = ?result.centroid,
            binarize_us = result.timings.binarize.as_micros() as u64,
            reduce_us = result.timings.reduce.as_micros() as u64,
            "Frame processed"
        );
        self.reporter
            .enter_stage(result.frame_index, PipelineStage::Done);
        self.reporter.frame_done(&result);
        result
    }

    fn binarize_region(
        &self,
        oriented: &RgbImage,
        region: &WorkingRegion,
        threshold: f32,
    ) -> Result<BinaryMask> {
        let config = BinarizeConfig {
            threshold,
            morphology_radius: self
                .config
                .morphology_radius(oriented.width(), oriented.height()),
            ..self.config.binarize.clone()
        };
        binarize(oriented, &config)?.crop(region)
    }

    fn fail(
        &self,
        mut result: PipelineResult,
        stage: PipelineStage,
        error: MomentError,
        raw_region: Option<RgbImage>,
    ) -> PipelineResult {
        warn!(frame = result.frame_index, %stage, "Frame failed: {error}");
        if self.config.composite {
            result.composite = raw_region;
        }
        result.failure = Some(StageFailure {
            stage,
            message: error.to_string(),
        });
        self.reporter
            .enter_stage(result.frame_index, PipelineStage::Done);
        self.reporter.frame_done(&result);
        result
    }
}
