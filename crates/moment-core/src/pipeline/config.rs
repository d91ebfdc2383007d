use serde::{Deserialize, Serialize};

use crate::binarize::BinarizeConfig;
use crate::compute::DevicePreference;
use crate::consts::{DEFAULT_REGION_MARGIN, DEFAULT_TILE_WIDTH, MAX_TILE_WIDTH};
use crate::error::{MomentError, Result};
use crate::frame::{Orientation, WorkingRegion};
use crate::moments::YAxis;

/// Everything the frame pipeline needs besides the frames themselves.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub device: DevicePreference,
    /// Reduction tile width. The working region width must be a multiple.
    #[serde(default = "default_tile_width")]
    pub tile_width: u32,
    #[serde(default)]
    pub orientation: Orientation,
    /// Y convention of the consumer; `Up` flips centroids vertically.
    #[serde(default)]
    pub y_axis: YAxis,
    /// Produce the minimum-composited debug image with each result.
    #[serde(default = "default_composite")]
    pub composite: bool,
    #[serde(default)]
    pub binarize: BinarizeConfig,
    #[serde(default)]
    pub region: RegionConfig,
}

fn default_tile_width() -> u32 {
    DEFAULT_TILE_WIDTH
}
fn default_composite() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            device: DevicePreference::default(),
            tile_width: DEFAULT_TILE_WIDTH,
            orientation: Orientation::default(),
            y_axis: YAxis::default(),
            composite: true,
            binarize: BinarizeConfig::default(),
            region: RegionConfig::default(),
        }
    }
}

/// Placement of the working region inside the oriented frame.
///
/// The region is centred. Without explicit sizes it is the largest square
/// that keeps `margin` pixels clear of every edge, rounded down to a whole
/// number of tiles.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionConfig {
    /// Minimum distance from the frame edge; must cover the morphology radius.
    #[serde(default = "default_margin")]
    pub margin: u32,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

fn default_margin() -> u32 {
    DEFAULT_REGION_MARGIN
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            margin: DEFAULT_REGION_MARGIN,
            width: None,
            height: None,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        let threshold = self.binarize.threshold;
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            return Err(MomentError::InvalidConfig(format!(
                "threshold {threshold} must be within [0.0, 1.0]"
            )));
        }
        if !self.tile_width.is_power_of_two() || self.tile_width > MAX_TILE_WIDTH {
            return Err(MomentError::InvalidConfig(format!(
                "tile width {} must be a power of two no larger than {MAX_TILE_WIDTH}",
                self.tile_width
            )));
        }
        if self.region.margin < self.binarize.morphology_radius {
            return Err(MomentError::InvalidConfig(format!(
                "region margin {} is smaller than the morphology radius {}",
                self.region.margin, self.binarize.morphology_radius
            )));
        }
        for (axis, side) in [("width", self.region.width), ("height", self.region.height)] {
            if let Some(side) = side {
                self.check_side(axis, side)?;
            }
        }
        Ok(())
    }

    fn check_side(&self, axis: &str, side: u32) -> Result<()> {
        if side == 0 || side % self.tile_width.max(1) != 0 {
            return Err(MomentError::InvalidConfig(format!(
                "region {axis} {side} is not a positive multiple of the tile width {}",
                self.tile_width
            )));
        }
        Ok(())
    }

    /// Morphology radius for an oriented frame, scaled by its shorter side.
    pub fn morphology_radius(&self, frame_width: u32, frame_height: u32) -> u32 {
        self.binarize
            .radius_for_height(frame_width.min(frame_height))
    }

    /// Working region for an oriented frame of `frame_width x frame_height`.
    ///
    /// The margin grows to the scaled morphology radius on large frames.
    /// Both sides are whole multiples of the tile width.
    pub fn resolve_region(&self, frame_width: u32, frame_height: u32) -> Result<WorkingRegion> {
        let margin = self
            .region
            .margin
            .max(self.morphology_radius(frame_width, frame_height));
        let usable_w = frame_width.saturating_sub(margin.saturating_mul(2));
        let usable_h = frame_height.saturating_sub(margin.saturating_mul(2));

        let tile = self.tile_width.max(1);
        let side = usable_w.min(usable_h) / tile * tile;
        let width = self.region.width.unwrap_or(side);
        let height = self
            .region
            .height
            .or(self.region.width)
            .unwrap_or(side);

        if width == 0 || height == 0 || width > usable_w || height > usable_h {
            return Err(MomentError::InvalidDimensions {
                width: frame_width,
                height: frame_height,
            });
        }
        self.check_side("width", width)?;
        self.check_side("height", height)?;

        Ok(WorkingRegion {
            x: (frame_width - width) / 2,
            y: (frame_height - height) / 2,
            width,
            height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_frame_region() {
        let region = PipelineConfig::default().resolve_region(480, 480).unwrap();
        assert_eq!(
            region,
            WorkingRegion { x: 16, y: 16, width: 448, height: 448 }
        );
    }

    #[test]
    fn test_landscape_frame_is_centred() {
        let region = PipelineConfig::default().resolve_region(640, 480).unwrap();
        assert_eq!((region.x, region.y), (96, 16));
        assert_eq!(region.width, 448);
    }

    #[test]
    fn test_auto_side_rounds_down_to_tiles() {
        let region = PipelineConfig::default().resolve_region(500, 500).unwrap();
        assert_eq!(region.width, 448);
        assert_eq!(region.x, 26);
    }

    #[test]
    fn test_margin_grows_with_scaled_radius() {
        let config = PipelineConfig::default();
        assert_eq!(config.morphology_radius(1920, 1080), 23);
        assert_eq!(config.morphology_radius(480, 640), 10);
        let region = config.resolve_region(1920, 1080).unwrap();
        assert_eq!(
            region,
            WorkingRegion { x: 448, y: 28, width: 1024, height: 1024 }
        );
    }

    #[test]
    fn test_tiny_frame_has_no_region() {
        assert!(PipelineConfig::default().resolve_region(40, 40).is_err());
    }
}
