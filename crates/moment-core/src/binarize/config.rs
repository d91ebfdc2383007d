use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_BINARIZE_THRESHOLD, DEFAULT_MORPHOLOGY_RADIUS, REFERENCE_FRAME_HEIGHT,
};

/// Order of the two morphological passes applied after thresholding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MorphologyOrder {
    /// Erode then dilate: removes white speckles smaller than the radius.
    #[default]
    ErodeFirst,
    /// Dilate then erode: fills dark gaps smaller than the radius.
    DilateFirst,
}

impl std::fmt::Display for MorphologyOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ErodeFirst => write!(f, "Erode \u{2192} Dilate"),
            Self::DilateFirst => write!(f, "Dilate \u{2192} Erode"),
        }
    }
}

/// Parameters of the grayscale -> threshold -> morphology filter chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BinarizeConfig {
    /// Foreground where the brightest channel is >= threshold * 255. Range [0.0, 1.0].
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    /// Radius of the disk structuring element at the 480-line reference
    /// resolution, in pixels. 0 disables morphology.
    #[serde(default = "default_radius")]
    pub morphology_radius: u32,
    #[serde(default)]
    pub morphology_order: MorphologyOrder,
}

fn default_threshold() -> f32 {
    DEFAULT_BINARIZE_THRESHOLD
}
fn default_radius() -> u32 {
    DEFAULT_MORPHOLOGY_RADIUS
}

impl Default for BinarizeConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_BINARIZE_THRESHOLD,
            morphology_radius: DEFAULT_MORPHOLOGY_RADIUS,
            morphology_order: MorphologyOrder::default(),
        }
    }
}

impl BinarizeConfig {
    /// Morphology radius scaled from the reference 480-line resolution to a
    /// frame of `height` lines. Never drops below 1 when the base radius is nonzero.
    pub fn radius_for_height(&self, height: u32) -> u32 {
        if self.morphology_radius == 0 {
            return 0;
        }
        let scaled = (self.morphology_radius as u64 * height as u64
            + REFERENCE_FRAME_HEIGHT as u64 / 2)
            / REFERENCE_FRAME_HEIGHT as u64;
        scaled.max(1) as u32
    }
}
