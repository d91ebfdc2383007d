//! Frame binarization: max-channel grayscale, fixed threshold, then a
//! morphological pass to suppress speckle.

pub mod composite;
pub mod config;
pub mod grayscale;
pub mod morphology;
pub mod threshold;

use image::RgbImage;
use tracing::debug;

use crate::error::{MomentError, Result};
use crate::frame::BinaryMask;

pub use composite::composite_minimum;
pub use config::{BinarizeConfig, MorphologyOrder};
pub use threshold::quantize_threshold;

/// Binarize a color frame.
///
/// The result has the same extent as `image`. Pixels within
/// `config.morphology_radius` of any edge are unreliable and must be cropped
/// before computing moments.
pub fn binarize(image: &RgbImage, config: &BinarizeConfig) -> Result<BinaryMask> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return Err(MomentError::FilterUnavailable(format!(
            "cannot binarize an empty {w}x{h} frame"
        )));
    }
    if !config.threshold.is_finite() {
        return Err(MomentError::FilterUnavailable(format!(
            "threshold {} is not a finite number",
            config.threshold
        )));
    }

    let gray = grayscale::max_channel(image);
    let thresholded = threshold::threshold_mask(&gray, config.threshold);
    let cleaned = morphology::apply_morphology(
        &thresholded,
        config.morphology_radius,
        config.morphology_order,
    );
    let mask = BinaryMask::new(cleaned);

    debug!(
        width = w,
        height = h,
        threshold = config.threshold,
        foreground = mask.count(),
        "Binarized frame"
    );
    Ok(mask)
}
