use ndarray::Array2;

use crate::consts::{MAX_CHANNEL_VALUE, THRESHOLD_STEP};

/// Binary mask of pixels with `gray >= threshold * 255`.
pub fn threshold_mask(gray: &Array2<u8>, threshold: f32) -> Array2<u8> {
    let cutoff = threshold * MAX_CHANNEL_VALUE;
    gray.mapv(|v| u8::from(v as f32 >= cutoff))
}

/// Snap a threshold to the nearest 0.1 step and clamp it to [0.0, 1.0].
pub fn quantize_threshold(value: f32) -> f32 {
    if !value.is_finite() {
        return 0.0;
    }
    let steps_per_unit = (1.0 / THRESHOLD_STEP).round();
    let snapped = (value * steps_per_unit).round() / steps_per_unit;
    snapped.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_inclusive() {
        let gray = Array2::from_shape_vec((1, 3), vec![50u8, 51, 52]).unwrap();
        // 0.2 * 255 = 51
        let mask = threshold_mask(&gray, 0.2);
        assert_eq!(mask.as_slice().unwrap(), &[0, 1, 1]);
    }

    #[test]
    fn test_quantize_threshold_rounds_to_step() {
        assert_eq!(quantize_threshold(0.24), 0.2);
        assert_eq!(quantize_threshold(0.26), 0.3);
        assert_eq!(quantize_threshold(1.7), 1.0);
        assert_eq!(quantize_threshold(-0.3), 0.0);
        assert_eq!(quantize_threshold(f32::NAN), 0.0);
    }
}
