use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::binarize::quantize_threshold;

/// Shared, last-write-wins binarization threshold.
///
/// Written by the control surface, read once per frame by the pipeline
/// worker. Values are quantised to the slider step on write.
#[derive(Clone, Debug)]
pub struct ThresholdHandle {
    bits: Arc<AtomicU32>,
}

impl ThresholdHandle {
    pub fn new(initial: f32) -> Self {
        Self {
            bits: Arc::new(AtomicU32::new(quantize_threshold(initial).to_bits())),
        }
    }

    pub fn set(&self, value: f32) {
        self.bits
            .store(quantize_threshold(value).to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }
}
