use image::{Rgb, RgbImage};

use crate::error::{MomentError, Result};
use crate::frame::BinaryMask;

/// Darken-composite an image with a mask: per channel `min(input, mask * 255)`.
///
/// The input shows through inside the foreground and is black elsewhere,
/// which makes a wrong threshold obvious at a glance.
pub fn composite_minimum(image: &RgbImage, mask: &BinaryMask) -> Result<RgbImage> {
    let (w, h) = image.dimensions();
    if w as usize != mask.width() || h as usize != mask.height() {
        return Err(MomentError::InvalidDimensions {
            width: mask.width() as u32,
            height: mask.height() as u32,
        });
    }
    Ok(RgbImage::from_fn(w, h, |x, y| {
        if mask.get(x as usize, y as usize) {
            *image.get_pixel(x, y)
        } else {
            Rgb([0, 0, 0])
        }
    }))
}
