use std::path::Path;

use image::{DynamicImage, ImageFormat, RgbImage};

use crate::error::Result;
use crate::frame::{BinaryMask, PixelFormat, RawFrame};

/// Load a still image as a raw frame. Grayscale files stay single-channel;
/// everything else is converted to 8-bit RGB.
pub fn load_frame(path: &Path) -> Result<RawFrame> {
    let img = image::open(path)?;
    let (w, h) = (img.width(), img.height());
    match img {
        DynamicImage::ImageLuma8(gray) => RawFrame::new(gray.into_raw(), w, h, PixelFormat::Gray8),
        DynamicImage::ImageLuma16(_) => {
            RawFrame::new(img.to_luma8().into_raw(), w, h, PixelFormat::Gray8)
        }
        other => RawFrame::new(other.to_rgb8().into_raw(), w, h, PixelFormat::Rgb8),
    }
}

/// Save an RGB image, choosing the format from the file extension (PNG
/// when it is missing or unknown).
pub fn save_rgb(image: &RgbImage, path: &Path) -> Result<()> {
    let format = ImageFormat::from_path(path).unwrap_or(ImageFormat::Png);
    image.save_with_format(path, format)?;
    Ok(())
}

/// Save a mask as 0/255 grayscale.
pub fn save_mask(mask: &BinaryMask, path: &Path) -> Result<()> {
    let format = ImageFormat::from_path(path).unwrap_or(ImageFormat::Png);
    mask.to_gray_image().save_with_format(path, format)?;
    Ok(())
}
