use image::RgbImage;
use ndarray::Array2;

/// Grayscale as the brightest of the three channels.
///
/// Unlike a luminance average, a saturated colored target stays bright.
pub fn max_channel(image: &RgbImage) -> Array2<u8> {
    let (w, h) = image.dimensions();
    let mut gray = Array2::<u8>::zeros((h as usize, w as usize));
    for (x, y, px) in image.enumerate_pixels() {
        let [r, g, b] = px.0;
        gray[[y as usize, x as usize]] = r.max(g).max(b);
    }
    gray
}
