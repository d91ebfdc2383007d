//! Binary morphology with a disk structuring element.
//!
//! Both operators work on per-row prefix sums, so each output pixel costs one
//! lookup per structuring-element row instead of one per element. Samples
//! outside the image count as background: erosion pulls foreground away from
//! the border by up to `radius` pixels, which callers crop away.

use ndarray::Array2;
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;

use super::config::MorphologyOrder;

/// Apply erosion and dilation with the same radius in the configured order.
pub fn apply_morphology(mask: &Array2<u8>, radius: u32, order: MorphologyOrder) -> Array2<u8> {
    if radius == 0 {
        return mask.clone();
    }
    match order {
        MorphologyOrder::ErodeFirst => dilate(&erode(mask, radius), radius),
        MorphologyOrder::DilateFirst => erode(&dilate(mask, radius), radius),
    }
}

/// A pixel stays foreground only if every pixel under the disk is foreground.
pub fn erode(mask: &Array2<u8>, radius: u32) -> Array2<u8> {
    let ctx = DiskContext::new(mask, radius);
    build_rows(mask.dim(), |row, out| ctx.erode_row(row, out))
}

/// A pixel becomes foreground if any pixel under the disk is foreground.
pub fn dilate(mask: &Array2<u8>, radius: u32) -> Array2<u8> {
    let ctx = DiskContext::new(mask, radius);
    build_rows(mask.dim(), |row, out| ctx.dilate_row(row, out))
}

/// Horizontal half-extent of a disk of `radius` for each row offset
/// `-radius..=radius`.
pub fn disk_half_widths(radius: u32) -> Vec<usize> {
    let r = radius as i64;
    (-r..=r)
        .map(|dy| {
            let span = r * r - dy * dy;
            let mut hw = (span as f64).sqrt() as i64;
            // Guard against sqrt rounding on perfect squares.
            while (hw + 1) * (hw + 1) <= span {
                hw += 1;
            }
            while hw * hw > span {
                hw -= 1;
            }
            hw as usize
        })
        .collect()
}

struct DiskContext {
    /// prefix[[row, i]] = number of foreground pixels in row[0..i].
    prefix: Array2<u32>,
    half_widths: Vec<usize>,
    radius: usize,
    height: usize,
    width: usize,
}

impl DiskContext {
    fn new(mask: &Array2<u8>, radius: u32) -> Self {
        let (h, w) = mask.dim();
        let mut prefix = Array2::<u32>::zeros((h, w + 1));
        for row in 0..h {
            let mut acc = 0u32;
            for col in 0..w {
                acc += u32::from(mask[[row, col]] != 0);
                prefix[[row, col + 1]] = acc;
            }
        }
        Self {
            prefix,
            half_widths: disk_half_widths(radius),
            radius: radius as usize,
            height: h,
            width: w,
        }
    }

    fn count(&self, row: usize, lo: usize, hi: usize) -> u32 {
        self.prefix[[row, hi + 1]] - self.prefix[[row, lo]]
    }

    fn erode_row(&self, row: usize, out: &mut [u8]) {
        if row < self.radius || row + self.radius >= self.height {
            out.fill(0);
            return;
        }
        for (col, px) in out.iter_mut().enumerate() {
            let mut keep = true;
            for (k, &hw) in self.half_widths.iter().enumerate() {
                let r = row + k - self.radius;
                if col < hw || col + hw >= self.width {
                    keep = false;
                    break;
                }
                if self.count(r, col - hw, col + hw) != (2 * hw + 1) as u32 {
                    keep = false;
                    break;
                }
            }
            *px = u8::from(keep);
        }
    }

    fn dilate_row(&self, row: usize, out: &mut [u8]) {
        for (col, px) in out.iter_mut().enumerate() {
            let mut hit = false;
            for (k, &hw) in self.half_widths.iter().enumerate() {
                let r = row as isize + k as isize - self.radius as isize;
                if r < 0 || r >= self.height as isize {
                    continue;
                }
                let lo = col.saturating_sub(hw);
                let hi = (col + hw).min(self.width - 1);
                if self.count(r as usize, lo, hi) > 0 {
                    hit = true;
                    break;
                }
            }
            *px = u8::from(hit);
        }
    }
}

fn build_rows<F>(dim: (usize, usize), fill_row: F) -> Array2<u8>
where
    F: Fn(usize, &mut [u8]) + Sync,
{
    let (h, w) = dim;
    let mut result = Array2::<u8>::zeros((h, w));
    if w == 0 {
        return result;
    }
    let buf = result
        .as_slice_mut()
        .expect("freshly allocated array is contiguous");
    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        buf.par_chunks_mut(w)
            .enumerate()
            .for_each(|(row, out)| fill_row(row, out));
    } else {
        for (row, out) in buf.chunks_mut(w).enumerate() {
            fill_row(row, out);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: usize, x0: usize, y0: usize, side: usize) -> Array2<u8> {
        Array2::from_shape_fn((size, size), |(r, c)| {
            u8::from(r >= y0 && r < y0 + side && c >= x0 && c < x0 + side)
        })
    }

    #[test]
    fn test_disk_half_widths_radius_2() {
        assert_eq!(disk_half_widths(2), vec![0, 1, 2, 1, 0]);
    }

    #[test]
    fn test_erode_removes_speckle() {
        let mut mask = Array2::<u8>::zeros((32, 32));
        mask[[10, 10]] = 1;
        mask[[11, 10]] = 1;
        let eroded = erode(&mask, 2);
        assert_eq!(eroded.iter().filter(|&&v| v != 0).count(), 0);
    }

    #[test]
    fn test_opening_keeps_large_square() {
        let mask = square(64, 20, 20, 20);
        let opened = apply_morphology(&mask, 2, MorphologyOrder::ErodeFirst);
        // Interior is intact; only the corners are rounded off.
        assert_eq!(opened[[30, 30]], 1);
        assert_eq!(opened[[20, 30]], 1);
        assert_eq!(opened[[30, 39]], 1);
        assert_eq!(opened[[19, 30]], 0);
    }

    #[test]
    fn test_closing_fills_pinhole() {
        let mut mask = square(64, 16, 16, 32);
        mask[[30, 30]] = 0;
        let closed = apply_morphology(&mask, 2, MorphologyOrder::DilateFirst);
        assert_eq!(closed[[30, 30]], 1);
    }

    #[test]
    fn test_erode_border_is_background() {
        let mask = Array2::<u8>::ones((16, 16));
        let eroded = erode(&mask, 3);
        assert_eq!(eroded[[0, 8]], 0);
        assert_eq!(eroded[[2, 8]], 0);
        assert_eq!(eroded[[3, 8]], 1);
        assert_eq!(eroded[[8, 12]], 1);
        assert_eq!(eroded[[8, 13]], 0);
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        // 300x300 crosses PARALLEL_PIXEL_THRESHOLD.
        let big = Array2::from_shape_fn((300, 300), |(r, c)| u8::from((r * 7 + c * 13) % 11 < 6));
        let small = big.slice(ndarray::s![..100, ..100]).to_owned();
        let big_out = dilate(&erode(&big, 2), 2);
        let small_out = dilate(&erode(&small, 2), 2);
        // Away from the cut edge the two results must match.
        for r in 0..90 {
            for c in 0..90 {
                assert_eq!(big_out[[r, c]], small_out[[r, c]], "({r},{c})");
            }
        }
    }
}
