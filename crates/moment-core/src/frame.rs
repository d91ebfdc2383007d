use std::path::PathBuf;

use image::{imageops, GrayImage, Rgb, RgbImage};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{MomentError, Result};

/// Pixel encoding of a captured frame buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Gray8,
    Rgb8,
    Rgba8,
    Bgra8,
    /// Bi-planar 4:2:0 YCbCr, full range: a Y plane followed by an
    /// interleaved CbCr plane at half resolution.
    Nv12,
}

impl PixelFormat {
    /// Expected buffer length for a frame of the given size.
    pub fn buffer_len(&self, width: usize, height: usize) -> usize {
        match self {
            Self::Gray8 => width * height,
            Self::Rgb8 => width * height * 3,
            Self::Rgba8 | Self::Bgra8 => width * height * 4,
            Self::Nv12 => width * height + 2 * width.div_ceil(2) * height.div_ceil(2),
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gray8 => write!(f, "Gray 8-bit"),
            Self::Rgb8 => write!(f, "RGB 8-bit"),
            Self::Rgba8 => write!(f, "RGBA 8-bit"),
            Self::Bgra8 => write!(f, "BGRA 8-bit"),
            Self::Nv12 => write!(f, "NV12 (4:2:0 bi-planar)"),
        }
    }
}

/// A captured frame as delivered by the capture source.
///
/// Row-major, immutable once constructed. Ownership moves into the pipeline
/// invocation that processes it.
#[derive(Clone, Debug)]
pub struct RawFrame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    format: PixelFormat,
    pub index: usize,
    pub timestamp_us: Option<u64>,
}

impl RawFrame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, format: PixelFormat) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(MomentError::InvalidDimensions { width, height });
        }
        let expected = format.buffer_len(width as usize, height as usize);
        if data.len() != expected {
            return Err(MomentError::FilterUnavailable(format!(
                "{format} buffer for {width}x{height} must be {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
            format,
            index: 0,
            timestamp_us: None,
        })
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    pub fn with_timestamp(mut self, timestamp_us: Option<u64>) -> Self {
        self.timestamp_us = timestamp_us;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Decode into packed 8-bit RGB.
    pub fn to_rgb(&self) -> RgbImage {
        let (w, h) = (self.width as usize, self.height as usize);
        match self.format {
            PixelFormat::Rgb8 => RgbImage::from_fn(self.width, self.height, |x, y| {
                let i = (y as usize * w + x as usize) * 3;
                Rgb([self.data[i], self.data[i + 1], self.data[i + 2]])
            }),
            PixelFormat::Gray8 => RgbImage::from_fn(self.width, self.height, |x, y| {
                let v = self.data[y as usize * w + x as usize];
                Rgb([v, v, v])
            }),
            PixelFormat::Rgba8 => RgbImage::from_fn(self.width, self.height, |x, y| {
                let i = (y as usize * w + x as usize) * 4;
                Rgb([self.data[i], self.data[i + 1], self.data[i + 2]])
            }),
            PixelFormat::Bgra8 => RgbImage::from_fn(self.width, self.height, |x, y| {
                let i = (y as usize * w + x as usize) * 4;
                Rgb([self.data[i + 2], self.data[i + 1], self.data[i]])
            }),
            PixelFormat::Nv12 => {
                let (luma, chroma) = self.data.split_at(w * h);
                let chroma_stride = 2 * w.div_ceil(2);
                RgbImage::from_fn(self.width, self.height, |x, y| {
                    let (x, y) = (x as usize, y as usize);
                    let c = (y / 2) * chroma_stride + (x / 2) * 2;
                    ycbcr_to_rgb(luma[y * w + x], chroma[c], chroma[c + 1])
                })
            }
        }
    }
}

/// Full-range BT.601 YCbCr to RGB.
fn ycbcr_to_rgb(y: u8, cb: u8, cr: u8) -> Rgb<u8> {
    let y = y as f32;
    let cb = cb as f32 - 128.0;
    let cr = cr as f32 - 128.0;
    let r = y + 1.402 * cr;
    let g = y - 0.344_136 * cb - 0.714_136 * cr;
    let b = y + 1.772 * cb;
    Rgb([
        r.round().clamp(0.0, 255.0) as u8,
        g.round().clamp(0.0, 255.0) as u8,
        b.round().clamp(0.0, 255.0) as u8,
    ])
}

/// Rotation applied to frames before processing, to bring the sensor's
/// native orientation upright.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Up,
    /// Rotate 90 degrees clockwise (landscape sensor held in portrait).
    Right,
    Down,
    /// Rotate 90 degrees counter-clockwise.
    Left,
}

impl Orientation {
    pub fn apply(&self, image: &RgbImage) -> RgbImage {
        match self {
            Self::Up => image.clone(),
            Self::Right => imageops::rotate90(image),
            Self::Down => imageops::rotate180(image),
            Self::Left => imageops::rotate270(image),
        }
    }

    /// Frame dimensions after applying this orientation.
    pub fn oriented_dims(&self, width: u32, height: u32) -> (u32, u32) {
        match self {
            Self::Up | Self::Down => (width, height),
            Self::Right | Self::Left => (height, width),
        }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Up => write!(f, "Up"),
            Self::Right => write!(f, "Right (90\u{b0} CW)"),
            Self::Down => write!(f, "Down (180\u{b0})"),
            Self::Left => write!(f, "Left (90\u{b0} CCW)"),
        }
    }
}

/// Cropped sub-area of an (oriented) frame over which moments are computed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl WorkingRegion {
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x as u64 + self.width as u64 <= width as u64
            && self.y as u64 + self.height as u64 <= height as u64
    }
}

impl std::fmt::Display for WorkingRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{} at ({}, {})",
            self.width, self.height, self.x, self.y
        )
    }
}

/// Binary foreground mask. Pixel values are 0 (background) or 1 (foreground).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryMask {
    /// Shape = (height, width), standard (row-major) layout.
    data: Array2<u8>,
}

impl BinaryMask {
    pub fn new(data: Array2<u8>) -> Self {
        Self {
            data: data.as_standard_layout().mapv(|v| u8::from(v != 0)),
        }
    }

    pub fn zeros(width: usize, height: usize) -> Self {
        Self {
            data: Array2::zeros((height, width)),
        }
    }

    pub fn from_fn<F>(width: usize, height: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> bool,
    {
        Self {
            data: Array2::from_shape_fn((height, width), |(y, x)| u8::from(f(x, y))),
        }
    }

    /// Pixel grid, shape = (height, width).
    pub fn data(&self) -> &Array2<u8> {
        &self.data
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn get(&self, x: usize, y: usize) -> bool {
        self.data[[y, x]] != 0
    }

    /// Number of foreground pixels.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    /// Row-major pixel values.
    pub fn as_slice(&self) -> &[u8] {
        self.data
            .as_slice()
            .expect("BinaryMask is always stored in standard layout")
    }

    pub fn crop(&self, region: &WorkingRegion) -> Result<BinaryMask> {
        if !region.fits_within(self.width() as u32, self.height() as u32) {
            return Err(MomentError::InvalidDimensions {
                width: region.width,
                height: region.height,
            });
        }
        let (x0, y0) = (region.x as usize, region.y as usize);
        let view = self.data.slice(ndarray::s![
            y0..y0 + region.height as usize,
            x0..x0 + region.width as usize
        ]);
        Ok(BinaryMask {
            data: view.as_standard_layout().into_owned(),
        })
    }

    /// 0/255 grayscale rendering for saving or compositing.
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width() as u32, self.height() as u32, |x, y| {
            image::Luma([self.data[[y as usize, x as usize]] * 255])
        })
    }
}

/// Metadata about a recorded frame source.
#[derive(Clone, Debug)]
pub struct SourceInfo {
    pub filename: PathBuf,
    pub total_frames: usize,
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub pixel_format: PixelFormat,
    pub observer: Option<String>,
    pub instrument: Option<String>,
}
