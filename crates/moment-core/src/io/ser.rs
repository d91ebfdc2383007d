//! Memory-mapped reader for SER video recordings, decoding frames into
//! 8-bit [`RawFrame`]s for replay through the live pipeline.

use std::fs::File;
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use memmap2::Mmap;

use crate::error::{MomentError, Result};
use crate::frame::{PixelFormat, RawFrame, SourceInfo};

pub const SER_HEADER_SIZE: usize = 178;
const SER_MAGIC: &[u8; 14] = b"LUCAM-RECORDER";

const SER_COLOR_RGB: i32 = 100;
const SER_COLOR_BGR: i32 = 101;

/// SER file header (178 bytes).
#[derive(Clone, Debug)]
pub struct SerHeader {
    pub color_id: i32,
    pub little_endian: bool,
    pub width: u32,
    pub height: u32,
    pub pixel_depth: u32,
    pub frame_count: u32,
    pub observer: String,
    pub instrument: String,
    pub telescope: String,
}

impl SerHeader {
    /// Bytes per sample (1 for 8-bit, 2 for 9-16 bit).
    pub fn bytes_per_sample(&self) -> usize {
        if self.pixel_depth <= 8 { 1 } else { 2 }
    }

    /// Samples per pixel: 3 for RGB/BGR, 1 for mono and raw Bayer.
    pub fn planes_per_pixel(&self) -> usize {
        match self.color_id {
            SER_COLOR_RGB | SER_COLOR_BGR => 3,
            _ => 1,
        }
    }

    pub fn frame_byte_size(&self) -> usize {
        self.width as usize
            * self.height as usize
            * self.bytes_per_sample()
            * self.planes_per_pixel()
    }

    /// Format of the decoded 8-bit frames. Bayer mosaics are passed through
    /// as grayscale; the brightest-channel filter only needs intensity.
    pub fn pixel_format(&self) -> PixelFormat {
        if self.planes_per_pixel() == 3 {
            PixelFormat::Rgb8
        } else {
            PixelFormat::Gray8
        }
    }
}

/// Memory-mapped SER file reader.
pub struct SerReader {
    mmap: Mmap,
    pub header: SerHeader,
}

impl SerReader {
    /// Open a SER file and parse its header.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        if mmap.len() < SER_HEADER_SIZE {
            return Err(MomentError::InvalidSer(
                "File too small for SER header".into(),
            ));
        }
        if &mmap[0..14] != SER_MAGIC {
            return Err(MomentError::InvalidSer(
                "Missing LUCAM-RECORDER magic".into(),
            ));
        }

        let header = parse_header(&mmap[..SER_HEADER_SIZE])?;

        let expected = (header.frame_byte_size() as u64)
            .checked_mul(header.frame_count as u64)
            .and_then(|n| n.checked_add(SER_HEADER_SIZE as u64))
            .ok_or_else(|| MomentError::InvalidSer("Frame data size overflows".into()))?;
        if (mmap.len() as u64) < expected {
            return Err(MomentError::InvalidSer(format!(
                "File truncated: expected at least {expected} bytes, got {}",
                mmap.len()
            )));
        }

        Ok(Self { mmap, header })
    }

    pub fn frame_count(&self) -> usize {
        self.header.frame_count as usize
    }

    /// Raw bytes of one frame, zero-copy from the mapping.
    pub fn frame_raw(&self, index: usize) -> Result<&[u8]> {
        let count = self.frame_count();
        if index >= count {
            return Err(MomentError::FrameIndexOutOfRange {
                index,
                total: count,
            });
        }
        let size = self.header.frame_byte_size();
        let offset = SER_HEADER_SIZE + index * size;
        Ok(&self.mmap[offset..offset + size])
    }

    /// Decode one frame to 8 bits per sample. BGR is reordered to RGB.
    pub fn read_frame(&self, index: usize) -> Result<RawFrame> {
        let raw = self.frame_raw(index)?;
        let header = &self.header;
        let mut data = decode_samples(
            raw,
            header.bytes_per_sample(),
            header.pixel_depth,
            header.little_endian,
        );
        if header.color_id == SER_COLOR_BGR {
            for px in data.chunks_exact_mut(3) {
                px.swap(0, 2);
            }
        }
        Ok(
            RawFrame::new(data, header.width, header.height, header.pixel_format())?
                .with_index(index)
                .with_timestamp(self.read_timestamp(index)),
        )
    }

    /// Per-frame timestamp from the optional trailer.
    fn read_timestamp(&self, index: usize) -> Option<u64> {
        let trailer_offset = SER_HEADER_SIZE + self.header.frame_byte_size() * self.frame_count();
        let ts_offset = trailer_offset + index * 8;
        let bytes = self.mmap.get(ts_offset..ts_offset + 8)?;
        Some(u64::from_le_bytes(bytes.try_into().ok()?))
    }

    pub fn source_info(&self, path: &Path) -> SourceInfo {
        SourceInfo {
            filename: path.to_path_buf(),
            total_frames: self.frame_count(),
            width: self.header.width,
            height: self.header.height,
            bit_depth: self.header.pixel_depth as u8,
            pixel_format: self.header.pixel_format(),
            observer: non_empty(&self.header.observer),
            instrument: non_empty(&self.header.instrument),
        }
    }

    pub fn frames(&self) -> impl Iterator<Item = Result<RawFrame>> + '_ {
        (0..self.frame_count()).map(move |i| self.read_frame(i))
    }
}

fn parse_header(buf: &[u8]) -> Result<SerHeader> {
    let mut cursor = std::io::Cursor::new(&buf[14..]);

    let _lu_id = cursor.read_i32::<LittleEndian>()?;
    let color_id = cursor.read_i32::<LittleEndian>()?;
    let le_flag = cursor.read_i32::<LittleEndian>()?;
    let width = cursor.read_i32::<LittleEndian>()? as u32;
    let height = cursor.read_i32::<LittleEndian>()? as u32;
    let pixel_depth = cursor.read_i32::<LittleEndian>()? as u32;
    let frame_count = cursor.read_i32::<LittleEndian>()? as u32;

    if width == 0 || height == 0 {
        return Err(MomentError::InvalidDimensions { width, height });
    }
    if !(1..=16).contains(&pixel_depth) {
        return Err(MomentError::InvalidSer(format!(
            "Unsupported pixel depth {pixel_depth}"
        )));
    }

    Ok(SerHeader {
        color_id,
        // Most writers store 0 for little-endian data despite the format notes.
        little_endian: le_flag != 1,
        width,
        height,
        pixel_depth,
        frame_count,
        observer: read_fixed_string(&buf[42..82]),
        instrument: read_fixed_string(&buf[82..122]),
        telescope: read_fixed_string(&buf[122..162]),
    })
}

fn read_fixed_string(buf: &[u8]) -> String {
    String::from_utf8_lossy(buf)
        .trim_end_matches('\0')
        .trim()
        .to_string()
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() { None } else { Some(s.to_string()) }
}

/// Scale samples of `bit_depth` bits to 0..=255.
fn decode_samples(raw: &[u8], bytes_per_sample: usize, bit_depth: u32, little_endian: bool) -> Vec<u8> {
    if bytes_per_sample == 1 {
        if bit_depth == 8 {
            return raw.to_vec();
        }
        let max_val = (1u32 << bit_depth) - 1;
        return raw
            .iter()
            .map(|&v| ((v as u32).min(max_val) * 255 / max_val) as u8)
            .collect();
    }
    let max_val = (1u32 << bit_depth) - 1;
    raw.chunks_exact(2)
        .map(|pair| {
            let pair = [pair[0], pair[1]];
            let v = if little_endian {
                u16::from_le_bytes(pair)
            } else {
                u16::from_be_bytes(pair)
            } as u32;
            (v.min(max_val) * 255 / max_val) as u8
        })
        .collect()
}
