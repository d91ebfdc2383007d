use moment_core::frame::{PixelFormat, RawFrame};
use moment_core::io::ser::SER_HEADER_SIZE;

/// Gray8 frame with a filled disk of `value` on a black background.
pub fn disk_frame(width: u32, height: u32, cx: i64, cy: i64, radius: i64, value: u8) -> RawFrame {
    let mut data = vec![0u8; (width * height) as usize];
    for y in 0..height as i64 {
        for x in 0..width as i64 {
            let (dx, dy) = (x - cx, y - cy);
            if dx * dx + dy * dy <= radius * radius {
                data[(y * width as i64 + x) as usize] = value;
            }
        }
    }
    RawFrame::new(data, width, height, PixelFormat::Gray8).expect("valid gray frame")
}

/// All-black Gray8 frame.
pub fn black_frame(width: u32, height: u32) -> RawFrame {
    RawFrame::new(vec![0u8; (width * height) as usize], width, height, PixelFormat::Gray8)
        .expect("valid gray frame")
}

/// Build a SER file header.
///
/// `color_id`: 0=MONO, 100=RGB, 101=BGR
pub fn build_ser_header(
    width: u32,
    height: u32,
    bit_depth: u32,
    num_frames: usize,
    color_id: i32,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(SER_HEADER_SIZE);

    // Magic (14 bytes)
    buf.extend_from_slice(b"LUCAM-RECORDER");
    // LuID
    buf.extend_from_slice(&0i32.to_le_bytes());
    // ColorID
    buf.extend_from_slice(&color_id.to_le_bytes());
    // LittleEndian = 0 (little-endian by common convention)
    buf.extend_from_slice(&0i32.to_le_bytes());
    buf.extend_from_slice(&(width as i32).to_le_bytes());
    buf.extend_from_slice(&(height as i32).to_le_bytes());
    buf.extend_from_slice(&(bit_depth as i32).to_le_bytes());
    buf.extend_from_slice(&(num_frames as i32).to_le_bytes());
    // Observer (40 bytes)
    let mut observer = [0u8; 40];
    observer[..4].copy_from_slice(b"Test");
    buf.extend_from_slice(&observer);
    // Instrument, Telescope (40 bytes each)
    buf.extend_from_slice(&[0u8; 80]);
    // DateTime, DateTimeUTC
    buf.extend_from_slice(&[0u8; 16]);

    assert_eq!(buf.len(), SER_HEADER_SIZE);
    buf
}

/// Complete SER file from pre-encoded frame payloads.
pub fn build_ser(width: u32, height: u32, bit_depth: u32, color_id: i32, frames: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = build_ser_header(width, height, bit_depth, frames.len(), color_id);
    for frame in frames {
        buf.extend_from_slice(frame);
    }
    buf
}

/// Write a buffer to a temporary file kept alive by the returned handle.
pub fn write_temp(data: &[u8]) -> tempfile::NamedTempFile {
    use std::io::Write;
    let mut f = tempfile::NamedTempFile::new().expect("create temp file");
    f.write_all(data).expect("write data");
    f.flush().expect("flush");
    f
}
