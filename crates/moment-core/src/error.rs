use thiserror::Error;

#[derive(Error, Debug)]
pub enum MomentError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid SER file: {0}")]
    InvalidSer(String),

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Frame index {index} out of range (total: {total})")]
    FrameIndexOutOfRange { index: usize, total: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Binarization filter unavailable: {0}")]
    FilterUnavailable(String),

    #[error("Moment reducer unavailable: {0}")]
    ReducerUnavailable(String),

    #[error("Device execution failed: {0}")]
    DeviceExecutionFailure(String),

    #[error("No compute device: {0}")]
    NoComputeDevice(String),
}

pub type Result<T> = std::result::Result<T, MomentError>;
