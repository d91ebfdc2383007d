use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use moment_core::binarize::quantize_threshold;
use moment_core::compute::create_backend;
use moment_core::io::image_io::{load_frame, save_mask, save_rgb};
use moment_core::pipeline::FramePipeline;
use tracing::warn;

use super::{load_config, DeviceArg, OrientationArg};

#[derive(Args)]
pub struct FrameArgs {
    /// Input image (PNG, JPEG, TIFF, ...)
    pub file: PathBuf,

    /// Pipeline config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Binarization threshold (0.0-1.0), overrides the config
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Compute device, overrides the config
    #[arg(long, value_enum)]
    pub device: Option<DeviceArg>,

    /// Frame orientation, overrides the config
    #[arg(long, value_enum)]
    pub orientation: Option<OrientationArg>,

    /// Save the minimum-composited region to this path
    #[arg(long)]
    pub composite: Option<PathBuf>,

    /// Save the cropped binary mask to this path
    #[arg(long)]
    pub mask: Option<PathBuf>,
}

pub fn run(args: &FrameArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(device) = args.device {
        config.device = device.into();
    }
    if let Some(orientation) = args.orientation {
        config.orientation = orientation.into();
    }
    if args.composite.is_some() {
        config.composite = true;
    }
    let threshold = quantize_threshold(args.threshold.unwrap_or(config.binarize.threshold));

    let frame = load_frame(&args.file)
        .with_context(|| format!("Failed to load {}", args.file.display()))?;

    let backend = create_backend(&config.device).context("No compute device available")?;
    let pipeline = FramePipeline::new(config, backend)?;
    let result = pipeline.process_blocking(frame, threshold);

    crate::summary::print_frame_result(&result, pipeline.reducer().backend().name(), threshold);

    if let Some(ref path) = args.composite {
        match result.composite {
            Some(ref image) => {
                save_rgb(image, path)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("Composite saved to {}", path.display());
            }
            None => warn!("No composite produced; {} not written", path.display()),
        }
    }

    if let Some(ref path) = args.mask {
        let mask = result
            .mask
            .as_ref()
            .context("Frame was not binarized; mask not written")?;
        save_mask(mask, path).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Mask saved to {}", path.display());
    }

    Ok(())
}
