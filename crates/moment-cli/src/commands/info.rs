use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use moment_core::consts::{CPU_MAX_GROUP_INVOCATIONS, REFERENCE_FRAME_HEIGHT};
use moment_core::io::ser::SerReader;
use moment_core::moments::TileGeometry;

use super::load_config;

#[derive(Args)]
pub struct InfoArgs {
    /// Input SER file
    pub file: PathBuf,

    /// Pipeline config file (TOML) used to derive the working region
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let reader = SerReader::open(&args.file)?;
    let info = reader.source_info(&args.file);
    let config = load_config(args.config.as_deref())?;

    println!("File:        {}", info.filename.display());
    println!("Frames:      {}", info.total_frames);
    println!("Dimensions:  {}x{}", info.width, info.height);
    println!("Bit depth:   {}", info.bit_depth);
    println!("Format:      {}", info.pixel_format);

    if let Some(ref obs) = info.observer {
        println!("Observer:    {}", obs);
    }
    if let Some(ref inst) = info.instrument {
        println!("Instrument:  {}", inst);
    }

    let frame_bytes = reader.header.frame_byte_size();
    let total_mb = (frame_bytes * info.total_frames) as f64 / (1024.0 * 1024.0);
    println!("Data size:   {:.1} MB", total_mb);

    let (w, h) = config.orientation.oriented_dims(info.width, info.height);
    println!();
    println!("Orientation: {} ({}x{})", config.orientation, w, h);
    match config.resolve_region(w, h) {
        Ok(region) => {
            println!("Region:      {}", region);
            // Tile height depends on the device; report the CPU layout.
            let geometry = TileGeometry::new(
                config.tile_width,
                CPU_MAX_GROUP_INVOCATIONS,
                region.width,
                region.height,
            )?;
            println!("Tiles (CPU): {}", geometry);
        }
        Err(e) => println!("Region:      unavailable ({e})"),
    }
    println!(
        "Morphology:  radius {} ({} at {} lines)",
        config.morphology_radius(w, h),
        config.binarize.morphology_radius,
        REFERENCE_FRAME_HEIGHT
    );

    Ok(())
}
