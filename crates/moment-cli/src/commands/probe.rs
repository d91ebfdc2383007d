use anyhow::{Context, Result};
use clap::Args;
use moment_core::compute::{create_backend, DevicePreference};
use moment_core::consts::DEFAULT_TILE_WIDTH;
use moment_core::moments::MomentReducer;

use super::DeviceArg;

#[derive(Args)]
pub struct ProbeArgs {
    /// Compute device to probe
    #[arg(long, value_enum, default_value = "auto")]
    pub device: DeviceArg,

    /// Reduction tile width
    #[arg(long, default_value_t = DEFAULT_TILE_WIDTH)]
    pub tile_width: u32,
}

pub fn run(args: &ProbeArgs) -> Result<()> {
    let preference = DevicePreference::from(args.device);
    let backend = create_backend(&preference)
        .with_context(|| format!("No compute device for preference {preference}"))?;
    let reducer = MomentReducer::new(backend, args.tile_width);
    let caps = reducer.capabilities();

    println!("Preference:       {}", preference);
    println!("Device:           {}", reducer.backend().name());
    println!("GPU:              {}", reducer.backend().is_gpu());
    println!("Subgroup reduce:  {}", caps.subgroup_reduce);
    println!("Max invocations:  {}", caps.max_group_invocations);
    if args.tile_width > 0 && caps.max_group_invocations >= args.tile_width {
        println!(
            "Tile size:        {}x{}",
            args.tile_width,
            caps.max_group_invocations / args.tile_width
        );
    }
    println!(
        "Runnable:         {}",
        if reducer.is_runnable() { "yes" } else { "no (degraded)" }
    );

    Ok(())
}
