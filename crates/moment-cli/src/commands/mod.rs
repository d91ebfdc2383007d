pub mod config;
pub mod frame;
pub mod info;
pub mod probe;
pub mod run;

use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use moment_core::compute::DevicePreference;
use moment_core::frame::Orientation;
use moment_core::pipeline::PipelineConfig;

#[derive(Clone, Copy, ValueEnum)]
pub enum DeviceArg {
    Auto,
    Cpu,
    Gpu,
}

impl From<DeviceArg> for DevicePreference {
    fn from(arg: DeviceArg) -> Self {
        match arg {
            DeviceArg::Auto => DevicePreference::Auto,
            DeviceArg::Cpu => DevicePreference::Cpu,
            DeviceArg::Gpu => DevicePreference::Gpu,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OrientationArg {
    Up,
    Right,
    Down,
    Left,
}

impl From<OrientationArg> for Orientation {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Up => Orientation::Up,
            OrientationArg::Right => Orientation::Right,
            OrientationArg::Down => Orientation::Down,
            OrientationArg::Left => Orientation::Left,
        }
    }
}

/// Load a TOML pipeline config, or the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let Some(path) = path else {
        return Ok(PipelineConfig::default());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: PipelineConfig = toml::from_str(&contents).context("Invalid pipeline config")?;
    config
        .validate()
        .with_context(|| format!("Invalid pipeline config {}", path.display()))?;
    Ok(config)
}
