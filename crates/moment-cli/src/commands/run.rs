use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use moment_core::binarize::quantize_threshold;
use moment_core::compute::create_backend;
use moment_core::consts::{DEFAULT_FEED_CAPACITY, DEFAULT_REPLAY_FPS};
use moment_core::io::ser::SerReader;
use moment_core::pipeline::{
    frame_channel, spawn_pipeline_worker, FramePipeline, Offer, ThresholdHandle,
};

use crate::summary::{print_run_header, print_run_summary, RunReport, RunStats};

use super::{load_config, DeviceArg, OrientationArg};

#[derive(Args)]
pub struct RunArgs {
    /// Input SER file
    pub file: PathBuf,

    /// Pipeline config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Binarization threshold (0.0-1.0), overrides the config
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Replay rate in frames per second (0 = as fast as possible)
    #[arg(long, default_value_t = DEFAULT_REPLAY_FPS)]
    pub fps: f32,

    /// Compute device, overrides the config
    #[arg(long, value_enum)]
    pub device: Option<DeviceArg>,

    /// Frame orientation, overrides the config
    #[arg(long, value_enum)]
    pub orientation: Option<OrientationArg>,

    /// Frames buffered between capture and the pipeline
    #[arg(long, default_value_t = DEFAULT_FEED_CAPACITY)]
    pub queue: usize,

    /// Print every centroid as it is produced
    #[arg(long)]
    pub print: bool,
}

pub fn run(args: &RunArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(device) = args.device {
        config.device = device.into();
    }
    if let Some(orientation) = args.orientation {
        config.orientation = orientation.into();
    }
    // Replay has no viewer for the debug image.
    config.composite = false;
    let threshold = quantize_threshold(args.threshold.unwrap_or(config.binarize.threshold));

    let reader = SerReader::open(&args.file)
        .with_context(|| format!("Failed to open {}", args.file.display()))?;
    let info = reader.source_info(&args.file);

    let backend = create_backend(&config.device).context("No compute device available")?;
    let pipeline = Arc::new(FramePipeline::new(config, backend)?);
    print_run_header(&info, &pipeline, threshold, args.fps);

    let (sender, receiver) = frame_channel(args.queue);
    let (results_tx, results_rx) = mpsc::channel();
    let worker = spawn_pipeline_worker(
        Arc::clone(&pipeline),
        receiver,
        ThresholdHandle::new(threshold),
        results_tx,
    )
    .context("Failed to start pipeline worker")?;

    let pb = ProgressBar::new(info.total_frames as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg:12} [{bar:40}] {pos}/{len} frames")?
            .progress_chars("=> "),
    );
    pb.set_message("Replaying");

    let consumer = {
        let pb = pb.clone();
        let print = args.print;
        thread::spawn(move || {
            let mut stats = RunStats::default();
            for result in results_rx {
                if print {
                    let line = match (result.centroid, &result.failure) {
                        (Some(c), _) => format!("frame {:>6}  centroid {}", result.frame_index, c),
                        (None, Some(f)) => format!("frame {:>6}  failed: {}", result.frame_index, f),
                        (None, None) => format!("frame {:>6}  no target", result.frame_index),
                    };
                    pb.println(line);
                }
                stats.record(&result);
            }
            stats
        })
    };

    let interval = (args.fps > 0.0).then(|| Duration::from_secs_f32(1.0 / args.fps));
    let start = Instant::now();
    for (i, frame) in reader.frames().enumerate() {
        let frame = frame.with_context(|| format!("Failed to read frame {i}"))?;
        if let Some(interval) = interval {
            let due = start + interval.mul_f64(i as f64);
            if let Some(wait) = due.checked_duration_since(Instant::now()) {
                thread::sleep(wait);
            }
        }
        if sender.offer(frame) == Offer::Closed {
            break;
        }
        pb.inc(1);
    }
    let elapsed = start.elapsed();
    let feed = sender.stats();
    drop(sender);

    let worker = worker
        .join()
        .map_err(|_| anyhow!("Pipeline worker panicked"))?;
    let stats = consumer
        .join()
        .map_err(|_| anyhow!("Result consumer panicked"))?;
    pb.finish_with_message("Done");

    print_run_summary(&RunReport {
        frames_read: info.total_frames,
        elapsed,
        feed,
        worker,
        stats,
    });

    Ok(())
}
