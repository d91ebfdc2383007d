use std::time::Duration;

use console::Style;
use moment_core::consts::REFERENCE_FRAME_HEIGHT;
use moment_core::frame::SourceInfo;
use moment_core::moments::Centroid;
use moment_core::pipeline::{FeedStats, FramePipeline, PipelineResult, WorkerSummary};

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

/// Per-result totals gathered while replaying.
#[derive(Default)]
pub struct RunStats {
    pub results: usize,
    pub detections: usize,
    pub failures: usize,
    pub latency_total: Duration,
    pub last_centroid: Option<(usize, Centroid)>,
    pub first_failure: Option<String>,
}

impl RunStats {
    pub fn record(&mut self, result: &PipelineResult) {
        self.results += 1;
        self.latency_total += result.timings.total();
        if let Some(c) = result.centroid {
            self.detections += 1;
            self.last_centroid = Some((result.frame_index, c));
        }
        if let Some(ref failure) = result.failure {
            self.failures += 1;
            self.first_failure
                .get_or_insert_with(|| format!("frame {}: {}", result.frame_index, failure));
        }
    }

    fn mean_latency(&self) -> Option<Duration> {
        (self.results > 0).then(|| self.latency_total / self.results as u32)
    }
}

pub struct RunReport {
    pub frames_read: usize,
    pub elapsed: Duration,
    pub feed: FeedStats,
    pub worker: WorkerSummary,
    pub stats: RunStats,
}

pub fn print_run_header(info: &SourceInfo, pipeline: &FramePipeline, threshold: f32, fps: f32) {
    let s = Styles::new();
    let config = pipeline.config();
    let reducer = pipeline.reducer();

    println!();
    println!("  {}", s.title.apply_to("Moment Replay"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(13)));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Input"),
        s.path.apply_to(info.filename.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Source"),
        s.value.apply_to(format!(
            "{}x{} {}, {} frames",
            info.width, info.height, info.pixel_format, info.total_frames
        ))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Device"),
        s.method.apply_to(reducer.backend().name())
    );
    if !reducer.is_runnable() {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Reducer"),
            s.disabled.apply_to("unavailable (no subgroup support)")
        );
    }
    println!();

    println!("  {}", s.header.apply_to("Binarize"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Threshold"),
        s.value.apply_to(format!("{threshold:.1}"))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Morphology"),
        s.method.apply_to(format!(
            "{} r={} @ {} lines",
            config.binarize.morphology_order, config.binarize.morphology_radius, REFERENCE_FRAME_HEIGHT
        ))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Orientation"),
        s.value.apply_to(config.orientation)
    );
    println!();

    println!("  {}", s.header.apply_to("Replay"));
    if fps > 0.0 {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Rate"),
            s.value.apply_to(format!("{fps:.1} fps"))
        );
    } else {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Rate"),
            s.disabled.apply_to("unthrottled")
        );
    }
    println!();
}

pub fn print_run_summary(report: &RunReport) {
    let s = Styles::new();
    let stats = &report.stats;

    println!();
    println!("  {}", s.header.apply_to("Summary"));
    let rows = [
        ("Read", report.frames_read),
        ("Processed", report.worker.processed),
        ("Skipped", report.worker.skipped),
        ("Dropped", report.feed.dropped),
        ("Superseded", report.feed.superseded),
        ("Detections", stats.detections),
        ("Failures", stats.failures),
    ];
    for (label, count) in rows {
        println!(
            "    {:<12}{}",
            s.label.apply_to(label),
            s.value.apply_to(count)
        );
    }
    println!(
        "    {:<12}{}",
        s.label.apply_to("Elapsed"),
        s.value.apply_to(format!("{:.2}s", report.elapsed.as_secs_f64()))
    );
    if let Some(latency) = stats.mean_latency() {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Latency"),
            s.value.apply_to(format!("{:.2} ms/frame", latency.as_secs_f64() * 1e3))
        );
    }
    if let Some((frame, c)) = stats.last_centroid {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Last"),
            s.method.apply_to(format!("{c} at frame {frame}"))
        );
    }
    if let Some(ref failure) = stats.first_failure {
        println!(
            "    {:<12}{}",
            s.label.apply_to("First error"),
            s.disabled.apply_to(failure)
        );
    }
    println!();
}

pub fn print_frame_result(result: &PipelineResult, device_name: &str, threshold: f32) {
    let s = Styles::new();

    println!();
    println!(
        "  {:<14}{}",
        s.label.apply_to("Device"),
        s.method.apply_to(device_name)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Threshold"),
        s.value.apply_to(format!("{threshold:.1}"))
    );
    match result.region {
        Some(region) => println!(
            "  {:<14}{}",
            s.label.apply_to("Region"),
            s.value.apply_to(region)
        ),
        None => println!(
            "  {:<14}{}",
            s.label.apply_to("Region"),
            s.disabled.apply_to("unavailable")
        ),
    }
    if let Some(m) = result.moments {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Moments"),
            s.value
                .apply_to(format!("m00={} m10={} m01={}", m.m00, m.m10, m.m01))
        );
    }
    match (result.centroid, result.frame_centroid()) {
        (Some(c), Some(f)) => {
            println!(
                "  {:<14}{}",
                s.label.apply_to("Centroid"),
                s.method.apply_to(c)
            );
            println!(
                "  {:<14}{}",
                s.label.apply_to("In frame"),
                s.value.apply_to(f)
            );
        }
        _ => println!(
            "  {:<14}{}",
            s.label.apply_to("Centroid"),
            s.disabled.apply_to("none")
        ),
    }
    if let Some(ref failure) = result.failure {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Failure"),
            s.disabled.apply_to(failure)
        );
    }
    println!(
        "  {:<14}{}",
        s.label.apply_to("Time"),
        s.value.apply_to(format!(
            "{:.2} ms",
            result.timings.total().as_secs_f64() * 1e3
        ))
    );
    println!();
}
