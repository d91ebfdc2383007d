mod commands;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "moment", about = "Real-time binary-image centroid tracker")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show SER file metadata and the derived working region
    Info(commands::info::InfoArgs),
    /// Report the compute device and its reduction capabilities
    Probe(commands::probe::ProbeArgs),
    /// Run the centroid pipeline on a single image
    Frame(commands::frame::FrameArgs),
    /// Replay a SER recording through the live pipeline
    Run(commands::run::RunArgs),
    /// Print or save the default pipeline configuration
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Info(args) => commands::info::run(args),
        Commands::Probe(args) => commands::probe::run(args),
        Commands::Frame(args) => commands::frame::run(args),
        Commands::Run(args) => commands::run::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
