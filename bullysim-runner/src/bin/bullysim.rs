//! Command-line entry point for the bully election simulator.
//!
//! Loads a JSON configuration (missing or malformed files fall back to
//! defaults with a warning), runs the simulation, and writes the three
//! NDJSON streams. Exits non-zero only on fatal errors, i.e. an output
//! sink that cannot be opened.

use std::path::PathBuf;
use std::process;

use bullysim_core::SimConfig;
use bullysim_runner::Simulation;
use clap::Parser;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "bullysim")]
#[command(about = "Deterministic tick-synchronous simulator of the Bully election algorithm", long_about = None)]
struct Args {
    /// Path to the JSON configuration file
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Number of peers in the cluster
    #[arg(long, default_value = "5")]
    nodes: u32,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = SimConfig::load(&args.config);

    let result = Simulation::new(args.nodes, config).and_then(Simulation::run);
    if let Err(err) = result {
        eprintln!("bullysim: {err}");
        process::exit(1);
    }
}
