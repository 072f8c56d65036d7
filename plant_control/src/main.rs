//! # Plant Control Binary
//!
//! Runs the sorting and storage cell: loads `plant.toml`, builds the I/O
//! driver, seeds the warehouse and scans the cell until interrupted.
//!
//! # Usage
//!
//! ```bash
//! # Simulation driver, default config path
//! plant_control
//!
//! # Explicit config, debug logs as JSON
//! plant_control --config config/plant.toml -v --json
//! ```

#![deny(warnings)]

use clap::Parser;
use plant::config::{ConfigLoader, LogLevel};
use plant_control::{Plant, PlantConfig};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

/// Plant Control - sequencing of the sorting and storage cell
#[derive(Parser, Debug)]
#[command(name = "plant_control")]
#[command(version)]
#[command(about = "Sequencing and dispatch for the sorting and storage cell")]
#[command(long_about = None)]
struct Args {
    /// Path to the plant configuration file
    #[arg(short, long, default_value = "config/plant.toml")]
    config: PathBuf,

    /// I/O driver to use
    #[arg(short, long, default_value = "simulation")]
    driver: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    let config = match load_config(&args.config) {
        Ok(config) => config,
        Err(e) => {
            setup_tracing(&args, LogLevel::default());
            error!("FATAL: {}", e);
            std::process::exit(1);
        }
    };
    setup_tracing(&args, config.shared.log_level);

    if let Err(e) = run(&args, &config) {
        error!("FATAL: {}", e);
        std::process::exit(1);
    }
}

fn load_config(path: &Path) -> Result<PlantConfig, plant::config::ConfigError> {
    let config = PlantConfig::load(path)?;
    config.validate()?;
    Ok(config)
}

fn run(args: &Args, config: &PlantConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        "Plant control v{} starting ({})",
        env!("CARGO_PKG_VERSION"),
        config.shared.service_name
    );

    let plant = Plant::from_config(config, &args.driver)?;
    let mut scan = plant.scan_loop(config);

    let running = scan.running_flag();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        running.store(false, Ordering::SeqCst);
    })?;

    plant.run(&mut scan)?;

    let stats = scan.stats();
    info!(
        cycles = stats.cycle_count,
        violations = stats.timing_violations,
        max_us = stats.max_cycle_time_us,
        "Plant control shutdown complete"
    );
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments and the configured level.
fn setup_tracing(args: &Args, configured: LogLevel) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        configured.as_directive().parse().unwrap_or(Level::INFO)
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
