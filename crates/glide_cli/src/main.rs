//! Glide CLI
//!
//! Run frame-ticked interpolations against a simulated host loop.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod sim;

use config::{GlideConfig, LerpEntry, SimulationConfig};
use sim::Report;

#[derive(Parser)]
#[command(name = "glide")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Frame-ticked interpolation simulator", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every interpolation in a config file
    Run {
        /// Config file or directory containing glide.toml
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Print only the final state of each interpolation
        #[arg(short, long)]
        quiet: bool,
    },

    /// Run a single interpolation given on the command line
    Lerp {
        /// Start value
        #[arg(long, allow_hyphen_values = true)]
        from: f64,

        /// Target value
        #[arg(long, allow_hyphen_values = true)]
        to: f64,

        /// Duration in seconds
        #[arg(long)]
        duration: f64,

        /// Frame delta in seconds
        #[arg(long, default_value = "0.016666666666666666")]
        step: f64,

        /// Completion threshold (0 for exact match)
        #[arg(long)]
        threshold: Option<f64>,

        /// Cancel after this many ticks
        #[arg(long)]
        max_ticks: Option<u32>,

        /// Stop the simulation after this many ticks
        #[arg(long, default_value = "10000")]
        tick_budget: u32,
    },

    /// Write a sample glide.toml into a directory
    Init {
        /// Target directory
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate a config file
    Check {
        /// Config file or directory containing glide.toml
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Run { path, quiet } => cmd_run(&path, quiet),

        Commands::Lerp {
            from,
            to,
            duration,
            step,
            threshold,
            max_ticks,
            tick_budget,
        } => {
            let config = GlideConfig {
                simulation: SimulationConfig { step, tick_budget },
                lerp: vec![LerpEntry {
                    name: "lerp".to_string(),
                    from,
                    to,
                    duration,
                    threshold,
                    max_ticks,
                    owner: None,
                }],
                ..GlideConfig::default()
            };
            config.validate()?;
            print_report(&sim::simulate(&config)?, false);
            Ok(())
        }

        Commands::Init { path } => cmd_init(&path),

        Commands::Check { path } => cmd_check(&path),
    }
}

fn cmd_run(path: &Path, quiet: bool) -> Result<()> {
    let config = GlideConfig::load(path)?;

    info!(
        "Running {} interpolation(s) at {}s per tick",
        config.lerp.len(),
        config.simulation.step
    );

    let report = sim::simulate(&config)?;
    print_report(&report, quiet);
    Ok(())
}

fn cmd_init(path: &Path) -> Result<()> {
    let config_path = path.join(config::CONFIG_FILE);
    if config_path.exists() {
        anyhow::bail!("{} already exists", config_path.display());
    }

    fs::create_dir_all(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    fs::write(&config_path, GlideConfig::sample().to_toml()?)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    info!("Created {}", config_path.display());
    Ok(())
}

fn cmd_check(path: &Path) -> Result<()> {
    let config = GlideConfig::load(path)?;
    info!(
        "Config OK: {} interpolation(s), {} owner release(s), default threshold {}",
        config.lerp.len(),
        config.release.len(),
        config.scheduler.default_threshold
    );
    Ok(())
}

fn print_report(report: &Report, quiet: bool) {
    if !quiet {
        for sample in &report.samples {
            println!("{:>6}  {:<16} {}", sample.tick, sample.name, sample.value);
        }
    }

    for outcome in &report.outcomes {
        println!("{:<16} {:?}", outcome.name, outcome.state);
    }
    info!("Finished after {} tick(s)", report.ticks);
}
