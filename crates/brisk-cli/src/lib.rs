//! # Brisk CLI
//!
//! Headless runner for the Brisk physics engine.
//!
//! ## Commands
//! - `simulate` - Run a scenario at a fixed tick and report the outcome
//! - `config` - Print the default simulation configuration as JSON

pub mod scenarios;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

pub use scenarios::{Scenario, ScenarioReport, SimulationConfig};

/// Brisk physics CLI
#[derive(Parser)]
#[command(name = "brisk")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Simulation configuration (JSON). Missing fields use defaults.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run a scenario
    Simulate {
        /// Scenario to run
        #[arg(value_enum)]
        scenario: Scenario,

        /// Number of fixed ticks to simulate
        #[arg(short, long, default_value = "300")]
        ticks: u64,

        /// Frame rate feeding the fixed-step clock
        #[arg(long, default_value = "60")]
        fps: f64,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default configuration
    Config,
}

/// Read a simulation config, or the defaults when no path is given
pub fn load_config(path: Option<&Path>) -> Result<SimulationConfig> {
    let Some(path) = path else {
        return Ok(SimulationConfig::default());
    };

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse config {}", path.display()))?;
    log::debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Execute the CLI command
pub fn execute(cli: Cli) -> Result<()> {
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Simulate { scenario, ticks, fps, json } => {
            let report = scenarios::run(scenario, &config, ticks, fps)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                log::info!("{:?} finished after {} ticks", report.scenario, report.ticks);
                for event in &report.events {
                    log::info!("  {}", event);
                }
                for body in &report.bodies {
                    log::info!(
                        "  {} at {} moving {}",
                        body.name,
                        body.position,
                        body.velocity
                    );
                }
            }
        }

        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
