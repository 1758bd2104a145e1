//! PoortLink CLI - Command-line interface
//!
//! Thin consumer of the `poortlink` library: configuration management, zone
//! discovery against the configured zone file, and a simulated queue session.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::CliError;

#[derive(Parser)]
#[command(name = "poortlink")]
#[command(version, about = "GPS-verified taxi queues for loading zones", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.poortlink/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Show the effective configuration
    Config,

    /// List active zones near a position, nearest first
    Zones {
        /// Latitude in decimal degrees
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        /// Longitude in decimal degrees
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        /// Search radius in meters (default: discovery_radius_m from config)
        #[arg(long)]
        radius: Option<f64>,
    },

    /// Run a simulated queue session against a zone
    Simulate {
        /// Zone identifier from the zone file
        #[arg(long)]
        zone: String,

        /// Number of simulated drivers (at least 2)
        #[arg(long, default_value = "2")]
        drivers: usize,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli
        .config
        .unwrap_or_else(poortlink::config::config_file_path);

    match cli.command {
        Commands::Init { force } => commands::init::run(&config_path, force),
        Commands::Config => commands::config::run(&config_path),
        Commands::Zones { lat, lon, radius } => {
            commands::zones::run(&config_path, commands::zones::ZonesArgs { lat, lon, radius })
        }
        Commands::Simulate { zone, drivers } => {
            commands::simulate::run(&config_path, commands::simulate::SimulateArgs { zone, drivers })
        }
    }
}
