//! CLI interface and argument parsing
//!
//! This module provides the administrative command-line interface for Dmed
//! using clap. HTTP serving lives in a separate boundary layer; the CLI
//! covers configuration management and the admin operations (location
//! import, registry status).

pub mod commands;

use clap::{Parser, Subcommand};

/// Dmed - Clinical Registry Backend
#[derive(Parser, Debug)]
#[command(name = "dmed")]
#[command(version, about, long_about = None)]
#[command(author = "Dmed Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "dmed.toml", env = "DMED_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "DMED_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new configuration file
    Init(commands::init::InitArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Import the region/city hierarchy from a JSON file (full replace)
    ImportLocations(commands::import_locations::ImportLocationsArgs),

    /// Show registry row counts
    Status(commands::status::StatusArgs),
}
