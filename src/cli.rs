//! Command-line interface definition using clap
//!
//! Provides structured argument parsing with automatic help generation.

use clap::Parser;
use std::path::PathBuf;

/// EnOcean to MQTT gateway
#[derive(Parser, Debug)]
#[command(name = "eno-bridge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    pub config: PathBuf,

    /// Serial port of the EnOcean adapter (overrides config)
    #[arg(long, value_name = "PORT")]
    pub port: Option<String>,

    /// Start with teach-in (learn) mode enabled
    #[arg(long)]
    pub learn: bool,

    /// Enable verbose debug output
    #[arg(short, long)]
    pub verbose: bool,
}

// =============================================================================
// Tests
// =============================================================================
