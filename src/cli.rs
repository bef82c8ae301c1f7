//! Command-line surface: thin, not the core's main concern, but still
//! the process entry point.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "nodepassdash-core")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the system and run the ingestion pipeline until shutdown.
    Run,
    /// Print endpoint/connection counts from the configured database.
    Status,
    /// Apply embedded Diesel migrations and exit.
    Migrate,
    /// Insert the `[[endpoints]]` entries from the config file, skipping
    /// any id already present. Bootstrap/integration-test convenience
    /// only: production endpoints come from the external management API,
    /// not this CLI.
    Seed,
}
