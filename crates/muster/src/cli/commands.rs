//! CLI command definitions.

use clap::{Parser, Subcommand};
use muster::StoreBackend;
use std::path::PathBuf;

/// Keep a PostgreSQL mirror of the Muster row model up to date
#[derive(Parser, Debug)]
#[command(name = "muster-sync")]
#[command(about = "Keep a PostgreSQL mirror of the Muster row model up to date", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file layered above the discovered ones
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Database URL
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    pub database_url: Option<String>,

    /// Backing store, overriding the configuration
    #[arg(long, value_enum, global = true)]
    pub backend: Option<StoreBackend>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load the row model and flush dirty tables until interrupted
    Run,

    /// Load the row model and print per-table row counts and fingerprints
    Check,
}
