//! muster-sync binary.
//!
//! - `run`: load the row model and keep the store in step until interrupted
//! - `check`: load the row model and print row counts and fingerprints

use clap::Parser;
use muster::{MusterConfig, init_tracing};

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, Commands, check, run};

    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = MusterConfig::load(cli.config.as_deref())?
        .with_overrides(cli.database_url, cli.backend);
    init_tracing(config.logging())?;

    match cli.command {
        Commands::Run => run(config).await?,
        Commands::Check => check(config).await?,
    }

    Ok(())
}
