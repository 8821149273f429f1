//! Command-line interface for the muster-sync binary.

mod commands;
mod run;

pub use commands::{Cli, Commands};
pub use run::{check, run};
