//! Tracing subscriber setup.

use crate::LoggingConfig;
use muster_error::{ConfigError, ConfigErrorKind, MusterResult};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Fails if the level
/// is not a valid filter directive or a subscriber is already installed.
pub fn init_tracing(logging: &LoggingConfig) -> MusterResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(logging.level()).map_err(|e| {
            ConfigError::new(ConfigErrorKind::Logging(format!(
                "invalid level '{}': {}",
                logging.level(),
                e
            )))
        })?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true);

    let installed = if *logging.json() {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| ConfigError::new(ConfigErrorKind::Logging(e.to_string())))?;
    Ok(())
}
