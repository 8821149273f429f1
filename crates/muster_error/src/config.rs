//! Configuration error types.

/// What went wrong while assembling the runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum ConfigErrorKind {
    /// A source could not be read or did not deserialize
    #[display("Failed to load configuration: {}", _0)]
    Load(String),
    /// A setting is outside the range the engine can run with
    #[display("Invalid setting {}: {}", key, reason)]
    Invalid {
        /// Dotted path of the setting, e.g. `flush.interval_secs`
        key: String,
        /// Why the value was rejected
        reason: String,
    },
    /// The database URL is neither configured nor in the environment
    #[display("No database URL: set database.url or DATABASE_URL")]
    MissingDatabaseUrl,
    /// Log filter or subscriber setup failed
    #[display("Logging setup failed: {}", _0)]
    Logging(String),
}

/// Configuration error with source location.
///
/// ```
/// use muster_error::{ConfigError, ConfigErrorKind};
///
/// let err = ConfigError::invalid("database.pool_size", "must be at least 1");
/// assert!(matches!(err.kind, ConfigErrorKind::Invalid { .. }));
/// assert!(err.to_string().contains("database.pool_size"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Configuration Error: {} at line {} in {}", kind, line, file)]
pub struct ConfigError {
    /// The kind of error that occurred
    pub kind: ConfigErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl ConfigError {
    /// Create a new ConfigError at the current location.
    #[track_caller]
    pub fn new(kind: ConfigErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// A setting rejected during validation.
    #[track_caller]
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::Invalid {
            key: key.into(),
            reason: reason.into(),
        })
    }
}
