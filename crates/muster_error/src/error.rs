//! Top-level error wrapper types.

use crate::{ConfigError, DatabaseError, FlushError, RepositoryError};

/// Error conditions surfaced by Muster crates.
///
/// # Examples
///
/// ```
/// use muster_error::{MusterError, ConfigError};
///
/// let err: MusterError = ConfigError::invalid("database.pool_size", "must be at least 1").into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum MusterErrorKind {
    /// Backing store error
    #[from(DatabaseError)]
    Database(DatabaseError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Row model error
    #[from(RepositoryError)]
    Repository(RepositoryError),
    /// Flush error
    #[from(FlushError)]
    Flush(FlushError),
}

/// Muster error with kind discrimination.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Muster Error: {}", _0)]
pub struct MusterError(Box<MusterErrorKind>);

impl MusterError {
    /// Create a new error from a kind.
    pub fn new(kind: MusterErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &MusterErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to MusterErrorKind
impl<T> From<T> for MusterError
where
    T: Into<MusterErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Muster operations.
pub type MusterResult<T> = std::result::Result<T, MusterError>;
