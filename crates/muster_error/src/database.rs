//! Database error types.

/// Database error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum DatabaseErrorKind {
    /// Connection failed or was dropped mid-transaction
    #[display("Database connection error: {}", _0)]
    Connection(String),
    /// Pool checkout or statement timed out
    #[display("Database timeout: {}", _0)]
    Timeout(String),
    /// Serialization failure or deadlock; the transaction was rolled back
    #[display("Database conflict: {}", _0)]
    Conflict(String),
    /// Query execution failed
    #[display("Database query error: {}", _0)]
    Query(String),
    /// Row could not be converted to or from its record type
    #[display("Serialization error: {}", _0)]
    Serialization(String),
    /// Record not found
    #[display("Record not found")]
    NotFound,
    /// Table not found
    #[display("Table '{}' not found in database", _0)]
    TableNotFound(String),
    /// Blocking database task panicked or was cancelled
    #[display("Database task failed: {}", _0)]
    TaskJoin(String),
}

impl DatabaseErrorKind {
    /// Whether retrying the whole transaction may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Timeout(_) | Self::Conflict(_)
        )
    }
}

/// Database error with source location tracking.
///
/// # Examples
///
/// ```
/// use muster_error::{DatabaseError, DatabaseErrorKind};
///
/// let err = DatabaseError::new(DatabaseErrorKind::Timeout("pool".into()));
/// assert!(err.is_transient());
/// assert!(format!("{}", err).contains("timeout"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Database Error: {} at line {} in {}", kind, line, file)]
pub struct DatabaseError {
    /// The kind of error that occurred
    pub kind: DatabaseErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl DatabaseError {
    /// Create a new DatabaseError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: DatabaseErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Whether retrying the whole transaction may succeed.
    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

// Diesel error conversions (only available with database feature)
#[cfg(feature = "database")]
impl From<diesel::result::Error> for DatabaseError {
    #[track_caller]
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind as Dk, Error};

        let kind = match &err {
            Error::NotFound => DatabaseErrorKind::NotFound,
            Error::DatabaseError(Dk::ClosedConnection, _) => {
                DatabaseErrorKind::Connection(err.to_string())
            }
            Error::DatabaseError(Dk::SerializationFailure, _) => {
                DatabaseErrorKind::Conflict(err.to_string())
            }
            // Postgres reports deadlocks (40P01) without a dedicated diesel kind
            Error::DatabaseError(_, info) if info.message().contains("deadlock") => {
                DatabaseErrorKind::Conflict(err.to_string())
            }
            Error::BrokenTransactionManager => DatabaseErrorKind::Connection(err.to_string()),
            Error::DeserializationError(_) | Error::SerializationError(_) => {
                DatabaseErrorKind::Serialization(err.to_string())
            }
            _ => DatabaseErrorKind::Query(err.to_string()),
        };
        DatabaseError::new(kind)
    }
}

#[cfg(feature = "database")]
impl From<diesel::ConnectionError> for DatabaseError {
    #[track_caller]
    fn from(err: diesel::ConnectionError) -> Self {
        DatabaseError::new(DatabaseErrorKind::Connection(err.to_string()))
    }
}

#[cfg(feature = "database")]
impl From<diesel::r2d2::PoolError> for DatabaseError {
    #[track_caller]
    fn from(err: diesel::r2d2::PoolError) -> Self {
        DatabaseError::new(DatabaseErrorKind::Timeout(err.to_string()))
    }
}
