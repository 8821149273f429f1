//! Row model error types.

/// Row model error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum RepositoryErrorKind {
    /// Row referenced by a mutation does not exist
    #[display("No row in {} with key {}", table, key)]
    MissingRow {
        /// Logical table name
        table: String,
        /// Debug rendering of the primary key
        key: String,
    },
    /// A mutation tried to change a row's primary key in place
    #[display("Mutation of {} row {} changed its key to {}", table, key, new_key)]
    KeyChanged {
        /// Logical table name
        table: String,
        /// Debug rendering of the original key
        key: String,
        /// Debug rendering of the key after the mutation
        new_key: String,
    },
}

/// Row model error with location tracking.
///
/// # Examples
///
/// ```
/// use muster_error::{RepositoryError, RepositoryErrorKind};
///
/// let err = RepositoryError::new(RepositoryErrorKind::MissingRow {
///     table: "raids".into(),
///     key: "7".into(),
/// });
/// assert!(format!("{}", err).contains("raids"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Repository Error: {} at line {} in {}", kind, line, file)]
pub struct RepositoryError {
    /// The kind of error that occurred
    pub kind: RepositoryErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl RepositoryError {
    /// Create a new RepositoryError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: RepositoryErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Shorthand for a [`RepositoryErrorKind::MissingRow`] error.
    #[track_caller]
    pub fn missing(table: impl Into<String>, key: impl std::fmt::Debug) -> Self {
        Self::new(RepositoryErrorKind::MissingRow {
            table: table.into(),
            key: format!("{:?}", key),
        })
    }
}
