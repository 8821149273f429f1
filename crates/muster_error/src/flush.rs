//! Flush error types.

use crate::DatabaseError;

/// Flush failure conditions.
#[derive(Debug, Clone, derive_more::Display)]
pub enum FlushErrorKind {
    /// Every attempt failed with a transient store error
    #[display("Flush failed after {} attempts: {}", attempts, last)]
    RetriesExhausted {
        /// Attempts made before giving up
        attempts: u32,
        /// The error from the final attempt
        last: DatabaseError,
    },
    /// The store rejected the flush with a non-retryable error
    #[display("Flush rejected by store: {}", _0)]
    Store(DatabaseError),
    /// Shutdown was signalled while the flush was pending
    #[display("Flush cancelled by shutdown after {} attempts", _0)]
    Cancelled(u32),
}

/// Flush error with location tracking.
///
/// A failed flush never discards in-memory state; the next flush diffs
/// against the same persisted baseline.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Flush Error: {} at line {} in {}", kind, line, file)]
pub struct FlushError {
    /// The kind of error that occurred
    pub kind: FlushErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl FlushError {
    /// Create a new FlushError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: FlushErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Whether the flush was abandoned because of shutdown.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind, FlushErrorKind::Cancelled(_))
    }
}
