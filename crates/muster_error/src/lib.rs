//! Error types for the Muster persistence engine.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use muster_error::{ConfigError, MusterResult};
//!
//! fn read_settings() -> MusterResult<String> {
//!     Err(ConfigError::invalid("flush.interval_secs", "must be at least 1"))?
//! }
//!
//! assert!(read_settings().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod database;
mod error;
mod flush;
mod repository;

pub use config::{ConfigError, ConfigErrorKind};
pub use database::{DatabaseError, DatabaseErrorKind};
pub use error::{MusterError, MusterErrorKind, MusterResult};
pub use flush::{FlushError, FlushErrorKind};
pub use repository::{RepositoryError, RepositoryErrorKind};
