//! Muster: an in-memory authoritative row model mirrored to PostgreSQL.
//!
//! Business logic mutates a [`Repository`] held in memory. A
//! [`FlushController`] periodically writes what changed to the backing store:
//! tables whose fingerprint is unchanged are skipped, the rest are diffed
//! against the last persisted snapshot into cell-level inserts, updates and
//! deletes, and everything is applied in one transaction with retry.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use muster::{Muster, MusterConfig, OptionKind};
//!
//! #[tokio::main]
//! async fn main() -> muster::MusterResult<()> {
//!     let config = MusterConfig::load(None)?;
//!     let muster = Muster::bootstrap(&config).await?;
//!
//!     muster.repository().lock().toggle_vote(1, OptionKind::Day, "12.03.2026", 42);
//!     muster.flush_dirty().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `muster_error` - Error types
//! - `muster_models` - Schema, records, deltas and fingerprints
//! - `muster_repository` - Row model, secondary indexes, cascade deletion
//! - `muster_database` - Backing stores (PostgreSQL, in-memory)
//! - `muster_persistence` - Flush controller
//!
//! This crate re-exports everything and adds configuration, tracing setup and
//! the process lifecycle used by the `muster-sync` binary.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod runtime;
mod telemetry;

pub use config::{
    DatabaseConfig, ENV_PREFIX, FlushConfig, LoggingConfig, MusterConfig, StoreBackend,
};
pub use runtime::{Muster, TableStatus, open_store};
pub use telemetry::init_tracing;

pub use muster_database::*;
pub use muster_error::*;
pub use muster_models::*;
pub use muster_persistence::*;
pub use muster_repository::*;
