//! Flush controller for the Muster row model.
//!
//! The in-memory [`Repository`](muster_repository::Repository) is the source
//! of truth while the process runs. [`FlushController`] mirrors it into a
//! [`BackingStore`](muster_database::BackingStore):
//!
//! 1. resolve candidate tables from dirty hints, widening to every table on
//!    each self-heal flush
//! 2. skip tables whose fingerprint matches the persisted baseline
//! 3. diff the rest against the baseline into cell-level deltas
//! 4. apply everything in one transaction, retrying transient failures
//! 5. on success, adopt the new rows and fingerprints as the baseline
//!
//! # Example
//!
//! ```
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! use muster_database::MemoryStore;
//! use muster_persistence::{FlushController, PersistenceConfig};
//! use muster_repository::Repository;
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::new());
//! let controller = FlushController::new(store.clone(), PersistenceConfig::default());
//! let repo = Repository::new().into_shared();
//! controller.load(&repo).await.unwrap();
//!
//! repo.lock().ensure_settings(7, Some("Guild"));
//! let report = controller.flush_dirty(&repo).await.unwrap();
//! assert_eq!(*report.statements(), 1);
//! assert_eq!(store.tables().settings.len(), 1);
//! # });
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod controller;
mod retry;

pub use config::{PersistenceConfig, PersistenceConfigBuilder};
pub use controller::{FlushController, FlushReport, FlushScope};
pub use retry::Backoff;
