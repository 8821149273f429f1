//! Backing stores for the Muster row model.
//!
//! A [`BackingStore`] loads every table at bootstrap and applies a
//! [`FlushPlan`] atomically. Two implementations ship:
//!
//! - [`PostgresStore`]: diesel over an r2d2 connection pool
//! - [`MemoryStore`]: in-process, with a statement log and failure injection

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod connection;
mod memory;
mod postgres;
mod store;

pub use connection::{PgPool, database_url_from_env, establish_pool};
pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use store::{BackingStore, DatabaseResult, FlushPlan};
