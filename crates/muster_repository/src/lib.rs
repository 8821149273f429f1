//! Authoritative in-memory row model for Muster.
//!
//! [`Repository`] owns every row while the process runs; the backing store is
//! a mirror kept up to date by the flush controller. Mutators record the tables
//! they touch as dirty hints, and maintain two secondary indexes:
//!
//! - [`VoteIndex`]: ballot natural key to row id, for O(1) toggles
//! - [`CacheIndex`]: cache keys by category, by category and scope, and by
//!   category, scope and item
//!
//! # Example
//!
//! ```
//! use muster_models::{OptionKind, Table};
//! use muster_repository::{NewRaid, Repository, VoteToggle};
//!
//! let mut repo = Repository::new();
//! let raid = repo.create_raid(NewRaid {
//!     guild_id: 1,
//!     channel_id: 10,
//!     creator_id: 20,
//!     dungeon: "Nanos".into(),
//!     min_players: 4,
//! });
//! repo.add_raid_options(raid.id, ["12.03.2026"], ["20:00"]);
//!
//! let added = repo.toggle_vote(raid.id, OptionKind::Day, "12.03.2026", 42);
//! assert!(matches!(added, VoteToggle::Added(_)));
//! assert!(repo.take_dirty().contains(&Table::RaidVotes));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod cascade;
mod counters;
mod guilds;
mod indexes;
mod members;
mod raids;
mod repository;

pub use cache::CacheFilter;
pub use cascade::{CascadeSummary, PurgeSummary};
pub use counters::IdCounters;
pub use guilds::ChannelConfig;
pub use indexes::{CacheIndex, VoteIndex, VoteKey};
pub use raids::{NewRaid, VoteCounts, VoteToggle, VoteUsers};
pub use repository::{DirectRow, Repository, SharedRepository};
