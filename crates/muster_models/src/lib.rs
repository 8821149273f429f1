//! Row model types for Muster.
//!
//! This crate defines the typed records of every logical table, the diesel
//! schema they map onto, and the two pure engines the flush path relies on:
//!
//! - [`Fingerprint`]: order-independent digests for cheap change detection
//! - [`diff`]: minimal inserts, cell-level updates and deletes between snapshots
//!
//! # Example
//!
//! ```
//! use muster_models::{GuildSettingsRecord, Table, TableSet};
//!
//! let baseline = TableSet::default();
//! let mut live = baseline.clone();
//! live.insert(GuildSettingsRecord::new(1, Some("A".into())));
//!
//! assert_ne!(baseline.fingerprint(Table::Settings), live.fingerprint(Table::Settings));
//! let delta = baseline.diff(&live, Table::Settings);
//! assert_eq!(delta.row_counts(), (1, 0, 0));
//! ```

#![forbid(unsafe_code)]

/// Call a generic function with the record type of a [`Table`].
macro_rules! dispatch_table {
    ($table:expr, $func:ident ( $($arg:expr),* $(,)? )) => {
        match $table {
            $crate::Table::Settings => $func::<$crate::GuildSettingsRecord>($($arg),*),
            $crate::Table::Dungeons => $func::<$crate::DungeonRecord>($($arg),*),
            $crate::Table::Raids => $func::<$crate::RaidRecord>($($arg),*),
            $crate::Table::RaidOptions => $func::<$crate::RaidOptionRecord>($($arg),*),
            $crate::Table::RaidVotes => $func::<$crate::RaidVoteRecord>($($arg),*),
            $crate::Table::RaidPostedSlots => $func::<$crate::RaidPostedSlotRecord>($($arg),*),
            $crate::Table::RaidTemplates => $func::<$crate::RaidTemplateRecord>($($arg),*),
            $crate::Table::RaidAttendance => $func::<$crate::RaidAttendanceRecord>($($arg),*),
            $crate::Table::UserLevels => $func::<$crate::UserLevelRecord>($($arg),*),
            $crate::Table::DebugCache => $func::<$crate::DebugCacheRecord>($($arg),*),
        }
    };
}
pub(crate) use dispatch_table;

mod delta;
mod fingerprint;
mod records;
mod row;
pub mod schema;
mod table;
mod table_set;

pub use delta::{Delta, RowUpdate, StatementKind, StatementSummary, TableDelta, diff};
pub use fingerprint::{Fingerprint, Fingerprints, row_digest};
pub use records::{
    DebugCacheRecord, DungeonRecord, GuildSettingsRecord, RaidAttendanceRecord, RaidOptionRecord,
    RaidPostedSlotRecord, RaidRecord, RaidTemplateRecord, RaidVoteRecord, UserLevelRecord,
};
pub use row::{
    Changeset, DebugCacheChanges, DungeonChanges, GuildSettingsChanges, RaidAttendanceChanges,
    RaidChanges, RaidOptionChanges, RaidPostedSlotChanges, RaidTemplateChanges, RaidVoteChanges,
    Row, UserLevelChanges,
};
pub use table::{AttendanceStatus, OptionKind, RaidStatus, Table};
pub use table_set::TableSet;
