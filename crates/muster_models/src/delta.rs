//! Delta Computer: minimal insert/update/delete sets between two snapshots.

use crate::{
    Changeset, DebugCacheRecord, DungeonRecord, GuildSettingsRecord, RaidAttendanceRecord,
    RaidOptionRecord, RaidPostedSlotRecord, RaidRecord, RaidTemplateRecord, RaidVoteRecord, Row,
    Table, TableSet, UserLevelRecord,
};
use std::collections::BTreeMap;

/// Update of the changed columns of one row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowUpdate<R: Row> {
    /// Primary key of the updated row
    pub key: R::Key,
    /// Changed columns only
    pub changes: R::Changes,
}

/// Inserts, cell-level updates and deletes that turn one table snapshot into another.
///
/// Each list is sorted by primary key.
#[derive(Debug, Clone, PartialEq)]
pub struct Delta<R: Row> {
    /// Rows present only in the new snapshot
    pub inserts: Vec<R>,
    /// Rows present in both snapshots with at least one differing column
    pub updates: Vec<RowUpdate<R>>,
    /// Keys present only in the old snapshot
    pub deletes: Vec<R::Key>,
}

impl<R: Row> Default for Delta<R> {
    fn default() -> Self {
        Self {
            inserts: Vec::new(),
            updates: Vec::new(),
            deletes: Vec::new(),
        }
    }
}

/// Kind of statement a flush issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum StatementKind {
    /// Batched delete by primary key
    Delete,
    /// Batched multi-row insert
    Insert,
    /// Single-row update of changed columns
    Update,
}

/// One statement of a flush, described without values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementSummary {
    /// Target table
    pub table: Table,
    /// Statement kind
    pub kind: StatementKind,
    /// Rows touched
    pub rows: usize,
    /// Columns written; only populated for updates
    pub columns: Vec<&'static str>,
}

impl<R: Row> Delta<R> {
    /// Whether the snapshots were identical.
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }

    /// Statements needed to apply this delta with batches of at most `chunk_size` rows.
    pub fn statement_count(&self, chunk_size: usize) -> usize {
        let chunk_size = chunk_size.max(1);
        self.deletes.len().div_ceil(chunk_size)
            + self.inserts.len().div_ceil(chunk_size)
            + self.updates.len()
    }

    /// Describe the statements that apply this delta, deletes first.
    pub fn statements(&self, chunk_size: usize) -> Vec<StatementSummary> {
        let chunk_size = chunk_size.max(1);
        let batch = |kind, len: usize| {
            (0..len.div_ceil(chunk_size)).map(move |i| StatementSummary {
                table: R::TABLE,
                kind,
                rows: chunk_size.min(len - i * chunk_size),
                columns: Vec::new(),
            })
        };

        let mut statements: Vec<_> = batch(StatementKind::Delete, self.deletes.len()).collect();
        statements.extend(self.updates.iter().map(|update| StatementSummary {
            table: R::TABLE,
            kind: StatementKind::Update,
            rows: 1,
            columns: update.changes.columns(),
        }));
        statements.extend(batch(StatementKind::Insert, self.inserts.len()));
        statements
    }

    /// Apply this delta to a row map, as the backing store would.
    pub fn apply_to(&self, rows: &mut BTreeMap<R::Key, R>) {
        for key in &self.deletes {
            rows.remove(key);
        }
        for update in &self.updates {
            if let Some(row) = rows.get_mut(&update.key) {
                update.changes.apply_to(row);
            }
        }
        for row in &self.inserts {
            rows.insert(row.key(), row.clone());
        }
    }
}

/// Compute the delta from `old` to `new`.
///
/// Rows present in both maps produce an update only when a non-key column
/// differs, and the update carries just those columns.
///
/// # Examples
///
/// ```
/// use muster_models::{diff, DungeonRecord, Row};
/// use std::collections::BTreeMap;
///
/// let dungeon = DungeonRecord {
///     id: 1,
///     name: "Nanos".into(),
///     short_code: "nanos".into(),
///     is_active: true,
///     sort_order: 0,
/// };
/// let old = BTreeMap::from([(dungeon.key(), dungeon.clone())]);
/// let mut new = old.clone();
/// new.get_mut(&1).unwrap().is_active = false;
///
/// let delta = diff(&old, &new);
/// assert!(delta.inserts.is_empty() && delta.deletes.is_empty());
/// assert_eq!(delta.updates[0].changes.is_active, Some(false));
/// ```
pub fn diff<R: Row>(old: &BTreeMap<R::Key, R>, new: &BTreeMap<R::Key, R>) -> Delta<R> {
    let mut delta = Delta::default();

    for (key, row) in new {
        match old.get(key) {
            None => delta.inserts.push(row.clone()),
            Some(previous) if previous != row => {
                debug_assert_eq!(&row.key(), key, "row filed under a stale key");
                let changes = R::Changes::between(previous, row);
                if !changes.is_empty() {
                    delta.updates.push(RowUpdate {
                        key: key.clone(),
                        changes,
                    });
                }
            }
            Some(_) => {}
        }
    }

    delta.deletes = old
        .keys()
        .filter(|key| !new.contains_key(*key))
        .cloned()
        .collect();

    delta
}

/// Declares [`TableDelta`] with one variant per logical table.
macro_rules! table_deltas {
    ($($variant:ident => $record:ident),+ $(,)?) => {
        /// Delta of one logical table.
        #[derive(Debug, Clone, PartialEq)]
        pub enum TableDelta {
            $(
                #[doc = concat!("Delta of [`", stringify!($record), "`] rows")]
                $variant(Delta<$record>),
            )+
        }

        impl TableDelta {
            /// Logical table this delta targets.
            pub fn table(&self) -> Table {
                match self {
                    $(Self::$variant(_) => Table::$variant,)+
                }
            }

            /// Whether the delta holds no statements.
            pub fn is_empty(&self) -> bool {
                match self {
                    $(Self::$variant(delta) => delta.is_empty(),)+
                }
            }

            /// Rows inserted, updated and deleted, in that order.
            pub fn row_counts(&self) -> (usize, usize, usize) {
                match self {
                    $(Self::$variant(delta) => {
                        (delta.inserts.len(), delta.updates.len(), delta.deletes.len())
                    })+
                }
            }

            /// Statements needed with batches of at most `chunk_size` rows.
            pub fn statement_count(&self, chunk_size: usize) -> usize {
                match self {
                    $(Self::$variant(delta) => delta.statement_count(chunk_size),)+
                }
            }

            /// Describe the statements of this delta.
            pub fn statements(&self, chunk_size: usize) -> Vec<StatementSummary> {
                match self {
                    $(Self::$variant(delta) => delta.statements(chunk_size),)+
                }
            }

            /// Apply the delta to the matching table of a snapshot.
            pub fn apply_to(&self, set: &mut TableSet) {
                match self {
                    $(Self::$variant(delta) => delta.apply_to(<$record as Row>::rows_mut(set)),)+
                }
            }
        }

        $(
            impl From<Delta<$record>> for TableDelta {
                fn from(delta: Delta<$record>) -> Self {
                    Self::$variant(delta)
                }
            }
        )+
    };
}

table_deltas! {
    Settings => GuildSettingsRecord,
    Dungeons => DungeonRecord,
    Raids => RaidRecord,
    RaidOptions => RaidOptionRecord,
    RaidVotes => RaidVoteRecord,
    RaidPostedSlots => RaidPostedSlotRecord,
    RaidTemplates => RaidTemplateRecord,
    RaidAttendance => RaidAttendanceRecord,
    UserLevels => UserLevelRecord,
    DebugCache => DebugCacheRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote(id: i32, raid_id: i32, label: &str) -> RaidVoteRecord {
        RaidVoteRecord {
            id,
            raid_id,
            kind: "day".to_string(),
            option_label: label.to_string(),
            user_id: 42,
        }
    }

    fn map(rows: Vec<RaidVoteRecord>) -> BTreeMap<i32, RaidVoteRecord> {
        rows.into_iter().map(|r| (r.key(), r)).collect()
    }

    #[test]
    fn test_diff_classifies_rows() {
        let old = map(vec![vote(1, 1, "a"), vote(2, 1, "b"), vote(3, 1, "c")]);
        let new = map(vec![vote(2, 1, "b"), vote(3, 1, "z"), vote(4, 1, "d")]);

        let delta = diff(&old, &new);
        assert_eq!(delta.deletes, vec![1]);
        assert_eq!(delta.inserts, vec![vote(4, 1, "d")]);
        assert_eq!(delta.updates.len(), 1);
        assert_eq!(delta.updates[0].key, 3);
        assert_eq!(delta.updates[0].changes.columns(), vec!["option_label"]);
    }

    #[test]
    fn test_diff_of_identical_maps_is_empty() {
        let rows = map(vec![vote(1, 1, "a"), vote(2, 2, "b")]);
        assert!(diff(&rows, &rows).is_empty());
    }

    #[test]
    fn test_statement_count_chunks_batches() {
        let old = map((1..=1200).map(|id| vote(id, 1, "a")).collect());
        let new = BTreeMap::new();
        let delta = diff(&old, &new);

        assert_eq!(delta.statement_count(500), 3);
        let statements = delta.statements(500);
        assert_eq!(
            statements.iter().map(|s| s.rows).collect::<Vec<_>>(),
            vec![500, 500, 200]
        );
        assert!(statements.iter().all(|s| s.kind == StatementKind::Delete));
    }

    #[test]
    fn test_apply_reproduces_new_snapshot() {
        let old = map(vec![vote(1, 1, "a"), vote(2, 1, "b")]);
        let new = map(vec![vote(2, 1, "x"), vote(5, 2, "y")]);

        let mut replay = old.clone();
        diff(&old, &new).apply_to(&mut replay);
        assert_eq!(replay, new);
    }

    #[test]
    fn test_table_delta_reports_table() {
        let delta: TableDelta = Delta::<RaidVoteRecord>::default().into();
        assert_eq!(delta.table(), Table::RaidVotes);
        assert!(delta.is_empty());
    }
}
