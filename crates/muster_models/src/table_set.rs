//! Snapshot container holding every logical table.

use crate::{
    Delta, DebugCacheRecord, DungeonRecord, Fingerprint, Fingerprints, GuildSettingsRecord,
    RaidAttendanceRecord, RaidOptionRecord, RaidPostedSlotRecord, RaidRecord, RaidTemplateRecord,
    RaidVoteRecord, Row, Table, TableDelta, UserLevelRecord, diff,
};
use std::collections::BTreeMap;
use strum::IntoEnumIterator;

/// Rows of every logical table keyed by primary key.
///
/// Used both as the live content of the row model and as a persisted
/// snapshot baseline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSet {
    /// `settings`
    pub settings: BTreeMap<i64, GuildSettingsRecord>,
    /// `dungeons`
    pub dungeons: BTreeMap<i32, DungeonRecord>,
    /// `raids`
    pub raids: BTreeMap<i32, RaidRecord>,
    /// `raid_options`
    pub raid_options: BTreeMap<i32, RaidOptionRecord>,
    /// `raid_votes`
    pub raid_votes: BTreeMap<i32, RaidVoteRecord>,
    /// `raid_posted_slots`
    pub raid_posted_slots: BTreeMap<i64, RaidPostedSlotRecord>,
    /// `raid_templates`
    pub raid_templates: BTreeMap<i32, RaidTemplateRecord>,
    /// `raid_attendance`
    pub raid_attendance: BTreeMap<i32, RaidAttendanceRecord>,
    /// `user_levels`
    pub user_levels: BTreeMap<(i64, i64), UserLevelRecord>,
    /// `debug_cache`
    pub debug_cache: BTreeMap<String, DebugCacheRecord>,
}

fn count<R: Row>(set: &TableSet) -> usize {
    R::rows(set).len()
}

fn fingerprint_of<R: Row>(set: &TableSet) -> Fingerprint {
    Fingerprint::of_rows(R::TABLE, R::rows(set).values())
}

fn copy_rows<R: Row>(dst: &mut TableSet, src: &TableSet) {
    *R::rows_mut(dst) = R::rows(src).clone();
}

fn diff_rows<R: Row>(old: &TableSet, new: &TableSet) -> TableDelta
where
    TableDelta: From<Delta<R>>,
{
    diff(R::rows(old), R::rows(new)).into()
}

impl TableSet {
    /// Rows of type `R`.
    pub fn rows<R: Row>(&self) -> &BTreeMap<R::Key, R> {
        R::rows(self)
    }

    /// Insert or replace a row, returning the previous version.
    pub fn insert<R: Row>(&mut self, row: R) -> Option<R> {
        R::rows_mut(self).insert(row.key(), row)
    }

    /// Replace every row of type `R`.
    pub fn set_rows<R: Row>(&mut self, rows: impl IntoIterator<Item = R>) {
        *R::rows_mut(self) = rows.into_iter().map(|row| (row.key(), row)).collect();
    }

    /// Row count of one table.
    pub fn len(&self, table: Table) -> usize {
        crate::dispatch_table!(table, count(self))
    }

    /// Row count across all tables.
    pub fn total_rows(&self) -> usize {
        Table::iter().map(|table| self.len(table)).sum()
    }

    /// Whether every table is empty.
    pub fn is_empty(&self) -> bool {
        self.total_rows() == 0
    }

    /// Fingerprint of one table.
    pub fn fingerprint(&self, table: Table) -> Fingerprint {
        crate::dispatch_table!(table, fingerprint_of(self))
    }

    /// Fingerprints of every table.
    pub fn fingerprints(&self) -> Fingerprints {
        Table::iter()
            .map(|table| (table, self.fingerprint(table)))
            .collect()
    }

    /// Overwrite one table with the rows of the same table in `src`.
    pub fn copy_table_from(&mut self, table: Table, src: &TableSet) {
        crate::dispatch_table!(table, copy_rows(self, src))
    }

    /// Delta of one table from this snapshot to `current`.
    pub fn diff(&self, current: &TableSet, table: Table) -> TableDelta {
        crate::dispatch_table!(table, diff_rows(self, current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(id: i32, raid_id: i32, label: &str) -> RaidOptionRecord {
        RaidOptionRecord {
            id,
            raid_id,
            kind: "day".to_string(),
            label: label.to_string(),
        }
    }

    #[test]
    fn test_counts_per_table() {
        let mut set = TableSet::default();
        set.insert(option(1, 1, "12.03.2026"));
        set.insert(option(2, 1, "13.03.2026"));
        set.insert(GuildSettingsRecord::new(5, None));

        assert_eq!(set.len(Table::RaidOptions), 2);
        assert_eq!(set.len(Table::Settings), 1);
        assert_eq!(set.total_rows(), 3);
    }

    #[test]
    fn test_copy_table_leaves_others() {
        let mut live = TableSet::default();
        live.insert(option(1, 1, "a"));
        live.insert(GuildSettingsRecord::new(5, None));

        let mut baseline = TableSet::default();
        baseline.copy_table_from(Table::RaidOptions, &live);

        assert_eq!(baseline.raid_options, live.raid_options);
        assert!(baseline.settings.is_empty());
        assert_eq!(
            baseline.fingerprint(Table::RaidOptions),
            live.fingerprint(Table::RaidOptions)
        );
    }

    #[test]
    fn test_diff_then_apply_converges() {
        let mut old = TableSet::default();
        old.insert(option(1, 1, "a"));
        let mut new = old.clone();
        new.insert(option(1, 1, "b"));
        new.insert(option(2, 1, "c"));

        let delta = old.diff(&new, Table::RaidOptions);
        assert_eq!(delta.row_counts(), (1, 1, 0));
        delta.apply_to(&mut old);
        assert_eq!(old, new);
    }
}
