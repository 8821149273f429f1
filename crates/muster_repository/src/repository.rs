//! The authoritative in-memory row model.

use crate::{CacheIndex, IdCounters, VoteIndex};
use muster_error::{RepositoryError, RepositoryErrorKind};
use muster_models::{
    DungeonRecord, GuildSettingsRecord, RaidAttendanceRecord, RaidTemplateRecord, Row, Table,
    TableSet, UserLevelRecord,
};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Repository shared between mutators and the flush controller.
///
/// Every read-modify-write of the model happens under this single lock.
pub type SharedRepository = Arc<Mutex<Repository>>;

/// Rows that carry no secondary index and own no dependents.
///
/// Only these may be written through the generic [`Repository::upsert`],
/// [`Repository::update`] and [`Repository::delete`]. Ballots, cache rows and
/// raids go through their dedicated operations so their indexes stay in step.
pub trait DirectRow: Row {
    /// Advance id counters past a row written from outside.
    fn observe(_counters: &mut IdCounters, _row: &Self) {}
}

impl DirectRow for GuildSettingsRecord {}

impl DirectRow for UserLevelRecord {}

impl DirectRow for DungeonRecord {
    fn observe(counters: &mut IdCounters, row: &Self) {
        counters.dungeon = counters.dungeon.max(row.id + 1);
    }
}

impl DirectRow for RaidTemplateRecord {
    fn observe(counters: &mut IdCounters, row: &Self) {
        counters.template = counters.template.max(row.id + 1);
    }
}

impl DirectRow for RaidAttendanceRecord {
    fn observe(counters: &mut IdCounters, row: &Self) {
        counters.attendance = counters.attendance.max(row.id + 1);
    }
}

/// Process-wide working copy of every table, with its indexes and dirty hints.
///
/// Constructed explicitly and handed to whoever needs it; there is no global
/// instance.
#[derive(Debug, Clone, Default)]
pub struct Repository {
    pub(crate) tables: TableSet,
    pub(crate) votes: VoteIndex,
    pub(crate) cache: CacheIndex,
    pub(crate) counters: IdCounters,
    pub(crate) dirty: BTreeSet<Table>,
}

impl Repository {
    /// Empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository holding `tables`, with indexes and counters derived from them.
    pub fn from_tables(tables: TableSet) -> Self {
        let mut repo = Self::new();
        repo.replace_tables(tables);
        repo
    }

    /// Wrap in the shared lock.
    pub fn into_shared(self) -> SharedRepository {
        Arc::new(Mutex::new(self))
    }

    /// Current content of every table.
    pub fn tables(&self) -> &TableSet {
        &self.tables
    }

    /// Replace the whole model, as at bootstrap.
    ///
    /// Indexes and id counters are rebuilt and dirty hints cleared.
    pub fn replace_tables(&mut self, tables: TableSet) {
        self.votes = VoteIndex::build(&tables.raid_votes);
        self.cache = CacheIndex::build(&tables.debug_cache);
        self.counters = IdCounters::recalculate(&tables);
        self.tables = tables;
        self.dirty.clear();
        debug!(rows = self.tables.total_rows(), "Row model replaced");
    }

    /// Drop every row.
    pub fn reset(&mut self) {
        self.replace_tables(TableSet::default());
    }

    /// Recompute counters and rebuild indexes from the current rows.
    pub fn recalculate(&mut self) {
        self.votes = VoteIndex::build(&self.tables.raid_votes);
        self.cache = CacheIndex::build(&self.tables.debug_cache);
        self.counters = IdCounters::recalculate(&self.tables);
    }

    /// Ballot index.
    pub fn vote_index(&self) -> &VoteIndex {
        &self.votes
    }

    /// Cache index.
    pub fn cache_index(&self) -> &CacheIndex {
        &self.cache
    }

    /// Id counters.
    pub fn counters(&self) -> &IdCounters {
        &self.counters
    }

    /// Whether both indexes equal a fresh rebuild from the rows.
    pub fn indexes_consistent(&self) -> bool {
        self.votes == VoteIndex::build(&self.tables.raid_votes)
            && self.cache == CacheIndex::build(&self.tables.debug_cache)
    }

    /// Row by primary key.
    pub fn get<R: Row>(&self, key: &R::Key) -> Option<&R> {
        R::rows(&self.tables).get(key)
    }

    /// Every row of a table, in key order.
    pub fn list<R: Row>(&self) -> impl Iterator<Item = &R> + '_ {
        R::rows(&self.tables).values()
    }

    /// Row count of a table.
    pub fn len<R: Row>(&self) -> usize {
        R::rows(&self.tables).len()
    }

    /// Whether the model holds no rows at all.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Insert or replace a row, returning the previous version.
    pub fn upsert<R: DirectRow>(&mut self, row: R) -> Option<R> {
        R::observe(&mut self.counters, &row);
        self.mark_dirty(R::TABLE);
        R::rows_mut(&mut self.tables).insert(row.key(), row)
    }

    /// Modify a row in place.
    ///
    /// Key columns cannot change this way; a closure that rewrites them is
    /// rejected and the stored row is left as it was. Delete and upsert to
    /// move a row to another key.
    pub fn update<R, F>(&mut self, key: &R::Key, f: F) -> Result<&R, RepositoryError>
    where
        R: DirectRow,
        F: FnOnce(&mut R),
    {
        let row = R::rows_mut(&mut self.tables)
            .get_mut(key)
            .ok_or_else(|| RepositoryError::missing(R::TABLE.as_ref(), key))?;
        let mut edited = row.clone();
        f(&mut edited);
        let new_key = edited.key();
        if new_key != *key {
            return Err(RepositoryError::new(RepositoryErrorKind::KeyChanged {
                table: R::TABLE.to_string(),
                key: format!("{:?}", key),
                new_key: format!("{:?}", new_key),
            }));
        }
        *row = edited;
        self.dirty.insert(R::TABLE);
        Ok(row)
    }

    /// Remove a row, returning it if it existed.
    pub fn delete<R: DirectRow>(&mut self, key: &R::Key) -> Option<R> {
        let removed = R::rows_mut(&mut self.tables).remove(key);
        if removed.is_some() {
            self.mark_dirty(R::TABLE);
        }
        removed
    }

    /// Hint that `table` changed since the last flush.
    pub fn mark_dirty(&mut self, table: Table) {
        self.dirty.insert(table);
    }

    /// Hint by logical table name. Unknown names are ignored.
    pub fn mark_dirty_named(&mut self, name: &str) -> Option<Table> {
        let table = Table::parse_hints([name]).into_iter().next()?;
        self.mark_dirty(table);
        Some(table)
    }

    /// Tables hinted since the last [`Repository::take_dirty`].
    pub fn dirty(&self) -> &BTreeSet<Table> {
        &self.dirty
    }

    /// Drain the dirty hints.
    pub fn take_dirty(&mut self) -> BTreeSet<Table> {
        std::mem::take(&mut self.dirty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_upsert_marks_dirty() {
        let mut repo = Repository::new();
        repo.upsert(GuildSettingsRecord::new(1, None));

        assert_eq!(repo.len::<GuildSettingsRecord>(), 1);
        assert_eq!(repo.take_dirty(), BTreeSet::from([Table::Settings]));
        assert!(repo.dirty().is_empty());
    }

    #[test]
    fn test_update_missing_row_fails() {
        let mut repo = Repository::new();
        let result = repo.update::<GuildSettingsRecord, _>(&5, |row| row.templates_enabled = false);
        assert!(result.is_err());
        assert!(repo.dirty().is_empty());
    }

    #[test]
    fn test_update_rejects_key_change() {
        let mut repo = Repository::new();
        repo.upsert(GuildSettingsRecord::new(1, Some("A".to_string())));
        repo.take_dirty();

        let err = repo
            .update::<GuildSettingsRecord, _>(&1, |row| {
                row.guild_id = 2;
                row.guild_name = Some("B".to_string());
            })
            .unwrap_err();
        assert!(matches!(err.kind, RepositoryErrorKind::KeyChanged { .. }));

        let row = &repo.tables().settings[&1];
        assert_eq!(row.guild_id, 1);
        assert_eq!(row.guild_name.as_deref(), Some("A"));
        assert!(repo.dirty().is_empty());
    }

    #[test]
    fn test_upsert_advances_counter() {
        let mut repo = Repository::new();
        repo.upsert(DungeonRecord {
            id: 10,
            name: "Nanos".to_string(),
            short_code: "nanos".to_string(),
            is_active: true,
            sort_order: 0,
        });
        assert_eq!(repo.counters().dungeon, 11);
    }

    #[test]
    fn test_unknown_hint_ignored() {
        let mut repo = Repository::new();
        assert_eq!(repo.mark_dirty_named("raid_votes"), Some(Table::RaidVotes));
        assert_eq!(repo.mark_dirty_named("bogus"), None);
        assert_eq!(repo.dirty().len(), 1);
    }
}
