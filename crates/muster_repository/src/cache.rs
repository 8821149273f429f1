//! Auxiliary cache rows and their category/scope/item indexes.

use crate::Repository;
use muster_models::{DebugCacheRecord, Table};
use std::collections::BTreeSet;

/// Filter for [`Repository::list_debug_cache`]. `None` matches anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheFilter<'a> {
    /// Category
    pub kind: Option<&'a str>,
    /// Scope
    pub guild_id: Option<i64>,
    /// Item
    pub raid_id: Option<i32>,
}

impl Repository {
    /// Insert or update a cache row, keeping all three indexes in step.
    ///
    /// When the category, scope or item of an existing key changes, the old
    /// index entries are removed before the new ones are added.
    pub fn upsert_debug_cache(&mut self, row: DebugCacheRecord) -> DebugCacheRecord {
        self.mark_dirty(Table::DebugCache);
        match self.tables.debug_cache.get_mut(&row.cache_key) {
            None => {
                self.cache.insert(&row);
                self.tables.debug_cache.insert(row.cache_key.clone(), row.clone());
                row
            }
            Some(existing) => {
                let moved = existing.kind != row.kind
                    || existing.guild_id != row.guild_id
                    || existing.raid_id != row.raid_id;
                if moved {
                    self.cache.remove(existing);
                    self.cache.insert(&row);
                }
                *existing = row.clone();
                row
            }
        }
    }

    /// Cache row by key.
    pub fn get_debug_cache(&self, cache_key: &str) -> Option<&DebugCacheRecord> {
        self.tables.debug_cache.get(cache_key)
    }

    /// Cache rows matching `filter`, ordered by key.
    ///
    /// Category lookups, alone or narrowed by scope and item, are served from
    /// the indexes; other combinations scan the table.
    pub fn list_debug_cache(&self, filter: CacheFilter<'_>) -> Vec<&DebugCacheRecord> {
        let indexed = match filter {
            CacheFilter {
                kind: Some(kind),
                guild_id: Some(guild_id),
                raid_id: Some(raid_id),
            } => Some(self.cache.keys_by_kind_guild_raid(kind, guild_id, Some(raid_id))),
            CacheFilter {
                kind: Some(kind),
                guild_id: Some(guild_id),
                raid_id: None,
            } => Some(self.cache.keys_by_kind_guild(kind, guild_id)),
            CacheFilter {
                kind: Some(kind),
                guild_id: None,
                raid_id: None,
            } => Some(self.cache.keys_by_kind(kind)),
            _ => None,
        };

        match indexed {
            Some(keys) => keys
                .into_iter()
                .flat_map(BTreeSet::iter)
                .filter_map(|key| self.tables.debug_cache.get(key))
                .collect(),
            None => self
                .tables
                .debug_cache
                .values()
                .filter(|row| filter.kind.is_none_or(|kind| row.kind == kind))
                .filter(|row| filter.guild_id.is_none_or(|guild_id| row.guild_id == guild_id))
                .filter(|row| filter.raid_id.is_none_or(|raid_id| row.raid_id == Some(raid_id)))
                .collect(),
        }
    }

    /// Remove a cache row and its index entries.
    pub fn delete_debug_cache(&mut self, cache_key: &str) -> Option<DebugCacheRecord> {
        let removed = self.tables.debug_cache.remove(cache_key)?;
        self.cache.remove(&removed);
        self.mark_dirty(Table::DebugCache);
        Some(removed)
    }
}
