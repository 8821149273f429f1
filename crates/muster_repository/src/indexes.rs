//! Secondary indexes over the row model.

use muster_models::{DebugCacheRecord, RaidVoteRecord};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Ballot lookup key: raid id, option kind, option label, voter id.
pub type VoteKey = (i32, String, String, i64);

/// Maps each ballot's natural key to its row id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteIndex(HashMap<VoteKey, i32>);

impl VoteIndex {
    /// Build the index from scratch.
    pub fn build(votes: &BTreeMap<i32, RaidVoteRecord>) -> Self {
        Self(votes.values().map(|row| (Self::key_of(row), row.id)).collect())
    }

    /// Natural key of a ballot row.
    pub fn key_of(row: &RaidVoteRecord) -> VoteKey {
        (
            row.raid_id,
            row.kind.clone(),
            row.option_label.clone(),
            row.user_id,
        )
    }

    /// Row id of the ballot with this natural key.
    pub fn get(&self, raid_id: i32, kind: &str, option_label: &str, user_id: i64) -> Option<i32> {
        self.0
            .get(&(raid_id, kind.to_string(), option_label.to_string(), user_id))
            .copied()
    }

    pub(crate) fn insert(&mut self, row: &RaidVoteRecord) {
        self.0.insert(Self::key_of(row), row.id);
    }

    pub(crate) fn remove(&mut self, row: &RaidVoteRecord) {
        self.0.remove(&Self::key_of(row));
    }

    /// Number of indexed ballots.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no ballot is indexed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Cache keys grouped by category, scope and item.
///
/// The three maps are derived from the cache rows and always move together:
/// [`CacheIndex::remove`] must run with the old row before [`CacheIndex::insert`]
/// whenever a row's category, scope or item changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheIndex {
    by_kind: HashMap<String, BTreeSet<String>>,
    by_kind_guild: HashMap<(String, i64), BTreeSet<String>>,
    by_kind_guild_raid: HashMap<(String, i64, Option<i32>), BTreeSet<String>>,
}

impl CacheIndex {
    /// Build the index from scratch.
    pub fn build(rows: &BTreeMap<String, DebugCacheRecord>) -> Self {
        let mut index = Self::default();
        for row in rows.values() {
            index.insert(row);
        }
        index
    }

    pub(crate) fn insert(&mut self, row: &DebugCacheRecord) {
        self.by_kind
            .entry(row.kind.clone())
            .or_default()
            .insert(row.cache_key.clone());
        self.by_kind_guild
            .entry((row.kind.clone(), row.guild_id))
            .or_default()
            .insert(row.cache_key.clone());
        self.by_kind_guild_raid
            .entry((row.kind.clone(), row.guild_id, row.raid_id))
            .or_default()
            .insert(row.cache_key.clone());
    }

    pub(crate) fn remove(&mut self, row: &DebugCacheRecord) {
        prune(&mut self.by_kind, &row.kind, &row.cache_key);
        prune(
            &mut self.by_kind_guild,
            &(row.kind.clone(), row.guild_id),
            &row.cache_key,
        );
        prune(
            &mut self.by_kind_guild_raid,
            &(row.kind.clone(), row.guild_id, row.raid_id),
            &row.cache_key,
        );
    }

    /// Keys of one category.
    pub fn keys_by_kind(&self, kind: &str) -> Option<&BTreeSet<String>> {
        self.by_kind.get(kind)
    }

    /// Keys of one category within one scope.
    pub fn keys_by_kind_guild(&self, kind: &str, guild_id: i64) -> Option<&BTreeSet<String>> {
        self.by_kind_guild.get(&(kind.to_string(), guild_id))
    }

    /// Keys of one category, scope and item.
    pub fn keys_by_kind_guild_raid(
        &self,
        kind: &str,
        guild_id: i64,
        raid_id: Option<i32>,
    ) -> Option<&BTreeSet<String>> {
        self.by_kind_guild_raid
            .get(&(kind.to_string(), guild_id, raid_id))
    }

    /// Total entries across the three maps.
    pub fn entry_count(&self) -> usize {
        self.by_kind.values().map(BTreeSet::len).sum::<usize>()
            + self.by_kind_guild.values().map(BTreeSet::len).sum::<usize>()
            + self.by_kind_guild_raid.values().map(BTreeSet::len).sum::<usize>()
    }

    /// Whether nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.by_kind.is_empty() && self.by_kind_guild.is_empty() && self.by_kind_guild_raid.is_empty()
    }
}

fn prune<K>(map: &mut HashMap<K, BTreeSet<String>>, bucket: &K, cache_key: &str)
where
    K: std::hash::Hash + Eq,
{
    if let Some(keys) = map.get_mut(bucket) {
        keys.remove(cache_key);
        if keys.is_empty() {
            map.remove(bucket);
        }
    }
}
