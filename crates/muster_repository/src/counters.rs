//! Id allocation for rows created in memory.

use muster_models::TableSet;
use std::collections::{BTreeMap, HashMap};

/// Next free ids per table, plus per-guild raid display numbers.
///
/// Counters only move forward between bulk loads, so an id freed by a delete
/// is not handed out again before the delete has been flushed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdCounters {
    pub(crate) dungeon: i32,
    pub(crate) raid: i32,
    pub(crate) option: i32,
    pub(crate) vote: i32,
    pub(crate) slot: i64,
    pub(crate) template: i32,
    pub(crate) attendance: i32,
    display_by_guild: HashMap<i64, i32>,
}

impl Default for IdCounters {
    fn default() -> Self {
        Self {
            dungeon: 1,
            raid: 1,
            option: 1,
            vote: 1,
            slot: 1,
            template: 1,
            attendance: 1,
            display_by_guild: HashMap::new(),
        }
    }
}

fn next_after<K: Copy + Into<i64>, V>(rows: &BTreeMap<K, V>) -> i64 {
    rows.keys().next_back().map_or(1, |key| (*key).into() + 1)
}

impl IdCounters {
    /// Derive counters from loaded rows: next id is the largest existing id plus one.
    pub fn recalculate(tables: &TableSet) -> Self {
        let mut display_by_guild: HashMap<i64, i32> = HashMap::new();
        for raid in tables.raids.values() {
            let current = display_by_guild.entry(raid.guild_id).or_insert(0);
            *current = (*current).max(raid.display_id);
        }

        Self {
            dungeon: next_after(&tables.dungeons) as i32,
            raid: next_after(&tables.raids) as i32,
            option: next_after(&tables.raid_options) as i32,
            vote: next_after(&tables.raid_votes) as i32,
            slot: next_after(&tables.raid_posted_slots),
            template: next_after(&tables.raid_templates) as i32,
            attendance: next_after(&tables.raid_attendance) as i32,
            display_by_guild,
        }
    }

    /// Reserve the next display number for a raid in `guild_id`.
    pub(crate) fn next_display_id(&mut self, guild_id: i64) -> i32 {
        let current = self.display_by_guild.entry(guild_id).or_insert(0);
        *current += 1;
        *current
    }

    /// Last display number handed out in `guild_id`.
    pub fn last_display_id(&self, guild_id: i64) -> i32 {
        self.display_by_guild.get(&guild_id).copied().unwrap_or(0)
    }
}

/// Return the current value of a counter and advance it.
pub(crate) fn bump<T: Copy + std::ops::AddAssign + From<u8>>(counter: &mut T) -> T {
    let id = *counter;
    *counter += T::from(1);
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use muster_models::RaidOptionRecord;

    #[test]
    fn test_recalculate_uses_max_id() {
        let mut tables = TableSet::default();
        for id in [3, 8, 5] {
            tables.insert(RaidOptionRecord {
                id,
                raid_id: 1,
                kind: "day".to_string(),
                label: id.to_string(),
            });
        }
        let counters = IdCounters::recalculate(&tables);
        assert_eq!(counters.option, 9);
        assert_eq!(counters.raid, 1);
    }

    #[test]
    fn test_display_ids_are_per_guild() {
        let mut counters = IdCounters::default();
        assert_eq!(counters.next_display_id(1), 1);
        assert_eq!(counters.next_display_id(1), 2);
        assert_eq!(counters.next_display_id(2), 1);
        assert_eq!(counters.last_display_id(1), 2);
    }
}
