//! Cascade Deletion: removing raids together with everything scoped to them.
//!
//! Deleting any number of raids walks each dependent table once, filtering by
//! the set of removed raid ids, and prunes index entries for every row it drops.

use crate::Repository;
use muster_models::{RaidStatus, Table};
use std::collections::BTreeSet;
use tracing::{debug, instrument};

/// Rows removed by a raid cascade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeSummary {
    /// Raids removed
    pub raids: usize,
    /// Options removed
    pub options: usize,
    /// Ballots removed
    pub votes: usize,
    /// Posted-slot markers removed
    pub posted_slots: usize,
    /// Cache rows tied to a removed raid
    pub cache: usize,
}

impl CascadeSummary {
    /// Total rows removed.
    pub fn total(&self) -> usize {
        self.raids + self.options + self.votes + self.posted_slots + self.cache
    }
}

/// Rows removed by [`Repository::purge_guild_data`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeSummary {
    /// Raid cascade
    pub cascade: CascadeSummary,
    /// Participant level records removed
    pub user_levels: usize,
    /// Templates removed
    pub templates: usize,
    /// Attendance entries removed
    pub attendance: usize,
    /// Remaining cache rows of the guild removed
    pub cache: usize,
    /// Settings rows removed (0 or 1)
    pub settings: usize,
}

impl Repository {
    /// Remove the given raids and all of their options, ballots, posted slots
    /// and raid-scoped cache rows in a single pass per table.
    ///
    /// Ids that do not exist are ignored. Rows of other raids are untouched.
    #[instrument(skip(self, raid_ids), fields(roots = raid_ids.len()))]
    pub fn delete_raids_cascade(&mut self, raid_ids: &BTreeSet<i32>) -> CascadeSummary {
        let mut summary = CascadeSummary::default();
        if raid_ids.is_empty() {
            return summary;
        }

        for raid_id in raid_ids {
            if self.tables.raids.remove(raid_id).is_some() {
                summary.raids += 1;
            }
        }

        let before = self.tables.raid_options.len();
        self.tables
            .raid_options
            .retain(|_, row| !raid_ids.contains(&row.raid_id));
        summary.options = before - self.tables.raid_options.len();

        let votes = &mut self.votes;
        self.tables.raid_votes.retain(|_, row| {
            let keep = !raid_ids.contains(&row.raid_id);
            if !keep {
                votes.remove(row);
                summary.votes += 1;
            }
            keep
        });

        let before = self.tables.raid_posted_slots.len();
        self.tables
            .raid_posted_slots
            .retain(|_, row| !raid_ids.contains(&row.raid_id));
        summary.posted_slots = before - self.tables.raid_posted_slots.len();

        let cache = &mut self.cache;
        self.tables.debug_cache.retain(|_, row| {
            let keep = row.raid_id.is_none_or(|raid_id| !raid_ids.contains(&raid_id));
            if !keep {
                cache.remove(row);
                summary.cache += 1;
            }
            keep
        });

        for table in [
            Table::Raids,
            Table::RaidOptions,
            Table::RaidVotes,
            Table::RaidPostedSlots,
            Table::DebugCache,
        ] {
            self.mark_dirty(table);
        }

        debug!(
            raids = summary.raids,
            options = summary.options,
            votes = summary.votes,
            posted_slots = summary.posted_slots,
            cache = summary.cache,
            "Raid cascade complete"
        );
        summary
    }

    /// Remove one raid and its dependents.
    pub fn delete_raid_cascade(&mut self, raid_id: i32) -> CascadeSummary {
        self.delete_raids_cascade(&BTreeSet::from([raid_id]))
    }

    /// Ids of the open raids of a guild.
    pub fn open_raid_ids(&self, guild_id: i64) -> BTreeSet<i32> {
        self.tables
            .raids
            .values()
            .filter(|raid| raid.guild_id == guild_id && raid.status == RaidStatus::Open.as_ref())
            .map(|raid| raid.id)
            .collect()
    }

    /// Cascade-delete every open raid of a guild, returning how many raids went.
    pub fn cancel_open_raids_for_guild(&mut self, guild_id: i64) -> usize {
        let raid_ids = self.open_raid_ids(guild_id);
        self.delete_raids_cascade(&raid_ids).raids
    }

    /// Remove everything stored for a guild.
    #[instrument(skip(self))]
    pub fn purge_guild_data(&mut self, guild_id: i64) -> PurgeSummary {
        let raid_ids: BTreeSet<i32> = self
            .tables
            .raids
            .values()
            .filter(|raid| raid.guild_id == guild_id)
            .map(|raid| raid.id)
            .collect();
        let mut summary = PurgeSummary {
            cascade: self.delete_raids_cascade(&raid_ids),
            ..Default::default()
        };

        let before = self.tables.user_levels.len();
        self.tables.user_levels.retain(|_, row| row.guild_id != guild_id);
        summary.user_levels = before - self.tables.user_levels.len();

        let before = self.tables.raid_templates.len();
        self.tables.raid_templates.retain(|_, row| row.guild_id != guild_id);
        summary.templates = before - self.tables.raid_templates.len();

        let before = self.tables.raid_attendance.len();
        self.tables.raid_attendance.retain(|_, row| row.guild_id != guild_id);
        summary.attendance = before - self.tables.raid_attendance.len();

        let cache = &mut self.cache;
        self.tables.debug_cache.retain(|_, row| {
            let keep = row.guild_id != guild_id;
            if !keep {
                cache.remove(row);
                summary.cache += 1;
            }
            keep
        });

        summary.settings = usize::from(self.tables.settings.remove(&guild_id).is_some());

        for table in [
            Table::UserLevels,
            Table::RaidTemplates,
            Table::RaidAttendance,
            Table::DebugCache,
            Table::Settings,
        ] {
            self.mark_dirty(table);
        }
        summary
    }
}
