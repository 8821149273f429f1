//! Raids, their options, ballots and posted-slot markers.

use crate::Repository;
use crate::counters::bump;
use muster_error::RepositoryError;
use muster_models::{
    OptionKind, RaidOptionRecord, RaidPostedSlotRecord, RaidRecord, RaidStatus, RaidVoteRecord,
    Row, Table,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Parameters of a new raid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRaid {
    /// Owning guild
    pub guild_id: i64,
    /// Planner channel
    pub channel_id: i64,
    /// Creating user
    pub creator_id: i64,
    /// Dungeon name
    pub dungeon: String,
    /// Minimum participants before a slot is posted
    pub min_players: i32,
}

/// Ballot counts per label, split by option kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteCounts {
    /// Votes per day label
    pub days: BTreeMap<String, usize>,
    /// Votes per time label
    pub times: BTreeMap<String, usize>,
}

/// Voters per label, split by option kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteUsers {
    /// Voters per day label
    pub days: BTreeMap<String, BTreeSet<i64>>,
    /// Voters per time label
    pub times: BTreeMap<String, BTreeSet<i64>>,
}

/// Outcome of [`Repository::toggle_vote`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteToggle {
    /// A ballot with this id was added
    Added(i32),
    /// The ballot with this id was withdrawn
    Removed(i32),
}

impl Repository {
    /// Create an open raid with the next display number of its guild.
    pub fn create_raid(&mut self, new: NewRaid) -> RaidRecord {
        let row = RaidRecord {
            id: bump(&mut self.counters.raid),
            display_id: self.counters.next_display_id(new.guild_id),
            guild_id: new.guild_id,
            channel_id: new.channel_id,
            creator_id: new.creator_id,
            dungeon: new.dungeon,
            status: RaidStatus::Open.to_string(),
            created_at: chrono::Utc::now().naive_utc(),
            message_id: None,
            min_players: new.min_players,
            participants_posted: false,
            temp_role_id: None,
            temp_role_created: false,
        };
        debug!(raid_id = row.id, display_id = row.display_id, guild_id = row.guild_id, "Raid created");
        self.tables.raids.insert(row.id, row.clone());
        self.mark_dirty(Table::Raids);
        row
    }

    fn raid_mut(&mut self, raid_id: i32) -> Result<&mut RaidRecord, RepositoryError> {
        let row = self
            .tables
            .raids
            .get_mut(&raid_id)
            .ok_or_else(|| RepositoryError::missing(RaidRecord::TABLE.as_ref(), raid_id))?;
        self.dirty.insert(Table::Raids);
        Ok(row)
    }

    /// Record the planner message of a raid.
    pub fn set_raid_message_id(&mut self, raid_id: i32, message_id: i64) -> Result<(), RepositoryError> {
        self.raid_mut(raid_id)?.message_id = Some(message_id);
        Ok(())
    }

    /// Modify a raid's own columns. Keys and dependents are untouched.
    pub fn update_raid<F>(&mut self, raid_id: i32, f: F) -> Result<&RaidRecord, RepositoryError>
    where
        F: FnOnce(&mut RaidRecord),
    {
        let row = self.raid_mut(raid_id)?;
        f(row);
        row.id = raid_id;
        Ok(row)
    }

    /// Mark a raid closed.
    pub fn close_raid(&mut self, raid_id: i32) -> Result<(), RepositoryError> {
        self.raid_mut(raid_id)?.status = RaidStatus::Closed.to_string();
        Ok(())
    }

    /// Raid by id.
    pub fn get_raid(&self, raid_id: i32) -> Option<&RaidRecord> {
        self.tables.raids.get(&raid_id)
    }

    /// Open raids, optionally of one guild, oldest first.
    pub fn list_open_raids(&self, guild_id: Option<i64>) -> Vec<&RaidRecord> {
        let mut rows: Vec<_> = self
            .tables
            .raids
            .values()
            .filter(|raid| raid.status == RaidStatus::Open.as_ref())
            .filter(|raid| guild_id.is_none_or(|guild_id| raid.guild_id == guild_id))
            .collect();
        rows.sort_by_key(|raid| (raid.created_at, raid.id));
        rows
    }

    /// Add day options then time options to a raid.
    pub fn add_raid_options<D, T>(&mut self, raid_id: i32, days: D, times: T)
    where
        D: IntoIterator,
        D::Item: AsRef<str>,
        T: IntoIterator,
        T::Item: AsRef<str>,
    {
        let labelled = days
            .into_iter()
            .map(|label| (OptionKind::Day, label.as_ref().to_string()))
            .chain(
                times
                    .into_iter()
                    .map(|label| (OptionKind::Time, label.as_ref().to_string())),
            );
        for (kind, label) in labelled {
            let id = bump(&mut self.counters.option);
            self.tables.raid_options.insert(
                id,
                RaidOptionRecord {
                    id,
                    raid_id,
                    kind: kind.to_string(),
                    label,
                },
            );
        }
        self.mark_dirty(Table::RaidOptions);
    }

    /// Day labels and time labels of a raid, in creation order.
    pub fn list_raid_options(&self, raid_id: i32) -> (Vec<&str>, Vec<&str>) {
        (
            self.option_labels(raid_id, OptionKind::Day),
            self.option_labels(raid_id, OptionKind::Time),
        )
    }

    fn option_labels(&self, raid_id: i32, kind: OptionKind) -> Vec<&str> {
        self.tables
            .raid_options
            .values()
            .filter(|row| row.raid_id == raid_id && row.kind == kind.as_ref())
            .map(|row| row.label.as_str())
            .collect()
    }

    /// Add the ballot if absent, withdraw it if present.
    ///
    /// Toggling the same key twice leaves the model as it was.
    pub fn toggle_vote(
        &mut self,
        raid_id: i32,
        kind: OptionKind,
        option_label: &str,
        user_id: i64,
    ) -> VoteToggle {
        self.mark_dirty(Table::RaidVotes);
        let existing = self
            .votes
            .get(raid_id, kind.as_ref(), option_label, user_id);
        if let Some(vote_id) = existing {
            if let Some(row) = self.tables.raid_votes.remove(&vote_id) {
                self.votes.remove(&row);
            }
            return VoteToggle::Removed(vote_id);
        }

        let row = RaidVoteRecord {
            id: bump(&mut self.counters.vote),
            raid_id,
            kind: kind.to_string(),
            option_label: option_label.to_string(),
            user_id,
        };
        self.votes.insert(&row);
        let id = row.id;
        self.tables.raid_votes.insert(id, row);
        VoteToggle::Added(id)
    }

    /// Ballot counts of a raid.
    pub fn vote_counts(&self, raid_id: i32) -> VoteCounts {
        let mut counts = VoteCounts::default();
        for row in self.tables.raid_votes.values().filter(|row| row.raid_id == raid_id) {
            let bucket = if row.kind == OptionKind::Day.as_ref() {
                &mut counts.days
            } else {
                &mut counts.times
            };
            *bucket.entry(row.option_label.clone()).or_default() += 1;
        }
        counts
    }

    /// Voters of a raid per label.
    pub fn vote_user_sets(&self, raid_id: i32) -> VoteUsers {
        let mut users = VoteUsers::default();
        for row in self.tables.raid_votes.values().filter(|row| row.raid_id == raid_id) {
            let bucket = if row.kind == OptionKind::Day.as_ref() {
                &mut users.days
            } else {
                &mut users.times
            };
            bucket
                .entry(row.option_label.clone())
                .or_default()
                .insert(row.user_id);
        }
        users
    }

    /// Posted slots of a raid keyed by (day, time).
    pub fn list_posted_slots(&self, raid_id: i32) -> BTreeMap<(String, String), &RaidPostedSlotRecord> {
        self.tables
            .raid_posted_slots
            .values()
            .filter(|row| row.raid_id == raid_id)
            .map(|row| ((row.day_label.clone(), row.time_label.clone()), row))
            .collect()
    }

    /// Record a posted slot, or repoint the existing marker for the same (raid, day, time).
    pub fn upsert_posted_slot(
        &mut self,
        raid_id: i32,
        day_label: &str,
        time_label: &str,
        channel_id: i64,
        message_id: i64,
        payload_hash: Option<&str>,
    ) -> RaidPostedSlotRecord {
        self.mark_dirty(Table::RaidPostedSlots);
        if let Some(row) = self.tables.raid_posted_slots.values_mut().find(|row| {
            row.raid_id == raid_id && row.day_label == day_label && row.time_label == time_label
        }) {
            row.channel_id = Some(channel_id);
            row.message_id = Some(message_id);
            if payload_hash.is_some() {
                row.payload_hash = payload_hash.map(str::to_string);
            }
            return row.clone();
        }

        let row = RaidPostedSlotRecord {
            id: bump(&mut self.counters.slot),
            raid_id,
            day_label: day_label.to_string(),
            time_label: time_label.to_string(),
            channel_id: Some(channel_id),
            message_id: Some(message_id),
            payload_hash: payload_hash.map(str::to_string),
        };
        self.tables.raid_posted_slots.insert(row.id, row.clone());
        row
    }

    /// Remove a posted-slot marker.
    pub fn delete_posted_slot(&mut self, slot_id: i64) -> Option<RaidPostedSlotRecord> {
        let removed = self.tables.raid_posted_slots.remove(&slot_id);
        if removed.is_some() {
            self.mark_dirty(Table::RaidPostedSlots);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raid(repo: &mut Repository, guild_id: i64) -> RaidRecord {
        repo.create_raid(NewRaid {
            guild_id,
            channel_id: 100,
            creator_id: 200,
            dungeon: "Nanos".to_string(),
            min_players: 3,
        })
    }

    #[test]
    fn test_display_ids_per_guild() {
        let mut repo = Repository::new();
        let a1 = raid(&mut repo, 1);
        let b1 = raid(&mut repo, 2);
        let a2 = raid(&mut repo, 1);

        assert_eq!((a1.display_id, b1.display_id, a2.display_id), (1, 1, 2));
        assert_ne!(a1.id, b1.id);
    }

    #[test]
    fn test_close_raid_drops_from_open_list() {
        let mut repo = Repository::new();
        let first = raid(&mut repo, 1);
        let second = raid(&mut repo, 1);
        repo.close_raid(first.id).unwrap();

        let open: Vec<_> = repo.list_open_raids(Some(1)).iter().map(|r| r.id).collect();
        assert_eq!(open, vec![second.id]);
        assert!(repo.list_open_raids(Some(2)).is_empty());
    }

    #[test]
    fn test_missing_raid_leaves_no_hint() {
        let mut repo = Repository::new();
        assert!(repo.close_raid(999).is_err());
        assert!(repo.set_raid_message_id(999, 1).is_err());
        assert!(repo.dirty().is_empty());
    }

    #[test]
    fn test_options_by_kind() {
        let mut repo = Repository::new();
        let r = raid(&mut repo, 1);
        repo.add_raid_options(r.id, ["12.03.2026", "13.03.2026"], ["20:00"]);

        let (days, times) = repo.list_raid_options(r.id);
        assert_eq!(days, vec!["12.03.2026", "13.03.2026"]);
        assert_eq!(times, vec!["20:00"]);
    }

    #[test]
    fn test_vote_counts_and_users() {
        let mut repo = Repository::new();
        let r = raid(&mut repo, 1);
        repo.toggle_vote(r.id, OptionKind::Day, "12.03.2026", 1);
        repo.toggle_vote(r.id, OptionKind::Day, "12.03.2026", 2);
        repo.toggle_vote(r.id, OptionKind::Time, "20:00", 1);

        let counts = repo.vote_counts(r.id);
        assert_eq!(counts.days.get("12.03.2026"), Some(&2));
        assert_eq!(counts.times.get("20:00"), Some(&1));

        let users = repo.vote_user_sets(r.id);
        assert_eq!(users.days["12.03.2026"], BTreeSet::from([1, 2]));
    }

    #[test]
    fn test_posted_slot_upsert_repoints() {
        let mut repo = Repository::new();
        let r = raid(&mut repo, 1);
        let first = repo.upsert_posted_slot(r.id, "12.03.2026", "20:00", 5, 50, Some("aa"));
        let second = repo.upsert_posted_slot(r.id, "12.03.2026", "20:00", 5, 51, None);

        assert_eq!(first.id, second.id);
        assert_eq!(second.message_id, Some(51));
        assert_eq!(second.payload_hash.as_deref(), Some("aa"));
        assert_eq!(repo.list_posted_slots(r.id).len(), 1);

        assert!(repo.delete_posted_slot(first.id).is_some());
        assert!(repo.list_posted_slots(r.id).is_empty());
    }
}
