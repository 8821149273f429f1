//! Participant levels and attendance.

use crate::Repository;
use crate::counters::bump;
use muster_models::{AttendanceStatus, RaidAttendanceRecord, Table, UserLevelRecord};
use std::collections::BTreeSet;

impl Repository {
    /// Level record of a participant, created at zero when absent.
    pub fn get_or_create_user_level(
        &mut self,
        guild_id: i64,
        user_id: i64,
        username: Option<&str>,
    ) -> &UserLevelRecord {
        self.level_mut(guild_id, user_id, username)
    }

    fn level_mut(&mut self, guild_id: i64, user_id: i64, username: Option<&str>) -> &mut UserLevelRecord {
        let rows = &mut self.tables.user_levels;
        if !rows.contains_key(&(guild_id, user_id)) {
            self.dirty.insert(Table::UserLevels);
        }
        rows.entry((guild_id, user_id))
            .or_insert_with(|| UserLevelRecord {
                guild_id,
                user_id,
                xp: 0,
                level: 0,
                username: username.map(str::to_string),
            })
    }

    /// Add experience and recompute the level with `level_for(total_xp)`.
    ///
    /// Negative gains are treated as zero. Returns the level before the gain
    /// together with the updated record.
    pub fn add_experience<F>(
        &mut self,
        guild_id: i64,
        user_id: i64,
        username: Option<&str>,
        gained: i32,
        level_for: F,
    ) -> (i32, &UserLevelRecord)
    where
        F: FnOnce(i32) -> i32,
    {
        self.mark_dirty(Table::UserLevels);
        let row = self.level_mut(guild_id, user_id, username);
        let previous = row.level;
        row.xp = row.xp.saturating_add(gained.max(0));
        row.level = level_for(row.xp);
        if let Some(name) = username {
            row.username = Some(name.to_string());
        }
        (previous, &*row)
    }

    /// Record attendance for a closed raid, marking each new participant present.
    ///
    /// Participants already recorded for this raid are skipped. Returns the
    /// number of entries created.
    pub fn create_attendance_snapshot(
        &mut self,
        guild_id: i64,
        raid_display_id: i32,
        dungeon: &str,
        user_ids: &BTreeSet<i64>,
    ) -> usize {
        let existing: BTreeSet<i64> = self
            .tables
            .raid_attendance
            .values()
            .filter(|row| row.guild_id == guild_id && row.raid_display_id == raid_display_id)
            .map(|row| row.user_id)
            .collect();

        let mut created = 0;
        for user_id in user_ids.difference(&existing) {
            let row = RaidAttendanceRecord {
                id: bump(&mut self.counters.attendance),
                guild_id,
                raid_display_id,
                dungeon: dungeon.to_string(),
                user_id: *user_id,
                status: AttendanceStatus::Present.to_string(),
                marked_by_user_id: None,
            };
            self.tables.raid_attendance.insert(row.id, row);
            created += 1;
        }
        if created > 0 {
            self.mark_dirty(Table::RaidAttendance);
        }
        created
    }

    /// Attendance of one raid, ordered by status then user.
    pub fn list_attendance(&self, guild_id: i64, raid_display_id: i32) -> Vec<&RaidAttendanceRecord> {
        let mut rows: Vec<_> = self
            .tables
            .raid_attendance
            .values()
            .filter(|row| row.guild_id == guild_id && row.raid_display_id == raid_display_id)
            .collect();
        rows.sort_by(|a, b| a.status.cmp(&b.status).then(a.user_id.cmp(&b.user_id)));
        rows
    }

    /// Number of raids a participant attended in a guild.
    pub fn participation_count(&self, guild_id: i64, user_id: i64) -> usize {
        self.tables
            .raid_attendance
            .values()
            .filter(|row| {
                row.guild_id == guild_id
                    && row.user_id == user_id
                    && row.status == AttendanceStatus::Present.as_ref()
            })
            .count()
    }

    /// Set a participant's attendance status. Returns `false` when no entry exists.
    pub fn mark_attendance(
        &mut self,
        guild_id: i64,
        raid_display_id: i32,
        user_id: i64,
        status: AttendanceStatus,
        marked_by_user_id: i64,
    ) -> bool {
        let Some(row) = self.tables.raid_attendance.values_mut().find(|row| {
            row.guild_id == guild_id && row.raid_display_id == raid_display_id && row.user_id == user_id
        }) else {
            return false;
        };
        row.status = status.to_string();
        row.marked_by_user_id = Some(marked_by_user_id);
        self.mark_dirty(Table::RaidAttendance);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_experience_accumulates() {
        let mut repo = Repository::new();
        let (previous, row) = repo.add_experience(1, 2, Some("vera"), 150, |xp| xp / 100);
        assert_eq!((previous, row.xp, row.level), (0, 150, 1));

        let (previous, row) = repo.add_experience(1, 2, None, -40, |xp| xp / 100);
        assert_eq!((previous, row.xp), (1, 150));
        assert_eq!(row.username.as_deref(), Some("vera"));
    }

    #[test]
    fn test_attendance_snapshot_skips_existing() {
        let mut repo = Repository::new();
        let first = repo.create_attendance_snapshot(1, 4, "Nanos", &BTreeSet::from([10, 11]));
        let second = repo.create_attendance_snapshot(1, 4, "Nanos", &BTreeSet::from([11, 12]));
        assert_eq!((first, second), (2, 1));
        assert_eq!(repo.list_attendance(1, 4).len(), 3);
    }

    #[test]
    fn test_mark_attendance_updates_count() {
        let mut repo = Repository::new();
        repo.create_attendance_snapshot(1, 4, "Nanos", &BTreeSet::from([10]));
        repo.create_attendance_snapshot(1, 5, "Nanos", &BTreeSet::from([10]));
        assert_eq!(repo.participation_count(1, 10), 2);

        assert!(repo.mark_attendance(1, 4, 10, AttendanceStatus::Absent, 99));
        assert!(!repo.mark_attendance(1, 4, 77, AttendanceStatus::Absent, 99));
        assert_eq!(repo.participation_count(1, 10), 1);

        let rows = repo.list_attendance(1, 4);
        assert_eq!(rows[0].marked_by_user_id, Some(99));
    }
}
