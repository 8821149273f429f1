//! Logical table identifiers and write ordering.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use strum::IntoEnumIterator;

/// Logical table of the row model.
///
/// The string form (`settings`, `raid_votes`, ...) is what dirty hints use;
/// [`Table::sql_name`] is the physical table in the backing store.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Table {
    /// Per-guild settings
    Settings,
    /// Dungeon catalogue
    Dungeons,
    /// Scheduling items
    Raids,
    /// Day/time options of a raid
    RaidOptions,
    /// Ballot entries
    RaidVotes,
    /// Posted-slot markers
    RaidPostedSlots,
    /// Saved raid templates
    RaidTemplates,
    /// Attendance snapshots
    RaidAttendance,
    /// Participant level records
    UserLevels,
    /// Auxiliary cache rows
    DebugCache,
}

impl Table {
    /// Number of logical tables.
    pub const COUNT: usize = 10;

    /// Parent-first order used for updates and inserts.
    pub const INSERT_ORDER: [Table; Table::COUNT] = [
        Table::Settings,
        Table::Dungeons,
        Table::Raids,
        Table::RaidOptions,
        Table::RaidVotes,
        Table::RaidPostedSlots,
        Table::RaidTemplates,
        Table::RaidAttendance,
        Table::UserLevels,
        Table::DebugCache,
    ];

    /// Child-first order used for deletes.
    pub const DELETE_ORDER: [Table; Table::COUNT] = [
        Table::RaidVotes,
        Table::RaidOptions,
        Table::RaidPostedSlots,
        Table::RaidTemplates,
        Table::Raids,
        Table::RaidAttendance,
        Table::UserLevels,
        Table::DebugCache,
        Table::Dungeons,
        Table::Settings,
    ];

    /// Every logical table in declaration order.
    pub fn all() -> BTreeSet<Table> {
        Table::iter().collect()
    }

    /// Physical table name in the backing store.
    pub fn sql_name(&self) -> &'static str {
        match self {
            Table::Settings => "guild_settings",
            Table::Dungeons => "dungeons",
            Table::Raids => "raids",
            Table::RaidOptions => "raid_options",
            Table::RaidVotes => "raid_votes",
            Table::RaidPostedSlots => "raid_posted_slots",
            Table::RaidTemplates => "raid_templates",
            Table::RaidAttendance => "raid_attendance",
            Table::UserLevels => "user_levels",
            Table::DebugCache => "debug_mirror_cache",
        }
    }

    /// Parse dirty-table hints by logical name, dropping names that match no table.
    ///
    /// # Examples
    ///
    /// ```
    /// use muster_models::Table;
    ///
    /// let hints = Table::parse_hints(["raid_votes", "settings", "nonsense"]);
    /// assert_eq!(hints.len(), 2);
    /// assert!(hints.contains(&Table::RaidVotes));
    /// ```
    pub fn parse_hints<I, S>(names: I) -> BTreeSet<Table>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .filter_map(|name| {
                let name = name.as_ref().trim();
                match Table::from_str(name) {
                    Ok(table) => Some(table),
                    Err(_) => {
                        tracing::debug!(hint = name, "Ignoring dirty hint for unknown table");
                        None
                    }
                }
            })
            .collect()
    }
}

/// Lifecycle state of a raid.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum RaidStatus {
    /// Accepting votes
    Open,
    /// Finished or cancelled
    Closed,
}

/// Kind of a raid option and of the ballots cast for it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum OptionKind {
    /// A day label such as `12.03.2026`
    Day,
    /// A time label such as `20:00`
    Time,
}

/// Attendance mark for one participant.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum AttendanceStatus {
    /// Not yet reviewed
    Pending,
    /// Showed up
    Present,
    /// Did not show up
    Absent,
}
