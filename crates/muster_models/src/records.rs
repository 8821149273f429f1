//! Typed records, one per logical table.
//!
//! Field names match the physical columns in [`crate::schema`]. Server-managed
//! timestamp columns (`updated_at`, `posted_at`) are left to column defaults and
//! do not appear here.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-guild settings row.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Queryable, Selectable, Insertable,
)]
#[diesel(table_name = crate::schema::guild_settings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct GuildSettingsRecord {
    /// Guild snowflake
    pub guild_id: i64,
    /// Display name of the guild
    pub guild_name: Option<String>,
    /// Channel where participant lists are posted
    pub participants_channel_id: Option<i64>,
    /// Channel holding the raid list message
    pub raidlist_channel_id: Option<i64>,
    /// Raid list message in `raidlist_channel_id`
    pub raidlist_message_id: Option<i64>,
    /// Channel where planners are created
    pub planner_channel_id: Option<i64>,
    /// Minimum participants before a slot is posted
    pub default_min_players: i32,
    /// Whether raid templates may be used
    pub templates_enabled: bool,
    /// Role allowed to manage templates
    pub template_manager_role_id: Option<i64>,
}

impl GuildSettingsRecord {
    /// Default settings for a guild seen for the first time.
    pub fn new(guild_id: i64, guild_name: Option<String>) -> Self {
        Self {
            guild_id,
            guild_name,
            participants_channel_id: None,
            raidlist_channel_id: None,
            raidlist_message_id: None,
            planner_channel_id: None,
            default_min_players: 0,
            templates_enabled: true,
            template_manager_role_id: None,
        }
    }
}

/// Dungeon catalogue row.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Queryable, Selectable, Insertable,
)]
#[diesel(table_name = crate::schema::dungeons)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DungeonRecord {
    /// Row id
    pub id: i32,
    /// Display name, referenced by raids
    pub name: String,
    /// Short code used in commands
    pub short_code: String,
    /// Whether the dungeon is offered for new raids
    pub is_active: bool,
    /// Position in pick lists
    pub sort_order: i32,
}

/// Scheduling item.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Queryable, Selectable, Insertable,
)]
#[diesel(table_name = crate::schema::raids)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RaidRecord {
    pub id: i32,
    /// Number shown to users, unique within the guild
    pub display_id: i32,
    pub guild_id: i64,
    pub channel_id: i64,
    pub creator_id: i64,
    pub dungeon: String,
    /// `open` or `closed`, see [`crate::RaidStatus`]
    pub status: String,
    pub created_at: NaiveDateTime,
    /// Planner message, once posted
    pub message_id: Option<i64>,
    pub min_players: i32,
    pub participants_posted: bool,
    pub temp_role_id: Option<i64>,
    pub temp_role_created: bool,
}

/// Day or time option offered by a raid.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Queryable, Selectable, Insertable,
)]
#[diesel(table_name = crate::schema::raid_options)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RaidOptionRecord {
    pub id: i32,
    pub raid_id: i32,
    /// `day` or `time`, see [`crate::OptionKind`]
    pub kind: String,
    pub label: String,
}

/// One participant's ballot for one option.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Queryable, Selectable, Insertable,
)]
#[diesel(table_name = crate::schema::raid_votes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RaidVoteRecord {
    pub id: i32,
    pub raid_id: i32,
    pub kind: String,
    pub option_label: String,
    pub user_id: i64,
}

/// Marker for a slot message already posted for a raid.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Queryable, Selectable, Insertable,
)]
#[diesel(table_name = crate::schema::raid_posted_slots)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RaidPostedSlotRecord {
    pub id: i64,
    pub raid_id: i32,
    pub day_label: String,
    pub time_label: String,
    pub channel_id: Option<i64>,
    pub message_id: Option<i64>,
    /// Digest of the last posted payload; skips identical re-posts
    pub payload_hash: Option<String>,
}

/// Saved raid template.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Queryable, Selectable, Insertable,
)]
#[diesel(table_name = crate::schema::raid_templates)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RaidTemplateRecord {
    pub id: i32,
    pub guild_id: i64,
    pub dungeon_id: i32,
    pub template_name: String,
    /// Opaque template body
    pub template_data: String,
}

/// Attendance entry captured when a raid is closed.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Queryable, Selectable, Insertable,
)]
#[diesel(table_name = crate::schema::raid_attendance)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RaidAttendanceRecord {
    pub id: i32,
    pub guild_id: i64,
    pub raid_display_id: i32,
    pub dungeon: String,
    pub user_id: i64,
    /// `pending`, `present` or `absent`, see [`crate::AttendanceStatus`]
    pub status: String,
    pub marked_by_user_id: Option<i64>,
}

/// Participant level counters.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Queryable, Selectable, Insertable,
)]
#[diesel(table_name = crate::schema::user_levels)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserLevelRecord {
    pub guild_id: i64,
    pub user_id: i64,
    pub xp: i32,
    pub level: i32,
    pub username: Option<String>,
}

/// Auxiliary cache row.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Queryable, Selectable, Insertable,
)]
#[diesel(table_name = crate::schema::debug_mirror_cache)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DebugCacheRecord {
    pub cache_key: String,
    /// Category
    pub kind: String,
    pub guild_id: i64,
    pub raid_id: Option<i32>,
    pub message_id: i64,
    pub payload_hash: String,
}
