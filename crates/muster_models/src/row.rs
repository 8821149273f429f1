//! Row trait and cell-level changesets.
//!
//! Every record type implements [`Row`], which ties it to its logical
//! [`Table`], its primary key, and a changeset type listing its non-key
//! columns. Changesets double as diesel `AsChangeset` values: a `None` field is
//! an unchanged column and is left out of the generated `UPDATE`.

use crate::{
    DebugCacheRecord, DungeonRecord, GuildSettingsRecord, RaidAttendanceRecord,
    RaidOptionRecord, RaidPostedSlotRecord, RaidRecord, RaidTemplateRecord, RaidVoteRecord,
    Table, TableSet, UserLevelRecord,
};
use chrono::NaiveDateTime;
use diesel::AsChangeset;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::hash::Hash;

/// A record of one logical table.
pub trait Row: Clone + PartialEq + Serialize + Send + Sync + Debug + 'static {
    /// Primary key type.
    type Key: Clone + Ord + Hash + Debug + Serialize + Send + Sync + 'static;

    /// Cell-level changes between two versions of a row.
    type Changes: Changeset<Self>;

    /// Logical table holding rows of this type.
    const TABLE: Table;

    /// Primary key of this row.
    fn key(&self) -> Self::Key;

    /// Rows of this type in a snapshot.
    fn rows(set: &TableSet) -> &BTreeMap<Self::Key, Self>;

    /// Mutable rows of this type in a snapshot.
    fn rows_mut(set: &mut TableSet) -> &mut BTreeMap<Self::Key, Self>;
}

/// Non-key column changes for a row type `R`.
pub trait Changeset<R>: Clone + Debug + PartialEq + Send + Sync + 'static {
    /// Columns whose values differ between `old` and `new`, carrying the new values.
    fn between(old: &R, new: &R) -> Self;

    /// Write the changed columns onto `row`.
    fn apply_to(&self, row: &mut R);

    /// Names of the changed columns, in declaration order.
    fn columns(&self) -> Vec<&'static str>;

    /// Whether no column changed.
    fn is_empty(&self) -> bool {
        self.columns().is_empty()
    }
}

/// Declares a changeset struct over the non-key columns of a record.
///
/// Nullable columns are written as `Option<T>`, so the field becomes
/// `Option<Option<T>>` and `Some(None)` sets the column to NULL.
macro_rules! row_changes {
    (
        $(#[$meta:meta])*
        $name:ident for $record:ident in $table:ident {
            $($field:ident: $ty:ty),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, AsChangeset)]
        #[diesel(table_name = crate::schema::$table)]
        pub struct $name {
            $(
                #[doc = concat!("New value of `", stringify!($field), "`, `None` when unchanged")]
                pub $field: Option<$ty>,
            )+
        }

        impl Changeset<$record> for $name {
            fn between(old: &$record, new: &$record) -> Self {
                Self {
                    $($field: (old.$field != new.$field).then(|| new.$field.clone()),)+
                }
            }

            fn apply_to(&self, row: &mut $record) {
                $(
                    if let Some(value) = &self.$field {
                        row.$field = value.clone();
                    }
                )+
            }

            fn columns(&self) -> Vec<&'static str> {
                let mut columns = Vec::new();
                $(
                    if self.$field.is_some() {
                        columns.push(stringify!($field));
                    }
                )+
                columns
            }
        }
    };
}

/// Implements [`Row`] for a record stored in the given [`TableSet`] field.
macro_rules! impl_row {
    ($record:ident, $changes:ident, $variant:ident, $field:ident, $key_ty:ty, |$row:ident| $key:expr) => {
        impl Row for $record {
            type Key = $key_ty;
            type Changes = $changes;

            const TABLE: Table = Table::$variant;

            fn key(&self) -> Self::Key {
                let $row = self;
                $key
            }

            fn rows(set: &TableSet) -> &BTreeMap<Self::Key, Self> {
                &set.$field
            }

            fn rows_mut(set: &mut TableSet) -> &mut BTreeMap<Self::Key, Self> {
                &mut set.$field
            }
        }
    };
}

row_changes! {
    /// Changed columns of a [`GuildSettingsRecord`].
    GuildSettingsChanges for GuildSettingsRecord in guild_settings {
        guild_name: Option<String>,
        participants_channel_id: Option<i64>,
        raidlist_channel_id: Option<i64>,
        raidlist_message_id: Option<i64>,
        planner_channel_id: Option<i64>,
        default_min_players: i32,
        templates_enabled: bool,
        template_manager_role_id: Option<i64>,
    }
}

row_changes! {
    /// Changed columns of a [`DungeonRecord`].
    DungeonChanges for DungeonRecord in dungeons {
        name: String,
        short_code: String,
        is_active: bool,
        sort_order: i32,
    }
}

row_changes! {
    /// Changed columns of a [`RaidRecord`].
    RaidChanges for RaidRecord in raids {
        display_id: i32,
        guild_id: i64,
        channel_id: i64,
        creator_id: i64,
        dungeon: String,
        status: String,
        created_at: NaiveDateTime,
        message_id: Option<i64>,
        min_players: i32,
        participants_posted: bool,
        temp_role_id: Option<i64>,
        temp_role_created: bool,
    }
}

row_changes! {
    /// Changed columns of a [`RaidOptionRecord`].
    RaidOptionChanges for RaidOptionRecord in raid_options {
        raid_id: i32,
        kind: String,
        label: String,
    }
}

row_changes! {
    /// Changed columns of a [`RaidVoteRecord`].
    RaidVoteChanges for RaidVoteRecord in raid_votes {
        raid_id: i32,
        kind: String,
        option_label: String,
        user_id: i64,
    }
}

row_changes! {
    /// Changed columns of a [`RaidPostedSlotRecord`].
    RaidPostedSlotChanges for RaidPostedSlotRecord in raid_posted_slots {
        raid_id: i32,
        day_label: String,
        time_label: String,
        channel_id: Option<i64>,
        message_id: Option<i64>,
        payload_hash: Option<String>,
    }
}

row_changes! {
    /// Changed columns of a [`RaidTemplateRecord`].
    RaidTemplateChanges for RaidTemplateRecord in raid_templates {
        guild_id: i64,
        dungeon_id: i32,
        template_name: String,
        template_data: String,
    }
}

row_changes! {
    /// Changed columns of a [`RaidAttendanceRecord`].
    RaidAttendanceChanges for RaidAttendanceRecord in raid_attendance {
        guild_id: i64,
        raid_display_id: i32,
        dungeon: String,
        user_id: i64,
        status: String,
        marked_by_user_id: Option<i64>,
    }
}

row_changes! {
    /// Changed columns of a [`UserLevelRecord`].
    UserLevelChanges for UserLevelRecord in user_levels {
        xp: i32,
        level: i32,
        username: Option<String>,
    }
}

row_changes! {
    /// Changed columns of a [`DebugCacheRecord`].
    DebugCacheChanges for DebugCacheRecord in debug_mirror_cache {
        kind: String,
        guild_id: i64,
        raid_id: Option<i32>,
        message_id: i64,
        payload_hash: String,
    }
}

impl_row!(GuildSettingsRecord, GuildSettingsChanges, Settings, settings, i64, |r| r.guild_id);
impl_row!(DungeonRecord, DungeonChanges, Dungeons, dungeons, i32, |r| r.id);
impl_row!(RaidRecord, RaidChanges, Raids, raids, i32, |r| r.id);
impl_row!(RaidOptionRecord, RaidOptionChanges, RaidOptions, raid_options, i32, |r| r.id);
impl_row!(RaidVoteRecord, RaidVoteChanges, RaidVotes, raid_votes, i32, |r| r.id);
impl_row!(RaidPostedSlotRecord, RaidPostedSlotChanges, RaidPostedSlots, raid_posted_slots, i64, |r| r.id);
impl_row!(RaidTemplateRecord, RaidTemplateChanges, RaidTemplates, raid_templates, i32, |r| r.id);
impl_row!(RaidAttendanceRecord, RaidAttendanceChanges, RaidAttendance, raid_attendance, i32, |r| r.id);
impl_row!(UserLevelRecord, UserLevelChanges, UserLevels, user_levels, (i64, i64), |r| (r.guild_id, r.user_id));
impl_row!(DebugCacheRecord, DebugCacheChanges, DebugCache, debug_cache, String, |r| r.cache_key.clone());
