//! Guild settings, dungeon catalogue and templates.

use crate::Repository;
use crate::counters::bump;
use muster_models::{DungeonRecord, GuildSettingsRecord, RaidTemplateRecord, Table};

/// Channel assignments for a guild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Channel where planners are created
    pub planner_channel_id: Option<i64>,
    /// Channel where participant lists are posted
    pub participants_channel_id: Option<i64>,
    /// Channel holding the raid list
    pub raidlist_channel_id: Option<i64>,
}

impl Repository {
    fn settings_mut(&mut self, guild_id: i64, guild_name: Option<&str>) -> &mut GuildSettingsRecord {
        self.mark_dirty(Table::Settings);
        let row = self
            .tables
            .settings
            .entry(guild_id)
            .or_insert_with(|| GuildSettingsRecord::new(guild_id, guild_name.map(str::to_string)));
        match guild_name {
            Some(name) if !name.is_empty() && row.guild_name.as_deref() != Some(name) => {
                row.guild_name = Some(name.to_string());
            }
            _ => {}
        }
        row
    }

    /// Settings of `guild_id`, created with defaults when absent.
    ///
    /// A non-empty `guild_name` that differs from the stored one replaces it.
    pub fn ensure_settings(&mut self, guild_id: i64, guild_name: Option<&str>) -> &GuildSettingsRecord {
        self.settings_mut(guild_id, guild_name)
    }

    /// Assign channels. Moving the raid list to another channel forgets its message.
    pub fn configure_channels(&mut self, guild_id: i64, channels: ChannelConfig) -> &GuildSettingsRecord {
        let row = self.settings_mut(guild_id, None);
        row.planner_channel_id = channels.planner_channel_id;
        row.participants_channel_id = channels.participants_channel_id;
        if row.raidlist_channel_id != channels.raidlist_channel_id {
            row.raidlist_channel_id = channels.raidlist_channel_id;
            row.raidlist_message_id = None;
        }
        row
    }

    /// Enable or disable templates for a guild.
    pub fn set_templates_enabled(
        &mut self,
        guild_id: i64,
        guild_name: Option<&str>,
        enabled: bool,
    ) -> &GuildSettingsRecord {
        let row = self.settings_mut(guild_id, guild_name);
        row.templates_enabled = enabled;
        row
    }

    /// Add a dungeon to the catalogue.
    pub fn add_dungeon(
        &mut self,
        name: &str,
        short_code: &str,
        is_active: bool,
        sort_order: i32,
    ) -> DungeonRecord {
        let row = DungeonRecord {
            id: bump(&mut self.counters.dungeon),
            name: name.to_string(),
            short_code: short_code.to_string(),
            is_active,
            sort_order,
        };
        self.tables.dungeons.insert(row.id, row.clone());
        self.mark_dirty(Table::Dungeons);
        row
    }

    /// Active dungeons ordered by sort order, then case-insensitive name.
    pub fn list_active_dungeons(&self) -> Vec<&DungeonRecord> {
        let mut rows: Vec<_> = self
            .tables
            .dungeons
            .values()
            .filter(|row| row.is_active)
            .collect();
        rows.sort_by_key(|row| (row.sort_order, row.name.to_lowercase()));
        rows
    }

    /// Active dungeon whose name matches case-insensitively.
    pub fn active_dungeon_by_name(&self, name: &str) -> Option<&DungeonRecord> {
        let name = name.trim().to_lowercase();
        self.tables
            .dungeons
            .values()
            .find(|row| row.is_active && row.name.to_lowercase() == name)
    }

    /// Create or overwrite the template named `template_name` for a guild and dungeon.
    pub fn upsert_template(
        &mut self,
        guild_id: i64,
        dungeon_id: i32,
        template_name: &str,
        template_data: &str,
    ) -> RaidTemplateRecord {
        self.mark_dirty(Table::RaidTemplates);
        if let Some(row) = self.tables.raid_templates.values_mut().find(|row| {
            row.guild_id == guild_id && row.dungeon_id == dungeon_id && row.template_name == template_name
        }) {
            row.template_data = template_data.to_string();
            return row.clone();
        }

        let row = RaidTemplateRecord {
            id: bump(&mut self.counters.template),
            guild_id,
            dungeon_id,
            template_name: template_name.to_string(),
            template_data: template_data.to_string(),
        };
        self.tables.raid_templates.insert(row.id, row.clone());
        row
    }

    /// Template by guild, dungeon and name.
    pub fn get_template(
        &self,
        guild_id: i64,
        dungeon_id: i32,
        template_name: &str,
    ) -> Option<&RaidTemplateRecord> {
        self.tables.raid_templates.values().find(|row| {
            row.guild_id == guild_id && row.dungeon_id == dungeon_id && row.template_name == template_name
        })
    }
}
