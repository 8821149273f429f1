// Mirrors the externally owned production schema. Never used for DDL.

diesel::table! {
    guild_settings (guild_id) {
        guild_id -> Int8,
        participants_channel_id -> Nullable<Int8>,
        raidlist_channel_id -> Nullable<Int8>,
        raidlist_message_id -> Nullable<Int8>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        planner_channel_id -> Nullable<Int8>,
        guild_name -> Nullable<Text>,
        default_min_players -> Int4,
        templates_enabled -> Bool,
        template_manager_role_id -> Nullable<Int8>,
    }
}

diesel::table! {
    dungeons (id) {
        id -> Int4,
        name -> Text,
        short_code -> Text,
        is_active -> Bool,
        sort_order -> Int4,
        created_at -> Timestamp,
    }
}

diesel::table! {
    raids (id) {
        id -> Int4,
        guild_id -> Int8,
        channel_id -> Int8,
        creator_id -> Int8,
        dungeon -> Text,
        status -> Text,
        created_at -> Timestamp,
        message_id -> Nullable<Int8>,
        min_players -> Int4,
        participants_posted -> Bool,
        temp_role_id -> Nullable<Int8>,
        temp_role_created -> Bool,
        display_id -> Int4,
    }
}

diesel::table! {
    raid_options (id) {
        id -> Int4,
        raid_id -> Int4,
        kind -> Text,
        label -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    raid_votes (id) {
        id -> Int4,
        raid_id -> Int4,
        kind -> Text,
        option_label -> Text,
        user_id -> Int8,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    raid_posted_slots (id) {
        id -> Int8,
        raid_id -> Int4,
        day_label -> Text,
        time_label -> Text,
        channel_id -> Nullable<Int8>,
        message_id -> Nullable<Int8>,
        #[max_length = 64]
        payload_hash -> Nullable<Varchar>,
        posted_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    raid_templates (id) {
        id -> Int4,
        guild_id -> Int8,
        dungeon_id -> Int4,
        #[max_length = 80]
        template_name -> Varchar,
        template_data -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    raid_attendance (id) {
        id -> Int4,
        guild_id -> Int8,
        raid_display_id -> Int4,
        dungeon -> Text,
        user_id -> Int8,
        #[max_length = 16]
        status -> Varchar,
        marked_by_user_id -> Nullable<Int8>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    user_levels (guild_id, user_id) {
        guild_id -> Int8,
        user_id -> Int8,
        xp -> Int4,
        level -> Int4,
        updated_at -> Timestamptz,
        username -> Nullable<Text>,
    }
}

diesel::table! {
    debug_mirror_cache (cache_key) {
        #[max_length = 96]
        cache_key -> Varchar,
        #[max_length = 32]
        kind -> Varchar,
        guild_id -> Int8,
        raid_id -> Nullable<Int4>,
        message_id -> Int8,
        #[max_length = 64]
        payload_hash -> Varchar,
        updated_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    guild_settings,
    dungeons,
    raids,
    raid_options,
    raid_votes,
    raid_posted_slots,
    raid_templates,
    raid_attendance,
    user_levels,
    debug_mirror_cache,
);
