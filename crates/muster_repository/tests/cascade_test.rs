use muster_models::{DebugCacheRecord, OptionKind, RaidOptionRecord, RaidVoteRecord, Table};
use muster_repository::{CacheFilter, NewRaid, Repository};
use std::collections::BTreeSet;

fn new_raid(repo: &mut Repository, guild_id: i64) -> i32 {
    repo.create_raid(NewRaid {
        guild_id,
        channel_id: 100,
        creator_id: 200,
        dungeon: "Nanos".to_string(),
        min_players: 2,
    })
    .id
}

fn cache_row(key: &str, guild_id: i64, raid_id: Option<i32>) -> DebugCacheRecord {
    DebugCacheRecord {
        cache_key: key.to_string(),
        kind: "planner".to_string(),
        guild_id,
        raid_id,
        message_id: 1,
        payload_hash: "h".to_string(),
    }
}

#[test]
fn test_cascade_removes_only_target_raid() {
    let mut repo = Repository::new();
    let target = new_raid(&mut repo, 1);
    let other = new_raid(&mut repo, 1);

    for raid_id in [target, other] {
        repo.add_raid_options(raid_id, ["12.03.2026", "13.03.2026"], Vec::<&str>::new());
        repo.toggle_vote(raid_id, OptionKind::Day, "12.03.2026", 7);
        repo.toggle_vote(raid_id, OptionKind::Day, "13.03.2026", 7);
        repo.upsert_posted_slot(raid_id, "12.03.2026", "20:00", 5, 50, None);
        repo.upsert_debug_cache(cache_row(&format!("planner:{raid_id}"), 1, Some(raid_id)));
    }
    repo.take_dirty();

    let summary = repo.delete_raid_cascade(target);
    assert_eq!(summary.raids, 1);
    assert_eq!(summary.options, 2);
    assert_eq!(summary.votes, 2);
    assert_eq!(summary.posted_slots, 1);
    assert_eq!(summary.cache, 1);

    assert!(repo.get_raid(target).is_none());
    assert!(repo.list::<RaidOptionRecord>().all(|row| row.raid_id == other));
    assert!(repo.list::<RaidVoteRecord>().all(|row| row.raid_id == other));
    assert!(repo.list_posted_slots(target).is_empty());

    assert!(repo.get_raid(other).is_some());
    assert_eq!(repo.list_raid_options(other).0.len(), 2);
    assert_eq!(repo.vote_counts(other).days.len(), 2);
    assert_eq!(repo.list_posted_slots(other).len(), 1);
    assert!(repo.vote_index().get(target, "day", "12.03.2026", 7).is_none());
    assert!(repo.vote_index().get(other, "day", "12.03.2026", 7).is_some());
    assert!(repo.indexes_consistent());

    let dirty = repo.take_dirty();
    assert!(dirty.contains(&Table::Raids));
    assert!(dirty.contains(&Table::RaidVotes));
}

#[test]
fn test_bulk_cascade_leaves_no_orphans() {
    let mut repo = Repository::new();
    let mut roots = BTreeSet::new();
    for n in 0..500 {
        let raid_id = new_raid(&mut repo, 1 + (n % 3));
        repo.add_raid_options(raid_id, ["12.03.2026"], ["20:00"]);
        repo.toggle_vote(raid_id, OptionKind::Day, "12.03.2026", 7);
        repo.toggle_vote(raid_id, OptionKind::Time, "20:00", 8);
        repo.upsert_debug_cache(cache_row(&format!("planner:{raid_id}"), 1 + (n % 3), Some(raid_id)));
        roots.insert(raid_id);
    }
    let survivor = new_raid(&mut repo, 1);
    repo.toggle_vote(survivor, OptionKind::Day, "12.03.2026", 7);

    let summary = repo.delete_raids_cascade(&roots);
    assert_eq!(summary.raids, 500);
    assert_eq!(summary.options, 1000);
    assert_eq!(summary.votes, 1000);
    assert_eq!(summary.cache, 500);

    assert_eq!(repo.len::<RaidVoteRecord>(), 1);
    assert_eq!(repo.vote_index().len(), 1);
    assert!(repo.cache_index().is_empty());
    assert!(repo.indexes_consistent());
}

#[test]
fn test_cancel_open_raids_skips_closed_and_other_guilds() {
    let mut repo = Repository::new();
    let open = new_raid(&mut repo, 1);
    let closed = new_raid(&mut repo, 1);
    let foreign = new_raid(&mut repo, 2);
    repo.close_raid(closed).unwrap();

    assert_eq!(repo.cancel_open_raids_for_guild(1), 1);
    assert!(repo.get_raid(open).is_none());
    assert!(repo.get_raid(closed).is_some());
    assert!(repo.get_raid(foreign).is_some());
}

#[test]
fn test_purge_guild_data() {
    let mut repo = Repository::new();
    repo.ensure_settings(1, Some("A"));
    repo.ensure_settings(2, Some("B"));
    let raid_id = new_raid(&mut repo, 1);
    repo.toggle_vote(raid_id, OptionKind::Day, "12.03.2026", 7);
    new_raid(&mut repo, 2);
    repo.get_or_create_user_level(1, 7, Some("vera"));
    repo.get_or_create_user_level(2, 7, Some("vera"));
    repo.upsert_template(1, 1, "weekly", "{}");
    repo.create_attendance_snapshot(1, 1, "Nanos", &BTreeSet::from([7]));
    repo.upsert_debug_cache(cache_row("raidlist:1", 1, None));
    repo.upsert_debug_cache(cache_row("raidlist:2", 2, None));

    let summary = repo.purge_guild_data(1);
    assert_eq!(summary.cascade.raids, 1);
    assert_eq!(summary.cascade.votes, 1);
    assert_eq!(summary.user_levels, 1);
    assert_eq!(summary.templates, 1);
    assert_eq!(summary.attendance, 1);
    assert_eq!(summary.cache, 1);
    assert_eq!(summary.settings, 1);

    assert!(repo.tables().settings.contains_key(&2));
    assert_eq!(repo.list_open_raids(None).len(), 1);
    assert_eq!(
        repo.list_debug_cache(CacheFilter {
            kind: Some("planner"),
            ..Default::default()
        })
        .len(),
        1
    );
    assert!(repo.indexes_consistent());
}
