use muster_database::MemoryStore;
use muster_error::{DatabaseErrorKind, FlushErrorKind};
use muster_error::RepositoryErrorKind;
use muster_models::{
    DebugCacheRecord, GuildSettingsRecord, OptionKind, StatementKind, Table, TableSet,
};
use muster_persistence::{FlushController, FlushScope, PersistenceConfig};
use muster_repository::{NewRaid, Repository, SharedRepository};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

fn config() -> PersistenceConfig {
    PersistenceConfig::default().with_jitter(false)
}

async fn setup(config: PersistenceConfig) -> (Arc<MemoryStore>, FlushController, SharedRepository) {
    let store = Arc::new(MemoryStore::new());
    let controller = FlushController::new(store.clone(), config);
    let repo = Repository::new().into_shared();
    controller.load(&repo).await.unwrap();
    (store, controller, repo)
}

fn new_raid(repo: &SharedRepository, guild_id: i64) -> i32 {
    repo.lock()
        .create_raid(NewRaid {
            guild_id,
            channel_id: 100,
            creator_id: 200,
            dungeon: "Nanos".to_string(),
            min_players: 2,
        })
        .id
}

fn planner_cache(guild_id: i64, raid_id: Option<i32>) -> DebugCacheRecord {
    DebugCacheRecord {
        cache_key: format!("planner:{}:{:?}", guild_id, raid_id),
        kind: "planner".to_string(),
        guild_id,
        raid_id,
        message_id: 900,
        payload_hash: "digest".to_string(),
    }
}

fn live(repo: &SharedRepository) -> TableSet {
    repo.lock().tables().clone()
}

#[tokio::test]
async fn test_store_converges_after_mutations() {
    let (store, controller, repo) = setup(config()).await;

    let raid = new_raid(&repo, 1);
    {
        let mut repo = repo.lock();
        repo.ensure_settings(1, Some("Raiders"));
        repo.add_raid_options(raid, ["12.03.2026", "13.03.2026"], ["20:00"]);
        repo.toggle_vote(raid, OptionKind::Day, "12.03.2026", 7);
        repo.toggle_vote(raid, OptionKind::Time, "20:00", 7);
    }
    controller.flush_dirty(&repo).await.unwrap();
    assert_eq!(store.tables(), live(&repo));

    {
        let mut repo = repo.lock();
        repo.toggle_vote(raid, OptionKind::Day, "12.03.2026", 7);
        repo.ensure_settings(1, Some("Renamed"));
        repo.close_raid(raid).unwrap();
    }
    controller.flush_dirty(&repo).await.unwrap();
    assert_eq!(store.tables(), live(&repo));
    assert_eq!(controller.baseline().await, live(&repo));
}

#[tokio::test]
async fn test_second_flush_issues_no_statements() {
    let (store, controller, repo) = setup(config()).await;
    repo.lock().ensure_settings(1, Some("Raiders"));

    let first = controller.flush(&repo, None).await.unwrap();
    assert_eq!(*first.scope(), FlushScope::Full);
    assert!(!first.is_noop());

    let second = controller.flush(&repo, None).await.unwrap();
    assert!(second.is_noop());
    assert_eq!(*second.attempts(), 0);
    assert_eq!(store.transactions(), 1);
    assert_eq!(store.apply_attempts(), 1);
}

#[tokio::test]
async fn test_rename_updates_only_that_column() {
    let (store, controller, repo) = setup(config()).await;
    repo.lock().ensure_settings(1, Some("A"));
    controller.flush_dirty(&repo).await.unwrap();
    store.clear_log();

    repo.lock().ensure_settings(1, Some("B"));
    let report = controller.flush_dirty(&repo).await.unwrap();

    assert_eq!(*report.statements(), 1);
    let log = store.statement_log();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].table, Table::Settings);
    assert_eq!(log[0].kind, StatementKind::Update);
    assert_eq!(log[0].columns, vec!["guild_name"]);
    assert_eq!(
        store.tables().settings[&1].guild_name.as_deref(),
        Some("B")
    );
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_are_retried() {
    let (store, controller, repo) = setup(config()).await;
    repo.lock().ensure_settings(1, Some("Raiders"));
    let before = live(&repo);

    store.fail_next(3, DatabaseErrorKind::Connection("reset by peer".to_string()));
    let report = controller.flush_dirty(&repo).await.unwrap();

    assert_eq!(*report.attempts(), 4);
    assert_eq!(store.apply_attempts(), 4);
    assert_eq!(store.transactions(), 1);
    // Only the bootstrap read; the model was never reloaded
    assert_eq!(store.loads(), 1);
    assert_eq!(live(&repo), before);
    assert_eq!(store.tables(), before);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_keep_state_for_next_flush() {
    let (store, controller, repo) = setup(config()).await;
    repo.lock().ensure_settings(1, Some("Raiders"));
    let before = live(&repo);

    store.fail_next(5, DatabaseErrorKind::Timeout("pool".to_string()));
    let err = controller.flush(&repo, None).await.unwrap_err();
    assert!(matches!(
        err.kind,
        FlushErrorKind::RetriesExhausted { attempts: 5, .. }
    ));
    assert_eq!(live(&repo), before);
    assert!(controller.baseline().await.settings.is_empty());

    let report = controller.flush(&repo, None).await.unwrap();
    assert_eq!(*report.attempts(), 1);
    assert_eq!(store.tables(), before);
}

#[tokio::test]
async fn test_permanent_error_fails_fast() {
    let (store, controller, repo) = setup(config()).await;
    repo.lock().ensure_settings(1, None);

    store.fail_next(1, DatabaseErrorKind::Query("duplicate key".to_string()));
    let err = controller.flush(&repo, None).await.unwrap_err();

    assert!(matches!(err.kind, FlushErrorKind::Store(_)));
    assert_eq!(store.apply_attempts(), 1);
}

#[tokio::test]
async fn test_failed_flush_restores_dirty_hints() {
    let (store, controller, repo) = setup(config()).await;
    repo.lock().ensure_settings(1, None);

    store.fail_next(1, DatabaseErrorKind::Query("bad statement".to_string()));
    assert!(controller.flush_dirty(&repo).await.is_err());
    assert!(repo.lock().dirty().contains(&Table::Settings));

    controller.flush_dirty(&repo).await.unwrap();
    assert!(repo.lock().dirty().is_empty());
    assert_eq!(store.tables().settings.len(), 1);
}

#[tokio::test]
async fn test_hinted_flush_writes_only_hinted_tables() {
    let (store, controller, repo) = setup(config().with_full_scan_every(3)).await;
    {
        let mut repo = repo.lock();
        repo.ensure_settings(1, None);
        repo.add_dungeon("Nanos", "nan", true, 1);
    }

    let hints = BTreeSet::from([Table::Settings]);
    let report = controller.flush(&repo, Some(hints.clone())).await.unwrap();
    assert_eq!(*report.scope(), FlushScope::Hinted);
    assert_eq!(report.tables(), &vec![Table::Settings]);
    assert!(store.tables().dungeons.is_empty());

    let report = controller.flush(&repo, Some(hints.clone())).await.unwrap();
    assert!(report.is_noop());

    // Third hinted flush widens to every table and picks up the missed hint
    let report = controller.flush(&repo, Some(hints)).await.unwrap();
    assert_eq!(*report.scope(), FlushScope::SelfHeal);
    assert_eq!(report.tables(), &vec![Table::Dungeons]);
    assert_eq!(store.tables(), live(&repo));
    assert_eq!(controller.hinted_flushes().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_retry_loop() {
    let (tx, rx) = tokio::sync::watch::channel(false);
    let store = Arc::new(MemoryStore::new());
    let controller = FlushController::new(
        store.clone(),
        config()
            .with_max_attempts(10)
            .with_retry_base_ms(1_000),
    )
    .with_shutdown(rx);
    let repo = Repository::new().into_shared();
    controller.load(&repo).await.unwrap();
    repo.lock().ensure_settings(1, None);

    store.fail_next(10, DatabaseErrorKind::Connection("down".to_string()));
    let signal = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();
    };
    let (result, ()) = tokio::join!(controller.flush(&repo, None), signal);

    let err = result.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(store.apply_attempts(), 1);
    assert_eq!(repo.lock().tables().settings.len(), 1);
}

#[tokio::test]
async fn test_bulk_cascade_flushes_in_batches() {
    let (store, controller, repo) = setup(config()).await;
    let mut roots = BTreeSet::new();
    for _ in 0..500 {
        let raid = new_raid(&repo, 1);
        let mut repo = repo.lock();
        repo.add_raid_options(raid, ["12.03.2026", "13.03.2026"], Vec::<&str>::new());
        repo.toggle_vote(raid, OptionKind::Day, "12.03.2026", 7);
        repo.upsert_posted_slot(raid, "12.03.2026", "20:00", 5, 50, Some("aa"));
        repo.upsert_debug_cache(planner_cache(1, Some(raid)));
        roots.insert(raid);
    }
    let survivor = new_raid(&repo, 2);
    {
        let mut repo = repo.lock();
        repo.add_raid_options(survivor, ["12.03.2026"], Vec::<&str>::new());
        repo.toggle_vote(survivor, OptionKind::Day, "12.03.2026", 7);
        repo.upsert_posted_slot(survivor, "12.03.2026", "20:00", 5, 51, None);
        repo.upsert_debug_cache(planner_cache(2, Some(survivor)));
        // Guild-wide row, not owned by any raid
        repo.upsert_debug_cache(planner_cache(1, None));
    }
    controller.flush_dirty(&repo).await.unwrap();
    assert_eq!(store.tables().raid_posted_slots.len(), 501);
    assert_eq!(store.tables().debug_cache.len(), 502);
    store.clear_log();

    let summary = repo.lock().delete_raids_cascade(&roots);
    assert_eq!(summary.raids, 500);
    let report = controller.flush_dirty(&repo).await.unwrap();

    let log = store.statement_log();
    assert!(log.iter().all(|s| s.kind == StatementKind::Delete));
    let tables: Vec<_> = log.iter().map(|s| (s.table, s.rows)).collect();
    assert_eq!(
        tables,
        vec![
            (Table::RaidVotes, 500),
            (Table::RaidOptions, 500),
            (Table::RaidOptions, 500),
            (Table::RaidPostedSlots, 500),
            (Table::Raids, 500),
            (Table::DebugCache, 500),
        ]
    );
    assert_eq!(*report.statements(), 6);

    let persisted = store.tables();
    assert_eq!(persisted.raids.keys().copied().collect::<Vec<_>>(), vec![survivor]);
    assert!(persisted.raid_options.values().all(|row| row.raid_id == survivor));
    assert_eq!(persisted.raid_options.len(), 1);
    assert!(persisted.raid_votes.values().all(|row| row.raid_id == survivor));
    assert_eq!(persisted.raid_votes.len(), 1);
    let slots: Vec<_> = persisted.raid_posted_slots.values().map(|row| row.raid_id).collect();
    assert_eq!(slots, vec![survivor]);
    let mut cached: Vec<_> = persisted.debug_cache.values().map(|row| row.raid_id).collect();
    cached.sort();
    assert_eq!(cached, vec![None, Some(survivor)]);
    assert_eq!(persisted, live(&repo));
    assert_eq!(repo.lock().vote_index().len(), 1);
}

#[tokio::test]
async fn test_key_rewrite_is_rejected_and_store_stays_in_step() {
    let (store, controller, repo) = setup(config()).await;
    repo.lock().ensure_settings(1, Some("A"));
    controller.flush_dirty(&repo).await.unwrap();

    let err = repo
        .lock()
        .update::<GuildSettingsRecord, _>(&1, |row| row.guild_id = 2)
        .unwrap_err();
    assert!(matches!(err.kind, RepositoryErrorKind::KeyChanged { .. }));

    let report = controller.flush_dirty(&repo).await.unwrap();
    assert!(report.is_noop());
    assert_eq!(store.tables(), live(&repo));
    assert_eq!(store.tables().settings[&1].guild_id, 1);
}

#[tokio::test]
async fn test_empty_hint_set_scans_every_table() {
    let (store, controller, repo) = setup(config()).await;
    {
        let mut repo = repo.lock();
        repo.ensure_settings(1, Some("A"));
        // A mutation whose hint never reaches the controller
        repo.take_dirty();
    }

    let report = controller.flush(&repo, Some(BTreeSet::new())).await.unwrap();
    assert_eq!(*report.scope(), FlushScope::Full);
    assert_eq!(report.tables(), &vec![Table::Settings]);
    assert_eq!(store.tables().settings.len(), 1);
}

#[tokio::test]
async fn test_full_flush_restarts_self_heal_count() {
    let (_store, controller, repo) = setup(config().with_full_scan_every(3)).await;
    let hints = BTreeSet::from([Table::Settings]);

    controller.flush(&repo, Some(hints.clone())).await.unwrap();
    controller.flush(&repo, Some(hints.clone())).await.unwrap();
    assert_eq!(controller.hinted_flushes().await, 2);

    controller.flush(&repo, None).await.unwrap();
    assert_eq!(controller.hinted_flushes().await, 0);

    let report = controller.flush(&repo, Some(hints)).await.unwrap();
    assert_eq!(*report.scope(), FlushScope::Hinted);
    assert_eq!(controller.hinted_flushes().await, 1);
}

#[tokio::test]
async fn test_bootstrap_failure_is_fatal() {
    let store = Arc::new(MemoryStore::new());
    store.fail_next(1, DatabaseErrorKind::Connection("refused".to_string()));
    let controller = FlushController::new(store.clone(), config());
    let repo = Repository::new().into_shared();

    assert!(controller.load(&repo).await.is_err());
    assert!(!controller.is_loaded().await);
    assert!(repo.lock().is_empty());
}

#[tokio::test]
async fn test_missing_table_blocks_bootstrap() {
    let store = Arc::new(MemoryStore::new());
    store.drop_table(Table::RaidAttendance);
    let controller = FlushController::new(store.clone(), config());
    let repo = Repository::new().into_shared();

    let err = controller.load(&repo).await.unwrap_err();
    assert!(matches!(err.kind, DatabaseErrorKind::TableNotFound(_)));
    assert_eq!(store.loads(), 0);
}

#[tokio::test]
async fn test_load_adopts_store_rows_as_baseline() {
    let mut seeded = TableSet::default();
    seeded.insert(GuildSettingsRecord::new(9, Some("Seeded".to_string())));
    let store = Arc::new(MemoryStore::with_tables(seeded.clone()));
    let controller = FlushController::new(store.clone(), config());
    let repo = Repository::new().into_shared();

    assert_eq!(controller.load(&repo).await.unwrap(), 1);
    assert_eq!(live(&repo), seeded);
    assert_eq!(controller.global_fingerprint().await, seeded.fingerprints().global());
    assert_eq!(
        controller.baseline_fingerprint(Table::Settings).await,
        Some(seeded.fingerprint(Table::Settings))
    );

    assert!(controller.flush(&repo, None).await.unwrap().is_noop());
    assert_eq!(store.apply_attempts(), 0);
}

#[tokio::test]
async fn test_concurrent_flushes_do_not_double_write() {
    let (store, controller, repo) = setup(config()).await;
    repo.lock().ensure_settings(1, None);

    let (a, b) = tokio::join!(controller.flush(&repo, None), controller.flush(&repo, None));
    let statements = *a.unwrap().statements() + *b.unwrap().statements();

    assert_eq!(statements, 1);
    assert_eq!(store.transactions(), 1);
}

