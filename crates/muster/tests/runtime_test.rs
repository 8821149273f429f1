use muster::{
    DatabaseErrorKind, MemoryStore, Muster, MusterConfig, NewRaid, OptionKind,
    StoreBackend, Table,
};
use std::sync::Arc;
use std::time::Duration;

fn config() -> MusterConfig {
    let config = MusterConfig::default().with_overrides(None, Some(StoreBackend::Memory));
    let persistence = config.persistence().clone().with_jitter(false);
    config.with_persistence(persistence)
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_flushes_then_writes_final_flush() {
    let store = Arc::new(MemoryStore::new());
    let muster = Muster::new(store.clone(), &config());
    muster.load().await.unwrap();

    let stop = async {
        muster.repository().lock().ensure_settings(1, Some("Raiders"));
        // Two ticks at the default 30 s interval
        tokio::time::sleep(Duration::from_secs(65)).await;
        let raid = muster
            .repository()
            .lock()
            .create_raid(NewRaid {
                guild_id: 1,
                channel_id: 10,
                creator_id: 20,
                dungeon: "Nanos".to_string(),
                min_players: 2,
            });
        muster
            .repository()
            .lock()
            .add_raid_options(raid.id, ["12.03.2026"], Vec::<&str>::new());
        muster
            .repository()
            .lock()
            .toggle_vote(raid.id, OptionKind::Day, "12.03.2026", 7);
    };

    let report = muster.run_until(stop).await.unwrap();

    assert_eq!(store.transactions(), 2);
    assert_eq!(report.tables(), &vec![Table::Raids, Table::RaidOptions, Table::RaidVotes]);
    assert_eq!(store.tables(), *muster.repository().lock().tables());
}

#[tokio::test(start_paused = true)]
async fn test_periodic_failure_is_retried_next_tick() {
    let store = Arc::new(MemoryStore::new());
    let muster = Muster::new(store.clone(), &config());
    muster.load().await.unwrap();
    muster.repository().lock().ensure_settings(1, None);

    store.fail_next(1, DatabaseErrorKind::Query("constraint".to_string()));
    let stop = tokio::time::sleep(Duration::from_secs(31));
    let report = muster.run_until(stop).await.unwrap();

    // The failed tick left the hint marked; the final flush wrote the row
    assert_eq!(*report.statements(), 1);
    assert_eq!(store.tables().settings.len(), 1);
    assert_eq!(store.apply_attempts(), 2);
    assert_eq!(store.transactions(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unhinted_change_is_caught_next_tick() {
    let store = Arc::new(MemoryStore::new());
    let muster = Muster::new(store.clone(), &config());
    muster.load().await.unwrap();
    {
        let mut repo = muster.repository().lock();
        repo.ensure_settings(1, Some("Raiders"));
        repo.take_dirty();
    }

    let stop = async {
        tokio::time::sleep(Duration::from_secs(31)).await;
        // Written by the tick, before the final flush
        assert_eq!(store.tables().settings.len(), 1);
        assert_eq!(store.transactions(), 1);
    };
    let report = muster.run_until(stop).await.unwrap();

    assert!(report.is_noop());
    assert_eq!(store.transactions(), 1);
}

#[tokio::test]
async fn test_bootstrap_fails_when_store_is_down() {
    let store = Arc::new(MemoryStore::new());
    store.fail_next(1, DatabaseErrorKind::Connection("refused".to_string()));
    let muster = Muster::new(store.clone(), &config());

    assert!(muster.load().await.is_err());
    assert!(!muster.controller().is_loaded().await);
}
