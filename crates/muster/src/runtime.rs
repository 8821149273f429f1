//! Process lifecycle: open the store, bootstrap, flush periodically, shut down.

use crate::{MusterConfig, StoreBackend};
use derive_getters::Getters;
use muster_database::{BackingStore, MemoryStore, PostgresStore};
use muster_error::MusterResult;
use muster_models::{Fingerprint, Table};
use muster_persistence::{FlushController, FlushReport};
use muster_repository::{Repository, SharedRepository};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use strum::IntoEnumIterator;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, instrument, warn};

/// Row count and fingerprint of one table.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct TableStatus {
    /// Table
    table: Table,
    /// Rows held in memory
    rows: usize,
    /// Fingerprint of those rows
    fingerprint: Fingerprint,
}

/// Open the backing store named by the configuration.
pub fn open_store(config: &MusterConfig) -> MusterResult<Arc<dyn BackingStore>> {
    match config.database().backend() {
        StoreBackend::Postgres => {
            let url = config.database_url()?;
            let store = PostgresStore::connect(&url, *config.database().pool_size())?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            warn!("Using in-memory store; nothing will survive a restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// A row model bound to its flush controller.
#[derive(Debug)]
pub struct Muster {
    repo: SharedRepository,
    controller: Arc<FlushController>,
    shutdown: watch::Sender<bool>,
    interval: Duration,
}

impl Muster {
    /// Bind an empty row model to `store`. Call [`Muster::load`] before use.
    pub fn new(store: Arc<dyn BackingStore>, config: &MusterConfig) -> Self {
        let (shutdown, signal) = watch::channel(false);
        let controller =
            FlushController::new(store, config.persistence().clone()).with_shutdown(signal);
        Self {
            repo: Repository::new().into_shared(),
            controller: Arc::new(controller),
            shutdown,
            interval: config.flush_interval(),
        }
    }

    /// Open the configured store and load every table from it.
    ///
    /// Fails if the store is unreachable or its schema is incomplete; the
    /// process must not continue with an empty model.
    #[instrument(skip(config))]
    pub async fn bootstrap(config: &MusterConfig) -> MusterResult<Self> {
        let store = open_store(config)?;
        let muster = Self::new(store, config);
        muster.load().await?;
        Ok(muster)
    }

    /// Load every table into the row model.
    pub async fn load(&self) -> MusterResult<usize> {
        Ok(self.controller.load(&self.repo).await?)
    }

    /// The row model, for business logic to mutate.
    pub fn repository(&self) -> &SharedRepository {
        &self.repo
    }

    /// The flush controller.
    pub fn controller(&self) -> &Arc<FlushController> {
        &self.controller
    }

    /// Flush the tables marked dirty.
    pub async fn flush_dirty(&self) -> MusterResult<FlushReport> {
        Ok(self.controller.flush_dirty(&self.repo).await?)
    }

    /// Flush every table whose fingerprint moved.
    pub async fn flush_all(&self) -> MusterResult<FlushReport> {
        Ok(self.controller.flush(&self.repo, None).await?)
    }

    /// Make any retrying flush give up.
    pub fn signal_shutdown(&self) {
        // No receiver means no flush can be waiting
        let _ = self.shutdown.send(true);
    }

    /// Per-table row counts and fingerprints of the row model.
    pub fn status(&self) -> Vec<TableStatus> {
        let repo = self.repo.lock();
        let tables = repo.tables();
        Table::iter()
            .map(|table| TableStatus {
                table,
                rows: tables.len(table),
                fingerprint: tables.fingerprint(table),
            })
            .collect()
    }

    /// Flush dirty tables every interval until `stop` resolves, then flush
    /// everything once more.
    ///
    /// Failed periodic flushes are logged and retried on the next tick; their
    /// hints stay marked. The final flush error, if any, is returned.
    #[instrument(skip(self, stop), fields(interval_secs = self.interval.as_secs()))]
    pub async fn run_until<F>(&self, stop: F) -> MusterResult<FlushReport>
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;
        tokio::pin!(stop);

        info!("Flush loop running");
        loop {
            tokio::select! {
                _ = &mut stop => break,
                _ = ticker.tick() => {}
            }

            match self.controller.flush_dirty(&self.repo).await {
                Ok(report) if !report.is_noop() => {
                    info!(statements = *report.statements(), "Periodic flush committed");
                }
                Ok(_) => {}
                Err(e) if e.is_cancelled() => break,
                Err(e) => error!(error = %e, "Periodic flush failed; will retry"),
            }
        }

        info!("Flush loop stopping; writing final flush");
        let report = self.flush_all().await?;
        info!(statements = *report.statements(), "Final flush committed");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use muster_models::TableSet;

    fn memory_config() -> MusterConfig {
        MusterConfig::default().with_overrides(None, Some(StoreBackend::Memory))
    }

    #[tokio::test]
    async fn test_bootstrap_memory_backend() {
        let muster = Muster::bootstrap(&memory_config()).await.unwrap();
        assert!(muster.controller().is_loaded().await);

        let status = muster.status();
        assert_eq!(status.len(), Table::COUNT);
        assert!(status.iter().all(|s| *s.rows() == 0));
        assert_eq!(
            *status[0].fingerprint(),
            TableSet::default().fingerprint(*status[0].table())
        );
    }
}
