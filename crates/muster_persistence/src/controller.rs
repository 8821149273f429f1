//! Flush controller.

use crate::{Backoff, PersistenceConfig};
use derive_getters::Getters;
use muster_database::{BackingStore, FlushPlan};
use muster_error::{DatabaseError, FlushError, FlushErrorKind};
use muster_models::{Fingerprint, Fingerprints, Table, TableSet};
use muster_repository::SharedRepository;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, instrument, warn};

/// How the candidate tables of a flush were chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum FlushScope {
    /// Only the tables named by dirty hints
    Hinted,
    /// Every table, because no hints were given or the hint set was empty
    Full,
    /// Every table, forced by the periodic self-heal
    SelfHeal,
}

/// Outcome of a successful flush.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct FlushReport {
    /// How candidates were chosen
    scope: FlushScope,
    /// Tables whose rows were written
    tables: Vec<Table>,
    /// Statements issued in the committed transaction
    statements: usize,
    /// Attempts used, zero when nothing had changed
    attempts: u32,
}

impl FlushReport {
    fn noop(scope: FlushScope) -> Self {
        Self {
            scope,
            tables: Vec::new(),
            statements: 0,
            attempts: 0,
        }
    }

    /// Whether the flush found nothing to write.
    pub fn is_noop(&self) -> bool {
        self.statements == 0
    }
}

/// Last state known to be persisted.
#[derive(Debug, Default)]
struct FlushState {
    baseline: TableSet,
    fingerprints: Fingerprints,
    hinted_flushes: u64,
    loaded: bool,
}

/// Keeps the backing store in step with the in-memory row model.
///
/// Each flush narrows the candidate tables by dirty hints, drops tables whose
/// fingerprint matches the persisted baseline, diffs the rest against that
/// baseline and applies the result in one transaction. Transient store errors
/// are retried with exponential backoff. A failed flush leaves both the row
/// model and the baseline untouched, so the next flush retries the same work.
///
/// Flushes are serialized: a second caller waits for the one in flight.
#[derive(Debug)]
pub struct FlushController {
    store: Arc<dyn BackingStore>,
    config: PersistenceConfig,
    backoff: Backoff,
    state: Mutex<FlushState>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl FlushController {
    /// Controller writing to `store`.
    pub fn new(store: Arc<dyn BackingStore>, config: PersistenceConfig) -> Self {
        let fingerprints = TableSet::default().fingerprints();
        Self {
            store,
            backoff: Backoff::from_config(&config),
            config,
            state: Mutex::new(FlushState {
                fingerprints,
                ..FlushState::default()
            }),
            shutdown: None,
        }
    }

    /// Abandon retries once `shutdown` holds `true`.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Settings in use.
    pub fn config(&self) -> &PersistenceConfig {
        &self.config
    }

    /// Store flushed to.
    pub fn store(&self) -> &Arc<dyn BackingStore> {
        &self.store
    }

    /// Read every table into `repo` and take it as the persisted baseline.
    ///
    /// Returns the number of rows loaded. Any error is fatal to the caller:
    /// the row model is left untouched rather than half-filled.
    #[instrument(skip(self, repo), fields(store = self.store.name()))]
    pub async fn load(&self, repo: &SharedRepository) -> Result<usize, DatabaseError> {
        let mut state = self.state.lock().await;

        self.store.validate_schema().await?;
        let tables = self.store.load_all().await.map_err(|e| {
            error!(error = %e, "Bootstrap load failed");
            e
        })?;

        let rows = tables.total_rows();
        state.fingerprints = tables.fingerprints();
        repo.lock().replace_tables(tables.clone());
        state.baseline = tables;
        state.hinted_flushes = 0;
        state.loaded = true;

        info!(rows, global = %state.fingerprints.global(), "Row model loaded");
        Ok(rows)
    }

    /// Persist changes in `hints`, or in every table when `hints` is `None`
    /// or empty.
    ///
    /// Every full-scope flush restarts the self-heal count; the hinted flush
    /// that reaches `full_scan_every` is widened to every table.
    ///
    /// # Errors
    ///
    /// - `Store` when the store rejects the flush permanently
    /// - `RetriesExhausted` when every attempt failed transiently
    /// - `Cancelled` when shutdown was signalled between attempts
    #[instrument(skip(self, repo, hints), fields(store = self.store.name()))]
    pub async fn flush(
        &self,
        repo: &SharedRepository,
        hints: Option<BTreeSet<Table>>,
    ) -> Result<FlushReport, FlushError> {
        let mut state = self.state.lock().await;
        if !state.loaded {
            debug!("Flushing before load; baseline is empty");
        }

        let hints = hints.filter(|hints| !hints.is_empty());
        let (scope, candidates) = match hints {
            None => {
                state.hinted_flushes = 0;
                (FlushScope::Full, Table::all())
            }
            Some(hints) => {
                state.hinted_flushes += 1;
                if state.hinted_flushes >= (*self.config.full_scan_every()).max(1) {
                    debug!(flush = state.hinted_flushes, "Self-heal flush widened to all tables");
                    state.hinted_flushes = 0;
                    (FlushScope::SelfHeal, Table::all())
                } else {
                    (FlushScope::Hinted, hints)
                }
            }
        };

        // Fingerprint gate and snapshot, under the row model lock
        let (changed, snapshot) = {
            let repo = repo.lock();
            let live = repo.tables();
            let mut changed: Vec<(Table, Fingerprint)> = Vec::new();
            let mut snapshot = TableSet::default();
            for table in candidates {
                let fingerprint = live.fingerprint(table);
                if state.fingerprints.get(table) == Some(fingerprint) {
                    continue;
                }
                snapshot.copy_table_from(table, live);
                changed.push((table, fingerprint));
            }
            (changed, snapshot)
        };

        if changed.is_empty() {
            debug!(%scope, "No table changed");
            return Ok(FlushReport::noop(scope));
        }

        let mut plan = FlushPlan::new(*self.config.chunk_size());
        for (table, _) in &changed {
            plan.push(state.baseline.diff(&snapshot, *table));
        }

        if plan.is_empty() {
            // Content identical to the baseline; only the recorded digests were stale.
            for (table, fingerprint) in changed {
                state.fingerprints.insert(table, fingerprint);
            }
            return Ok(FlushReport::noop(scope));
        }

        let tables: Vec<Table> = plan.tables().collect();
        let (statements, attempts) = self.apply_with_retry(Arc::new(plan)).await?;

        for (table, fingerprint) in changed {
            state.baseline.copy_table_from(table, &snapshot);
            state.fingerprints.insert(table, fingerprint);
        }

        info!(%scope, tables = ?tables, statements, attempts, "Flush committed");
        Ok(FlushReport {
            scope,
            tables,
            statements,
            attempts,
        })
    }

    /// Flush the tables the row model marked dirty.
    ///
    /// The hints are drained up front and marked again if the flush fails.
    pub async fn flush_dirty(&self, repo: &SharedRepository) -> Result<FlushReport, FlushError> {
        let hints = repo.lock().take_dirty();
        let result = self.flush(repo, Some(hints.clone())).await;
        if result.is_err() {
            let mut repo = repo.lock();
            for table in hints {
                repo.mark_dirty(table);
            }
        }
        result
    }

    async fn apply_with_retry(&self, plan: Arc<FlushPlan>) -> Result<(usize, u32), FlushError> {
        let max_attempts = (*self.config.max_attempts()).max(1);
        let mut shutdown = self.shutdown.clone();
        let mut delays = self.backoff.schedule();
        let mut attempt = 0u32;

        loop {
            if is_shut_down(shutdown.as_ref()) {
                warn!(attempts = attempt, "Flush abandoned for shutdown");
                return Err(FlushError::new(FlushErrorKind::Cancelled(attempt)));
            }

            attempt += 1;
            let err = match self.store.apply(plan.clone()).await {
                Ok(statements) => return Ok((statements, attempt)),
                Err(err) => err,
            };

            if !err.is_transient() {
                error!(attempt, error = %err, "Flush rejected by store");
                return Err(FlushError::new(FlushErrorKind::Store(err)));
            }
            if attempt >= max_attempts {
                error!(attempts = attempt, error = %err, "Flush failed after all attempts");
                return Err(FlushError::new(FlushErrorKind::RetriesExhausted {
                    attempts: attempt,
                    last: err,
                }));
            }

            let delay = delays.next().unwrap_or_else(|| self.backoff.max_delay());
            warn!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Transient store error, retrying flush"
            );
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown_signalled(&mut shutdown) => {
                    warn!(attempts = attempt, "Flush abandoned for shutdown");
                    return Err(FlushError::new(FlushErrorKind::Cancelled(attempt)));
                }
            }
        }
    }

    /// Whether `load` has succeeded.
    pub async fn is_loaded(&self) -> bool {
        self.state.lock().await.loaded
    }

    /// Hinted flushes since the last full-scope flush.
    pub async fn hinted_flushes(&self) -> u64 {
        self.state.lock().await.hinted_flushes
    }

    /// Persisted fingerprint of one table.
    pub async fn baseline_fingerprint(&self, table: Table) -> Option<Fingerprint> {
        self.state.lock().await.fingerprints.get(table)
    }

    /// Persisted fingerprints of every table.
    pub async fn baseline_fingerprints(&self) -> Fingerprints {
        self.state.lock().await.fingerprints.clone()
    }

    /// Digest over every persisted table fingerprint.
    pub async fn global_fingerprint(&self) -> Fingerprint {
        self.state.lock().await.fingerprints.global()
    }

    /// Copy of the rows last known to be persisted.
    pub async fn baseline(&self) -> TableSet {
        self.state.lock().await.baseline.clone()
    }
}

fn is_shut_down(shutdown: Option<&watch::Receiver<bool>>) -> bool {
    shutdown.is_some_and(|rx| *rx.borrow())
}

/// Resolves once shutdown is signalled; pending forever without a signal.
async fn shutdown_signalled(shutdown: &mut Option<watch::Receiver<bool>>) {
    match shutdown {
        Some(rx) => {
            // A dropped sender can never signal
            if rx.wait_for(|stop| *stop).await.is_err() {
                std::future::pending::<()>().await
            }
        }
        None => std::future::pending::<()>().await,
    }
}
