//! In-process backing store.

use crate::{BackingStore, DatabaseResult, FlushPlan};
use async_trait::async_trait;
use muster_error::{DatabaseError, DatabaseErrorKind};
use muster_models::{StatementSummary, Table, TableSet};
use parking_lot::Mutex;
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, instrument};

#[derive(Debug, Default)]
struct MemoryState {
    tables: TableSet,
    log: Vec<StatementSummary>,
    committed: usize,
    attempts: usize,
    loads: usize,
    failures: VecDeque<DatabaseErrorKind>,
    missing: BTreeSet<Table>,
}

/// Backing store held in memory, with the same all-or-nothing semantics as
/// the PostgreSQL store.
///
/// Keeps a log of applied statements and can be told to fail upcoming calls,
/// which makes it the store of choice for tests and for running without a
/// database.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with `tables`.
    pub fn with_tables(tables: TableSet) -> Self {
        let store = Self::new();
        store.state.lock().tables = tables;
        store
    }

    /// Copy of the stored rows.
    pub fn tables(&self) -> TableSet {
        self.state.lock().tables.clone()
    }

    /// Statements applied by committed transactions, in order.
    pub fn statement_log(&self) -> Vec<StatementSummary> {
        self.state.lock().log.clone()
    }

    /// Forget the statement log.
    pub fn clear_log(&self) {
        self.state.lock().log.clear();
    }

    /// Committed transactions.
    pub fn transactions(&self) -> usize {
        self.state.lock().committed
    }

    /// Calls to `apply`, failed ones included.
    pub fn apply_attempts(&self) -> usize {
        self.state.lock().attempts
    }

    /// Calls to `load_all`.
    pub fn loads(&self) -> usize {
        self.state.lock().loads
    }

    /// Make the next `count` calls to `load_all` or `apply` fail with `kind`.
    pub fn fail_next(&self, count: usize, kind: DatabaseErrorKind) {
        let mut state = self.state.lock();
        state
            .failures
            .extend(std::iter::repeat_n(kind, count));
    }

    /// Report `table` as absent from the schema.
    pub fn drop_table(&self, table: Table) {
        self.state.lock().missing.insert(table);
    }

    fn take_failure(state: &mut MemoryState) -> DatabaseResult<()> {
        match state.failures.pop_front() {
            Some(kind) => {
                debug!(error = %kind, "Injected failure");
                Err(DatabaseError::new(kind))
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BackingStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn validate_schema(&self) -> DatabaseResult<()> {
        let state = self.state.lock();
        if state.missing.is_empty() {
            return Ok(());
        }
        let names: Vec<_> = state.missing.iter().map(|table| table.sql_name()).collect();
        Err(DatabaseError::new(DatabaseErrorKind::TableNotFound(
            names.join(", "),
        )))
    }

    async fn load_all(&self) -> DatabaseResult<TableSet> {
        let mut state = self.state.lock();
        state.loads += 1;
        Self::take_failure(&mut state)?;
        Ok(state.tables.clone())
    }

    #[instrument(skip(self, plan), fields(tables = plan.tables().count()))]
    async fn apply(&self, plan: Arc<FlushPlan>) -> DatabaseResult<usize> {
        let mut state = self.state.lock();
        state.attempts += 1;
        Self::take_failure(&mut state)?;

        let mut next = state.tables.clone();
        plan.apply_to(&mut next);
        let statements = plan.statements();
        let count = statements.len();

        state.tables = next;
        state.log.extend(statements);
        state.committed += 1;
        debug!(statements = count, "Transaction committed");
        Ok(count)
    }
}
