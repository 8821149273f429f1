//! Backing store abstraction and flush plans.

use async_trait::async_trait;
use muster_error::DatabaseError;
use muster_models::{StatementKind, StatementSummary, Table, TableDelta, TableSet};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Result type for backing store operations.
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Every statement of one flush, applied in a single transaction.
///
/// Deletes run first in child-first table order, then updates and inserts in
/// parent-first order.
#[derive(Debug, Clone, PartialEq)]
pub struct FlushPlan {
    deltas: BTreeMap<Table, TableDelta>,
    chunk_size: usize,
}

impl FlushPlan {
    /// Empty plan batching deletes and inserts by at most `chunk_size` rows.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            deltas: BTreeMap::new(),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Add a table delta. Empty deltas are dropped.
    pub fn push(&mut self, delta: TableDelta) {
        if !delta.is_empty() {
            self.deltas.insert(delta.table(), delta);
        }
    }

    /// Rows per delete or insert batch.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Whether the plan holds no statements.
    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    /// Delta of one table, if the plan touches it.
    pub fn delta(&self, table: Table) -> Option<&TableDelta> {
        self.deltas.get(&table)
    }

    /// Tables the plan writes to.
    pub fn tables(&self) -> impl Iterator<Item = Table> + '_ {
        self.deltas.keys().copied()
    }

    /// Deltas in delete order.
    pub fn delete_phase(&self) -> impl Iterator<Item = &TableDelta> + '_ {
        Table::DELETE_ORDER
            .iter()
            .filter_map(|table| self.deltas.get(table))
    }

    /// Deltas in update/insert order.
    pub fn write_phase(&self) -> impl Iterator<Item = &TableDelta> + '_ {
        Table::INSERT_ORDER
            .iter()
            .filter_map(|table| self.deltas.get(table))
    }

    /// Statements the plan issues, in execution order.
    pub fn statements(&self) -> Vec<StatementSummary> {
        let deletes = self.delete_phase().flat_map(|delta| {
            delta
                .statements(self.chunk_size)
                .into_iter()
                .filter(|s| s.kind == StatementKind::Delete)
        });
        let writes = self.write_phase().flat_map(|delta| {
            delta
                .statements(self.chunk_size)
                .into_iter()
                .filter(|s| s.kind != StatementKind::Delete)
        });
        deletes.chain(writes).collect()
    }

    /// Number of statements the plan issues.
    pub fn statement_count(&self) -> usize {
        self.deltas
            .values()
            .map(|delta| delta.statement_count(self.chunk_size))
            .sum()
    }

    /// Apply every delta to a snapshot, as a successful transaction would.
    pub fn apply_to(&self, tables: &mut TableSet) {
        for delta in self.deltas.values() {
            delta.apply_to(tables);
        }
    }
}

/// Durable mirror of the row model.
///
/// The engine only reads and writes rows; it never alters the schema.
#[async_trait]
pub trait BackingStore: Send + Sync + std::fmt::Debug {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Check that every table the engine writes exists.
    async fn validate_schema(&self) -> DatabaseResult<()> {
        Ok(())
    }

    /// Read every row of every table.
    async fn load_all(&self) -> DatabaseResult<TableSet>;

    /// Apply the plan atomically, returning the number of statements issued.
    ///
    /// On error nothing from the plan is visible in the store.
    async fn apply(&self, plan: Arc<FlushPlan>) -> DatabaseResult<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use muster_models::{GuildSettingsRecord, RaidVoteRecord};

    fn vote(id: i32) -> RaidVoteRecord {
        RaidVoteRecord {
            id,
            raid_id: 1,
            kind: "day".to_string(),
            option_label: "12.03.2026".to_string(),
            user_id: id as i64,
        }
    }

    #[test]
    fn test_deletes_precede_writes() {
        let mut old = TableSet::default();
        old.insert(vote(1));
        let mut new = TableSet::default();
        new.insert(GuildSettingsRecord::new(1, None));

        let mut plan = FlushPlan::new(500);
        plan.push(old.diff(&new, Table::RaidVotes));
        plan.push(old.diff(&new, Table::Settings));
        plan.push(old.diff(&new, Table::Raids));

        let statements = plan.statements();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0].table, Table::RaidVotes);
        assert_eq!(statements[0].kind, StatementKind::Delete);
        assert_eq!(statements[1].table, Table::Settings);
        assert_eq!(plan.statement_count(), 2);
        assert_eq!(plan.tables().count(), 2);
    }
}
