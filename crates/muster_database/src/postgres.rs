//! PostgreSQL backing store.

use crate::{BackingStore, DatabaseResult, FlushPlan, PgPool, establish_pool};
use async_trait::async_trait;
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use diesel::query_builder::BoxedDeleteStatement;
use diesel::sql_types::{Bool, Text};
use muster_error::{DatabaseError, DatabaseErrorKind};
use muster_models::schema::{
    debug_mirror_cache, dungeons, guild_settings, raid_attendance, raid_options,
    raid_posted_slots, raid_templates, raid_votes, raids, user_levels,
};
use muster_models::{
    DebugCacheRecord, DungeonRecord, GuildSettingsRecord, RaidAttendanceRecord, RaidOptionRecord,
    RaidPostedSlotRecord, RaidRecord, RaidTemplateRecord, RaidVoteRecord, Table, TableDelta,
    TableSet, UserLevelRecord,
};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Backing store over a pooled PostgreSQL connection.
///
/// Blocking diesel calls run on tokio's blocking pool. Each flush plan runs in
/// one transaction: deletes are batched with `= ANY`, inserts are batched
/// multi-row, and updates write only the changed columns of one row.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to `database_url` with a pool of `pool_size` connections.
    pub fn connect(database_url: &str, pool_size: u32) -> DatabaseResult<Self> {
        Ok(Self::new(establish_pool(database_url, pool_size)?))
    }

    /// Underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn with_connection<T, F>(&self, f: F) -> DatabaseResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> DatabaseResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> DatabaseResult<T> {
            let mut conn = pool.get()?;
            f(&mut conn)
        })
        .await
        .map_err(|e| DatabaseError::new(DatabaseErrorKind::TaskJoin(e.to_string())))?
    }
}

#[derive(Debug, QueryableByName)]
struct ExistsResult {
    #[diesel(sql_type = Bool)]
    exists: bool,
}

fn table_exists(conn: &mut PgConnection, table_name: &str) -> DatabaseResult<bool> {
    let query = "SELECT EXISTS (
        SELECT FROM information_schema.tables
        WHERE table_schema = current_schema() AND table_name = $1
    ) as exists";

    let result: ExistsResult = diesel::sql_query(query)
        .bind::<Text, _>(table_name)
        .get_result(conn)?;
    Ok(result.exists)
}

fn load_tables(conn: &mut PgConnection) -> DatabaseResult<TableSet> {
    let mut set = TableSet::default();
    set.set_rows(
        guild_settings::table
            .select(GuildSettingsRecord::as_select())
            .load(conn)?,
    );
    set.set_rows(dungeons::table.select(DungeonRecord::as_select()).load(conn)?);
    set.set_rows(raids::table.select(RaidRecord::as_select()).load(conn)?);
    set.set_rows(
        raid_options::table
            .select(RaidOptionRecord::as_select())
            .load(conn)?,
    );
    set.set_rows(
        raid_votes::table
            .select(RaidVoteRecord::as_select())
            .load(conn)?,
    );
    set.set_rows(
        raid_posted_slots::table
            .select(RaidPostedSlotRecord::as_select())
            .load(conn)?,
    );
    set.set_rows(
        raid_templates::table
            .select(RaidTemplateRecord::as_select())
            .load(conn)?,
    );
    set.set_rows(
        raid_attendance::table
            .select(RaidAttendanceRecord::as_select())
            .load(conn)?,
    );
    set.set_rows(
        user_levels::table
            .select(UserLevelRecord::as_select())
            .load(conn)?,
    );
    set.set_rows(
        debug_mirror_cache::table
            .select(DebugCacheRecord::as_select())
            .load(conn)?,
    );
    Ok(set)
}

/// Chunked `DELETE ... WHERE key = ANY($1)` for a single-column key.
macro_rules! delete_by_key {
    ($conn:expr, $delta:expr, $chunk:expr, $table:ident, $key:ident) => {{
        let mut statements = 0usize;
        for batch in $delta.deletes.chunks($chunk) {
            let rows = diesel::delete($table::table.filter($table::$key.eq_any(batch.to_vec())))
                .execute($conn)?;
            debug!(
                table = stringify!($table),
                kind = "DELETE",
                keys = batch.len(),
                rows,
                "Statement applied"
            );
            statements += 1;
        }
        statements
    }};
}

/// Per-row updates of changed columns, then chunked multi-row inserts.
macro_rules! write_rows {
    ($conn:expr, $delta:expr, $chunk:expr, $table:ident) => {{
        let mut statements = 0usize;
        for update in &$delta.updates {
            let rows = diesel::update($table::table.find(update.key.clone()))
                .set(&update.changes)
                .execute($conn)?;
            debug!(
                table = stringify!($table),
                kind = "UPDATE",
                columns = ?muster_models::Changeset::columns(&update.changes),
                rows,
                "Statement applied"
            );
            statements += 1;
        }
        for batch in $delta.inserts.chunks($chunk) {
            let rows = diesel::insert_into($table::table)
                .values(batch)
                .execute($conn)?;
            debug!(
                table = stringify!($table),
                kind = "INSERT",
                rows,
                "Statement applied"
            );
            statements += 1;
        }
        statements
    }};
}

fn delete_phase(conn: &mut PgConnection, delta: &TableDelta, chunk: usize) -> DatabaseResult<usize> {
    let statements = match delta {
        TableDelta::Settings(d) => delete_by_key!(conn, d, chunk, guild_settings, guild_id),
        TableDelta::Dungeons(d) => delete_by_key!(conn, d, chunk, dungeons, id),
        TableDelta::Raids(d) => delete_by_key!(conn, d, chunk, raids, id),
        TableDelta::RaidOptions(d) => delete_by_key!(conn, d, chunk, raid_options, id),
        TableDelta::RaidVotes(d) => delete_by_key!(conn, d, chunk, raid_votes, id),
        TableDelta::RaidPostedSlots(d) => delete_by_key!(conn, d, chunk, raid_posted_slots, id),
        TableDelta::RaidTemplates(d) => delete_by_key!(conn, d, chunk, raid_templates, id),
        TableDelta::RaidAttendance(d) => delete_by_key!(conn, d, chunk, raid_attendance, id),
        TableDelta::DebugCache(d) => delete_by_key!(conn, d, chunk, debug_mirror_cache, cache_key),
        TableDelta::UserLevels(d) => {
            let mut statements = 0usize;
            for batch in d.deletes.chunks(chunk) {
                let mut query: BoxedDeleteStatement<'_, Pg, user_levels::table> =
                    diesel::delete(user_levels::table).into_boxed();
                for (guild_id, user_id) in batch {
                    query = query.or_filter(
                        user_levels::guild_id
                            .eq(*guild_id)
                            .and(user_levels::user_id.eq(*user_id)),
                    );
                }
                let rows = query.execute(conn)?;
                debug!(
                    table = "user_levels",
                    kind = "DELETE",
                    keys = batch.len(),
                    rows,
                    "Statement applied"
                );
                statements += 1;
            }
            statements
        }
    };
    Ok(statements)
}

fn write_phase(conn: &mut PgConnection, delta: &TableDelta, chunk: usize) -> DatabaseResult<usize> {
    let statements = match delta {
        TableDelta::Settings(d) => write_rows!(conn, d, chunk, guild_settings),
        TableDelta::Dungeons(d) => write_rows!(conn, d, chunk, dungeons),
        TableDelta::Raids(d) => write_rows!(conn, d, chunk, raids),
        TableDelta::RaidOptions(d) => write_rows!(conn, d, chunk, raid_options),
        TableDelta::RaidVotes(d) => write_rows!(conn, d, chunk, raid_votes),
        TableDelta::RaidPostedSlots(d) => write_rows!(conn, d, chunk, raid_posted_slots),
        TableDelta::RaidTemplates(d) => write_rows!(conn, d, chunk, raid_templates),
        TableDelta::RaidAttendance(d) => write_rows!(conn, d, chunk, raid_attendance),
        TableDelta::UserLevels(d) => write_rows!(conn, d, chunk, user_levels),
        TableDelta::DebugCache(d) => write_rows!(conn, d, chunk, debug_mirror_cache),
    };
    Ok(statements)
}

#[async_trait]
impl BackingStore for PostgresStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    #[instrument(skip(self))]
    async fn validate_schema(&self) -> DatabaseResult<()> {
        let missing = self
            .with_connection(|conn| {
                let mut missing = Vec::new();
                for table in Table::INSERT_ORDER {
                    if !table_exists(conn, table.sql_name())? {
                        missing.push(table.sql_name());
                    }
                }
                Ok(missing)
            })
            .await?;

        if missing.is_empty() {
            debug!("All tables present");
            Ok(())
        } else {
            Err(DatabaseError::new(DatabaseErrorKind::TableNotFound(
                missing.join(", "),
            )))
        }
    }

    #[instrument(skip(self))]
    async fn load_all(&self) -> DatabaseResult<TableSet> {
        let set = self
            .with_connection(|conn| {
                conn.build_transaction()
                    .read_only()
                    .repeatable_read()
                    .run(load_tables)
            })
            .await?;
        info!(rows = set.total_rows(), "Loaded all tables");
        Ok(set)
    }

    #[instrument(skip(self, plan), fields(tables = plan.tables().count(), chunk = plan.chunk_size()))]
    async fn apply(&self, plan: Arc<FlushPlan>) -> DatabaseResult<usize> {
        let statements = self
            .with_connection(move |conn| {
                conn.transaction::<usize, DatabaseError, _>(|conn| {
                    let chunk = plan.chunk_size();
                    let mut statements = 0;
                    for delta in plan.delete_phase() {
                        statements += delete_phase(conn, delta, chunk)?;
                    }
                    for delta in plan.write_phase() {
                        statements += write_phase(conn, delta, chunk)?;
                    }
                    Ok(statements)
                })
            })
            .await?;
        debug!(statements, "Transaction committed");
        Ok(statements)
    }
}
