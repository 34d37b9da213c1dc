//! # Schema Migrations
//!
//! The schema ships inside the binary via `sqlx::migrate!` and is applied in
//! filename order when a [`Database`](crate::Database) opens.
//!
//! ```text
//! migrations/sqlite/
//! ├── 001_initial_schema.sql      tables, CHECK constraints, indexes
//! └── 002_append_only_guards.sql  triggers refusing UPDATE/DELETE on
//!                                 stock_log and sale_lines
//! ```
//!
//! Applied migrations are never edited; changes go in a new numbered file.
//! The append-only triggers stay: a ledger correction is a new entry.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every migration not yet recorded in `_sqlx_migrations`.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    debug!(known = MIGRATOR.migrations.len(), "Applying pending migrations");
    MIGRATOR.run(pool).await?;
    Ok(())
}

/// `(known, applied)`. A store that was never migrated reports zero applied.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((MIGRATOR.migrations.len(), applied as usize))
}
