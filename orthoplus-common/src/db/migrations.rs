//! Database schema migrations
//!
//! Versioned, idempotent migrations tracked in the `schema_version` table.
//! Fresh databases already get the current table layout from `init`; the
//! migrations bring databases created by older builds up to date and add
//! indexes that are not part of the table definitions.
//!
//! Never modify an existing migration. Add a new one and bump
//! `CURRENT_SCHEMA_VERSION`.

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Get current schema version from database
///
/// Returns 0 if schema_version table doesn't exist or has no rows
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='schema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("✓ Migration v1 completed");
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
        info!("✓ Migration v2 completed");
    }

    Ok(())
}

async fn has_column(pool: &SqlitePool, table: &str, column: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pragma_table_info(?) WHERE name = ?",
    )
    .bind(table)
    .bind(column)
    .fetch_one(pool)
    .await?;

    Ok(count > 0)
}

/// Migration v1: idempotency key on split_transactions
///
/// Adds the column to databases that predate it, then enforces one
/// transaction per (clinic, key). NULL keys never collide in SQLite.
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    info!("Running migration v1: idempotency key on split_transactions");

    if !has_column(pool, "split_transactions", "idempotency_key").await? {
        sqlx::query("ALTER TABLE split_transactions ADD COLUMN idempotency_key TEXT")
            .execute(pool)
            .await?;
        info!("  ✓ Added idempotency_key column");
    }

    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_split_transactions_idempotency
        ON split_transactions(clinic_id, idempotency_key)
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Migration v2: explicit unassigned residual on split_transactions
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    info!("Running migration v2: unassigned_cents on split_transactions");

    if has_column(pool, "split_transactions", "unassigned_cents").await? {
        info!("  unassigned_cents column already exists - skipping");
        return Ok(());
    }

    sqlx::query(
        "ALTER TABLE split_transactions ADD COLUMN unassigned_cents INTEGER NOT NULL DEFAULT 0",
    )
    .execute(pool)
    .await?;

    info!("  ✓ Added unassigned_cents column");
    Ok(())
}
