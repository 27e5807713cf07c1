//! Database initialization
//!
//! Creates the database file on first run, applies connection pragmas and
//! creates every table with `CREATE TABLE IF NOT EXISTS`. Versioned
//! migrations run afterwards for databases created by older builds.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open (creating if needed) the database at `db_path` and bring its schema up to date
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL allows concurrent readers alongside the single writer
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    prepare_schema(&pool).await?;

    Ok(pool)
}

/// In-memory database with the full schema
///
/// Limited to one connection that never expires: every SQLite in-memory
/// connection is a separate database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    prepare_schema(&pool).await?;

    Ok(pool)
}

async fn prepare_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await?;

    // Idempotent - safe to call on every startup
    create_schema_version_table(pool).await?;
    create_split_configs_table(pool).await?;
    create_split_transactions_table(pool).await?;
    create_audit_log_table(pool).await?;

    crate::db::migrations::run_migrations(pool).await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_split_configs_table(pool: &SqlitePool) -> Result<()> {
    // split_rules and apply_to_payment_methods hold JSON arrays
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS split_configs (
            id TEXT PRIMARY KEY,
            clinic_id TEXT NOT NULL,
            name TEXT NOT NULL,
            split_type TEXT NOT NULL CHECK (split_type IN ('PERCENTAGE', 'FIXED', 'HYBRID')),
            split_rules TEXT NOT NULL,
            apply_to_payment_methods TEXT NOT NULL DEFAULT '[]',
            minimum_amount_cents INTEGER NOT NULL DEFAULT 0 CHECK (minimum_amount_cents >= 0),
            is_active INTEGER NOT NULL DEFAULT 1,
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_split_configs_clinic_active ON split_configs(clinic_id, is_active)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_split_transactions_table(pool: &SqlitePool) -> Result<()> {
    // Append-only: rows are never updated after insert
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS split_transactions (
            id TEXT PRIMARY KEY,
            clinic_id TEXT NOT NULL,
            config_id TEXT NOT NULL REFERENCES split_configs(id),
            amount_total_cents INTEGER NOT NULL CHECK (amount_total_cents > 0),
            payment_method TEXT NOT NULL,
            computed_payouts TEXT NOT NULL,
            unassigned_cents INTEGER NOT NULL DEFAULT 0,
            idempotency_key TEXT,
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_split_transactions_clinic_created ON split_transactions(clinic_id, created_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_audit_log_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audit_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_name TEXT NOT NULL,
            clinic_id TEXT NOT NULL,
            actor_id TEXT NOT NULL,
            payload TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
