//! Tests for database initialization
//!
//! Covers:
//! - Automatic database file and directory creation
//! - Reopening an existing database
//! - Schema version after first run

use orthoplus_common::db::{get_schema_version, init_database};
use tempfile::TempDir;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("orthoplus.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("orthoplus.db");

    let pool1 = init_database(&db_path).await.unwrap();
    sqlx::query(
        "INSERT INTO split_configs (id, clinic_id, name, split_type, split_rules, created_by, created_at)
         VALUES ('cfg', 'clinic', 'Kept', 'FIXED', '[]', 'user', '2024-01-01T00:00:00.000000Z')",
    )
    .execute(&pool1)
    .await
    .unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM split_configs")
        .fetch_one(&pool2)
        .await
        .unwrap();

    assert_eq!(count, 1, "Existing rows must survive reopening");
}

#[tokio::test]
async fn test_schema_version_recorded() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("orthoplus.db");

    let pool = init_database(&db_path).await.unwrap();
    let version = get_schema_version(&pool).await.unwrap();

    assert!(version >= 2, "Expected migrations to run, got v{}", version);
}
