//! Integration tests for migrations and the migration ledger


use roster_core::SchemaMigrator;
use roster_storage::{run_migrations, PgMigrator, MIGRATOR};
use test_helpers::*;

#[tokio::test]
#[ignore = "requires Docker for the postgres container"]
async fn test_first_run_applies_everything() {
    let db = TestDb::unmigrated().await;

    let report = run_migrations(db.pool()).await.expect("migrations failed");

    assert_eq!(report.total, MIGRATOR.iter().count());
    assert_eq!(report.applied, vec![1, 2]);
}

#[tokio::test]
#[ignore = "requires Docker for the postgres container"]
async fn test_second_run_is_noop() {
    let db = TestDb::unmigrated().await;
    let migrator = PgMigrator::new(db.pool().clone());

    let first = migrator.migrate().await.expect("first run failed");
    assert!(!first.is_noop());

    let second = migrator.migrate().await.expect("second run failed");
    assert!(second.is_noop());
    assert_eq!(second.total, first.total);
}

#[tokio::test]
#[ignore = "requires Docker for the postgres container"]
async fn test_ledger_records_applied_versions() {
    let db = TestDb::new().await;

    let versions: Vec<i64> =
        sqlx::query_scalar("SELECT version FROM _sqlx_migrations WHERE success ORDER BY version")
            .fetch_all(db.pool())
            .await
            .unwrap();

    assert_eq!(versions, vec![1, 2]);
}

#[tokio::test]
#[ignore = "requires Docker for the postgres container"]
async fn test_conflicting_schema_fails() {
    let db = TestDb::unmigrated().await;

    // A hand-made table with the same name but an incompatible shape
    sqlx::query("CREATE TABLE users (id TEXT PRIMARY KEY)")
        .execute(db.pool())
        .await
        .unwrap();

    let err = PgMigrator::new(db.pool().clone())
        .migrate()
        .await
        .expect_err("migration against a conflicting schema must fail");
    assert!(matches!(err, roster_core::RosterError::Migration(_)));
}

#[tokio::test]
#[ignore = "requires Docker for the postgres container"]
async fn test_edited_migration_is_detected() {
    let db = TestDb::new().await;

    // Pretend version 1 was applied from different SQL than the binary carries
    sqlx::query("UPDATE _sqlx_migrations SET checksum = '\\x00'::bytea WHERE version = 1")
        .execute(db.pool())
        .await
        .unwrap();

    let err = run_migrations(db.pool())
        .await
        .expect_err("checksum mismatch must fail");
    assert!(matches!(err, roster_storage::StorageError::Migration(_)));
}
