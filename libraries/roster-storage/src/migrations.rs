//! Embedded schema migrations
//!
//! The migration ledger is sqlx's `_sqlx_migrations` table. `run_migrations`
//! applies only versions missing from it and verifies the checksums of the
//! ones already applied, so it is safe to call on every start.

use crate::error::Result;
use async_trait::async_trait;
use roster_core::{MigrationReport, SchemaMigrator};
use sqlx::migrate::{Migrate, Migrator};
use sqlx::postgres::{PgConnection, PgPool};
use std::collections::HashSet;

// Embed migrations into binary
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Run database migrations
///
/// This should be called once when the application starts to ensure
/// the database schema is up to date. Never generates new migrations.
///
/// # Errors
///
/// Returns an error if the ledger cannot be read or a migration fails
pub async fn run_migrations(pool: &PgPool) -> Result<MigrationReport> {
    let already_applied: HashSet<i64> = {
        let mut pooled = pool.acquire().await?;
        let conn: &mut PgConnection = &mut pooled;
        conn.ensure_migrations_table().await?;
        conn.list_applied_migrations()
            .await?
            .into_iter()
            .map(|m| m.version)
            .collect()
    };

    MIGRATOR.run(pool).await?;

    let known: Vec<i64> = MIGRATOR
        .iter()
        .filter(|m| !m.migration_type.is_down_migration())
        .map(|m| m.version)
        .collect();

    let applied: Vec<i64> = known
        .iter()
        .copied()
        .filter(|version| !already_applied.contains(version))
        .collect();

    if applied.is_empty() {
        tracing::info!(total = known.len(), "Schema up to date");
    } else {
        tracing::info!(?applied, total = known.len(), "Applied migrations");
    }

    Ok(MigrationReport {
        applied,
        total: known.len(),
    })
}

/// `SchemaMigrator` backed by the embedded migrations
#[derive(Clone)]
pub struct PgMigrator {
    pool: PgPool,
}

impl PgMigrator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SchemaMigrator for PgMigrator {
    async fn migrate(&self) -> roster_core::Result<MigrationReport> {
        run_migrations(&self.pool)
            .await
            .map_err(|e| roster_core::RosterError::migration(e.to_string()))
    }
}
