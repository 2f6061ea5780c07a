//! Startup collaborator traits
//!
//! The startup sequence is written against these two seams so it can run
//! against PostgreSQL in production and against scripted fakes in tests.

use crate::error::Result;
use crate::types::{MigrationReport, ProbeOutcome};
use async_trait::async_trait;

/// A lightweight check confirming a dependent service can accept connections
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    /// Human readable target (`host:port`), safe to log
    ///
    /// Must never contain credentials.
    fn target(&self) -> String;

    /// Run a single probe
    ///
    /// Probe failures are data, not errors: the caller decides whether to
    /// retry.
    async fn probe(&self) -> ProbeOutcome;
}

/// Applies pending schema migrations
#[async_trait]
pub trait SchemaMigrator: Send + Sync {
    /// Apply every migration not yet recorded in the migration ledger
    ///
    /// Must be idempotent: calling it against an up-to-date schema applies
    /// nothing and succeeds. Never generates new migrations.
    async fn migrate(&self) -> Result<MigrationReport>;
}
