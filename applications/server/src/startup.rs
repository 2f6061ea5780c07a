//! Startup sequence
//!
//! Three steps, strictly in order, short-circuiting on the first failure:
//!
//! 1. wait until the database accepts connections (bounded retry),
//! 2. apply pending schema migrations exactly once (fatal on failure),
//! 3. bind the HTTP listener.
//!
//! Nothing is bound before step 2 has succeeded, so a server with a missing
//! schema never accepts a request.

use roster_core::{MigrationReport, ProbeOutcome, ReadinessProbe, RosterError, SchemaMigrator};
use std::future::Future;
use std::io;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(
        "database at {target} not ready after {attempts} attempts over {}ms (last probe: {last})",
        waited.as_millis()
    )]
    DependencyTimeout {
        target: String,
        attempts: u32,
        waited: Duration,
        last: ProbeOutcome,
    },

    #[error("startup cancelled while waiting for database at {target}")]
    Cancelled { target: String },

    #[error("schema migration failed: {0}")]
    Migration(#[source] RosterError),

    #[error("failed to bind HTTP listener: {0}")]
    Bind(#[source] io::Error),
}

/// Delay schedule between readiness probes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed,
    /// `interval * 2^(attempt - 1)`, capped at `max_interval`
    Exponential { max_interval: Duration },
}

/// Bounded retry policy for the readiness wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub max_wait: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn fixed(interval: Duration, max_wait: Duration) -> Self {
        Self {
            interval,
            max_wait,
            backoff: Backoff::Fixed,
        }
    }

    pub fn exponential(interval: Duration, max_interval: Duration, max_wait: Duration) -> Self {
        Self {
            interval,
            max_wait,
            backoff: Backoff::Exponential { max_interval },
        }
    }

    /// Delay before the next probe, `None` once the deadline has passed
    ///
    /// The last delay is clipped so the final probe lands on the deadline
    /// rather than after it.
    pub fn next_delay(&self, attempts: u32, elapsed: Duration) -> Option<Duration> {
        let remaining = self
            .max_wait
            .checked_sub(elapsed)
            .filter(|remaining| !remaining.is_zero())?;

        let delay = match self.backoff {
            Backoff::Fixed => self.interval,
            Backoff::Exponential { max_interval } => {
                let exponent = attempts.saturating_sub(1).min(31);
                self.interval
                    .saturating_mul(1u32 << exponent)
                    .min(max_interval)
            }
        };

        Some(delay.min(remaining))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(1), Duration::from_secs(60))
    }
}

/// A process that made it through the startup sequence
#[derive(Debug)]
pub struct Startup<L> {
    pub listener: L,
    pub migrations: MigrationReport,
    /// Probes needed before the database reported ready
    pub attempts: u32,
}

/// Poll the database until it is ready, the policy's deadline passes, or
/// `cancel` fires
///
/// Probe failures are expected while the database boots; they are logged as
/// waiting state, never as errors. Returns the number of probes used.
pub async fn wait_for_database<P>(
    probe: &P,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<u32, StartupError>
where
    P: ReadinessProbe + ?Sized,
{
    let target = probe.target();
    let started = Instant::now();
    let mut attempts: u32 = 0;

    tracing::info!(
        database = %target,
        max_wait_ms = policy.max_wait.as_millis() as u64,
        "Waiting for database"
    );

    loop {
        attempts += 1;

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(StartupError::Cancelled { target }),
            outcome = probe.probe() => outcome,
        };

        let waited_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            ProbeOutcome::Ready => {
                tracing::info!(database = %target, attempts, waited_ms, "Database is ready");
                return Ok(attempts);
            }
            ProbeOutcome::NotReady(reason) => {
                tracing::debug!(
                    database = %target,
                    attempts,
                    waited_ms,
                    reason = %reason,
                    "Database is starting, waiting"
                );
            }
            ProbeOutcome::Unreachable(reason) => {
                tracing::debug!(
                    database = %target,
                    attempts,
                    waited_ms,
                    reason = %reason,
                    "Database unreachable, waiting"
                );
            }
        }

        let Some(delay) = policy.next_delay(attempts, started.elapsed()) else {
            return Err(StartupError::DependencyTimeout {
                target,
                attempts,
                waited: started.elapsed(),
                last: outcome,
            });
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(StartupError::Cancelled { target }),
            () = tokio::time::sleep(delay) => {}
        }
    }
}

/// Apply pending migrations once; a failure is fatal and never retried
pub async fn apply_migrations<M>(migrator: &M) -> Result<MigrationReport, StartupError>
where
    M: SchemaMigrator + ?Sized,
{
    let report = migrator.migrate().await.map_err(|e| {
        tracing::error!(error = %e, "Schema migration failed, aborting startup");
        StartupError::Migration(e)
    })?;

    tracing::info!(
        applied = report.applied.len(),
        total = report.total,
        "Schema migrations complete"
    );

    Ok(report)
}

/// Run the whole sequence: readiness wait, migrations, then `bind`
///
/// `bind` is only invoked after migrations succeeded.
pub async fn run<P, M, B, Fut, L>(
    probe: &P,
    migrator: &M,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    bind: B,
) -> Result<Startup<L>, StartupError>
where
    P: ReadinessProbe + ?Sized,
    M: SchemaMigrator + ?Sized,
    B: FnOnce() -> Fut,
    Fut: Future<Output = io::Result<L>>,
{
    let attempts = wait_for_database(probe, policy, cancel).await?;
    let migrations = apply_migrations(migrator).await?;
    let listener = bind().await.map_err(StartupError::Bind)?;

    Ok(Startup {
        listener,
        migrations,
        attempts,
    })
}
