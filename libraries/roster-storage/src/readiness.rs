//! Database readiness probe
//!
//! One probe is one short-lived connection followed by `SELECT 1`, opened
//! outside the pool.

use crate::error::Result;
use async_trait::async_trait;
use roster_core::{ProbeOutcome, ReadinessProbe};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use std::time::Duration;

/// SQLSTATE classes meaning "server is up but not accepting work yet":
/// `57P` operator intervention (`57P03 cannot_connect_now`) and `53`
/// insufficient resources (`53300 too_many_connections`).
const NOT_READY_SQLSTATE_PREFIXES: &[&str] = &["57P", "53"];

/// Readiness probe against a PostgreSQL server
#[derive(Debug, Clone)]
pub struct PgReadinessProbe {
    options: PgConnectOptions,
    connect_timeout: Duration,
}

impl PgReadinessProbe {
    pub fn new(options: PgConnectOptions, connect_timeout: Duration) -> Self {
        Self {
            options,
            connect_timeout,
        }
    }

    /// Build a probe from a connection string
    ///
    /// Host, port and user name (the credential identity) come from the URL.
    pub fn from_url(database_url: &str, connect_timeout: Duration) -> Result<Self> {
        Ok(Self::new(crate::connect_options(database_url)?, connect_timeout))
    }

    pub fn username(&self) -> &str {
        self.options.get_username()
    }
}

#[async_trait]
impl ReadinessProbe for PgReadinessProbe {
    fn target(&self) -> String {
        format!("{}:{}", self.options.get_host(), self.options.get_port())
    }

    async fn probe(&self) -> ProbeOutcome {
        let attempt = async {
            let mut conn = PgConnection::connect_with(&self.options).await?;
            sqlx::query("SELECT 1").execute(&mut conn).await?;
            conn.close().await
        };

        match tokio::time::timeout(self.connect_timeout, attempt).await {
            Ok(Ok(())) => ProbeOutcome::Ready,
            Ok(Err(err)) => classify_connect_error(&err),
            Err(_) => ProbeOutcome::Unreachable(format!(
                "no response within {}ms",
                self.connect_timeout.as_millis()
            )),
        }
    }
}

/// Map a connection error onto a probe outcome
///
/// A server that answers with anything other than a "not now" SQLSTATE is
/// accepting connections, even when it rejects our credentials: the same
/// rule `pg_isready` follows.
pub fn classify_connect_error(err: &sqlx::Error) -> ProbeOutcome {
    match err {
        sqlx::Error::Database(db_err) => {
            let not_ready = db_err.code().is_some_and(|code| {
                NOT_READY_SQLSTATE_PREFIXES
                    .iter()
                    .any(|prefix| code.starts_with(prefix))
            });
            if not_ready {
                ProbeOutcome::NotReady(db_err.message().to_string())
            } else {
                ProbeOutcome::Ready
            }
        }
        sqlx::Error::Io(e) => ProbeOutcome::Unreachable(e.to_string()),
        sqlx::Error::Tls(e) => ProbeOutcome::Unreachable(format!("tls: {e}")),
        sqlx::Error::PoolTimedOut => ProbeOutcome::Unreachable("timed out".to_string()),
        // Something answered, but not with a usable protocol exchange.
        other => ProbeOutcome::NotReady(other.to_string()),
    }
}
