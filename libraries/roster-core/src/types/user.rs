/// User domain type
use crate::error::{Result, RosterError};
use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user record
///
/// Owned by the database: `id` and `created_at` are assigned on insert and
/// never change afterwards. Serializes `created_at` as RFC 3339.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-support", derive(sqlx::FromRow))]
pub struct User {
    /// Unique, system-assigned identifier
    pub id: UserId,

    /// Display name
    pub name: String,

    /// Email address, unique across all users
    pub email: String,

    /// Insert timestamp
    pub created_at: DateTime<Utc>,
}

/// Input for inserting a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
}

impl CreateUser {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Reject obviously malformed input
    ///
    /// Uniqueness is not checked here; that is the database's job.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(RosterError::validation("name must not be empty"));
        }

        let mut parts = self.email.split('@');
        let local = parts.next().unwrap_or_default();
        let domain = parts.next().unwrap_or_default();
        if local.is_empty() || domain.is_empty() || parts.next().is_some() {
            return Err(RosterError::validation(format!(
                "invalid email address: {:?}",
                self.email
            )));
        }

        Ok(())
    }
}
