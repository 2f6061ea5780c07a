//! Storage trait for the user collection

use crate::error::Result;
use crate::types::{CreateUser, User};
use async_trait::async_trait;

/// Storage context providing access to user records
///
/// The HTTP layer only ever talks to this trait, so handlers can be exercised
/// against an in-memory store without a database.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Get every user, ordered by ascending id
    async fn get_all_users(&self) -> Result<Vec<User>>;

    /// Insert a new user; the store assigns `id` and `created_at`
    async fn create_user(&self, user: CreateUser) -> Result<User>;
}
