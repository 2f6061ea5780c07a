use crate::users;
use async_trait::async_trait;
use roster_core::{error::Result, storage::UserStore, types::*};
use sqlx::PgPool;

/// Storage context backed by PostgreSQL
#[derive(Clone)]
pub struct PgStorageContext {
    pool: PgPool,
}

impl PgStorageContext {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for PgStorageContext {
    async fn get_all_users(&self) -> Result<Vec<User>> {
        users::get_all(&self.pool).await
    }

    async fn create_user(&self, user: CreateUser) -> Result<User> {
        users::create(&self.pool, user).await
    }
}
