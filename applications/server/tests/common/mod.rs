//! Common test utilities and fixtures
#![allow(dead_code)]

pub mod postgres;

use async_trait::async_trait;
use chrono::Utc;
use roster_core::{CreateUser, Result, RosterError, User, UserId, UserStore};
use std::sync::Mutex;

/// In-memory `UserStore` with the same guarantees the database gives:
/// increasing ids, unique emails, insert-time timestamps
#[derive(Default)]
pub struct InMemoryStore {
    users: Mutex<Vec<User>>,
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn get_all_users(&self) -> Result<Vec<User>> {
        Ok(self.users.lock().unwrap().clone())
    }

    async fn create_user(&self, user: CreateUser) -> Result<User> {
        user.validate()?;

        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(RosterError::Duplicate(user.email));
        }

        let id = users.last().map_or(1, |u| u.id.get() + 1);
        let created = User {
            id: UserId::new(id),
            name: user.name,
            email: user.email,
            created_at: Utc::now(),
        };
        users.push(created.clone());
        Ok(created)
    }
}

/// Store whose every call fails like a lost database connection
pub struct BrokenStore;

#[async_trait]
impl UserStore for BrokenStore {
    async fn get_all_users(&self) -> Result<Vec<User>> {
        Err(RosterError::storage("connection reset by peer"))
    }

    async fn create_user(&self, _user: CreateUser) -> Result<User> {
        Err(RosterError::storage("connection reset by peer"))
    }
}

/// A local port with nothing listening on it
pub fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Test user fixtures
pub mod fixtures {
    pub const ADA_NAME: &str = "Ada";
    pub const ADA_EMAIL: &str = "ada@example.com";
}
