//! User queries

use roster_core::{
    error::{Result, RosterError},
    types::{CreateUser, User},
};
use sqlx::PgPool;

/// SQLSTATE for `unique_violation`
const UNIQUE_VIOLATION: &str = "23505";

/// Get all users, oldest first
///
/// Reads the whole table on every call; nothing is cached in-process.
pub async fn get_all(pool: &PgPool) -> Result<Vec<User>> {
    let users = sqlx::query_as::<_, User>(
        "SELECT id, name, email, created_at FROM users ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(users)
}

/// Insert a user
///
/// `id` and `created_at` are assigned by the database. Email uniqueness is
/// enforced by the `users_email_key` constraint, not checked beforehand.
///
/// # Errors
///
/// * `RosterError::Validation` if the input is malformed
/// * `RosterError::Duplicate` if the email is already registered
pub async fn create(pool: &PgPool, user: CreateUser) -> Result<User> {
    user.validate()?;

    sqlx::query_as::<_, User>(
        "INSERT INTO users (name, email) VALUES ($1, $2)
         RETURNING id, name, email, created_at",
    )
    .bind(&user.name)
    .bind(&user.email)
    .fetch_one(pool)
    .await
    .map_err(|e| map_insert_error(e, &user.email))
}

fn map_insert_error(err: sqlx::Error, email: &str) -> RosterError {
    let is_duplicate = err
        .as_database_error()
        .and_then(|db_err| db_err.code())
        .is_some_and(|code| code == UNIQUE_VIOLATION);

    if is_duplicate {
        RosterError::Duplicate(format!("email already registered: {email}"))
    } else {
        err.into()
    }
}
