/// Storage-specific errors
use thiserror::Error;

/// Result type alias using `StorageError`
pub type Result<T> = std::result::Result<T, StorageError>;

/// Storage error types
#[derive(Error, Debug)]
pub enum StorageError {
    /// Connection string could not be parsed
    #[error("Invalid database URL: {0}")]
    InvalidUrl(String),

    /// Database connection error
    #[error("Database connection error: {0}")]
    Connection(String),

    /// Migration error (conflicting schema, checksum mismatch, failed DDL)
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Database error from `SQLx`
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<StorageError> for roster_core::RosterError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Migration(e) => roster_core::RosterError::migration(e.to_string()),
            other => roster_core::RosterError::storage(other.to_string()),
        }
    }
}
