//! Roster Core
//!
//! Platform-agnostic domain types, traits, and error handling for Roster.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `User`, `CreateUser`, plus the startup vocabulary
//!   (`ProbeOutcome`, `MigrationReport`)
//! - **Core Traits**: `UserStore`, `ReadinessProbe`, `SchemaMigrator`
//! - **Error Handling**: Unified `RosterError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use roster_core::types::CreateUser;
//!
//! let new_user = CreateUser::new("Ada", "ada@example.com");
//! assert!(new_user.validate().is_ok());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod storage;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{Result, RosterError};
pub use storage::UserStore;
pub use traits::{ReadinessProbe, SchemaMigrator};

pub use types::{CreateUser, MigrationReport, ProbeOutcome, User, UserId};
