//! Roster Server Library
//!
//! HTTP API over the user collection, plus the startup sequence that brings
//! the process from "container launched" to "accepting requests" in a safe
//! order relative to the database.
//!
//! This library exposes the core components for testing purposes.

pub mod api;
pub mod config;
pub mod error;
pub mod notify;
pub mod startup;
pub mod state;

// Re-export commonly used types for convenience
pub use config::RosterConfig;
pub use error::{Result, ServerError};
pub use startup::{RetryPolicy, StartupError};
pub use state::AppState;
