//! Domain types

mod ids;
mod startup;
mod user;

pub use ids::UserId;
pub use startup::{MigrationReport, ProbeOutcome};
pub use user::{CreateUser, User};
