/// User API routes
use crate::{error::Result, state::AppState};
use axum::{extract::State, Json};
use roster_core::types::User;

/// GET /users
/// List every user, oldest first
///
/// Re-reads the table on every request; there is no in-process cache.
pub async fn list_users(State(app_state): State<AppState>) -> Result<Json<Vec<User>>> {
    let users = app_state.store.get_all_users().await?;
    Ok(Json(users))
}
