/// API route modules
pub mod health;
pub mod users;

use crate::state::AppState;
use axum::{routing::get, Router};
use tower_http::trace::{DefaultMakeSpan, TraceLayer};

/// Build the application router
pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/users", get(users::list_users))
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .with_state(app_state)
}
