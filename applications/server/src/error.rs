/// Server error types
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use roster_core::RosterError;
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Database error: {0}")]
    Database(#[from] RosterError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Notification error: {0}")]
    Notification(String),
}

impl From<roster_storage::StorageError> for ServerError {
    fn from(err: roster_storage::StorageError) -> Self {
        // Convert StorageError -> RosterError -> ServerError
        ServerError::Database(err.into())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ServerError::Database(RosterError::Validation(msg)) => (StatusCode::BAD_REQUEST, msg),
            ServerError::Database(RosterError::Duplicate(msg)) => (StatusCode::CONFLICT, msg),
            ServerError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            ServerError::Config(ref msg) => {
                tracing::error!("Config error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Configuration error".to_string(),
                )
            }
            ServerError::Notification(ref msg) => {
                tracing::error!("Notification error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Notification error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn storage_failures_do_not_leak_details() {
        let response =
            ServerError::Database(RosterError::storage("password authentication failed"))
                .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body, json!({ "error": "Database error" }));
    }

    #[tokio::test]
    async fn migration_failures_are_opaque_too() {
        let response = ServerError::Database(RosterError::migration("checksum mismatch"))
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"], "Database error");
    }

    #[test]
    fn client_errors_keep_their_status() {
        let cases = [
            (
                ServerError::Database(RosterError::validation("bad email")),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServerError::Database(RosterError::Duplicate("ada@example.com".into())),
                StatusCode::CONFLICT,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}
