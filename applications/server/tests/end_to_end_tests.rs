/// End-to-end tests: real PostgreSQL, real startup sequence, real HTTP
mod common;

use common::{fixtures::*, postgres::TestPostgres};
use roster_core::{CreateUser, UserStore};
use roster_server::{api, startup, state::AppState, RetryPolicy};
use roster_storage::{PgMigrator, PgReadinessProbe, PgStorageContext};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

struct RunningServer {
    base_url: String,
    storage: PgStorageContext,
    migrator: PgMigrator,
    shutdown: CancellationToken,
    _postgres: TestPostgres,
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Boot the server exactly like `roster-server serve` does
async fn start_server() -> RunningServer {
    let postgres = TestPostgres::start().await;

    let pool = roster_storage::create_pool(&postgres.database_url, 5).unwrap();
    let probe = PgReadinessProbe::from_url(&postgres.database_url, Duration::from_secs(2)).unwrap();
    let migrator = PgMigrator::new(pool.clone());
    let policy = RetryPolicy::fixed(Duration::from_millis(200), Duration::from_secs(60));
    let shutdown = CancellationToken::new();

    let startup = startup::run(&probe, &migrator, &policy, &shutdown, || {
        TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
    })
    .await
    .expect("startup failed");

    let base_url = format!("http://{}", startup.listener.local_addr().unwrap());
    let storage = PgStorageContext::new(pool);
    let app = api::create_router(AppState::new(Arc::new(storage.clone())));

    let token = shutdown.clone();
    tokio::spawn(async move {
        axum::serve(startup.listener, app)
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await
            .unwrap();
    });

    RunningServer {
        base_url,
        storage,
        migrator,
        shutdown,
        _postgres: postgres,
    }
}

async fn http_get(base_url: &str, path: &str) -> (reqwest::StatusCode, serde_json::Value) {
    let response = reqwest::get(format!("{base_url}{path}"))
        .await
        .expect("request failed");
    let status = response.status();
    let body = response
        .json::<serde_json::Value>()
        .await
        .expect("response body is not JSON");

    (status, body)
}

#[tokio::test]
#[ignore = "requires Docker for the postgres container"]
async fn test_empty_database_lists_no_users() {
    let server = start_server().await;

    let (status, body) = http_get(&server.base_url, "/users").await;

    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(body, serde_json::json!([]));
}

#[tokio::test]
#[ignore = "requires Docker for the postgres container"]
async fn test_inserted_user_is_listed() {
    let server = start_server().await;

    server
        .storage
        .create_user(CreateUser::new(ADA_NAME, ADA_EMAIL))
        .await
        .unwrap();

    let (status, body) = http_get(&server.base_url, "/users").await;

    assert_eq!(status, reqwest::StatusCode::OK);
    let users = body.as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["name"], ADA_NAME);
    assert_eq!(users[0]["email"], ADA_EMAIL);
    assert!(users[0]["id"].as_i64().unwrap() > 0);
    assert!(chrono::DateTime::parse_from_rfc3339(users[0]["created_at"].as_str().unwrap()).is_ok());
}

#[tokio::test]
#[ignore = "requires Docker for the postgres container"]
async fn test_restart_migration_is_noop() {
    use roster_core::SchemaMigrator;

    let server = start_server().await;

    // Startup already migrated; a second run (a container restart) applies nothing
    let report = server.migrator.migrate().await.unwrap();
    assert!(report.is_noop());
}
