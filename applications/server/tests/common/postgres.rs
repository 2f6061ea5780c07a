//! Throwaway PostgreSQL server for end-to-end tests
//!
//! Needs a Docker daemon; tests using it are `#[ignore]`d by default.

use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};

/// Unlike the storage crate's helper of the same name, `start` returns as
/// soon as the container is up and does not poll for readiness: the
/// end-to-end tests hand the fresh server to `startup::run`, whose readiness
/// wait is part of what they exercise.
pub struct TestPostgres {
    pub database_url: String,
    _container: ContainerAsync<GenericImage>,
}

impl TestPostgres {
    /// Start a container without waiting for the server inside it
    pub async fn start() -> Self {
        let container = GenericImage::new("postgres", "16-alpine")
            .with_exposed_port(5432.tcp())
            .with_wait_for(WaitFor::message_on_stderr(
                "database system is ready to accept connections",
            ))
            .with_env_var("POSTGRES_USER", "roster")
            .with_env_var("POSTGRES_PASSWORD", "roster-test")
            .with_env_var("POSTGRES_DB", "roster")
            .start()
            .await
            .expect("Failed to start postgres container");

        let host = container.get_host().await.expect("Failed to get host");
        let port = container
            .get_host_port_ipv4(5432.tcp())
            .await
            .expect("Failed to get mapped port");

        Self {
            database_url: format!("postgres://roster:roster-test@{host}:{port}/roster"),
            _container: container,
        }
    }
}
