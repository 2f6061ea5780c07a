/// Roster Server - user directory API with a safe startup sequence
use clap::{Parser, Subcommand};
use roster_core::{storage::UserStore, CreateUser};
use roster_server::{
    api,
    config::RosterConfig,
    notify::{Mailer, PipelineReport, PipelineStatus},
    startup::{self, StartupError},
    state::AppState,
};
use roster_storage::{PgMigrator, PgReadinessProbe, PgStorageContext};
use std::{path::PathBuf, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "roster-server")]
#[command(about = "Roster user directory server", long_about = None)]
struct Cli {
    /// Configuration file path (defaults to ./roster.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Wait for the database, migrate, then start the HTTP server
    Serve,
    /// Wait for the database and apply pending migrations only
    Migrate,
    /// Insert a user
    AddUser {
        /// Display name
        #[arg(short, long)]
        name: String,
        /// Email address (must be unique)
        #[arg(short, long)]
        email: String,
    },
    /// List all users
    ListUsers,
    /// Send the pipeline result notification
    Notify {
        #[arg(long, value_enum)]
        status: PipelineStatus,
        /// Job name
        #[arg(long)]
        job: String,
        /// Build number or identifier
        #[arg(long)]
        build: Option<String>,
        /// Where the run's console output can be read
        #[arg(long)]
        log_url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "roster_server=info,roster_storage=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = RosterConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve => {
            serve(&config).await?;
        }
        Commands::Migrate => {
            migrate(&config).await?;
        }
        Commands::AddUser { name, email } => {
            add_user(&config, CreateUser::new(name, email)).await?;
        }
        Commands::ListUsers => {
            list_users(&config).await?;
        }
        Commands::Notify {
            status,
            job,
            build,
            log_url,
        } => {
            let report = PipelineReport {
                job,
                build,
                status,
                log_url,
            };
            notify(&config, &report).await?;
        }
    }

    Ok(())
}

async fn serve(config: &RosterConfig) -> anyhow::Result<()> {
    config.validate()?;
    let addr = config.server.socket_addr()?;

    tracing::info!("Starting Roster server");
    tracing::info!("Address: {}", addr);
    tracing::info!(
        "Database: {}",
        roster_storage::display_target(&config.database.url)?
    );

    let pool =
        roster_storage::create_pool(&config.database.url, config.database.max_connections)?;
    let probe =
        PgReadinessProbe::from_url(&config.database.url, config.database.connect_timeout())?;
    let migrator = PgMigrator::new(pool.clone());

    let cancel = CancellationToken::new();
    spawn_shutdown_listener(cancel.clone())?;

    let startup = match startup::run(
        &probe,
        &migrator,
        &config.database.readiness.retry_policy(),
        &cancel,
        || tokio::net::TcpListener::bind(addr),
    )
    .await
    {
        Ok(startup) => startup,
        Err(StartupError::Cancelled { target }) => {
            tracing::info!("Shutdown requested while waiting for database at {}", target);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let app_state = AppState::new(Arc::new(PgStorageContext::new(pool)));
    let app = api::create_router(app_state);

    tracing::info!("Server listening on {}", startup.listener.local_addr()?);

    axum::serve(startup.listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn migrate(config: &RosterConfig) -> anyhow::Result<()> {
    config.validate()?;

    let pool =
        roster_storage::create_pool(&config.database.url, config.database.max_connections)?;
    let probe =
        PgReadinessProbe::from_url(&config.database.url, config.database.connect_timeout())?;

    let cancel = CancellationToken::new();
    spawn_shutdown_listener(cancel.clone())?;

    let policy = config.database.readiness.retry_policy();
    match startup::wait_for_database(&probe, &policy, &cancel).await {
        Ok(_) => {}
        Err(StartupError::Cancelled { target }) => {
            tracing::info!("Shutdown requested while waiting for database at {}", target);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }

    let report = startup::apply_migrations(&PgMigrator::new(pool)).await?;

    if report.is_noop() {
        println!("Schema up to date ({} migrations)", report.total);
    } else {
        println!(
            "Applied {} of {} migrations: {:?}",
            report.applied.len(),
            report.total,
            report.applied
        );
    }

    Ok(())
}

async fn add_user(config: &RosterConfig, user: CreateUser) -> anyhow::Result<()> {
    config.validate()?;
    let pool =
        roster_storage::create_pool(&config.database.url, config.database.max_connections)?;
    roster_storage::run_migrations(&pool).await?;

    let storage = PgStorageContext::new(pool);
    let user = storage.create_user(user).await?;

    println!("Created user {} - {} <{}>", user.id, user.name, user.email);

    Ok(())
}

async fn list_users(config: &RosterConfig) -> anyhow::Result<()> {
    config.validate()?;
    let pool =
        roster_storage::create_pool(&config.database.url, config.database.max_connections)?;
    roster_storage::run_migrations(&pool).await?;

    let users = roster_storage::users::get_all(&pool).await?;

    println!("Users:");
    for user in users {
        println!(
            "  {} - {} <{}> (created {})",
            user.id,
            user.name,
            user.email,
            user.created_at.to_rfc3339()
        );
    }

    Ok(())
}

async fn notify(config: &RosterConfig, report: &PipelineReport) -> anyhow::Result<()> {
    config.validate_notification()?;

    let mailer = Mailer::from_settings(&config.notification)?;
    mailer.send(report).await?;

    Ok(())
}

/// Cancel `token` on Ctrl-C or SIGTERM
///
/// The handlers are installed before this returns, so a signal arriving
/// right after startup is never lost.
#[cfg(unix)]
fn spawn_shutdown_listener(token: CancellationToken) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    tokio::spawn(async move {
        tokio::select! {
            _ = interrupt.recv() => {},
            _ = terminate.recv() => {},
        }

        tracing::info!("Shutdown signal received");
        token.cancel();
    });

    Ok(())
}

#[cfg(not(unix))]
fn spawn_shutdown_listener(token: CancellationToken) -> std::io::Result<()> {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            return;
        }

        tracing::info!("Shutdown signal received");
        token.cancel();
    });

    Ok(())
}
