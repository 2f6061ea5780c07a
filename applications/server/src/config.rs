/// Server configuration
///
/// Assembled once at process start and handed to whoever needs it; nothing
/// else in the crate reads the environment.
use crate::error::{Result, ServerError};
use crate::startup::{Backoff, RetryPolicy};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "roster.toml";

/// Conventional variables honoured on top of the `ROSTER__` namespace
const DATABASE_URL_VAR: &str = "DATABASE_URL";
const NOTIFY_RECIPIENT_VAR: &str = "NOTIFY_RECIPIENT";
const SMTP_PASSWORD_VAR: &str = "SMTP_PASSWORD";

#[derive(Debug, Clone, Deserialize)]
pub struct RosterConfig {
    #[serde(default = "default_server")]
    pub server: ServerSettings,

    #[serde(default = "default_database")]
    pub database: DatabaseSettings,

    #[serde(default = "default_notification")]
    pub notification: NotificationSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default)]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Upper bound on a single readiness probe
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_readiness")]
    pub readiness: ReadinessSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReadinessSettings {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Give up waiting for the database after this long
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,

    #[serde(default)]
    pub backoff: BackoffKind,

    /// Cap for exponential backoff
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    #[default]
    Fixed,
    Exponential,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationSettings {
    /// Who receives pipeline notifications
    #[serde(default)]
    pub recipient: Option<String>,

    /// From address; defaults to the SMTP user name
    #[serde(default)]
    pub sender: Option<String>,

    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,

    /// Defaults to the conventional port for `tls`
    #[serde(default)]
    pub smtp_port: Option<u16>,

    #[serde(default)]
    pub smtp_username: Option<String>,

    #[serde(default)]
    pub smtp_password: Option<Secret>,

    #[serde(default)]
    pub tls: SmtpTls,

    #[serde(default = "default_smtp_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpTls {
    #[default]
    Starttls,
    Tls,
    None,
}

impl SmtpTls {
    /// Submission port conventionally paired with this mode
    pub fn default_port(self) -> u16 {
        match self {
            SmtpTls::Starttls => 587,
            SmtpTls::Tls => 465,
            SmtpTls::None => 25,
        }
    }
}

/// A credential that never shows up in logs or debug output
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw value; only hand this to the transport that needs it
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([redacted])")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[redacted]")
    }
}

impl RosterConfig {
    /// Load configuration from file and the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, std::env::vars().collect())
    }

    /// Load configuration from file and an explicit set of variables
    ///
    /// Precedence, lowest first: defaults, TOML file, `ROSTER__*` variables
    /// (`__` separates sections, e.g. `ROSTER__SERVER__PORT`), then the
    /// conventional `DATABASE_URL`, `NOTIFY_RECIPIENT` and `SMTP_PASSWORD`.
    pub fn load_with_env(path: Option<&Path>, vars: HashMap<String, String>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        settings = settings
            .add_source(
                config::Environment::with_prefix("ROSTER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(vars.clone().into_iter().collect())),
            )
            .set_override_option("database.url", vars.get(DATABASE_URL_VAR).cloned())
            .and_then(|s| {
                s.set_override_option(
                    "notification.recipient",
                    vars.get(NOTIFY_RECIPIENT_VAR).cloned(),
                )
            })
            .and_then(|s| {
                s.set_override_option(
                    "notification.smtp_password",
                    vars.get(SMTP_PASSWORD_VAR).cloned(),
                )
            })
            .map_err(|e| ServerError::Config(e.to_string()))?;

        let config = settings
            .build()
            .map_err(|e| ServerError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Validate everything `serve` and `migrate` depend on
    pub fn validate(&self) -> Result<()> {
        if self.database.url.is_empty() {
            return Err(ServerError::Config(
                "database URL is required (set DATABASE_URL)".to_string(),
            ));
        }

        roster_storage::connect_options(&self.database.url)
            .map_err(|e| ServerError::Config(e.to_string()))?;

        if self.database.max_connections == 0 {
            return Err(ServerError::Config(
                "database.max_connections must be at least 1".to_string(),
            ));
        }

        if self.database.connect_timeout_secs == 0 {
            return Err(ServerError::Config(
                "database.connect_timeout_secs must be at least 1".to_string(),
            ));
        }

        let readiness = &self.database.readiness;
        if readiness.interval_ms == 0 {
            return Err(ServerError::Config(
                "database.readiness.interval_ms must be positive".to_string(),
            ));
        }
        if readiness.max_wait_secs == 0 {
            return Err(ServerError::Config(
                "database.readiness.max_wait_secs must be positive".to_string(),
            ));
        }
        if readiness.backoff == BackoffKind::Exponential
            && readiness.max_interval_ms < readiness.interval_ms
        {
            return Err(ServerError::Config(
                "database.readiness.max_interval_ms must not be below interval_ms".to_string(),
            ));
        }

        self.server.socket_addr()?;

        Ok(())
    }

    /// Validate the mail settings; only the `notify` command needs them
    pub fn validate_notification(&self) -> Result<()> {
        let n = &self.notification;

        if n.recipient.as_deref().map_or(true, str::is_empty) {
            return Err(ServerError::Config(
                "notification recipient is required (set NOTIFY_RECIPIENT)".to_string(),
            ));
        }

        if n.sender.is_none() && n.smtp_username.is_none() {
            return Err(ServerError::Config(
                "notification.sender or notification.smtp_username is required".to_string(),
            ));
        }

        if n.smtp_username.is_some() && n.smtp_password.is_none() {
            return Err(ServerError::Config(
                "SMTP credential is required when smtp_username is set (set SMTP_PASSWORD)"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip = self
            .host
            .parse::<IpAddr>()
            .map_err(|e| ServerError::Config(format!("invalid server.host {:?}: {e}", self.host)))?;
        Ok(SocketAddr::from((ip, self.port)))
    }
}

impl NotificationSettings {
    pub fn port(&self) -> u16 {
        self.smtp_port.unwrap_or_else(|| self.tls.default_port())
    }
}

impl DatabaseSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl ReadinessSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        let interval = Duration::from_millis(self.interval_ms);
        let max_wait = Duration::from_secs(self.max_wait_secs);
        let backoff = match self.backoff {
            BackoffKind::Fixed => Backoff::Fixed,
            BackoffKind::Exponential => Backoff::Exponential {
                max_interval: Duration::from_millis(self.max_interval_ms),
            },
        };

        RetryPolicy {
            interval,
            max_wait,
            backoff,
        }
    }
}

// Default values
fn default_server() -> ServerSettings {
    ServerSettings {
        host: default_host(),
        port: default_port(),
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_database() -> DatabaseSettings {
    DatabaseSettings {
        url: String::new(),
        max_connections: default_max_connections(),
        connect_timeout_secs: default_connect_timeout_secs(),
        readiness: default_readiness(),
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_timeout_secs() -> u64 {
    3
}

fn default_readiness() -> ReadinessSettings {
    ReadinessSettings {
        interval_ms: default_interval_ms(),
        max_wait_secs: default_max_wait_secs(),
        backoff: BackoffKind::default(),
        max_interval_ms: default_max_interval_ms(),
    }
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_max_wait_secs() -> u64 {
    60
}

fn default_max_interval_ms() -> u64 {
    10_000
}

fn default_notification() -> NotificationSettings {
    NotificationSettings {
        recipient: None,
        sender: None,
        smtp_host: default_smtp_host(),
        smtp_port: None,
        smtp_username: None,
        smtp_password: None,
        tls: SmtpTls::default(),
        timeout_secs: default_smtp_timeout_secs(),
    }
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_timeout_secs() -> u64 {
    30
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            database: default_database(),
            notification: default_notification(),
        }
    }
}
