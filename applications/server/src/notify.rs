//! Pipeline notification mail
//!
//! Exactly one message per pipeline run: a success or a failure variant,
//! naming the job and pointing at its log. Delivery is attempted once; a
//! failed send is reported to the caller and not retried.

use crate::config::{NotificationSettings, SmtpTls};
use crate::error::{Result, ServerError};
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    Success,
    Failure,
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStatus::Success => f.write_str("SUCCESS"),
            PipelineStatus::Failure => f.write_str("FAILURE"),
        }
    }
}

/// Outcome of one pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub job: String,
    pub build: Option<String>,
    pub status: PipelineStatus,
    /// Where the run's console output lives
    pub log_url: String,
}

impl PipelineReport {
    fn job_label(&self) -> String {
        match &self.build {
            Some(build) => format!("{} #{}", self.job, build),
            None => self.job.clone(),
        }
    }

    pub fn subject(&self) -> String {
        format!("[roster] {}: {}", self.status, self.job_label())
    }

    pub fn body(&self) -> String {
        let summary = match self.status {
            PipelineStatus::Success => "built, tested and deployed successfully",
            PipelineStatus::Failure => "failed",
        };

        format!(
            "Pipeline {job} {summary}.\n\nStatus: {status}\nLogs: {log_url}\n",
            job = self.job_label(),
            status = self.status,
            log_url = self.log_url,
        )
    }
}

/// Sends pipeline notifications over authenticated SMTP
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl Mailer {
    /// Build a mailer; does not open a connection
    pub fn from_settings(settings: &NotificationSettings) -> Result<Self> {
        let to = settings
            .recipient
            .as_deref()
            .ok_or_else(|| ServerError::Config("notification recipient is not set".to_string()))
            .and_then(parse_mailbox)?;

        let from = settings
            .sender
            .as_deref()
            .or(settings.smtp_username.as_deref())
            .ok_or_else(|| ServerError::Config("notification sender is not set".to_string()))
            .and_then(parse_mailbox)?;

        let builder = match settings.tls {
            SmtpTls::Starttls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.smtp_host)
                    .map_err(|e| ServerError::Notification(format!("STARTTLS setup: {e}")))?
            }
            SmtpTls::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.smtp_host)
                .map_err(|e| ServerError::Notification(format!("TLS setup: {e}")))?,
            SmtpTls::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.smtp_host)
            }
        };

        let mut builder = builder
            .port(settings.port())
            .timeout(Some(Duration::from_secs(settings.timeout_secs)));

        if let (Some(username), Some(password)) = (&settings.smtp_username, &settings.smtp_password)
        {
            builder = builder.credentials(Credentials::new(
                username.clone(),
                password.expose().to_string(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from,
            to,
        })
    }

    /// Render the message for a report
    pub fn message(&self, report: &PipelineReport) -> Result<Message> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(report.subject())
            .header(ContentType::TEXT_PLAIN)
            .body(report.body())
            .map_err(|e| ServerError::Notification(e.to_string()))
    }

    /// Send a single notification
    pub async fn send(&self, report: &PipelineReport) -> Result<()> {
        let message = self.message(report)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| ServerError::Notification(format!("delivery failed: {e}")))?;

        tracing::info!(
            job = %report.job,
            status = %report.status,
            recipient = %self.to,
            "Notification sent"
        );

        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox> {
    address
        .parse::<Mailbox>()
        .map_err(|e| ServerError::Config(format!("invalid email address {address:?}: {e}")))
}
