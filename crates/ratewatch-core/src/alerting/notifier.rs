//! Alert delivery channels

use std::time::Duration;

use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use crate::config::EmailConfig;
use crate::models::AlertPayload;

/// SMTP command timeout
const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Notification errors
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    /// The SMTP exchange failed
    #[error("SMTP error: {0}")]
    SmtpError(String),

    /// Sender settings are unusable
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The message could not be assembled
    #[error("Message build error: {0}")]
    MessageError(String),

    /// The sender panicked mid-delivery
    #[error("Sender panicked: {0}")]
    Panicked(String),
}

/// A channel that can deliver a rendered alert
#[async_trait::async_trait]
pub trait AlertSender: Send + Sync {
    /// Deliver the alert
    async fn send(&self, payload: &AlertPayload) -> Result<(), NotificationError>;

    /// Human-readable channel name (e.g. "email")
    fn channel_name(&self) -> &str;
}

/// Sends alerts as email through an SMTP relay
pub struct SmtpAlertSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl SmtpAlertSender {
    /// Build a sender from email configuration
    ///
    /// Port 465 uses implicit TLS, any other port uses STARTTLS unless
    /// `tls` is off. Credentials are attached only when both username and
    /// password are set.
    pub fn from_config(config: &EmailConfig) -> Result<Self, NotificationError> {
        config
            .validate()
            .map_err(|e| NotificationError::ConfigError(e.to_string()))?;

        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e: lettre::address::AddressError| {
                NotificationError::ConfigError(format!("invalid sender '{}': {e}", config.from))
            })?;

        let to = config
            .to
            .iter()
            .map(|addr| {
                addr.parse().map_err(|e: lettre::address::AddressError| {
                    NotificationError::ConfigError(format!("invalid recipient '{addr}': {e}"))
                })
            })
            .collect::<Result<Vec<Mailbox>, _>>()?;

        let builder = if config.smtp_port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
                .map_err(|e| NotificationError::ConfigError(e.to_string()))?
        } else if config.tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                .map_err(|e| NotificationError::ConfigError(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
        };
        let mut builder = builder.port(config.smtp_port).timeout(Some(SMTP_TIMEOUT));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
            to,
        })
    }

    fn build_message(&self, payload: &AlertPayload) -> Result<Message, NotificationError> {
        let mut builder = Message::builder().from(self.from.clone());
        for recipient in &self.to {
            builder = builder.to(recipient.clone());
        }

        builder
            .subject(&payload.subject)
            .multipart(MultiPart::alternative_plain_html(
                payload.text_body.clone(),
                payload.html_body.clone(),
            ))
            .map_err(|e| NotificationError::MessageError(e.to_string()))
    }
}

#[async_trait::async_trait]
impl AlertSender for SmtpAlertSender {
    async fn send(&self, payload: &AlertPayload) -> Result<(), NotificationError> {
        let message = self.build_message(payload)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotificationError::SmtpError(e.to_string()))?;

        info!(
            channel = "email",
            subject = %payload.subject,
            recipients = self.to.len(),
            "Email notification sent"
        );
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "email"
    }
}

/// Logs alerts instead of delivering them (dry-run mode)
#[derive(Debug, Default)]
pub struct LogAlertSender;

#[async_trait::async_trait]
impl AlertSender for LogAlertSender {
    async fn send(&self, payload: &AlertPayload) -> Result<(), NotificationError> {
        info!(
            channel = "log",
            condition = %payload.condition,
            subject = %payload.subject,
            "Dry run: alert not delivered"
        );
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "log"
    }
}
