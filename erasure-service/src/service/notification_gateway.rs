// src/service/notification_gateway.rs

use crate::config::NotificationConfig;
use crate::domain::subject::SubjectType;
use crate::repository::subject_directory::SubjectDirectory;
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("SMTP configuration error: {0}")]
    ConfigurationError(String),

    #[error("No contact address for subject {0}")]
    MissingRecipient(Uuid),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Failed to send notification: {0}")]
    SendError(String),
}

/// Delivers verification and cancellation links to the subject.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn send_verification_links(
        &self,
        subject_id: Uuid,
        subject_type: SubjectType,
        verify_token: &str,
        cancel_token: &str,
    ) -> Result<(), NotificationError>;
}

fn verify_link(base_url: &str, token: &str) -> String {
    format!("{}/erasure/verify?token={}", base_url.trim_end_matches('/'), token)
}

fn cancel_link(base_url: &str, token: &str) -> String {
    format!("{}/erasure/cancel?token={}", base_url.trim_end_matches('/'), token)
}

fn render_body(verify_url: &str, cancel_url: &str) -> String {
    format!(
        "We received a request to erase your account data.\n\n\
         Confirm the request:\n{}\n\n\
         If you did not ask for this, or changed your mind, cancel it here:\n{}\n\n\
         Your data is removed once the grace period has passed.\n",
        verify_url, cancel_url
    )
}

/// 開発モード用：送信せずログに出す
pub struct LoggingNotificationGateway {
    link_base_url: String,
}

impl LoggingNotificationGateway {
    pub fn new(link_base_url: impl Into<String>) -> Self {
        Self {
            link_base_url: link_base_url.into(),
        }
    }
}

#[async_trait]
impl NotificationGateway for LoggingNotificationGateway {
    async fn send_verification_links(
        &self,
        subject_id: Uuid,
        subject_type: SubjectType,
        verify_token: &str,
        cancel_token: &str,
    ) -> Result<(), NotificationError> {
        info!(
            subject_id = %subject_id,
            subject_type = %subject_type,
            verify_url = %verify_link(&self.link_base_url, verify_token),
            cancel_url = %cancel_link(&self.link_base_url, cancel_token),
            "📧 [DEV MODE] Erasure verification links"
        );
        Ok(())
    }
}

pub struct SmtpNotificationGateway {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    link_base_url: String,
    directory: Arc<dyn SubjectDirectory>,
}

impl SmtpNotificationGateway {
    pub fn new(
        config: &NotificationConfig,
        directory: Arc<dyn SubjectDirectory>,
    ) -> Result<Self, NotificationError> {
        config
            .validate()
            .map_err(NotificationError::ConfigurationError)?;

        let from = format!("{} <{}>", config.from_name, config.from_email)
            .parse::<Mailbox>()
            .map_err(|e| NotificationError::InvalidAddress(e.to_string()))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| NotificationError::ConfigurationError(e.to_string()))?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            ))
            .build();

        Ok(Self {
            transport,
            from,
            link_base_url: config.link_base_url.clone(),
            directory,
        })
    }
}

#[async_trait]
impl NotificationGateway for SmtpNotificationGateway {
    async fn send_verification_links(
        &self,
        subject_id: Uuid,
        subject_type: SubjectType,
        verify_token: &str,
        cancel_token: &str,
    ) -> Result<(), NotificationError> {
        let email = self
            .directory
            .contact_email(subject_id, subject_type)
            .await
            .map_err(|e| NotificationError::SendError(e.to_string()))?
            .ok_or(NotificationError::MissingRecipient(subject_id))?;

        let to = email
            .parse::<Mailbox>()
            .map_err(|_| NotificationError::InvalidAddress(email.clone()))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject("Confirm your data erasure request")
            .header(ContentType::TEXT_PLAIN)
            .body(render_body(
                &verify_link(&self.link_base_url, verify_token),
                &cancel_link(&self.link_base_url, cancel_token),
            ))
            .map_err(|e| NotificationError::SendError(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotificationError::SendError(e.to_string()))?;

        info!(
            subject_id = %subject_id,
            subject_type = %subject_type,
            "Erasure verification email sent"
        );
        Ok(())
    }
}
