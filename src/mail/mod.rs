use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::EmailConfig;
use crate::report::EmailMessage;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Email setting `{0}` is not configured")]
    MissingSetting(&'static str),

    #[error("Invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Failed to build email: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Delivers a composed digest.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

/// Sends over SMTP with STARTTLS and username/password login.
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    sender: Mailbox,
    recipient: Mailbox,
    host: String,
    port: u16,
    username: String,
    password: String,
}

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, MailError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or(MailError::MissingSetting(name))
}

impl SmtpMailer {
    pub fn from_config(config: &EmailConfig) -> Result<Self, MailError> {
        Ok(Self {
            sender: required(&config.sender, "sender")?.parse()?,
            recipient: required(&config.recipient, "recipient")?.parse()?,
            host: config.smtp_host.clone(),
            port: config.smtp_port,
            username: required(&config.username, "username")?.to_string(),
            password: required(&config.password, "password")?.to_string(),
        })
    }

    /// Plaintext message with Subject/From/To headers.
    pub fn build_message(&self, message: &EmailMessage) -> Result<Message, MailError> {
        let email = Message::builder()
            .from(self.sender.clone())
            .to(self.recipient.clone())
            .subject(message.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())?;
        Ok(email)
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    #[instrument(skip(self, message), fields(host = %self.host, port = self.port))]
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let email = self.build_message(message)?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)?
            .port(self.port)
            .credentials(Credentials::new(self.username.clone(), self.password.clone()))
            .build();

        debug!("sending digest over SMTP");
        let response = transport.send(email).await?;
        debug!(code = %response.code(), "SMTP server accepted message");
        Ok(())
    }
}
