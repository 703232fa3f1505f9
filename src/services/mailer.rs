use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::{EmailConfig, EmailTransport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid address: {0}")]
    Address(String),

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Outbound mail seam. Handlers only see this trait.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &EmailConfig) -> Result<Self, MailError> {
        let from: Mailbox = config.from.parse().map_err(|_| MailError::Address(config.from.clone()))?;

        // 465 is implicit TLS, 587 upgrades with STARTTLS, anything else is plain (dev relays)
        let mut builder = match config.port {
            465 => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| MailError::Transport(e.to_string()))?,
            587 => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| MailError::Transport(e.to_string()))?,
            _ => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host),
        }
        .port(config.port);

        if let (Some(user), Some(password)) = (&config.user, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }

        Ok(Self { transport: builder.build(), from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        let to: Mailbox = message.to.parse().map_err(|_| MailError::Address(message.to.clone()))?;
        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(message.body)
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        tracing::info!("Sent email to {}", message.to);
        Ok(())
    }
}

/// Keeps messages in memory instead of delivering them.
#[derive(Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<EmailMessage>>,
    fail: std::sync::atomic::AtomicBool,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `send` fail with a transport error
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn last(&self) -> Option<EmailMessage> {
        self.sent.lock().await.last().cloned()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(MailError::Transport("memory mailer set to fail".to_string()));
        }
        tracing::info!(to = %message.to, subject = %message.subject, "Email captured (not delivered)");
        tracing::debug!("{}", message.body);
        self.sent.lock().await.push(message);
        Ok(())
    }
}

pub fn mailer_from_config(config: &EmailConfig) -> Result<Arc<dyn Mailer>, MailError> {
    Ok(match config.transport {
        EmailTransport::Smtp => Arc::new(SmtpMailer::new(config)?),
        EmailTransport::Log => Arc::new(MemoryMailer::new()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> EmailMessage {
        EmailMessage {
            to: "ada@example.com".into(),
            subject: "Password change request Received".into(),
            body: "reset".into(),
        }
    }

    #[tokio::test]
    async fn memory_mailer_records_messages() {
        let mailer = MemoryMailer::new();
        mailer.send(message()).await.unwrap();
        assert_eq!(mailer.sent().await.len(), 1);
        assert_eq!(mailer.last().await.unwrap().subject, "Password change request Received");
    }

    #[tokio::test]
    async fn memory_mailer_can_fail() {
        let mailer = MemoryMailer::new();
        mailer.set_failing(true);
        assert!(matches!(mailer.send(message()).await, Err(MailError::Transport(_))));
        assert!(mailer.sent().await.is_empty());
    }

    #[test]
    fn smtp_mailer_rejects_bad_sender() {
        let config = EmailConfig {
            transport: EmailTransport::Smtp,
            host: "localhost".into(),
            port: 1025,
            user: None,
            password: None,
            from: "not an address".into(),
        };
        assert!(matches!(SmtpMailer::new(&config), Err(MailError::Address(_))));
    }
}
