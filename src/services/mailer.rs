use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::User;

/// A plain-text message ready to hand to a transport
#[derive(Clone)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

// Bodies may carry reset links, keep them out of logs
impl fmt::Debug for OutgoingMail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutgoingMail")
            .field("to", &self.to)
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

impl OutgoingMail {
    /// Password reset instructions containing the one-time link
    pub fn password_reset(user: &User, reset_url: &str, validity_minutes: i64) -> Self {
        Self {
            to: user.email.clone(),
            subject: format!(
                "Your password reset token (valid for {} min)",
                validity_minutes
            ),
            body: format!(
                "Hi {},\n\n\
                 Forgot your password? Submit a PATCH request with your new password to:\n\
                 {}\n\n\
                 If you didn't forget your password, please ignore this email.\n",
                user.full_name(),
                reset_url
            ),
        }
    }
}

/// Outgoing mail backend
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> AppResult<()>;
}

/// SMTP relay mailer
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// STARTTLS relay in production, plain SMTP (e.g. a local catcher) otherwise
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let builder = if config.environment.is_production() {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.email_host)
                .map_err(|e| AppError::Mail(format!("Invalid SMTP relay: {}", e)))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.email_host)
        };

        let mut builder = builder.port(config.email_port);
        if let (Some(username), Some(password)) = (&config.email_username, &config.email_password)
        {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let from = format!("No Reply <{}>", config.email_from)
            .parse::<Mailbox>()
            .map_err(|e| AppError::Mail(format!("Invalid sender address: {}", e)))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> AppResult<()> {
        let to = mail
            .to
            .parse::<Mailbox>()
            .map_err(|e| AppError::Mail(format!("Invalid recipient address: {}", e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body)
            .map_err(|e| AppError::Mail(format!("Failed to build message: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::Mail(format!("SMTP send failed: {}", e)))?;

        Ok(())
    }
}

/// In-memory mailer for testing, records everything it is asked to send
#[derive(Clone, Default)]
pub struct InMemoryMailer {
    outbox: Arc<Mutex<Vec<OutgoingMail>>>,
    failing: bool,
}

impl InMemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every send fails
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Messages sent so far, oldest first
    pub async fn sent(&self) -> Vec<OutgoingMail> {
        self.outbox.lock().await.clone()
    }

    pub async fn last(&self) -> Option<OutgoingMail> {
        self.outbox.lock().await.last().cloned()
    }
}

#[async_trait]
impl Mailer for InMemoryMailer {
    async fn send(&self, mail: OutgoingMail) -> AppResult<()> {
        if self.failing {
            return Err(AppError::Mail("mail transport unavailable".to_string()));
        }
        self.outbox.lock().await.push(mail);
        Ok(())
    }
}
