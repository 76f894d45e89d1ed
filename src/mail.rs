//! Outbound mail delivery.
//!
//! The service layer only sees the [`Mailer`] trait. [`LogMailer`] writes
//! letters to the log and is the default for development; [`SmtpMailer`]
//! relays them through an SMTP server with `lettre`.

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport,
    AsyncTransport,
    Message,
    Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use thiserror::Error;
use tracing::{debug, info};

/// A rendered letter ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid mail address {address:?}: {source}")]
    Address {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },
    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("smtp transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
    #[error("mail backend rejected message: {0}")]
    Rejected(String),
}

/// Sends letters on behalf of the notification hooks.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver `mail`.
    ///
    /// # Errors
    /// Returns [`MailError`] when the message cannot be built or delivered.
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError>;
}

/// Writes letters to the tracing log instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        info!(to = %mail.to, subject = %mail.subject, "mail not delivered (log backend)");
        debug!(body = %mail.html_body, "mail body");
        Ok(())
    }
}

/// Transport security for [`SmtpMailer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmtpSecurity {
    #[default]
    StartTls,
    Tls,
    None,
}

/// Connection settings for [`SmtpMailer`].
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub security: SmtpSecurity,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Delivers letters through an SMTP relay.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl std::fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailer")
            .field("from", &self.from.to_string())
            .finish_non_exhaustive()
    }
}

fn mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse().map_err(|source| MailError::Address {
        address: address.to_owned(),
        source,
    })
}

impl SmtpMailer {
    /// Build a transport for `settings`, sending as `from`.
    ///
    /// # Errors
    /// Returns [`MailError`] when `from` is not a valid address or the TLS
    /// parameters for `host` cannot be prepared.
    pub fn new(settings: &SmtpSettings, from: &str) -> Result<Self, MailError> {
        let builder = match settings.security {
            SmtpSecurity::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?
            }
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)?,
            SmtpSecurity::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
            }
        };
        let mut builder = builder.port(settings.port);
        if let Some(username) = settings.username.as_deref() {
            let password = settings.password.clone().unwrap_or_default();
            builder = builder.credentials(Credentials::new(username.to_owned(), password));
        }
        Ok(Self {
            transport: builder.build(),
            from: mailbox(from)?,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(mailbox(&mail.to)?)
            .subject(mail.subject.as_str())
            .header(ContentType::TEXT_HTML)
            .body(mail.html_body.clone())?;
        let response = self.transport.send(message).await?;
        if !response.is_positive() {
            return Err(MailError::Rejected(response.code().to_string()));
        }
        info!(to = %mail.to, subject = %mail.subject, "mail delivered");
        Ok(())
    }
}
