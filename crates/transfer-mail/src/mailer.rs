//! Mail transports.
//!
//! [`SmtpMailer`] delivers through an SMTP relay with lettre. [`LogMailer`]
//! writes the full message to the log instead, for development.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};

use transfer_core::{Error, Result};

use crate::config::MailConfig;

/// A rendered HTML email ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub html_body: String,
}

/// A mail transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver one message.
    async fn send(&self, message: &EmailMessage) -> Result<()>;

    /// Short transport name for logs.
    fn name(&self) -> &'static str;
}

fn parse_mailbox(address: &str) -> Result<Mailbox> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|e| Error::Mail(format!("invalid address '{}': {}", address, e)))
}

/// Build a lettre message from an [`EmailMessage`].
pub fn build_message(from: &str, message: &EmailMessage) -> Result<Message> {
    if message.to.is_empty() {
        return Err(Error::Mail("message has no recipients".to_string()));
    }

    let mut builder = Message::builder()
        .from(parse_mailbox(from)?)
        .subject(message.subject.as_str());
    for to in &message.to {
        builder = builder.to(parse_mailbox(to)?);
    }
    for bcc in &message.bcc {
        builder = builder.bcc(parse_mailbox(bcc)?);
    }

    builder
        .header(ContentType::TEXT_HTML)
        .body(message.html_body.clone())
        .map_err(|e| Error::Mail(format!("unable to build message: {}", e)))
}

/// SMTP transport.
///
/// With credentials configured the connection is upgraded with STARTTLS;
/// without them the relay is used in plain text, as campus relays expect.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self> {
        let host = config
            .host
            .as_deref()
            .ok_or_else(|| Error::Config("SMTP_HOST is required unless SMTP_DEV_MODE is set".into()))?;

        let transport = match (&config.username, &config.password) {
            (Some(user), Some(pass)) => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| Error::Config(format!("invalid SMTP relay {}: {}", host, e)))?
                .port(config.port)
                .credentials(Credentials::new(user.clone(), pass.clone()))
                .build(),
            _ => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
                .port(config.port)
                .build(),
        };

        info!(
            subsystem = "mail",
            component = "smtp",
            host = %host,
            port = config.port,
            authenticated = config.username.is_some(),
            "SMTP mailer configured"
        );

        Ok(Self {
            transport,
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let email = build_message(&self.from, message)?;
        self.transport
            .send(email)
            .await
            .map_err(|e| Error::Mail(format!("SMTP delivery failed: {}", e)))?;
        debug!(subsystem = "mail", component = "smtp", subject = %message.subject, recipients = message.to.len() + message.bcc.len(), "Message delivered");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}

/// Development transport: logs the message instead of sending it.
#[derive(Debug, Clone)]
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        // Building the message still validates every address.
        build_message(&self.from, message)?;
        info!(
            subsystem = "mail",
            component = "log",
            from = %self.from,
            to = %message.to.join(","),
            bcc = %message.bcc.join(","),
            subject = %message.subject,
            body = %message.html_body,
            "Email is in dev mode; logging message instead of sending"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Pick the transport for `config`: [`LogMailer`] in dev mode, SMTP otherwise.
pub fn mailer_from_config(config: &MailConfig) -> Result<Arc<dyn Mailer>> {
    if config.dev_mode {
        info!(subsystem = "mail", component = "log", "SMTP dev mode enabled; emails will be logged");
        return Ok(Arc::new(LogMailer::new(config.from.clone())));
    }
    Ok(Arc::new(SmtpMailer::new(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> EmailMessage {
        EmailMessage {
            to: vec!["ada@example.edu".to_string()],
            bcc: vec!["staff@example.edu".to_string()],
            subject: "UVA Archives Transfer Receipt".to_string(),
            html_body: "<p>hi</p>".to_string(),
        }
    }

    #[test]
    fn test_build_message_sets_headers() {
        let built = build_message("no-reply@virginia.edu", &message()).unwrap();
        let raw = String::from_utf8(built.formatted()).unwrap();
        assert!(raw.contains("Subject: UVA Archives Transfer Receipt"));
        assert!(raw.contains("To: ada@example.edu"));
        assert!(raw.contains("text/html"));
        // Bcc recipients are on the envelope only.
        assert!(!raw.contains("staff@example.edu"));
        assert_eq!(built.envelope().to().len(), 2);
    }

    #[test]
    fn test_build_message_rejects_bad_address() {
        let mut msg = message();
        msg.to = vec!["not an address".to_string()];
        assert!(matches!(
            build_message("no-reply@virginia.edu", &msg),
            Err(Error::Mail(_))
        ));
    }

    #[test]
    fn test_build_message_requires_recipient() {
        let mut msg = message();
        msg.to.clear();
        assert!(build_message("no-reply@virginia.edu", &msg).is_err());
    }

    #[tokio::test]
    async fn test_log_mailer_accepts_valid_message() {
        let mailer = LogMailer::new("no-reply@virginia.edu");
        assert!(mailer.send(&message()).await.is_ok());
        assert_eq!(mailer.name(), "log");
    }

    #[test]
    fn test_dev_mode_selects_log_mailer() {
        let config = MailConfig {
            dev_mode: true,
            ..MailConfig::default()
        };
        assert_eq!(mailer_from_config(&config).unwrap().name(), "log");
    }

    #[test]
    fn test_smtp_mailer_requires_host() {
        let config = MailConfig::default();
        assert!(matches!(SmtpMailer::new(&config), Err(Error::Config(_))));
    }
}
