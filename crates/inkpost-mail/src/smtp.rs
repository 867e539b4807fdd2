//! SMTP relay transport built on `lettre`.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};

use inkpost_core::config::MailConfig;
use inkpost_core::error::{AppError, ErrorKind};
use inkpost_core::result::AppResult;
use inkpost_core::traits::mailer::Mailer;
use inkpost_core::types::email::{EmailBody, EmailMessage};

/// Sends mail through an SMTP relay.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
}

impl std::fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailer").field("host", &self.host).finish()
    }
}

impl SmtpMailer {
    /// Build the relay client from configuration. No connection is opened
    /// until the first send.
    pub fn new(config: &MailConfig) -> AppResult<Self> {
        let builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host).map_err(|e| {
                AppError::with_source(
                    ErrorKind::Configuration,
                    format!("Invalid SMTP relay '{}': {e}", config.host),
                    e,
                )
            })?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };

        let mut builder = builder
            .port(config.port)
            .timeout(Some(Duration::from_secs(config.timeout_seconds)));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        info!(
            host = %config.host,
            port = config.port,
            starttls = config.starttls,
            "SMTP transport configured"
        );

        Ok(Self {
            transport: builder.build(),
            host: config.host.clone(),
        })
    }
}

/// Convert an [`EmailMessage`] into a `lettre` message.
///
/// Malformed addresses are validation errors, not transport errors.
fn build_message(message: &EmailMessage) -> AppResult<Message> {
    let from: Mailbox = parse_mailbox(&message.from)?;
    let mut builder = Message::builder().from(from).subject(&message.subject);

    if message.to.is_empty() {
        return Err(AppError::validation("Email has no recipients"));
    }
    for to in &message.to {
        builder = builder.to(parse_mailbox(to)?);
    }

    let (content_type, body) = match &message.body {
        EmailBody::Plain(text) => (ContentType::TEXT_PLAIN, text.clone()),
        EmailBody::Html(html) => (ContentType::TEXT_HTML, html.clone()),
    };

    builder
        .header(content_type)
        .body(body)
        .map_err(|e| AppError::with_source(ErrorKind::Validation, "Failed to build email", e))
}

fn parse_mailbox(address: &str) -> AppResult<Mailbox> {
    address.parse::<Mailbox>().map_err(|e| {
        AppError::with_source(
            ErrorKind::Validation,
            format!("Invalid email address '{address}'"),
            e,
        )
    })
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> AppResult<()> {
        let email = build_message(message)?;

        self.transport.send(email).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::ExternalService,
                format!("SMTP delivery via '{}' failed: {e}", self.host),
                e,
            )
        })?;

        debug!(
            to = ?message.to,
            subject = %message.subject,
            "Email delivered via SMTP"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "smtp"
    }
}
