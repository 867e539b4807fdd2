//! Outbound email message.

use serde::{Deserialize, Serialize};

/// Body of an outbound email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "content", rename_all = "lowercase")]
pub enum EmailBody {
    /// `text/plain` body.
    Plain(String),
    /// `text/html` body.
    Html(String),
}

/// A message handed to a [`Mailer`](crate::traits::mailer::Mailer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    /// Sender address.
    pub from: String,
    /// Destination addresses.
    pub to: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// Message body.
    pub body: EmailBody,
}

impl EmailMessage {
    /// Build a plain-text message to a single recipient.
    pub fn plain(
        from: impl Into<String>,
        to: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: vec![to.into()],
            subject: subject.into(),
            body: EmailBody::Plain(body.into()),
        }
    }

    /// Build an HTML message to a list of recipients.
    pub fn html(
        from: impl Into<String>,
        to: Vec<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to,
            subject: subject.into(),
            body: EmailBody::Html(body.into()),
        }
    }
}
