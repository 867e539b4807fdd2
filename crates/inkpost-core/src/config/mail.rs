//! Outbound mail configuration.

use serde::{Deserialize, Serialize};

/// Which mail transport the worker uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailTransportKind {
    /// Deliver through an SMTP relay.
    Smtp,
    /// Keep messages in memory and log them (development and tests).
    Memory,
}

/// SMTP relay and sender settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Transport selection.
    #[serde(default = "default_transport")]
    pub transport: MailTransportKind,
    /// SMTP relay host.
    #[serde(default = "default_host")]
    pub host: String,
    /// SMTP relay port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Optional SMTP username. Authentication is skipped when unset.
    #[serde(default)]
    pub username: Option<String>,
    /// Optional SMTP password.
    #[serde(default)]
    pub password: Option<String>,
    /// Upgrade the connection with STARTTLS.
    #[serde(default = "default_true")]
    pub starttls: bool,
    /// `From` address for every outgoing message.
    #[serde(default = "default_sender")]
    pub sender: String,
    /// Transport-level timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            transport: default_transport(),
            host: default_host(),
            port: default_port(),
            username: None,
            password: None,
            starttls: true,
            sender: default_sender(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_transport() -> MailTransportKind {
    MailTransportKind::Smtp
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    25
}

fn default_true() -> bool {
    true
}

fn default_sender() -> String {
    "from@example.com".to_string()
}

fn default_timeout() -> u64 {
    30
}
