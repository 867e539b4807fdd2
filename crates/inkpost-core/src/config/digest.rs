//! Weekly digest configuration.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Schedule and recipients of the weekly digest email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestConfig {
    /// Whether the weekly trigger is registered.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Six-field cron expression (sec min hour day month weekday).
    #[serde(default = "default_cron")]
    pub cron: String,
    /// IANA timezone the cron expression and the week window are evaluated in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Addresses that receive the digest.
    #[serde(default)]
    pub recipients: Vec<String>,
    /// Subject line of the digest email.
    #[serde(default = "default_subject")]
    pub subject: String,
}

impl DigestConfig {
    /// Parse the configured timezone.
    pub fn timezone(&self) -> Result<Tz, AppError> {
        self.timezone.parse::<Tz>().map_err(|_| {
            AppError::configuration(format!("Invalid digest timezone '{}'", self.timezone))
        })
    }
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cron: default_cron(),
            timezone: default_timezone(),
            recipients: Vec::new(),
            subject: default_subject(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_cron() -> String {
    "0 0 10 * * Sat".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_subject() -> String {
    "Weekly Digest".to_string()
}
