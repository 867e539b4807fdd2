//! Transport selection from configuration.

use std::sync::Arc;

use tracing::info;

use inkpost_core::config::{MailConfig, MailTransportKind};
use inkpost_core::result::AppResult;
use inkpost_core::traits::mailer::Mailer;

use crate::memory::MemoryMailer;
use crate::smtp::SmtpMailer;

/// Build the configured mail transport.
pub fn build_mailer(config: &MailConfig) -> AppResult<Arc<dyn Mailer>> {
    let mailer: Arc<dyn Mailer> = match config.transport {
        MailTransportKind::Smtp => Arc::new(SmtpMailer::new(config)?),
        MailTransportKind::Memory => Arc::new(MemoryMailer::new()),
    };
    info!(transport = mailer.name(), sender = %config.sender, "Mail transport ready");
    Ok(mailer)
}
