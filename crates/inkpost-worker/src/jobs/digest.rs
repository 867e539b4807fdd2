//! Weekly digest job.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde_json::Value;
use tracing;

use inkpost_core::config::DigestConfig;
use inkpost_core::result::AppResult;
use inkpost_core::traits::mailer::Mailer;
use inkpost_core::types::email::EmailMessage;
use inkpost_entity::job::Job;

use crate::executor::{JobExecutionError, JobHandler};
use crate::render::DigestRenderer;
use crate::store::CategorySource;
use crate::week::week_window;

/// Mails the posts published during the current ISO week.
#[derive(Debug)]
pub struct DigestJobHandler {
    categories: Arc<dyn CategorySource>,
    mailer: Arc<dyn Mailer>,
    sender: String,
    recipients: Vec<String>,
    subject: String,
    timezone: Tz,
    renderer: DigestRenderer,
    clock: fn() -> DateTime<Utc>,
}

impl DigestJobHandler {
    /// Create a new digest job handler.
    ///
    /// Fails when the configured timezone is unknown.
    pub fn new(
        categories: Arc<dyn CategorySource>,
        mailer: Arc<dyn Mailer>,
        sender: impl Into<String>,
        config: &DigestConfig,
    ) -> AppResult<Self> {
        let timezone = config.timezone()?;
        Ok(Self {
            categories,
            mailer,
            sender: sender.into(),
            recipients: config.recipients.clone(),
            subject: config.subject.clone(),
            timezone,
            renderer: DigestRenderer::new(config.subject.clone(), timezone),
            clock: Utc::now,
        })
    }

    /// Replace the clock used to pick the current week.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }
}

#[async_trait]
impl JobHandler for DigestJobHandler {
    fn job_type(&self) -> &str {
        "digest"
    }

    async fn execute(&self, _job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let today = (self.clock)().with_timezone(&self.timezone).date_naive();
        let window = week_window(today)?;
        let (from, until) = window.bounds_in(self.timezone)?;

        let entries = self.categories.published_between(from, until).await?;

        tracing::info!(
            week = window.week,
            year = window.year,
            start = %window.start,
            end = %window.end,
            posts = entries.len(),
            "Digest window computed"
        );

        if entries.is_empty() {
            return Ok(Some(serde_json::json!({ "sent": false, "posts": 0 })));
        }

        if self.recipients.is_empty() {
            tracing::warn!("Digest has posts but no recipients are configured");
            return Ok(Some(
                serde_json::json!({ "sent": false, "posts": entries.len() }),
            ));
        }

        let body = self.renderer.render(&window, &entries);
        let message = EmailMessage::html(
            self.sender.as_str(),
            self.recipients.clone(),
            self.subject.as_str(),
            body,
        );
        self.mailer
            .send(&message)
            .await
            .map_err(JobExecutionError::classify)?;

        tracing::info!(
            recipients = self.recipients.len(),
            posts = entries.len(),
            "Weekly digest sent"
        );
        Ok(Some(serde_json::json!({
            "sent": true,
            "posts": entries.len(),
            "start": window.start,
            "end": window.end,
        })))
    }
}
