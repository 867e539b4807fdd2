//! Reminder delivery job.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing;

use inkpost_core::traits::mailer::Mailer;
use inkpost_core::types::email::EmailMessage;
use inkpost_entity::job::{Job, JobPayload};

use crate::executor::{JobExecutionError, JobHandler, parse_payload};
use crate::store::ReminderStore;

/// Subject line of reminder emails.
pub const REMINDER_SUBJECT: &str = "Your reminder";

/// Sends the email of one reminder.
#[derive(Debug)]
pub struct RemindJobHandler {
    reminders: Arc<dyn ReminderStore>,
    mailer: Arc<dyn Mailer>,
    sender: String,
}

impl RemindJobHandler {
    /// Create a new reminder job handler.
    pub fn new(
        reminders: Arc<dyn ReminderStore>,
        mailer: Arc<dyn Mailer>,
        sender: impl Into<String>,
    ) -> Self {
        Self {
            reminders,
            mailer,
            sender: sender.into(),
        }
    }
}

#[async_trait]
impl JobHandler for RemindJobHandler {
    fn job_type(&self) -> &str {
        "remind"
    }

    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let reminder_id = match parse_payload::<JobPayload>(job)? {
            JobPayload::Remind { reminder_id } => reminder_id,
            other => {
                return Err(JobExecutionError::Permanent(format!(
                    "Expected a remind payload, got '{}'",
                    other.job_type()
                )));
            }
        };

        let reminder = self
            .reminders
            .find_by_id(reminder_id)
            .await?
            .ok_or_else(|| JobExecutionError::NotFound(format!("Reminder {reminder_id}")))?;

        let message = EmailMessage::plain(
            self.sender.as_str(),
            reminder.email.as_str(),
            REMINDER_SUBJECT,
            reminder.text.as_str(),
        );
        self.mailer
            .send(&message)
            .await
            .map_err(JobExecutionError::classify)?;

        tracing::info!(
            reminder_id = %reminder_id,
            to = %reminder.email,
            transport = self.mailer.name(),
            "Reminder sent"
        );
        Ok(None)
    }
}
