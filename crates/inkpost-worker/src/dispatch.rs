//! Reminder dispatch: the hook run after a reminder is saved.

use std::sync::Arc;

use tracing;

use inkpost_core::result::AppResult;
use inkpost_entity::job::{Job, JobPayload};
use inkpost_entity::reminder::{NewReminder, Reminder};

use crate::queue::{JobCreateParams, JobQueue};
use crate::retry::RetryPolicy;
use crate::store::ReminderStore;

/// Submits the one-shot `remind` job of a saved reminder.
#[derive(Debug, Clone)]
pub struct ReminderDispatcher {
    queue: Arc<JobQueue>,
    retry: RetryPolicy,
}

impl ReminderDispatcher {
    /// Create a dispatcher submitting to `queue` with the given retry policy.
    pub fn new(queue: Arc<JobQueue>, retry: RetryPolicy) -> Self {
        Self { queue, retry }
    }

    /// Enqueue exactly one `remind` job whose eta is the reminder date.
    ///
    /// Submission errors are returned unchanged.
    pub async fn on_reminder_saved(&self, reminder: &Reminder) -> AppResult<Job> {
        let params = JobCreateParams::from_payload(
            &JobPayload::Remind {
                reminder_id: reminder.id,
            },
            self.retry,
        )?
        .eta(reminder.date);

        let job = self.queue.enqueue(params).await?;
        tracing::info!(
            reminder_id = %reminder.id,
            job_id = %job.id,
            eta = %reminder.date,
            "Reminder scheduled"
        );
        Ok(job)
    }
}

/// Saves reminders and schedules their delivery.
#[derive(Debug, Clone)]
pub struct ReminderService {
    store: Arc<dyn ReminderStore>,
    dispatcher: ReminderDispatcher,
}

impl ReminderService {
    /// Create the service.
    pub fn new(store: Arc<dyn ReminderStore>, dispatcher: ReminderDispatcher) -> Self {
        Self { store, dispatcher }
    }

    /// Save a reminder, then run the dispatch hook.
    pub async fn create(&self, new: NewReminder) -> AppResult<(Reminder, Job)> {
        let reminder = self.store.insert(new.into_reminder()).await?;
        let job = self.dispatcher.on_reminder_saved(&reminder).await?;
        Ok((reminder, job))
    }
}
