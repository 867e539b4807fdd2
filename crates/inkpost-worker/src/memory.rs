//! In-process implementations of the storage seams.
//!
//! Used by tests and by local runs without PostgreSQL. The job store keeps
//! the same claim semantics as the SQL queue: oldest due job first, one
//! claimant per job, expired leases reclaimed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::Mutex;

use inkpost_core::error::AppError;
use inkpost_core::result::AppResult;
use inkpost_core::types::id::{JobId, ReminderId};
use inkpost_entity::category::DigestEntry;
use inkpost_entity::job::{Job, JobStatus};
use inkpost_entity::reminder::Reminder;

use crate::store::{CategorySource, JobStore, ReminderStore};

/// In-memory job queue store.
#[derive(Debug, Clone, Default)]
pub struct MemoryJobStore {
    jobs: Arc<Mutex<Vec<Job>>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryJobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an unreachable broker: every call fails while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Snapshot of every stored job, in insertion order.
    pub async fn jobs(&self) -> Vec<Job> {
        self.jobs.lock().await.clone()
    }

    fn check_available(&self) -> AppResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::service_unavailable("Job store is unreachable"));
        }
        Ok(())
    }

    async fn update<F>(&self, id: JobId, apply: F) -> AppResult<()>
    where
        F: FnOnce(&mut Job) + Send,
    {
        self.check_available()?;
        let mut jobs = self.jobs.lock().await;
        let job = jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| AppError::not_found(format!("Job {id} not found")))?;
        apply(job);
        job.updated_at = Utc::now();
        Ok(())
    }
}

/// Pending and due, or running on an expired lease.
fn claimable(job: &Job, now: DateTime<Utc>, stale_before: DateTime<Utc>) -> bool {
    match job.status {
        JobStatus::Pending => job.is_due(now),
        JobStatus::Running => job.started_at.is_some_and(|at| at < stale_before),
        JobStatus::Completed | JobStatus::Failed => false,
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert(&self, job: Job) -> AppResult<Job> {
        self.check_available()?;
        self.jobs.lock().await.push(job.clone());
        Ok(job)
    }

    async fn claim_next(
        &self,
        queue: &str,
        worker_id: &str,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
    ) -> AppResult<Option<Job>> {
        self.check_available()?;
        let mut jobs = self.jobs.lock().await;
        let next = jobs
            .iter_mut()
            .filter(|j| j.queue == queue && claimable(j, now, stale_before))
            .min_by_key(|j| (j.scheduled_at.unwrap_or(j.created_at), j.created_at));

        Ok(next.map(|job| {
            job.status = JobStatus::Running;
            job.attempts += 1;
            job.started_at = Some(now);
            job.worker_id = Some(worker_id.to_string());
            job.updated_at = now;
            job.clone()
        }))
    }

    async fn complete(&self, id: JobId, result: Option<Value>) -> AppResult<()> {
        self.update(id, |job| {
            job.status = JobStatus::Completed;
            job.result = result;
            job.error_message = None;
            job.completed_at = Some(Utc::now());
        })
        .await
    }

    async fn fail(&self, id: JobId, error: &str) -> AppResult<()> {
        let error = error.to_string();
        self.update(id, |job| {
            job.status = JobStatus::Failed;
            job.error_message = Some(error);
            job.completed_at = Some(Utc::now());
        })
        .await
    }

    async fn reschedule(&self, id: JobId, run_at: DateTime<Utc>, error: &str) -> AppResult<()> {
        let error = error.to_string();
        self.update(id, |job| {
            if job.status == JobStatus::Running {
                job.status = JobStatus::Pending;
                job.scheduled_at = Some(run_at);
                job.error_message = Some(error);
                job.worker_id = None;
            }
        })
        .await
    }

    async fn find_by_id(&self, id: JobId) -> AppResult<Option<Job>> {
        self.check_available()?;
        Ok(self.jobs.lock().await.iter().find(|j| j.id == id).cloned())
    }

    async fn count_by_status(&self, status: JobStatus) -> AppResult<i64> {
        self.check_available()?;
        let count = self
            .jobs
            .lock()
            .await
            .iter()
            .filter(|j| j.status == status)
            .count();
        Ok(count as i64)
    }
}

/// In-memory reminder table.
#[derive(Debug, Clone, Default)]
pub struct MemoryReminderStore {
    reminders: Arc<DashMap<ReminderId, Reminder>>,
}

impl MemoryReminderStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delete a reminder, as the blog does when a user withdraws it.
    pub fn remove(&self, id: ReminderId) -> Option<Reminder> {
        self.reminders.remove(&id).map(|(_, r)| r)
    }
}

#[async_trait]
impl ReminderStore for MemoryReminderStore {
    async fn find_by_id(&self, id: ReminderId) -> AppResult<Option<Reminder>> {
        Ok(self.reminders.get(&id).map(|r| r.value().clone()))
    }

    async fn insert(&self, reminder: Reminder) -> AppResult<Reminder> {
        self.reminders.insert(reminder.id, reminder.clone());
        Ok(reminder)
    }
}

/// In-memory list of published posts.
#[derive(Debug, Clone, Default)]
pub struct MemoryCategorySource {
    entries: Arc<Mutex<Vec<DigestEntry>>>,
}

impl MemoryCategorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a post.
    pub async fn push(&self, entry: DigestEntry) {
        self.entries.lock().await.push(entry);
    }
}

#[async_trait]
impl CategorySource for MemoryCategorySource {
    async fn published_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> AppResult<Vec<DigestEntry>> {
        let mut found: Vec<DigestEntry> = self
            .entries
            .lock()
            .await
            .iter()
            .filter(|e| e.category.publish_date >= from && e.category.publish_date < until)
            .cloned()
            .collect();
        found.sort_by_key(|e| e.category.publish_date);
        Ok(found)
    }
}
