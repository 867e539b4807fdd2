//! Storage seams used by the queue and the job handlers.
//!
//! The PostgreSQL repositories implement these traits directly; the
//! [`memory`](crate::memory) module provides in-process twins.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use inkpost_core::result::AppResult;
use inkpost_core::types::id::{JobId, ReminderId};
use inkpost_database::repositories::{CategoryRepository, JobRepository, ReminderRepository};
use inkpost_entity::category::DigestEntry;
use inkpost_entity::job::{Job, JobStatus};
use inkpost_entity::reminder::Reminder;

/// Persistence behind the job queue.
#[async_trait]
pub trait JobStore: Send + Sync + std::fmt::Debug + 'static {
    /// Persist a new pending job.
    async fn insert(&self, job: Job) -> AppResult<Job>;

    /// Atomically claim the oldest job of `queue` that is either pending
    /// with its eta passed at `now`, or still running since before
    /// `stale_before`. Bumps the attempt counter.
    async fn claim_next(
        &self,
        queue: &str,
        worker_id: &str,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
    ) -> AppResult<Option<Job>>;

    /// Record a successful run.
    async fn complete(&self, id: JobId, result: Option<Value>) -> AppResult<()>;

    /// Record a final failure.
    async fn fail(&self, id: JobId, error: &str) -> AppResult<()>;

    /// Return a running job to pending with a new eta.
    async fn reschedule(&self, id: JobId, run_at: DateTime<Utc>, error: &str) -> AppResult<()>;

    /// Look a job up.
    async fn find_by_id(&self, id: JobId) -> AppResult<Option<Job>>;

    /// Count jobs in a status.
    async fn count_by_status(&self, status: JobStatus) -> AppResult<i64>;
}

/// Reminder records as seen by the dispatch hook and the `remind` job.
#[async_trait]
pub trait ReminderStore: Send + Sync + std::fmt::Debug + 'static {
    /// Look a reminder up.
    async fn find_by_id(&self, id: ReminderId) -> AppResult<Option<Reminder>>;

    /// Save a new reminder.
    async fn insert(&self, reminder: Reminder) -> AppResult<Reminder>;
}

/// Read access to published posts for the digest.
#[async_trait]
pub trait CategorySource: Send + Sync + std::fmt::Debug + 'static {
    /// Posts with `from <= publish_date < until`.
    async fn published_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> AppResult<Vec<DigestEntry>>;
}

#[async_trait]
impl JobStore for JobRepository {
    async fn insert(&self, job: Job) -> AppResult<Job> {
        self.create(&job).await
    }

    async fn claim_next(
        &self,
        queue: &str,
        worker_id: &str,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
    ) -> AppResult<Option<Job>> {
        JobRepository::claim_next(self, queue, worker_id, now, stale_before).await
    }

    async fn complete(&self, id: JobId, result: Option<Value>) -> AppResult<()> {
        JobRepository::complete(self, id, result.as_ref()).await
    }

    async fn fail(&self, id: JobId, error: &str) -> AppResult<()> {
        JobRepository::fail(self, id, error).await
    }

    async fn reschedule(&self, id: JobId, run_at: DateTime<Utc>, error: &str) -> AppResult<()> {
        JobRepository::reschedule(self, id, run_at, error).await
    }

    async fn find_by_id(&self, id: JobId) -> AppResult<Option<Job>> {
        JobRepository::find_by_id(self, id).await
    }

    async fn count_by_status(&self, status: JobStatus) -> AppResult<i64> {
        JobRepository::count_by_status(self, status).await
    }
}

#[async_trait]
impl ReminderStore for ReminderRepository {
    async fn find_by_id(&self, id: ReminderId) -> AppResult<Option<Reminder>> {
        ReminderRepository::find_by_id(self, id).await
    }

    async fn insert(&self, reminder: Reminder) -> AppResult<Reminder> {
        self.create(&reminder).await
    }
}

#[async_trait]
impl CategorySource for CategoryRepository {
    async fn published_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> AppResult<Vec<DigestEntry>> {
        self.find_published_between(from, until).await
    }
}
