//! Job queue abstraction for enqueuing and dequeuing background jobs.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing;

use inkpost_core::result::AppResult;
use inkpost_core::types::id::JobId;
use inkpost_entity::job::{CreateJob, Job, JobPayload, JobStatus};

use crate::retry::RetryPolicy;
use crate::store::JobStore;

/// Queue that carries outbound mail jobs.
pub const MAIL_QUEUE: &str = "mail";

/// Queue for everything else.
pub const DEFAULT_QUEUE: &str = "default";

/// Lease used when none is configured.
pub const DEFAULT_LEASE: Duration = Duration::from_secs(900);

/// Parameters for creating a new job.
#[derive(Debug, Clone)]
pub struct JobCreateParams {
    /// Task name (`"remind"`, `"digest"`, `"log"`, `"multiply"`).
    pub job_type: String,
    /// Queue name.
    pub queue: String,
    /// Task arguments as JSON.
    pub payload: serde_json::Value,
    /// Retry policy applied when the task fails transiently.
    pub retry: RetryPolicy,
    /// Earliest execution time (eta).
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl JobCreateParams {
    /// Build parameters from a typed payload: mail tasks go to
    /// [`MAIL_QUEUE`], the others to [`DEFAULT_QUEUE`].
    pub fn from_payload(payload: &JobPayload, retry: RetryPolicy) -> AppResult<Self> {
        let queue = match payload {
            JobPayload::Remind { .. } | JobPayload::Digest => MAIL_QUEUE,
            JobPayload::Log { .. } | JobPayload::Multiply { .. } => DEFAULT_QUEUE,
        };
        Ok(Self {
            job_type: payload.job_type().to_string(),
            queue: queue.to_string(),
            payload: serde_json::to_value(payload)?,
            retry,
            scheduled_at: None,
        })
    }

    /// Set the eta.
    pub fn eta(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_at = Some(at);
        self
    }

    fn into_create_job(self) -> CreateJob {
        CreateJob {
            job_type: self.job_type,
            queue: self.queue,
            payload: self.payload,
            max_attempts: self.retry.max_attempts(),
            retry_delay_seconds: self.retry.delay_seconds(),
            scheduled_at: self.scheduled_at,
        }
    }
}

/// Job queue for enqueuing and dequeuing work.
#[derive(Debug, Clone)]
pub struct JobQueue {
    store: Arc<dyn JobStore>,
    worker_id: String,
    /// Queues polled by [`dequeue`](Self::dequeue), in order.
    queues: Vec<String>,
    /// How long a claim holds before the job can be claimed again.
    lease: TimeDelta,
}

impl JobQueue {
    /// Create a queue handle polling the given queue names in order.
    pub fn new(store: Arc<dyn JobStore>, worker_id: String, queues: Vec<String>) -> Self {
        Self {
            store,
            worker_id,
            queues,
            lease: lease_delta(DEFAULT_LEASE),
        }
    }

    /// Replace the claim lease.
    ///
    /// A job still running this long after its claim is handed to the next
    /// poller, so the lease must outlast the slowest handler.
    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease_delta(lease);
        self
    }

    /// Identifier written on the jobs this handle claims.
    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Queue names polled by this handle.
    pub fn queues(&self) -> &[String] {
        &self.queues
    }

    /// Enqueue a new job.
    pub async fn enqueue(&self, params: JobCreateParams) -> AppResult<Job> {
        let job = self.store.insert(params.into_create_job().into_job(Utc::now())).await?;

        tracing::debug!(
            job_id = %job.id,
            job_type = %job.job_type,
            queue = %job.queue,
            eta = ?job.scheduled_at,
            "Enqueued job"
        );

        Ok(job)
    }

    /// Claim the next due job from the configured queues.
    pub async fn dequeue(&self) -> AppResult<Option<Job>> {
        self.dequeue_at(Utc::now()).await
    }

    /// Claim the next job due at `now`.
    pub async fn dequeue_at(&self, now: DateTime<Utc>) -> AppResult<Option<Job>> {
        let stale_before = now
            .checked_sub_signed(self.lease)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        for queue in &self.queues {
            if let Some(job) = self
                .store
                .claim_next(queue, &self.worker_id, now, stale_before)
                .await?
            {
                tracing::debug!(
                    job_id = %job.id,
                    job_type = %job.job_type,
                    queue = %job.queue,
                    attempt = job.attempts,
                    "Dequeued job"
                );
                return Ok(Some(job));
            }
        }

        Ok(None)
    }

    /// Mark a job as completed successfully.
    pub async fn complete(&self, job_id: JobId, result: Option<serde_json::Value>) -> AppResult<()> {
        self.store.complete(job_id, result).await?;
        tracing::debug!(job_id = %job_id, "Job completed");
        Ok(())
    }

    /// Mark a job as failed for good.
    pub async fn fail(&self, job_id: JobId, error: &str) -> AppResult<()> {
        self.store.fail(job_id, error).await?;
        tracing::debug!(job_id = %job_id, error = %error, "Job failed");
        Ok(())
    }

    /// Put a running job back in the queue with a new eta.
    pub async fn reschedule(
        &self,
        job_id: JobId,
        run_at: DateTime<Utc>,
        error: &str,
    ) -> AppResult<()> {
        self.store.reschedule(job_id, run_at, error).await?;
        tracing::debug!(job_id = %job_id, run_at = %run_at, "Job rescheduled");
        Ok(())
    }

    /// Get queue statistics.
    pub async fn stats(&self) -> AppResult<QueueStats> {
        Ok(QueueStats {
            pending: self.store.count_by_status(JobStatus::Pending).await?,
            running: self.store.count_by_status(JobStatus::Running).await?,
            completed: self.store.count_by_status(JobStatus::Completed).await?,
            failed: self.store.count_by_status(JobStatus::Failed).await?,
            worker_id: self.worker_id.clone(),
        })
    }
}

fn lease_delta(lease: Duration) -> TimeDelta {
    TimeDelta::from_std(lease).unwrap_or(TimeDelta::MAX)
}

/// Queue statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Number of pending jobs.
    pub pending: i64,
    /// Number of running jobs.
    pub running: i64,
    /// Number of completed jobs.
    pub completed: i64,
    /// Number of failed jobs.
    pub failed: i64,
    /// Current worker identifier.
    pub worker_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use inkpost_core::error::ErrorKind;
    use inkpost_core::types::id::ReminderId;

    use crate::memory::MemoryJobStore;

    fn queue(store: &MemoryJobStore) -> JobQueue {
        JobQueue::new(
            Arc::new(store.clone()),
            "test-worker".to_string(),
            vec![MAIL_QUEUE.to_string(), DEFAULT_QUEUE.to_string()],
        )
    }

    fn multiply() -> JobCreateParams {
        JobCreateParams::from_payload(&JobPayload::Multiply { x: 2, y: 3 }, RetryPolicy::none())
            .unwrap()
    }

    #[test]
    fn test_from_payload_routes_mail_tasks() {
        let remind = JobCreateParams::from_payload(
            &JobPayload::Remind {
                reminder_id: ReminderId::new(),
            },
            RetryPolicy::MAIL,
        )
        .unwrap();
        assert_eq!(remind.queue, MAIL_QUEUE);
        assert_eq!(remind.job_type, "remind");
        assert_eq!(multiply().queue, DEFAULT_QUEUE);
    }

    #[tokio::test]
    async fn test_enqueue_stores_retry_policy() {
        let store = MemoryJobStore::new();
        let job = queue(&store)
            .enqueue(JobCreateParams::from_payload(&JobPayload::Digest, RetryPolicy::MAIL).unwrap())
            .await
            .unwrap();

        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.attempts, 0);
        assert_eq!(job.max_attempts, 6);
        assert_eq!(job.retry_delay_seconds, 300);
        assert_eq!(store.jobs().await.len(), 1);
    }

    #[tokio::test]
    async fn test_dequeue_claims_once_and_counts_attempt() {
        let store = MemoryJobStore::new();
        let queue = queue(&store);
        let job = queue.enqueue(multiply()).await.unwrap();

        let claimed = queue.dequeue().await.unwrap().unwrap();
        assert_eq!(claimed.id, job.id);
        assert_eq!(claimed.status, JobStatus::Running);
        assert_eq!(claimed.attempts, 1);
        assert_eq!(claimed.worker_id.as_deref(), Some("test-worker"));

        assert!(queue.dequeue().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_dequeue_honours_eta() {
        let store = MemoryJobStore::new();
        let queue = queue(&store);
        let eta = Utc::now() + ChronoDuration::hours(1);
        queue.enqueue(multiply().eta(eta)).await.unwrap();

        assert!(queue.dequeue_at(eta - ChronoDuration::seconds(1)).await.unwrap().is_none());
        assert!(queue.dequeue_at(eta).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_dequeue_skips_unpolled_queues() {
        let store = MemoryJobStore::new();
        let mail_only = JobQueue::new(
            Arc::new(store.clone()),
            "mailer".to_string(),
            vec![MAIL_QUEUE.to_string()],
        );
        mail_only.enqueue(multiply()).await.unwrap();
        assert!(mail_only.dequeue().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stats_count_each_status() {
        let store = MemoryJobStore::new();
        let queue = queue(&store);
        queue.enqueue(multiply()).await.unwrap();
        queue.enqueue(multiply()).await.unwrap();
        let claimed = queue.dequeue().await.unwrap().unwrap();
        queue.complete(claimed.id, None).await.unwrap();

        let stats = queue.stats().await.unwrap();
        assert_eq!((stats.pending, stats.running, stats.completed, stats.failed), (1, 0, 1, 0));
        assert_eq!(stats.worker_id, "test-worker");
    }

    #[tokio::test]
    async fn test_enqueue_propagates_store_outage() {
        let store = MemoryJobStore::new();
        store.set_unavailable(true);
        let err = queue(&store).enqueue(multiply()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ServiceUnavailable);
    }

    #[tokio::test]
    async fn test_expired_lease_is_claimed_again() {
        let store = MemoryJobStore::new();
        let crashed = queue(&store).with_lease(Duration::from_secs(600));
        let job = crashed.enqueue(multiply()).await.unwrap();
        let t0 = Utc::now();
        crashed.dequeue_at(t0).await.unwrap().unwrap();

        let survivor = JobQueue::new(
            Arc::new(store.clone()),
            "survivor".to_string(),
            vec![DEFAULT_QUEUE.to_string()],
        )
        .with_lease(Duration::from_secs(600));
        assert!(survivor
            .dequeue_at(t0 + ChronoDuration::seconds(600))
            .await
            .unwrap()
            .is_none());

        let reclaimed = survivor
            .dequeue_at(t0 + ChronoDuration::seconds(601))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reclaimed.id, job.id);
        assert_eq!(reclaimed.attempts, 2);
        assert_eq!(reclaimed.worker_id.as_deref(), Some("survivor"));
    }

    #[tokio::test]
    async fn test_finished_jobs_are_never_reclaimed() {
        let store = MemoryJobStore::new();
        let queue = queue(&store).with_lease(Duration::from_secs(1));
        queue.enqueue(multiply()).await.unwrap();
        let t0 = Utc::now();
        let claimed = queue.dequeue_at(t0).await.unwrap().unwrap();
        queue.complete(claimed.id, None).await.unwrap();

        assert!(queue
            .dequeue_at(t0 + ChronoDuration::hours(1))
            .await
            .unwrap()
            .is_none());
    }
}
