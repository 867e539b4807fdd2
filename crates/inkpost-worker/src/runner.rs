//! Worker runner: main loop that polls for jobs and executes them.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::watch;
use tokio::time;
use tracing;

use inkpost_core::config::WorkerConfig;
use inkpost_core::result::AppResult;
use inkpost_core::types::id::JobId;
use inkpost_entity::job::Job;

use crate::executor::{JobExecutionError, JobExecutor};
use crate::queue::JobQueue;

/// How long shutdown waits for in-flight jobs.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// What happened to a claimed job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// The handler succeeded.
    Completed {
        /// Job processed.
        job_id: JobId,
        /// Handler result.
        result: Option<Value>,
    },
    /// A transient failure with attempts left: the job is pending again.
    Rescheduled {
        /// Job processed.
        job_id: JobId,
        /// New eta.
        at: DateTime<Utc>,
        /// Error of the failed attempt.
        error: String,
    },
    /// The job reached the failed state.
    Failed {
        /// Job processed.
        job_id: JobId,
        /// Final error.
        error: String,
    },
}

/// Main worker runner that polls queues and executes jobs.
#[derive(Debug)]
pub struct WorkerRunner {
    queue: Arc<JobQueue>,
    executor: Arc<JobExecutor>,
    config: WorkerConfig,
    worker_id: String,
}

impl WorkerRunner {
    /// Create a new worker runner.
    pub fn new(
        queue: Arc<JobQueue>,
        executor: Arc<JobExecutor>,
        config: WorkerConfig,
        worker_id: String,
    ) -> Self {
        Self {
            queue,
            executor,
            config,
            worker_id,
        }
    }

    /// Run until the cancel signal flips to `true`.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        let concurrency = self.config.concurrency.max(1);
        tracing::info!(
            worker_id = %self.worker_id,
            concurrency,
            poll_interval = self.config.poll_interval_seconds,
            queues = ?self.queue.queues(),
            "Worker started"
        );

        let semaphore = Arc::new(tokio::sync::Semaphore::new(concurrency));
        let poll_interval = Duration::from_secs(self.config.poll_interval_seconds);

        loop {
            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        tracing::info!(worker_id = %self.worker_id, "Worker received shutdown signal");
                        break;
                    }
                }
                claimed = self.poll_and_spawn(&semaphore) => {
                    // Keep draining while work is available.
                    if claimed {
                        continue;
                    }
                    tokio::select! {
                        changed = cancel.changed() => {
                            if changed.is_err() || *cancel.borrow() {
                                tracing::info!(worker_id = %self.worker_id, "Worker shutting down");
                                break;
                            }
                        }
                        _ = time::sleep(poll_interval) => {}
                    }
                }
            }
        }

        tracing::info!(worker_id = %self.worker_id, "Waiting for in-flight jobs to complete");

        let permits = u32::try_from(concurrency).unwrap_or(u32::MAX);
        if time::timeout(DRAIN_TIMEOUT, semaphore.acquire_many(permits))
            .await
            .is_err()
        {
            tracing::warn!(worker_id = %self.worker_id, "In-flight jobs did not finish in time");
        }

        tracing::info!(worker_id = %self.worker_id, "Worker shut down complete");
    }

    /// Process at most one due job and report what happened to it.
    pub async fn run_once(&self) -> AppResult<Option<JobOutcome>> {
        self.run_once_at(Utc::now()).await
    }

    /// Like [`run_once`](Self::run_once) with an explicit clock, so retries
    /// can be driven without waiting for the delay.
    pub async fn run_once_at(&self, now: DateTime<Utc>) -> AppResult<Option<JobOutcome>> {
        match self.queue.dequeue_at(now).await? {
            Some(job) => process(&self.queue, &self.executor, job, now).await.map(Some),
            None => Ok(None),
        }
    }

    /// Claim and spawn one job if a slot is free. Returns whether a job
    /// was claimed.
    async fn poll_and_spawn(&self, semaphore: &Arc<tokio::sync::Semaphore>) -> bool {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(p) => p,
            Err(_) => return false,
        };

        match self.queue.dequeue().await {
            Ok(Some(job)) => {
                let queue = Arc::clone(&self.queue);
                let executor = Arc::clone(&self.executor);

                tokio::spawn(async move {
                    let _permit = permit;
                    let job_id = job.id;
                    if let Err(e) = process(&queue, &executor, job, Utc::now()).await {
                        tracing::error!(job_id = %job_id, error = %e, "Failed to record job outcome");
                    }
                });
                true
            }
            Ok(None) => {
                tracing::trace!("No jobs available in queues");
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to dequeue job");
                false
            }
        }
    }
}

/// Execute a claimed job and record its outcome.
///
/// The retry time is computed from `now` plus the job's stored delay.
async fn process(
    queue: &JobQueue,
    executor: &JobExecutor,
    job: Job,
    now: DateTime<Utc>,
) -> AppResult<JobOutcome> {
    let job_id = job.id;

    match executor.execute(&job).await {
        Ok(result) => {
            queue.complete(job_id, result.clone()).await?;
            tracing::info!(job_id = %job_id, job_type = %job.job_type, "Job completed successfully");
            Ok(JobOutcome::Completed { job_id, result })
        }
        Err(err) => {
            let error = err.to_string();
            if err.is_retryable() && job.can_retry() {
                let at = job.next_attempt_at(now);
                tracing::warn!(
                    job_id = %job_id,
                    job_type = %job.job_type,
                    attempt = job.attempts,
                    max_attempts = job.max_attempts,
                    retry_at = %at,
                    error = %error,
                    "Job failed, retry scheduled"
                );
                queue.reschedule(job_id, at, &error).await?;
                return Ok(JobOutcome::Rescheduled { job_id, at, error });
            }

            match &err {
                JobExecutionError::Transient(_) => tracing::error!(
                    job_id = %job_id,
                    attempts = job.attempts,
                    error = %error,
                    "Job failed, retries exhausted"
                ),
                _ => tracing::error!(job_id = %job_id, error = %error, "Job failed permanently"),
            }
            queue.fail(job_id, &error).await?;
            Ok(JobOutcome::Failed { job_id, error })
        }
    }
}
