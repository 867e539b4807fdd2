//! Cron scheduler for the periodic tasks.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing;
use uuid::Uuid;

use inkpost_core::config::DigestConfig;
use inkpost_core::error::AppError;
use inkpost_core::result::AppResult;
use inkpost_entity::job::{Job, JobPayload};

use crate::queue::{JobCreateParams, JobQueue};
use crate::retry::RetryPolicy;

/// Submit one `digest` job now.
///
/// Shared by the weekly trigger and manual triggers.
pub async fn enqueue_digest(queue: &JobQueue, retry: RetryPolicy) -> AppResult<Job> {
    queue
        .enqueue(JobCreateParams::from_payload(&JobPayload::Digest, retry)?)
        .await
}

/// Cron-based scheduler for periodic background tasks.
pub struct CronScheduler {
    scheduler: JobScheduler,
    queue: Arc<JobQueue>,
    digest: DigestConfig,
    retry: RetryPolicy,
    digest_job: Option<Uuid>,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler")
            .field("digest_cron", &self.digest.cron)
            .field("timezone", &self.digest.timezone)
            .finish()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler.
    pub async fn new(
        queue: Arc<JobQueue>,
        digest: DigestConfig,
        retry: RetryPolicy,
    ) -> AppResult<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self {
            scheduler,
            queue,
            digest,
            retry,
            digest_job: None,
        })
    }

    /// Register all default scheduled tasks.
    pub async fn register_default_tasks(&mut self) -> AppResult<()> {
        if self.digest.enabled {
            self.digest_job = Some(self.register_weekly_digest().await?);
        } else {
            tracing::info!("Weekly digest disabled, trigger not registered");
        }

        tracing::info!("All scheduled tasks registered");
        Ok(())
    }

    /// Start the scheduler.
    pub async fn start(&self) -> AppResult<()> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        tracing::info!("Cron scheduler started");
        Ok(())
    }

    /// Next time the digest trigger fires, if it is registered.
    pub async fn next_digest_at(&mut self) -> AppResult<Option<DateTime<Utc>>> {
        let Some(id) = self.digest_job else {
            return Ok(None);
        };
        self.scheduler
            .next_tick_for_job(id)
            .await
            .map_err(|e| AppError::internal(format!("Failed to read digest schedule: {e}")))
    }

    /// Shutdown the scheduler.
    pub async fn shutdown(&mut self) -> AppResult<()> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        tracing::info!("Cron scheduler shut down");
        Ok(())
    }

    /// Weekly digest, Saturday 10:00 by default, evaluated in the digest
    /// timezone.
    async fn register_weekly_digest(&self) -> AppResult<Uuid> {
        let timezone = self.digest.timezone()?;
        let queue = Arc::clone(&self.queue);
        let retry = self.retry;

        let job = CronJob::new_async_tz(self.digest.cron.as_str(), timezone, move |_uuid, _lock| {
            let queue = Arc::clone(&queue);
            Box::pin(async move {
                tracing::debug!("Scheduling weekly digest job");
                if let Err(e) = enqueue_digest(&queue, retry).await {
                    tracing::error!(error = %e, "Failed to enqueue digest");
                }
            })
        })
        .map_err(|e| {
            AppError::configuration(format!(
                "Invalid digest schedule '{}': {e}",
                self.digest.cron
            ))
        })?;

        let id = self
            .scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add digest schedule: {e}")))?;

        tracing::info!(
            cron = %self.digest.cron,
            timezone = %timezone,
            "Registered: digest"
        );
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike, Weekday};
    use chrono_tz::Tz;
    use inkpost_core::error::ErrorKind;
    use inkpost_entity::job::JobStatus;

    use crate::memory::MemoryJobStore;

    fn queue(store: &MemoryJobStore) -> Arc<JobQueue> {
        Arc::new(JobQueue::new(
            Arc::new(store.clone()),
            "scheduler".to_string(),
            vec!["mail".to_string()],
        ))
    }

    async fn next_digest_in(timezone: &str) -> DateTime<Tz> {
        let store = MemoryJobStore::new();
        let digest = DigestConfig {
            timezone: timezone.to_string(),
            ..DigestConfig::default()
        };
        let tz = digest.timezone().unwrap();
        let mut scheduler = CronScheduler::new(queue(&store), digest, RetryPolicy::MAIL)
            .await
            .unwrap();
        scheduler.register_default_tasks().await.unwrap();
        scheduler
            .next_digest_at()
            .await
            .unwrap()
            .expect("digest trigger registered")
            .with_timezone(&tz)
    }

    #[tokio::test]
    async fn test_digest_fires_saturday_ten_in_utc() {
        let next = next_digest_in("UTC").await;
        assert_eq!(next.weekday(), Weekday::Sat);
        assert_eq!((next.hour(), next.minute(), next.second()), (10, 0, 0));
        assert!(next.with_timezone(&Utc) > Utc::now());
    }

    #[tokio::test]
    async fn test_digest_fires_saturday_ten_in_local_time() {
        for zone in ["Europe/Paris", "America/New_York"] {
            let next = next_digest_in(zone).await;
            assert_eq!(next.weekday(), Weekday::Sat, "{zone}");
            assert_eq!((next.hour(), next.minute()), (10, 0), "{zone}");
        }
    }

    #[tokio::test]
    async fn test_disabled_digest_has_no_next_tick() {
        let store = MemoryJobStore::new();
        let digest = DigestConfig {
            enabled: false,
            ..DigestConfig::default()
        };
        let mut scheduler = CronScheduler::new(queue(&store), digest, RetryPolicy::MAIL)
            .await
            .unwrap();
        scheduler.register_default_tasks().await.unwrap();
        assert!(scheduler.next_digest_at().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_cron_is_a_configuration_error() {
        let store = MemoryJobStore::new();
        let digest = DigestConfig {
            cron: "every saturday".to_string(),
            ..DigestConfig::default()
        };
        let mut scheduler = CronScheduler::new(queue(&store), digest, RetryPolicy::MAIL)
            .await
            .unwrap();
        let err = scheduler.register_default_tasks().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_invalid_timezone_is_rejected() {
        let store = MemoryJobStore::new();
        let digest = DigestConfig {
            timezone: "Mars/Olympus".to_string(),
            ..DigestConfig::default()
        };
        let mut scheduler = CronScheduler::new(queue(&store), digest, RetryPolicy::MAIL)
            .await
            .unwrap();
        assert!(scheduler.register_default_tasks().await.is_err());
    }

    #[tokio::test]
    async fn test_enqueue_digest_targets_mail_queue() {
        let store = MemoryJobStore::new();
        let job = enqueue_digest(&queue(&store), RetryPolicy::MAIL).await.unwrap();
        assert_eq!(job.job_type, "digest");
        assert_eq!(job.queue, "mail");
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.max_attempts, 6);
    }
}
