//! Job repository implementation.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use inkpost_core::error::{AppError, ErrorKind};
use inkpost_core::result::AppResult;
use inkpost_core::types::id::JobId;
use inkpost_entity::job::model::Job;
use inkpost_entity::job::status::JobStatus;

/// Repository for background job persistence and queue operations.
#[derive(Debug, Clone)]
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    /// Create a new job repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a job by ID.
    pub async fn find_by_id(&self, id: JobId) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find job", e))
    }

    /// List the most recently created jobs.
    pub async fn find_recent(&self, limit: i64) -> AppResult<Vec<Job>> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs ORDER BY created_at DESC LIMIT $1")
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list jobs", e))
    }

    /// Insert a new job row.
    pub async fn create(&self, job: &Job) -> AppResult<Job> {
        sqlx::query_as::<_, Job>(
            "INSERT INTO jobs (id, job_type, queue, payload, status, attempts, max_attempts, \
             retry_delay_seconds, scheduled_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING *",
        )
        .bind(job.id)
        .bind(&job.job_type)
        .bind(&job.queue)
        .bind(&job.payload)
        .bind(job.status)
        .bind(job.attempts)
        .bind(job.max_attempts)
        .bind(job.retry_delay_seconds)
        .bind(job.scheduled_at)
        .bind(job.created_at)
        .bind(job.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::ServiceUnavailable, "Failed to create job", e)
        })
    }

    /// Claim the oldest due job of a queue (SKIP LOCKED for concurrency).
    ///
    /// A job left `running` since before `stale_before` counts as due: its
    /// worker is presumed dead.
    pub async fn claim_next(
        &self,
        queue: &str,
        worker_id: &str,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
    ) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>(
            "UPDATE jobs SET status = 'running', started_at = $3, worker_id = $2, \
             attempts = attempts + 1, updated_at = $3 \
             WHERE id = ( \
                SELECT id FROM jobs \
                WHERE queue = $1 AND ( \
                   (status = 'pending' AND (scheduled_at IS NULL OR scheduled_at <= $3)) \
                   OR (status = 'running' AND started_at < $4) \
                ) \
                ORDER BY COALESCE(scheduled_at, created_at) ASC, created_at ASC \
                LIMIT 1 \
                FOR UPDATE SKIP LOCKED \
             ) RETURNING *",
        )
        .bind(queue)
        .bind(worker_id)
        .bind(now)
        .bind(stale_before)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to claim job", e))
    }

    /// Mark a job as completed.
    pub async fn complete(&self, id: JobId, result: Option<&serde_json::Value>) -> AppResult<()> {
        sqlx::query(
            "UPDATE jobs SET status = 'completed', result = $2, error_message = NULL, \
             completed_at = NOW(), updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(result)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to complete job", e))?;
        Ok(())
    }

    /// Mark a job as failed for good.
    pub async fn fail(&self, id: JobId, error_message: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE jobs SET status = 'failed', error_message = $2, completed_at = NOW(), \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(error_message)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to mark job as failed", e)
        })?;
        Ok(())
    }

    /// Put a running job back to pending with a new eta.
    pub async fn reschedule(
        &self,
        id: JobId,
        run_at: DateTime<Utc>,
        error_message: &str,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE jobs SET status = 'pending', scheduled_at = $2, error_message = $3, \
             worker_id = NULL, updated_at = NOW() WHERE id = $1 AND status = 'running'",
        )
        .bind(id)
        .bind(run_at)
        .bind(error_message)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to reschedule job", e))?;
        Ok(())
    }

    /// Count jobs in a given status.
    pub async fn count_by_status(&self, status: JobStatus) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE status = $1")
            .bind(status)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count jobs", e))
    }
}
