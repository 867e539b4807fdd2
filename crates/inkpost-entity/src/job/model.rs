//! Job entity model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use inkpost_core::types::id::JobId;

use super::status::JobStatus;

/// A background job.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    /// Unique job identifier.
    pub id: JobId,
    /// Task name (`"remind"`, `"digest"`, ...).
    pub job_type: String,
    /// Queue name.
    pub queue: String,
    /// Task arguments (JSON).
    pub payload: serde_json::Value,
    /// Result data on completion (JSON).
    pub result: Option<serde_json::Value>,
    /// Last error message.
    pub error_message: Option<String>,
    /// Current job status.
    pub status: JobStatus,
    /// Number of attempts started so far.
    pub attempts: i32,
    /// Maximum attempts, first run included.
    pub max_attempts: i32,
    /// Delay between attempts in seconds.
    pub retry_delay_seconds: i64,
    /// Earliest execution time (eta). `None` runs as soon as possible.
    pub scheduled_at: Option<DateTime<Utc>>,
    /// When the current or last attempt started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
    /// Worker that claimed the job.
    pub worker_id: Option<String>,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// When the job was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Whether another attempt is allowed after the current one fails.
    pub fn can_retry(&self) -> bool {
        self.attempts < self.max_attempts
    }

    /// Whether the eta has passed at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_at.is_none_or(|eta| eta <= now)
    }

    /// When the next attempt may start if the current one fails at `now`.
    pub fn next_attempt_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::seconds(self.retry_delay_seconds)
    }
}

/// Data required to create a new job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJob {
    /// Task name.
    pub job_type: String,
    /// Queue name.
    pub queue: String,
    /// Task arguments.
    pub payload: serde_json::Value,
    /// Maximum attempts, first run included.
    pub max_attempts: i32,
    /// Delay between attempts in seconds.
    pub retry_delay_seconds: i64,
    /// Earliest execution time.
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl CreateJob {
    /// Materialize the row a store inserts for this request.
    pub fn into_job(self, now: DateTime<Utc>) -> Job {
        Job {
            id: JobId::new(),
            job_type: self.job_type,
            queue: self.queue,
            payload: self.payload,
            result: None,
            error_message: None,
            status: JobStatus::Pending,
            attempts: 0,
            max_attempts: self.max_attempts,
            retry_delay_seconds: self.retry_delay_seconds,
            scheduled_at: self.scheduled_at,
            started_at: None,
            completed_at: None,
            worker_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(max_attempts: i32, scheduled_at: Option<DateTime<Utc>>) -> Job {
        CreateJob {
            job_type: "remind".to_string(),
            queue: "mail".to_string(),
            payload: serde_json::json!({}),
            max_attempts,
            retry_delay_seconds: 300,
            scheduled_at,
        }
        .into_job(Utc::now())
    }

    #[test]
    fn test_can_retry_counts_first_attempt() {
        let mut job = create(6, None);
        job.attempts = 5;
        assert!(job.can_retry());
        job.attempts = 6;
        assert!(!job.can_retry());
    }

    #[test]
    fn test_is_due_respects_eta() {
        let now = Utc::now();
        assert!(create(1, None).is_due(now));
        assert!(create(1, Some(now)).is_due(now));
        assert!(!create(1, Some(now + Duration::seconds(1))).is_due(now));
    }

    #[test]
    fn test_next_attempt_uses_fixed_delay() {
        let now = Utc::now();
        let job = create(6, None);
        assert_eq!(job.next_attempt_at(now), now + Duration::seconds(300));
    }
}
