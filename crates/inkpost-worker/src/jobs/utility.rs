//! Smoke-test jobs that exercise the queue without side effects.

use async_trait::async_trait;
use serde_json::Value;
use tracing;

use inkpost_entity::job::{Job, JobPayload};

use crate::executor::{JobExecutionError, JobHandler, parse_payload};

/// Echoes its message.
#[derive(Debug, Default)]
pub struct LogJobHandler;

#[async_trait]
impl JobHandler for LogJobHandler {
    fn job_type(&self) -> &str {
        "log"
    }

    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        match parse_payload::<JobPayload>(job)? {
            JobPayload::Log { msg } => {
                tracing::info!(job_id = %job.id, "{msg}");
                Ok(Some(Value::String(msg)))
            }
            other => Err(JobExecutionError::Permanent(format!(
                "Expected a log payload, got '{}'",
                other.job_type()
            ))),
        }
    }
}

/// Multiplies two integers.
#[derive(Debug, Default)]
pub struct MultiplyJobHandler;

#[async_trait]
impl JobHandler for MultiplyJobHandler {
    fn job_type(&self) -> &str {
        "multiply"
    }

    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let (x, y) = match parse_payload::<JobPayload>(job)? {
            JobPayload::Multiply { x, y } => (x, y),
            other => {
                return Err(JobExecutionError::Permanent(format!(
                    "Expected a multiply payload, got '{}'",
                    other.job_type()
                )));
            }
        };

        let product = x
            .checked_mul(y)
            .ok_or_else(|| JobExecutionError::Permanent(format!("{x} * {y} overflows i64")))?;
        Ok(Some(Value::from(product)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use inkpost_entity::job::CreateJob;

    fn job(payload: Value) -> Job {
        CreateJob {
            job_type: "multiply".into(),
            queue: "default".into(),
            payload,
            max_attempts: 1,
            retry_delay_seconds: 0,
            scheduled_at: None,
        }
        .into_job(Utc::now())
    }

    #[tokio::test]
    async fn test_multiply_overflow_is_permanent() {
        let err = MultiplyJobHandler
            .execute(&job(serde_json::json!({"job_type": "multiply", "x": i64::MAX, "y": 2})))
            .await
            .unwrap_err();
        assert!(matches!(err, JobExecutionError::Permanent(_)));
    }

    #[tokio::test]
    async fn test_log_rejects_foreign_payload() {
        let err = LogJobHandler
            .execute(&job(serde_json::json!({"job_type": "multiply", "x": 1, "y": 2})))
            .await
            .unwrap_err();
        assert!(matches!(err, JobExecutionError::Permanent(_)));
    }
}
