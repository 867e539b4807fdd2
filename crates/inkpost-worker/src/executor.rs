//! Job executor: dispatches claimed jobs to registered handlers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing;

use inkpost_core::error::{AppError, ErrorKind};
use inkpost_entity::job::Job;

/// A task body bound to one task name.
#[async_trait]
pub trait JobHandler: Send + Sync + std::fmt::Debug {
    /// Task name this handler processes.
    fn job_type(&self) -> &str;

    /// Run the task for the given job.
    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError>;
}

/// Error from job execution.
///
/// The variant decides what the runner does next; see
/// [`JobExecutionError::is_retryable`].
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// Permanent failure, do not retry.
    #[error("Permanent job failure: {0}")]
    Permanent(String),

    /// Transient failure, retried under the job's policy.
    #[error("Transient job failure: {0}")]
    Transient(String),

    /// The record the job refers to no longer exists.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}

impl JobExecutionError {
    /// Classify an infrastructure error raised while talking to an
    /// external collaborator.
    ///
    /// Transport and availability problems are transient; a missing record
    /// maps to [`NotFound`](Self::NotFound); invalid input is permanent;
    /// anything else stays internal.
    pub fn classify(err: AppError) -> Self {
        match err.kind {
            ErrorKind::ExternalService | ErrorKind::ServiceUnavailable => {
                Self::Transient(err.to_string())
            }
            ErrorKind::NotFound => Self::NotFound(err.message),
            ErrorKind::Validation => Self::Permanent(err.to_string()),
            _ => Self::Internal(err),
        }
    }

    /// Whether the runner may schedule another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Deserialize a job payload into the handler's argument type.
///
/// A payload that does not match is a permanent failure.
pub fn parse_payload<T: DeserializeOwned>(job: &Job) -> Result<T, JobExecutionError> {
    serde_json::from_value(job.payload.clone()).map_err(|e| {
        JobExecutionError::Permanent(format!(
            "Invalid payload for '{}' job {}: {e}",
            job.job_type, job.id
        ))
    })
}

/// Dispatches jobs to the appropriate handler based on `job_type`.
#[derive(Debug)]
pub struct JobExecutor {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl JobExecutor {
    /// Create an executor with no handlers.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler, replacing any previous one for the same task.
    pub fn register(&mut self, handler: Arc<dyn JobHandler>) {
        let job_type = handler.job_type().to_string();
        tracing::info!(job_type = %job_type, "Registered job handler");
        self.handlers.insert(job_type, handler);
    }

    /// Execute a job by dispatching to the correct handler.
    pub async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let handler = self.handlers.get(&job.job_type).ok_or_else(|| {
            JobExecutionError::Permanent(format!(
                "No handler registered for job type '{}'",
                job.job_type
            ))
        })?;

        tracing::info!(
            job_id = %job.id,
            job_type = %job.job_type,
            "Executing job: attempt {}/{}",
            job.attempts,
            job.max_attempts
        );

        handler.execute(job).await
    }

    /// Check if a handler is registered for a task name.
    pub fn has_handler(&self, job_type: &str) -> bool {
        self.handlers.contains_key(job_type)
    }

    /// Registered task names, sorted.
    pub fn registered_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.keys().cloned().collect();
        types.sort();
        types
    }
}

impl Default for JobExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use inkpost_entity::job::CreateJob;

    #[derive(Debug)]
    struct Echo;

    #[async_trait]
    impl JobHandler for Echo {
        fn job_type(&self) -> &str {
            "echo"
        }

        async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
            Ok(Some(job.payload.clone()))
        }
    }

    fn job(job_type: &str, payload: Value) -> Job {
        CreateJob {
            job_type: job_type.to_string(),
            queue: "default".to_string(),
            payload,
            max_attempts: 1,
            retry_delay_seconds: 0,
            scheduled_at: None,
        }
        .into_job(Utc::now())
    }

    #[test]
    fn test_classify_maps_error_kinds() {
        assert!(matches!(
            JobExecutionError::classify(AppError::external_service("smtp down")),
            JobExecutionError::Transient(_)
        ));
        assert!(matches!(
            JobExecutionError::classify(AppError::service_unavailable("db down")),
            JobExecutionError::Transient(_)
        ));
        assert!(matches!(
            JobExecutionError::classify(AppError::not_found("gone")),
            JobExecutionError::NotFound(_)
        ));
        assert!(matches!(
            JobExecutionError::classify(AppError::validation("bad address")),
            JobExecutionError::Permanent(_)
        ));
        assert!(matches!(
            JobExecutionError::classify(AppError::internal("boom")),
            JobExecutionError::Internal(_)
        ));
    }

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(JobExecutionError::Transient("x".into()).is_retryable());
        assert!(!JobExecutionError::Permanent("x".into()).is_retryable());
        assert!(!JobExecutionError::NotFound("x".into()).is_retryable());
    }

    #[tokio::test]
    async fn test_dispatches_by_job_type() {
        let mut executor = JobExecutor::new();
        executor.register(Arc::new(Echo));
        assert!(executor.has_handler("echo"));

        let result = executor
            .execute(&job("echo", serde_json::json!({"a": 1})))
            .await
            .unwrap();
        assert_eq!(result, Some(serde_json::json!({"a": 1})));
    }

    #[tokio::test]
    async fn test_unknown_job_type_is_permanent() {
        let executor = JobExecutor::new();
        let err = executor
            .execute(&job("nope", Value::Null))
            .await
            .unwrap_err();
        assert!(matches!(err, JobExecutionError::Permanent(_)));
    }

    #[test]
    fn test_parse_payload_rejects_mismatch() {
        #[derive(Debug, serde::Deserialize)]
        #[allow(dead_code)]
        struct Args {
            x: i64,
        }

        let ok: Args = parse_payload(&job("m", serde_json::json!({"x": 3}))).unwrap();
        assert_eq!(ok.x, 3);
        let err = parse_payload::<Args>(&job("m", serde_json::json!({"x": "three"}))).unwrap_err();
        assert!(matches!(err, JobExecutionError::Permanent(_)));
    }
}
