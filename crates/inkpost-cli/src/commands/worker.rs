//! Worker and job queue CLI commands.

use std::sync::Arc;

use clap::{Args, Subcommand, ValueEnum};
use serde::Serialize;
use tabled::Tabled;

use inkpost_core::config::AppConfig;
use inkpost_core::error::AppError;
use inkpost_database::repositories::{CategoryRepository, JobRepository, ReminderRepository};
use inkpost_entity::job::{Job, JobPayload};
use inkpost_worker::{JobCreateParams, JobOutcome, RetryPolicy, WorkerRunner, build_executor};

use crate::output::{self, OutputFormat};

/// Arguments for worker commands
#[derive(Debug, Args)]
pub struct WorkerArgs {
    /// Worker subcommand
    #[command(subcommand)]
    pub command: WorkerCommand,
}

/// Worker subcommands
#[derive(Debug, Subcommand)]
pub enum WorkerCommand {
    /// Show queue counts and the most recent jobs
    Status {
        /// Number of recent jobs to list
        #[arg(short, long, default_value_t = 10)]
        limit: i64,
    },
    /// Enqueue a job by task name
    Trigger {
        /// Task to enqueue
        #[arg(value_enum)]
        job_type: TriggerKind,
        /// JSON arguments, e.g. '{"x": 6, "y": 7}'
        #[arg(short, long, default_value = "{}")]
        payload: String,
    },
    /// Process due jobs in this process until the queues are empty
    Drain,
}

/// Tasks that can be triggered by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TriggerKind {
    /// Echo a message
    Log,
    /// Multiply two integers
    Multiply,
    /// Send this week's digest now
    Digest,
}

impl TriggerKind {
    fn job_type(self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Multiply => "multiply",
            Self::Digest => "digest",
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
struct JobRow {
    id: String,
    job_type: String,
    queue: String,
    status: String,
    attempts: String,
    eta: String,
    error: String,
}

impl From<&Job> for JobRow {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id.to_string(),
            job_type: job.job_type.clone(),
            queue: job.queue.clone(),
            status: job.status.to_string(),
            attempts: format!("{}/{}", job.attempts, job.max_attempts),
            eta: job
                .scheduled_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "-".to_string()),
            error: job.error_message.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
struct OutcomeRow {
    job_id: String,
    outcome: String,
    detail: String,
}

impl From<&JobOutcome> for OutcomeRow {
    fn from(outcome: &JobOutcome) -> Self {
        match outcome {
            JobOutcome::Completed { job_id, result } => Self {
                job_id: job_id.to_string(),
                outcome: "completed".to_string(),
                detail: result.as_ref().map(|v| v.to_string()).unwrap_or_default(),
            },
            JobOutcome::Rescheduled { job_id, at, error } => Self {
                job_id: job_id.to_string(),
                outcome: format!("retry at {}", at.to_rfc3339()),
                detail: error.clone(),
            },
            JobOutcome::Failed { job_id, error } => Self {
                job_id: job_id.to_string(),
                outcome: "failed".to_string(),
                detail: error.clone(),
            },
        }
    }
}

/// Build the typed payload of a manual trigger from its JSON arguments.
fn trigger_payload(kind: TriggerKind, payload: &str) -> Result<JobPayload, AppError> {
    let mut args: serde_json::Map<String, serde_json::Value> = serde_json::from_str(payload)
        .map_err(|e| AppError::validation(format!("Invalid JSON payload: {e}")))?;
    args.insert("job_type".to_string(), kind.job_type().into());
    serde_json::from_value(serde_json::Value::Object(args)).map_err(|e| {
        AppError::validation(format!(
            "Invalid arguments for '{}': {e}",
            kind.job_type()
        ))
    })
}

/// Execute worker commands.
pub async fn execute(
    args: &WorkerArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let pool = super::create_db_pool(config).await?;
    let queue = super::cli_queue(&pool, config);

    match &args.command {
        WorkerCommand::Status { limit } => {
            let stats = queue.stats().await?;
            let recent = JobRepository::new(pool.clone()).find_recent(*limit).await?;
            let rows: Vec<JobRow> = recent.iter().map(JobRow::from).collect();

            match format {
                OutputFormat::Json => output::print_json(&serde_json::json!({
                    "stats": stats,
                    "recent": rows,
                })),
                OutputFormat::Table => {
                    println!("Worker Queue Status:");
                    output::print_kv("Pending", &stats.pending.to_string());
                    output::print_kv("Running", &stats.running.to_string());
                    output::print_kv("Completed", &stats.completed.to_string());
                    output::print_kv("Failed", &stats.failed.to_string());
                    output::print_kv("Worker Enabled", &config.worker.enabled.to_string());
                    output::print_kv("Concurrency", &config.worker.concurrency.to_string());
                    output::print_kv("Queues", &config.worker.queues.join(", "));
                    println!();
                    output::print_list(&rows, format);
                }
            }
        }
        WorkerCommand::Trigger { job_type, payload } => {
            let payload = trigger_payload(*job_type, payload)?;
            let retry = match job_type {
                TriggerKind::Digest => RetryPolicy::from(&config.worker.retry),
                TriggerKind::Log | TriggerKind::Multiply => RetryPolicy::none(),
            };
            let job = queue
                .enqueue(JobCreateParams::from_payload(&payload, retry)?)
                .await?;
            output::print_success(&format!(
                "Job '{}' enqueued on '{}' (id: {})",
                job.job_type, job.queue, job.id
            ));
        }
        WorkerCommand::Drain => {
            let mailer = inkpost_mail::build_mailer(&config.mail)?;
            let executor = build_executor(
                Arc::new(ReminderRepository::new(pool.clone())),
                Arc::new(CategoryRepository::new(pool.clone())),
                mailer,
                &config.mail.sender,
                &config.digest,
            )?;
            let runner = WorkerRunner::new(
                Arc::clone(&queue),
                Arc::new(executor),
                config.worker.clone(),
                queue.worker_id().to_string(),
            );

            let mut outcomes = Vec::new();
            while let Some(outcome) = runner.run_once().await? {
                outcomes.push(outcome);
            }

            let failed = outcomes
                .iter()
                .filter(|o| matches!(o, JobOutcome::Failed { .. }))
                .count();
            let rows: Vec<OutcomeRow> = outcomes.iter().map(OutcomeRow::from).collect();
            output::print_list(&rows, format);
            if failed > 0 {
                output::print_warning(&format!("{failed} job(s) failed"));
            } else {
                output::print_success(&format!("{} job(s) processed", outcomes.len()));
            }
        }
    }

    pool.close().await;
    Ok(())
}
