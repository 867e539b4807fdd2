//! Background job processing and scheduled tasks for Inkpost.
//!
//! This crate provides:
//! - A job queue over a pluggable [`store::JobStore`] (PostgreSQL or in-memory)
//! - A worker runner that claims due jobs and applies the retry contract
//! - A cron scheduler that enqueues the weekly digest
//! - The reminder dispatch hook run when a reminder is saved
//! - The `remind`, `digest`, `log` and `multiply` job handlers

pub mod dispatch;
pub mod executor;
pub mod jobs;
pub mod memory;
pub mod queue;
pub mod render;
pub mod retry;
pub mod runner;
pub mod scheduler;
pub mod store;
pub mod week;

pub use dispatch::{ReminderDispatcher, ReminderService};
pub use executor::{JobExecutionError, JobExecutor, JobHandler};
pub use jobs::build_executor;
pub use queue::{JobCreateParams, JobQueue, QueueStats};
pub use retry::RetryPolicy;
pub use runner::{JobOutcome, WorkerRunner};
pub use scheduler::CronScheduler;
