//! Background worker configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Background job worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the worker is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Number of jobs processed at the same time by one worker process.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Interval in seconds between job queue polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Queues to poll, in priority order.
    #[serde(default = "default_queues")]
    pub queues: Vec<String>,
    /// Seconds a claimed job may stay running before another worker may
    /// claim it again.
    #[serde(default = "default_lease")]
    pub lease_seconds: u64,
    /// Retry policy applied to mail-sending jobs.
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Retry settings for jobs whose failures are transient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Number of retries after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Fixed delay between attempts, in seconds.
    #[serde(default = "default_retry_delay")]
    pub delay_seconds: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            concurrency: default_concurrency(),
            poll_interval_seconds: default_poll_interval(),
            queues: default_queues(),
            lease_seconds: default_lease(),
            retry: RetryConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Claim lease as a [`Duration`].
    pub fn lease(&self) -> Duration {
        Duration::from_secs(self.lease_seconds)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            delay_seconds: default_retry_delay(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> usize {
    1
}

fn default_poll_interval() -> u64 {
    5
}

fn default_queues() -> Vec<String> {
    vec!["mail".to_string(), "default".to_string()]
}

fn default_lease() -> u64 {
    900
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_delay() -> u64 {
    300
}
