//! Retry policy attached to jobs at submission time.

use std::time::Duration;

use inkpost_core::config::RetryConfig;

/// Fixed-delay retry policy.
///
/// `max_retries` counts attempts after the first one, so a job submitted
/// with the default policy runs at most six times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay between two attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Policy used by the mail jobs: 5 retries, 300 s apart.
    pub const MAIL: Self = Self {
        max_retries: 5,
        delay: Duration::from_secs(300),
    };

    /// Single attempt, no retry.
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            delay: Duration::ZERO,
        }
    }

    /// Total attempts allowed, first run included.
    pub fn max_attempts(&self) -> i32 {
        i32::try_from(self.max_retries).unwrap_or(i32::MAX - 1) + 1
    }

    /// Delay in whole seconds as stored on the job row.
    pub fn delay_seconds(&self) -> i64 {
        i64::try_from(self.delay.as_secs()).unwrap_or(i64::MAX)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::MAIL
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            delay: Duration::from_secs(config.delay_seconds),
        }
    }
}
