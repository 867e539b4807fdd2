//! In-memory mail transport.
//!
//! Keeps every delivered message in a buffer and logs it. Failures can be
//! scripted with [`MemoryMailer::fail_next`], which makes the recorder
//! useful for exercising retry paths.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use inkpost_core::error::AppError;
use inkpost_core::result::AppResult;
use inkpost_core::traits::mailer::Mailer;
use inkpost_core::types::email::EmailMessage;

/// Mail transport that records messages instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct MemoryMailer {
    sent: Arc<Mutex<Vec<EmailMessage>>>,
    failures_pending: Arc<AtomicU32>,
    attempts: Arc<AtomicUsize>,
}

impl MemoryMailer {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` sends fail with a transport error.
    pub fn fail_next(&self, count: u32) {
        self.failures_pending.store(count, Ordering::SeqCst);
    }

    /// Messages delivered so far.
    pub async fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().await.clone()
    }

    /// Number of send calls, failed ones included.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, message: &EmailMessage) -> AppResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let should_fail = self
            .failures_pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(AppError::external_service("Memory transport refused message"));
        }

        info!(
            to = ?message.to,
            subject = %message.subject,
            "Email recorded by memory transport"
        );
        self.sent.lock().await.push(message.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
