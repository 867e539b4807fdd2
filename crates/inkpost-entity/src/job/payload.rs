//! Typed job payload definitions.

use serde::{Deserialize, Serialize};

use inkpost_core::types::id::ReminderId;

/// Typed payloads for the known task names.
///
/// Serialized internally tagged, so a stored payload always carries its
/// own `job_type` next to the arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "job_type")]
pub enum JobPayload {
    /// Deliver one reminder email.
    #[serde(rename = "remind")]
    Remind {
        /// Reminder to deliver.
        reminder_id: ReminderId,
    },
    /// Send the weekly digest of the current ISO week.
    #[serde(rename = "digest")]
    Digest,
    /// Echo a message through the queue.
    #[serde(rename = "log")]
    Log {
        /// Message to echo.
        msg: String,
    },
    /// Multiply two integers through the queue.
    #[serde(rename = "multiply")]
    Multiply {
        /// Left operand.
        x: i64,
        /// Right operand.
        y: i64,
    },
}

impl JobPayload {
    /// Task name this payload is dispatched to.
    pub fn job_type(&self) -> &'static str {
        match self {
            Self::Remind { .. } => "remind",
            Self::Digest => "digest",
            Self::Log { .. } => "log",
            Self::Multiply { .. } => "multiply",
        }
    }
}
