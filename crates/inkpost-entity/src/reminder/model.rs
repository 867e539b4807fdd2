//! Reminder entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use inkpost_core::types::id::ReminderId;

/// A one-shot email scheduled for a future moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Reminder {
    /// Unique reminder identifier.
    pub id: ReminderId,
    /// Free-text body of the email.
    pub text: String,
    /// Destination address.
    pub email: String,
    /// Earliest delivery time.
    pub date: DateTime<Utc>,
}

/// Data required to create a reminder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReminder {
    /// Free-text body of the email.
    pub text: String,
    /// Destination address.
    pub email: String,
    /// Earliest delivery time.
    pub date: DateTime<Utc>,
}

impl NewReminder {
    /// Assign an identifier, producing the row to insert.
    pub fn into_reminder(self) -> Reminder {
        Reminder {
            id: ReminderId::new(),
            text: self.text,
            email: self.email,
            date: self.date,
        }
    }
}
