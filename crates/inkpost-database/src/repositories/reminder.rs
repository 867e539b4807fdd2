//! Reminder repository implementation.

use sqlx::PgPool;

use inkpost_core::error::{AppError, ErrorKind};
use inkpost_core::result::AppResult;
use inkpost_core::types::id::ReminderId;
use inkpost_entity::reminder::Reminder;

/// Repository for scheduled reminders.
#[derive(Debug, Clone)]
pub struct ReminderRepository {
    pool: PgPool,
}

impl ReminderRepository {
    /// Create a new reminder repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a reminder by ID.
    pub async fn find_by_id(&self, id: ReminderId) -> AppResult<Option<Reminder>> {
        sqlx::query_as::<_, Reminder>("SELECT * FROM reminders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find reminder", e))
    }

    /// List reminders, soonest first.
    pub async fn find_upcoming(&self, limit: i64) -> AppResult<Vec<Reminder>> {
        sqlx::query_as::<_, Reminder>(
            "SELECT * FROM reminders WHERE date >= NOW() ORDER BY date ASC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list reminders", e))
    }

    /// Insert a reminder.
    pub async fn create(&self, reminder: &Reminder) -> AppResult<Reminder> {
        sqlx::query_as::<_, Reminder>(
            "INSERT INTO reminders (id, text, email, date) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(reminder.id)
        .bind(&reminder.text)
        .bind(&reminder.email)
        .bind(reminder.date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create reminder", e))
    }
}
