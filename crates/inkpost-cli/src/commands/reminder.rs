//! Reminder management CLI commands.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use inkpost_core::config::AppConfig;
use inkpost_core::error::AppError;
use inkpost_database::repositories::ReminderRepository;
use inkpost_entity::reminder::{NewReminder, Reminder};
use inkpost_worker::{ReminderDispatcher, ReminderService, RetryPolicy};

use crate::output::{self, OutputFormat};

/// Arguments for reminder commands
#[derive(Debug, Args)]
pub struct ReminderArgs {
    /// Reminder subcommand
    #[command(subcommand)]
    pub command: ReminderCommand,
}

/// Reminder subcommands
#[derive(Debug, Subcommand)]
pub enum ReminderCommand {
    /// Save a reminder and schedule its email
    Add {
        /// Destination address
        #[arg(long, value_parser = parse_email)]
        email: String,
        /// Email body
        #[arg(long)]
        text: String,
        /// Delivery time, RFC 3339 (e.g. 2025-03-01T09:00:00Z)
        #[arg(long, value_parser = parse_at)]
        at: DateTime<Utc>,
    },
    /// List upcoming reminders
    List {
        /// Maximum number of reminders to show
        #[arg(short, long, default_value_t = 20)]
        limit: i64,
    },
}

#[derive(Debug, Serialize, Tabled)]
struct ReminderRow {
    id: String,
    email: String,
    date: String,
    text: String,
}

impl From<&Reminder> for ReminderRow {
    fn from(reminder: &Reminder) -> Self {
        Self {
            id: reminder.id.to_string(),
            email: reminder.email.clone(),
            date: reminder.date.to_rfc3339(),
            text: reminder.text.clone(),
        }
    }
}

fn parse_email(value: &str) -> Result<String, String> {
    inkpost_mail::normalize_address(value).map_err(|e| e.message)
}

fn parse_at(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {e}"))
}

/// Execute reminder commands.
pub async fn execute(
    args: &ReminderArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let pool = super::create_db_pool(config).await?;
    let repo = ReminderRepository::new(pool.clone());

    match &args.command {
        ReminderCommand::Add { email, text, at } => {
            let dispatcher = ReminderDispatcher::new(
                super::cli_queue(&pool, config),
                RetryPolicy::from(&config.worker.retry),
            );
            let service = ReminderService::new(Arc::new(repo), dispatcher);
            let (reminder, job) = service
                .create(NewReminder {
                    text: text.clone(),
                    email: email.clone(),
                    date: *at,
                })
                .await?;

            output::print_success(&format!(
                "Reminder {} saved, delivery job {} scheduled for {}",
                reminder.id,
                job.id,
                reminder.date.to_rfc3339()
            ));
        }
        ReminderCommand::List { limit } => {
            let reminders = repo.find_upcoming(*limit).await?;
            let rows: Vec<ReminderRow> = reminders.iter().map(ReminderRow::from).collect();
            output::print_list(&rows, format);
        }
    }

    pool.close().await;
    Ok(())
}
