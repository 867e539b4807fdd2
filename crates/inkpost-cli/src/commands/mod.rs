//! CLI command definitions and dispatch.

pub mod config;
pub mod migrate;
pub mod reminder;
pub mod worker;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use inkpost_core::config::AppConfig;
use inkpost_core::error::AppError;
use inkpost_database::repositories::JobRepository;
use inkpost_worker::JobQueue;

use crate::output::OutputFormat;

/// Inkpost: blog reminders and weekly digest delivery
#[derive(Debug, Parser)]
#[command(name = "inkpost", version, about, long_about = None)]
pub struct Cli {
    /// Path to a configuration file (defaults to `config/default.toml`
    /// plus the `INKPOST_ENV` overlay)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Job queue and worker management
    Worker(worker::WorkerArgs),
    /// Reminder management
    Reminder(reminder::ReminderArgs),
    /// Configuration inspection
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command.
    pub async fn execute(&self) -> Result<(), AppError> {
        let config = load_config(self.config.as_deref())?;
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, &config).await,
            Commands::Worker(args) => worker::execute(args, &config, self.format).await,
            Commands::Reminder(args) => reminder::execute(args, &config, self.format).await,
            Commands::Config(args) => config::execute(args, &config, self.format),
        }
    }
}

/// Load configuration from an explicit file or from the environment.
pub fn load_config(path: Option<&str>) -> Result<AppConfig, AppError> {
    match path {
        Some(path) => AppConfig::load_from(path),
        None => {
            let env = std::env::var("INKPOST_ENV").unwrap_or_else(|_| "development".to_string());
            AppConfig::load(&env)
        }
    }
}

/// Create a database pool from configuration.
pub async fn create_db_pool(config: &AppConfig) -> Result<sqlx::PgPool, AppError> {
    let pool = inkpost_database::DatabasePool::connect(&config.database).await?;
    Ok(pool.into_pool())
}

/// Queue handle for submissions made from the CLI.
pub fn cli_queue(pool: &sqlx::PgPool, config: &AppConfig) -> Arc<JobQueue> {
    Arc::new(JobQueue::new(
        Arc::new(JobRepository::new(pool.clone())),
        format!("inkpost-cli-{}", std::process::id()),
        config.worker.queues.clone(),
    )
    .with_lease(config.worker.lease()))
}
