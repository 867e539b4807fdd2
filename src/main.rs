//! Inkpost worker daemon.
//!
//! Wires the database, the mail transport, the job handlers, the cron
//! scheduler and the worker runner together, then runs until Ctrl+C or
//! SIGTERM.

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use inkpost_core::config::{AppConfig, LogFormat};
use inkpost_core::error::AppError;
use inkpost_database::repositories::{CategoryRepository, JobRepository, ReminderRepository};
use inkpost_worker::{CronScheduler, JobQueue, RetryPolicy, WorkerRunner, build_executor};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Worker error");
        std::process::exit(1);
    }
}

/// Load configuration from `INKPOST_CONFIG` or from `config/` and the
/// `INKPOST_ENV` overlay.
fn load_configuration() -> Result<AppConfig, AppError> {
    match std::env::var("INKPOST_CONFIG") {
        Ok(path) => AppConfig::load_from(&path),
        Err(_) => {
            let env = std::env::var("INKPOST_ENV").unwrap_or_else(|_| "development".to_string());
            AppConfig::load(&env)
        }
    }
}

/// Initialize tracing/logging.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        LogFormat::Pretty => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main worker run function.
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Inkpost worker v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Database connection + migrations ─────────────────
    tracing::info!("Connecting to database...");
    let db = inkpost_database::DatabasePool::connect(&config.database).await?;
    inkpost_database::migration::run_migrations(db.pool()).await?;

    // ── Step 2: Mail transport ───────────────────────────────────
    let mailer = inkpost_mail::build_mailer(&config.mail)?;

    // ── Step 3: Queue and handlers ───────────────────────────────
    let worker_id = format!("worker-{}", &uuid::Uuid::new_v4().simple().to_string()[..8]);
    let job_queue = Arc::new(
        JobQueue::new(
            Arc::new(JobRepository::new(db.pool().clone())),
            worker_id.clone(),
            config.worker.queues.clone(),
        )
        .with_lease(config.worker.lease()),
    );

    let executor = build_executor(
        Arc::new(ReminderRepository::new(db.pool().clone())),
        Arc::new(CategoryRepository::new(db.pool().clone())),
        mailer,
        &config.mail.sender,
        &config.digest,
    )?;
    tracing::info!(handlers = ?executor.registered_types(), "Job handlers registered");

    // ── Step 4: Cron scheduler ───────────────────────────────────
    let mut scheduler = CronScheduler::new(
        Arc::clone(&job_queue),
        config.digest.clone(),
        RetryPolicy::from(&config.worker.retry),
    )
    .await?;
    scheduler.register_default_tasks().await?;
    scheduler.start().await?;
    if let Some(at) = scheduler.next_digest_at().await? {
        tracing::info!(next_digest = %at, "Weekly digest scheduled");
    }

    // ── Step 5: Worker runner ────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker_handle = if config.worker.enabled {
        let runner = WorkerRunner::new(
            Arc::clone(&job_queue),
            Arc::new(executor),
            config.worker.clone(),
            worker_id,
        );
        Some(tokio::spawn(async move {
            runner.run(shutdown_rx).await;
        }))
    } else {
        tracing::info!("Job consumption disabled, running the scheduler only");
        None
    };

    // ── Step 6: Wait for shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received");

    let _ = shutdown_tx.send(true);
    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!(error = %e, "Scheduler did not shut down cleanly");
    }
    if let Some(handle) = worker_handle {
        let _ = handle.await;
    }

    db.close().await;
    tracing::info!("Inkpost worker shut down gracefully");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
