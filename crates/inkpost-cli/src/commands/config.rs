//! Configuration inspection CLI commands.

use clap::{Args, Subcommand};

use inkpost_core::config::AppConfig;
use inkpost_core::error::AppError;
use inkpost_database::connection::mask_password;

use crate::output::{self, OutputFormat};

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration with secrets masked
    Show,
}

/// Copy of `config` safe to print.
fn redacted(config: &AppConfig) -> AppConfig {
    let mut config = config.clone();
    config.database.url = mask_password(&config.database.url);
    if config.mail.password.is_some() {
        config.mail.password = Some("****".to_string());
    }
    config
}

/// Execute config commands.
pub fn execute(args: &ConfigArgs, config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => {
            let config = redacted(config);
            match format {
                OutputFormat::Json => output::print_json(&config),
                OutputFormat::Table => {
                    println!("Database:");
                    output::print_kv("URL", &config.database.url);
                    output::print_kv("Max connections", &config.database.max_connections.to_string());
                    println!("Worker:");
                    output::print_kv("Enabled", &config.worker.enabled.to_string());
                    output::print_kv("Concurrency", &config.worker.concurrency.to_string());
                    output::print_kv(
                        "Poll interval",
                        &format!("{}s", config.worker.poll_interval_seconds),
                    );
                    output::print_kv("Queues", &config.worker.queues.join(", "));
                    output::print_kv("Lease", &format!("{}s", config.worker.lease_seconds));
                    output::print_kv(
                        "Retry",
                        &format!(
                            "{} retries, {}s apart",
                            config.worker.retry.max_retries, config.worker.retry.delay_seconds
                        ),
                    );
                    println!("Mail:");
                    output::print_kv("Transport", &format!("{:?}", config.mail.transport));
                    output::print_kv("Relay", &format!("{}:{}", config.mail.host, config.mail.port));
                    output::print_kv("Sender", &config.mail.sender);
                    println!("Digest:");
                    output::print_kv("Enabled", &config.digest.enabled.to_string());
                    output::print_kv(
                        "Schedule",
                        &format!("{} ({})", config.digest.cron, config.digest.timezone),
                    );
                    output::print_kv("Recipients", &config.digest.recipients.join(", "));
                    println!("Logging:");
                    output::print_kv(
                        "Level",
                        &format!("{} ({})", config.logging.level, config.logging.format),
                    );
                }
            }
        }
    }

    Ok(())
}
