//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod database;
pub mod digest;
pub mod logging;
pub mod mail;
pub mod worker;

use serde::{Deserialize, Serialize};

pub use self::database::DatabaseConfig;
pub use self::digest::DigestConfig;
pub use self::logging::{LogFormat, LoggingConfig};
pub use self::mail::{MailConfig, MailTransportKind};
pub use self::worker::{RetryConfig, WorkerConfig};

use crate::error::AppError;

/// Environment variable prefix for overrides (`INKPOST__MAIL__HOST=...`).
const ENV_PREFIX: &str = "INKPOST";

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database connection settings.
    pub database: DatabaseConfig,
    /// Background worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Outbound mail settings.
    #[serde(default)]
    pub mail: MailConfig,
    /// Weekly digest schedule and recipients.
    #[serde(default)]
    pub digest: DigestConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration for a named environment.
    ///
    /// Merges `config/default.toml`, the `config/{env}.toml` overlay and
    /// environment variables prefixed with `INKPOST__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        Self::build(
            config::Config::builder()
                .add_source(config::File::with_name("config/default").required(false))
                .add_source(config::File::with_name(&format!("config/{env}")).required(false)),
        )
    }

    /// Load configuration from an explicit file, still honouring
    /// environment variable overrides.
    pub fn load_from(path: &str) -> Result<Self, AppError> {
        Self::build(config::Config::builder().add_source(config::File::with_name(path)))
    }

    fn build(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, AppError> {
        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("digest.recipients")
                    .with_list_parse_key("worker.queues")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> AppConfig {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config = parse(
            r#"
            [database]
            url = "postgres://inkpost@localhost/inkpost"
            "#,
        );

        assert_eq!(config.worker.concurrency, 1);
        assert_eq!(config.worker.retry.max_retries, 5);
        assert_eq!(config.worker.retry.delay_seconds, 300);
        assert_eq!(config.mail.transport, MailTransportKind::Smtp);
        assert_eq!(config.mail.port, 25);
        assert_eq!(config.digest.cron, "0 0 10 * * Sat");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_sections_override_defaults() {
        let config = parse(
            r#"
            [database]
            url = "postgres://inkpost@localhost/inkpost"

            [mail]
            transport = "memory"
            sender = "digest@blog.test"

            [digest]
            timezone = "Europe/Paris"
            recipients = ["a@blog.test", "b@blog.test"]

            [worker.retry]
            max_retries = 2
            "#,
        );

        assert_eq!(config.mail.transport, MailTransportKind::Memory);
        assert_eq!(config.mail.sender, "digest@blog.test");
        assert_eq!(config.digest.recipients.len(), 2);
        assert_eq!(config.digest.timezone().unwrap(), chrono_tz::Europe::Paris);
        assert_eq!(config.worker.retry.max_retries, 2);
        assert_eq!(config.worker.retry.delay_seconds, 300);
    }
}
