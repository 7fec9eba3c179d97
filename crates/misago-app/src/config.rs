//! Runtime configuration of the operator tool.
//!
//! Every setting comes from a global flag; clap falls back to the matching
//! environment variable (`DATABASE_URL`, `MISAGO_*`) when the flag is absent.

use misago_telemetry::LogFormat;

use crate::cli::Cli;
use crate::error::{AppError, AppResult};

const DATABASE_URL: &str = "DATABASE_URL";

/// Resolved runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Postgres connection string.
    pub database_url: Option<String>,
    /// Log level directive.
    pub log_level: String,
    /// Log output format.
    pub log_format: LogFormat,
    /// Upper bound on threads moved by one command.
    pub bulk_action_limit: usize,
    /// Connection pool size.
    pub max_connections: u32,
}

impl AppConfig {
    /// Take the settings parsed from flags and environment.
    #[must_use]
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            database_url: cli
                .database_url
                .clone()
                .filter(|url| !url.trim().is_empty()),
            log_level: cli.log_level.clone(),
            log_format: cli.log_format.unwrap_or_else(LogFormat::infer),
            bulk_action_limit: cli.bulk_action_limit,
            max_connections: cli.max_connections,
        }
    }

    /// Connection string, required by every command touching the database.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::MissingEnv`] when no connection string was configured.
    pub fn require_database_url(&self) -> AppResult<&str> {
        self.database_url
            .as_deref()
            .ok_or(AppError::MissingEnv { name: DATABASE_URL })
    }
}
