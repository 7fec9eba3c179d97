//! Command-line interface of the operator tool.

use clap::{Args, Parser, Subcommand};
use misago_telemetry::{DEFAULT_LOG_LEVEL, LogFormat};
use misago_threads::context::DEFAULT_BULK_ACTION_LIMIT;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Top-level arguments.
#[derive(Debug, Parser)]
#[command(name = "misago", about = "Operator tool for a Misago forum database")]
pub struct Cli {
    /// Postgres connection string.
    #[arg(long, global = true, env = "DATABASE_URL")]
    pub database_url: Option<String>,
    /// Log level directive.
    #[arg(long, global = true, env = "MISAGO_LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,
    /// Log output format (`json` or `pretty`); inferred from the terminal when unset.
    #[arg(
        long,
        global = true,
        env = "MISAGO_LOG_FORMAT",
        value_parser = parse_log_format
    )]
    pub log_format: Option<LogFormat>,
    /// Upper bound on threads moved by one command.
    #[arg(
        long,
        global = true,
        env = "MISAGO_BULK_ACTION_LIMIT",
        value_parser = parse_positive::<usize>,
        default_value_t = DEFAULT_BULK_ACTION_LIMIT
    )]
    pub bulk_action_limit: usize,
    /// Connection pool size.
    #[arg(
        long,
        global = true,
        env = "MISAGO_DB_MAX_CONNECTIONS",
        value_parser = parse_positive::<u32>,
        default_value_t = DEFAULT_MAX_CONNECTIONS
    )]
    pub max_connections: u32,
    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Apply pending schema migrations.
    Migrate,
    /// Revert schema migrations.
    Rollback(RollbackArgs),
    /// Move threads to another category through the moderation pipeline.
    MoveThreads(MoveThreadsArgs),
}

/// Arguments of `rollback`.
#[derive(Debug, Args)]
pub struct RollbackArgs {
    /// Revert every migration newer than this version; defaults to one step back.
    #[arg(long)]
    pub target: Option<i64>,
}

/// Arguments of `move-threads`.
#[derive(Debug, Args)]
pub struct MoveThreadsArgs {
    /// Destination category id.
    #[arg(long, required_unless_present = "input")]
    pub category: Option<i64>,
    /// Comma separated ids of the threads to move.
    #[arg(long, value_delimiter = ',', required_unless_present = "input")]
    pub threads: Vec<i64>,
    /// Raw JSON payload used instead of `--category`/`--threads`.
    #[arg(long, conflicts_with_all = ["category", "threads"])]
    pub input: Option<String>,
    /// Id of the acting user; anonymous when omitted.
    #[arg(long)]
    pub user_id: Option<i32>,
    /// Display name of the acting user.
    #[arg(long, default_value = "operator")]
    pub user_name: String,
    /// Act with moderation rights.
    #[arg(long)]
    pub moderator: bool,
    /// Identifier attached to logs; generated when omitted.
    #[arg(long)]
    pub request_id: Option<String>,
}

fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    value
        .parse()
        .map_err(|_| format!("unknown log format `{value}`, expected `json` or `pretty`"))
}

fn parse_positive<T>(value: &str) -> Result<T, String>
where
    T: std::str::FromStr + Default + PartialOrd,
{
    match value.trim().parse::<T>() {
        Ok(parsed) if parsed > T::default() => Ok(parsed),
        _ => Err(format!("expected a positive integer, got `{value}`")),
    }
}
