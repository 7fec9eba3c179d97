//! Service wiring and command execution.

use std::sync::Arc;

use clap::Parser;
use misago_data::migrations::{latest_version, previous_version};
use misago_data::{PgForumStore, connect, run_migrations, undo_migrations};
use misago_telemetry::{
    GlobalContextGuard, LoggingConfig, Metrics, PipelineOutcome, build_sha, init_logging,
    with_request_context,
};
use misago_threads::filters::{AuditMoveFilter, RequireModeratorFilter};
use misago_threads::{
    CategoriesRepository, ContextUser, ForumSettings, GraphQLContext, MoveThreadsHooks,
    MoveThreadsInput, MoveThreadsMutation, MoveThreadsPayload, ThreadsRepository,
};
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cli::{Cli, Command, MoveThreadsArgs, RollbackArgs};
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};

/// Operation label used in logs and metrics.
pub const MOVE_THREADS_OPERATION: &str = "move_threads";

/// Hooks used by the operator tool: moderators only, every move audited.
#[must_use]
pub fn build_hooks() -> MoveThreadsHooks {
    let mut hooks = MoveThreadsHooks::new();
    hooks.input.append_filter(RequireModeratorFilter);
    hooks.action.append_filter(AuditMoveFilter);
    hooks
}

/// Runs the move-threads operation against a pair of repositories.
#[derive(Clone)]
pub struct MoveThreadsService {
    mutation: MoveThreadsMutation,
    threads: Arc<dyn ThreadsRepository>,
    categories: Arc<dyn CategoriesRepository>,
    settings: ForumSettings,
    metrics: Metrics,
}

impl MoveThreadsService {
    /// Compile `hooks` and bind them to the repositories.
    #[must_use]
    pub fn new(
        hooks: &MoveThreadsHooks,
        threads: Arc<dyn ThreadsRepository>,
        categories: Arc<dyn CategoriesRepository>,
        settings: ForumSettings,
        metrics: Metrics,
    ) -> Self {
        Self {
            mutation: hooks.compile(),
            threads,
            categories,
            settings,
            metrics,
        }
    }

    /// Metrics recorded by this service.
    #[must_use]
    pub const fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Resolve one move request.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidInput`] for malformed `--input` payloads and
    /// [`AppError::Hook`] when the pipeline aborts with a fault. Validation
    /// failures are reported in the payload.
    pub async fn execute(&self, args: &MoveThreadsArgs) -> AppResult<MoveThreadsPayload> {
        let input = move_threads_input(args)?;
        let request_id = args.request_id.clone().unwrap_or_else(generate_request_id);

        let mut ctx = GraphQLContext::new(Arc::clone(&self.threads), Arc::clone(&self.categories))
            .with_request_id(request_id.clone())
            .with_settings(self.settings);
        if let Some(id) = args.user_id {
            ctx = ctx.with_user(ContextUser {
                id,
                name: args.user_name.clone(),
                is_moderator: args.moderator,
            });
        }

        let result = with_request_context(
            request_id,
            MOVE_THREADS_OPERATION,
            self.mutation.resolve(&ctx, &input),
        )
        .await;

        match result {
            Ok(payload) => {
                if payload.is_ok() {
                    self.metrics
                        .inc_pipeline_run(MOVE_THREADS_OPERATION, PipelineOutcome::Completed);
                } else {
                    self.metrics
                        .inc_pipeline_run(MOVE_THREADS_OPERATION, PipelineOutcome::Rejected);
                    self.metrics.inc_validation_errors(payload.errors.codes());
                }
                Ok(payload)
            }
            Err(err) => {
                warn!(error = %err, operation = err.operation(), "move threads failed");
                self.metrics
                    .inc_pipeline_run(MOVE_THREADS_OPERATION, PipelineOutcome::Failed);
                Err(AppError::hook("move_threads.resolve", err))
            }
        }
    }
}

/// Build the raw payload from command arguments.
///
/// # Errors
///
/// Returns [`AppError::InvalidInput`] when `--input` is not a JSON object.
pub fn move_threads_input(args: &MoveThreadsArgs) -> AppResult<MoveThreadsInput> {
    let value = match &args.input {
        Some(raw) => serde_json::from_str::<Value>(raw).map_err(|_| AppError::InvalidInput {
            reason: "input is not valid json",
        })?,
        None => json!({ "category": args.category, "threads": args.threads }),
    };
    match value {
        Value::Object(input) => Ok(input),
        _ => Err(AppError::InvalidInput {
            reason: "input must be a json object",
        }),
    }
}

fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Migrate => "migrate",
        Command::Rollback(_) => "rollback",
        Command::MoveThreads(_) => "move-threads",
    }
}

/// Entry point for the operator tool.
///
/// # Errors
///
/// Returns an error if logging, the database or the requested command fails.
pub async fn run_app() -> AppResult<()> {
    let cli = Cli::parse();
    let config = AppConfig::from_cli(&cli);
    run_with(cli.command, &config).await
}

/// Run `command` with an already resolved configuration.
///
/// # Errors
///
/// Returns an error if logging, the database or the command fails.
pub async fn run_with(command: Command, config: &AppConfig) -> AppResult<()> {
    init_logging(&LoggingConfig {
        level: &config.log_level,
        format: config.log_format,
        build_sha: LoggingConfig::default().build_sha,
    })
    .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new(command_label(&command));
    info!(build_sha = build_sha(), "misago operator starting");
    run_command(command, config).await
}

/// Connect, run `command` and close the pool whatever the outcome.
///
/// # Errors
///
/// Returns an error if the database or the command fails.
pub async fn run_command(command: Command, config: &AppConfig) -> AppResult<()> {
    let pool = connect(config.require_database_url()?, config.max_connections)
        .await
        .map_err(|err| AppError::data("database.connect", err))?;

    let result = match command {
        Command::Migrate => run_migrations(&pool)
            .await
            .map_err(|err| AppError::data("migrations.apply", err)),
        Command::Rollback(RollbackArgs { target }) => {
            let target = target.unwrap_or_else(|| previous_version(latest_version()));
            undo_migrations(&pool, target)
                .await
                .map_err(|err| AppError::data("migrations.undo", err))
        }
        Command::MoveThreads(args) => {
            let store = Arc::new(PgForumStore::new(pool.clone()));
            move_threads(store, config, &args).await
        }
    };

    pool.close().await;
    result
}

async fn move_threads(
    store: Arc<PgForumStore>,
    config: &AppConfig,
    args: &MoveThreadsArgs,
) -> AppResult<()> {
    let metrics = Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
    let service = MoveThreadsService::new(
        &build_hooks(),
        store.clone(),
        store,
        ForumSettings {
            bulk_action_limit: config.bulk_action_limit,
        },
        metrics,
    );
    let payload = service.execute(args).await?;
    let rendered =
        serde_json::to_string_pretty(&payload).map_err(|source| AppError::Output { source })?;
    println!("{rendered}");
    if let Ok(exposition) = service.metrics().render() {
        debug!(metrics = %exposition, "move threads metrics");
    }
    Ok(())
}
