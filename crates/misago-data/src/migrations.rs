//! Connection setup and reversible schema migrations.

use std::time::Duration;

use sqlx::PgPool;
use sqlx::migrate::{MigrationType, Migrator};
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::error::{DataError, Result, map_query_err};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Version of the migration creating `misago_users` and `misago_categories`.
pub const USERS_CATEGORIES_VERSION: i64 = 20_191_216_171_725;
/// Version of the migration creating `misago_threads` and `misago_posts`.
pub const THREADS_POSTS_VERSION: i64 = 20_191_216_171_726;

/// Open a connection pool against `database_url`.
///
/// # Errors
///
/// Returns an error when the database cannot be reached.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await
        .map_err(map_query_err("database.connect"))
}

/// Apply every pending migration.
///
/// # Errors
///
/// Returns an error when migration execution fails.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .map_err(|source| DataError::MigrationFailed {
            operation: "migrations.apply",
            source,
        })?;
    info!(latest = latest_version(), "migrations applied");
    Ok(())
}

/// Revert applied migrations newer than `target`; `0` reverts everything.
///
/// # Errors
///
/// Returns an error when a down migration fails.
pub async fn undo_migrations(pool: &PgPool, target: i64) -> Result<()> {
    MIGRATOR
        .undo(pool, target)
        .await
        .map_err(|source| DataError::MigrationFailed {
            operation: "migrations.undo",
            source,
        })?;
    info!(target, "migrations reverted");
    Ok(())
}

/// Versions of the bundled migrations, oldest first.
#[must_use]
pub fn versions() -> Vec<i64> {
    MIGRATOR
        .iter()
        .filter(|migration| migration.migration_type != MigrationType::ReversibleDown)
        .map(|migration| migration.version)
        .collect()
}

/// Newest bundled migration version.
#[must_use]
pub fn latest_version() -> i64 {
    versions().last().copied().unwrap_or_default()
}

/// Version preceding `version`, or `0` when it is the first one.
#[must_use]
pub fn previous_version(version: i64) -> i64 {
    versions()
        .into_iter()
        .take_while(|candidate| *candidate < version)
        .last()
        .unwrap_or_default()
}
