//! SQLite connection pool and embedded migrations.
//!
//! The pool is the only shared mutable resource in the service. Every unit of work acquires a
//! connection through it and hands it back when the guard or transaction is dropped.
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::config::DatabaseConfig;

/// Re-export of the connection pool type used throughout the crate.
pub type Pool = SqlitePool;

/// Errors raised while preparing the database.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("database connection failed: {0}")]
    Connect(#[from] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Create a connection pool with bounded acquisition and lock-wait timeouts.
///
/// In-memory databases live and die with their connection, so they are pinned to a single
/// connection that is never recycled.
pub async fn connection_pool(config: &DatabaseConfig) -> Result<Pool, DatabaseError> {
    let mut options = SqliteConnectOptions::from_str(&config.url)?
        .foreign_keys(true)
        .busy_timeout(config.statement_timeout);

    let mut pool_options = SqlitePoolOptions::new().acquire_timeout(config.acquire_timeout);

    if !config.is_in_memory() {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    pool_options = if config.is_in_memory() {
        pool_options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        pool_options.max_connections(config.max_connections.max(1))
    };

    let pool = pool_options.connect_with(options).await?;
    Ok(pool)
}

/// Run any pending database migrations from inside the application.
pub async fn run_pending_migrations(pool: &Pool) -> Result<(), DatabaseError> {
    sqlx::migrate!().run(pool).await?;
    Ok(())
}

/// Connect and migrate in one step.
pub async fn prepare(config: &DatabaseConfig) -> Result<Pool, DatabaseError> {
    let pool = connection_pool(config).await?;
    run_pending_migrations(&pool).await?;
    Ok(pool)
}
