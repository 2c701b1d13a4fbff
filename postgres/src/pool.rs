//! Connection pool and schema bootstrap.

use sqlx::migrate::MigrateDatabase;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::Postgres;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while preparing the database.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The URL could not be parsed
    #[error("Invalid database URL: {0}")]
    InvalidUrl(#[source] sqlx::Error),

    /// No connection could be established
    #[error("Failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    /// The target database could not be created
    #[error("Failed to create database: {0}")]
    CreateDatabase(#[source] sqlx::Error),

    /// A migration failed to apply
    #[error("Migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Pool sizing and timeouts.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    /// Maximum connections in the pool
    pub max_connections: u32,
    /// Connections kept open while idle
    pub min_connections: u32,
    /// How long to wait for a connection
    pub connect_timeout: Duration,
    /// Server-side limit for a single statement
    pub statement_timeout: Duration,
    /// Close connections idle for longer than this
    pub idle_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            statement_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

/// Open a pool. Every connection carries `statement_timeout`, which bounds
/// each storage call independently of the request that issued it.
///
/// # Errors
///
/// Returns [`StorageError::InvalidUrl`] for a malformed URL and
/// [`StorageError::Connect`] when the server is unreachable.
pub async fn connect(database_url: &str, settings: &PoolSettings) -> Result<PgPool, StorageError> {
    let options = database_url
        .parse::<PgConnectOptions>()
        .map_err(StorageError::InvalidUrl)?
        .options([("statement_timeout", settings.statement_timeout.as_millis().to_string())]);

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(settings.connect_timeout)
        .idle_timeout(Some(settings.idle_timeout))
        .connect_with(options)
        .await
        .map_err(StorageError::Connect)?;

    tracing::info!(
        max_connections = settings.max_connections,
        statement_timeout_ms = u64::try_from(settings.statement_timeout.as_millis()).unwrap_or(u64::MAX),
        "Database pool ready"
    );
    Ok(pool)
}

/// Create the database named in `database_url` if it does not exist yet.
///
/// Returns `true` when the database was created.
///
/// # Errors
///
/// Returns [`StorageError::CreateDatabase`] if the existence check or the
/// creation fails.
pub async fn ensure_database(database_url: &str) -> Result<bool, StorageError> {
    if Postgres::database_exists(database_url)
        .await
        .map_err(StorageError::CreateDatabase)?
    {
        return Ok(false);
    }

    Postgres::create_database(database_url)
        .await
        .map_err(StorageError::CreateDatabase)?;
    tracing::info!("Database created");
    Ok(true)
}

/// Apply pending migrations from `postgres/migrations`.
///
/// # Errors
///
/// Returns [`StorageError::Migrate`] if any migration fails.
pub async fn migrate(pool: &PgPool) -> Result<(), StorageError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}
