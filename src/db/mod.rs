//! PostgreSQL pool, embedded migrations and the readiness probe

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::{Duration, Instant};

use crate::config::Config;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
const IDLE_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("cannot reach database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("database probe failed: {0}")]
    Probe(#[source] sqlx::Error),
}

pub async fn create_pool(config: &Config) -> Result<PgPool, DbError> {
    tracing::info!(url = %config.database_url_masked(), "Connecting to database");

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .idle_timeout(IDLE_TIMEOUT)
        .connect(&config.database_url)
        .await
        .map_err(DbError::Connect)?;

    tracing::info!(max_connections = config.db_max_connections, "Database pool ready");
    Ok(pool)
}

/// Apply the migrations embedded from `./migrations`
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    let migrator = sqlx::migrate!("./migrations");
    tracing::info!(available = migrator.iter().count(), "Applying migrations");
    migrator.run(pool).await?;
    Ok(())
}

/// Round trip to the database; returns how long it took
pub async fn check_health(pool: &PgPool) -> Result<Duration, DbError> {
    let started = Instant::now();
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(DbError::Probe)?;
    Ok(started.elapsed())
}
