//! PostgreSQL-backed persistence.
//!
//! The pool is created once at startup (with retry, since the database may
//! come up after the service in containerized deployments) and shared
//! through a `OnceLock`. The schema bootstrap is idempotent so tests and
//! fresh deployments can call it freely.

mod postgres_repository;

#[cfg(test)]
mod tests;

use crate::config::DatabaseConfig;
use crate::domain::RepositoryPtr;
use anyhow::{anyhow, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use std::sync::OnceLock;
use std::time::Duration;

pub use postgres_repository::PostgresRepository;

// ---

static POOL: OnceLock<PgPool> = OnceLock::new();

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id            UUID PRIMARY KEY,
    username      TEXT NOT NULL UNIQUE,
    email         TEXT UNIQUE,
    password_hash TEXT,
    created_at    TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS credentials (
    id           BYTEA PRIMARY KEY,
    user_id      UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    public_key   BYTEA NOT NULL,
    counter      BIGINT NOT NULL,
    label        TEXT NOT NULL,
    created_at   TIMESTAMPTZ NOT NULL,
    last_used_at TIMESTAMPTZ
);

CREATE INDEX IF NOT EXISTS credentials_user_id_idx ON credentials (user_id);

CREATE TABLE IF NOT EXISTS password_reset_tokens (
    user_id    UUID PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
    token      TEXT NOT NULL UNIQUE,
    expires_at TIMESTAMPTZ NOT NULL
);
"#;

/// Connects to PostgreSQL with retry and bootstraps the schema.
///
/// Idempotent: repeated calls reuse the already-initialized pool, which
/// lets every integration test call it without coordination.
pub async fn init_database_with_retry_from_env() -> Result<()> {
    // ---
    if POOL.get().is_some() {
        return Ok(());
    }

    let config = DatabaseConfig::from_env()?;
    let pool = connect_with_retry(&config).await?;

    sqlx::raw_sql(SCHEMA).execute(&pool).await?;

    // A racing initializer may have won; its pool is equivalent.
    let _ = POOL.set(pool);

    Ok(())
}

async fn connect_with_retry(config: &DatabaseConfig) -> Result<PgPool> {
    // ---
    let mut last_err = None;

    for attempt in 1..=config.retry_count {
        match PgPoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => return Ok(pool),
            Err(err) => {
                tracing::warn!(
                    "database connection attempt {}/{} failed: {}",
                    attempt,
                    config.retry_count,
                    err
                );
                last_err = Some(err);
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
        }
    }

    Err(anyhow!(
        "could not connect to database after {} attempts: {:?}",
        config.retry_count,
        last_err
    ))
}

/// Creates the repository backed by the initialized pool.
///
/// # Errors
/// Fails if [`init_database_with_retry_from_env`] has not run yet.
pub fn create_postgres_repository() -> Result<RepositoryPtr> {
    // ---
    let pool = POOL
        .get()
        .ok_or_else(|| anyhow!("database pool not initialized"))?
        .clone();

    Ok(Arc::new(PostgresRepository::new(pool)))
}
