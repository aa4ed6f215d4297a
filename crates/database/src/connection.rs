use crate::error::DbError;
use sqlx::migrate::MigrateDatabase;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres};
use std::time::Duration;

/// Opens the single connection the loader holds for the whole run.
///
/// The pool is capped at one connection: schema install, load and query all
/// run sequentially on it. Connection failures are reported as
/// [`DbError::ConnectionError`] and are never retried.
pub async fn connect(dsn: &str) -> Result<PgPool, DbError> {
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(5))
        .connect(dsn)
        .await
        .map_err(DbError::ConnectionError)?;

    Ok(pool)
}

/// Reports whether the database named in `dsn` exists on its server.
pub async fn database_exists(dsn: &str) -> Result<bool, DbError> {
    Postgres::database_exists(dsn)
        .await
        .map_err(DbError::ConnectionError)
}

/// Creates the database named in `dsn`.
pub async fn create_database(dsn: &str) -> Result<(), DbError> {
    Postgres::create_database(dsn).await?;
    tracing::info!("Database created.");
    Ok(())
}

/// Drops the database named in `dsn` if it exists.
///
/// Returns `false` when there was nothing to drop.
pub async fn drop_database(dsn: &str) -> Result<bool, DbError> {
    if !database_exists(dsn).await? {
        return Ok(false);
    }
    Postgres::drop_database(dsn).await?;
    tracing::info!("Database dropped.");
    Ok(true)
}
