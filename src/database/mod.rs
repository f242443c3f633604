pub mod migrations;
pub mod models;
pub mod queries;

use anyhow::Result;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Sqlite, SqlitePool};
use std::str::FromStr;

pub async fn create_connection(database_url: &str) -> Result<SqlitePool> {
    let connect_options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePool::connect_with(connect_options).await?;

    Ok(pool)
}

/// Checks a connection out of the pool. It goes back to the pool when the
/// handle is dropped, whichever way the caller returns.
pub async fn acquire(pool: &SqlitePool) -> Result<PoolConnection<Sqlite>> {
    Ok(pool.acquire().await?)
}

/// A single-connection in-memory pool. Every connection to `sqlite::memory:`
/// opens its own database, so the pool must never grow past one.
#[cfg(test)]
pub async fn memory_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);

    sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .unwrap()
}

#[cfg(test)]
pub async fn bootstrapped_pool() -> SqlitePool {
    let pool = memory_pool().await;
    let mut conn = acquire(&pool).await.unwrap();
    migrations::ensure_schema(&mut conn).await.unwrap();
    drop(conn);
    pool
}
