use anyhow::Result;
use sqlx::{Connection, Executor, SqliteConnection};
use tracing::info;

/// Its presence means the bootstrap script has already run.
pub const SENTINEL_TABLE: &str = "guild";

const BOOTSTRAP_SQL: &str = include_str!("../../sql/yellowtracker.sql");

/// Runs the bootstrap script when the sentinel table is missing.
///
/// Returns `true` when the script was executed.
pub async fn ensure_schema(conn: &mut SqliteConnection) -> Result<bool> {
    if sentinel_exists(conn).await? {
        return Ok(false);
    }

    info!("Sentinel table {} not found, running bootstrap script...", SENTINEL_TABLE);

    let mut tx = conn.begin().await?;
    (&mut *tx).execute(sqlx::raw_sql(BOOTSTRAP_SQL)).await?;
    tx.commit().await?;

    info!("Database bootstrap completed successfully");
    Ok(true)
}

async fn sentinel_exists(conn: &mut SqliteConnection) -> Result<bool> {
    let found: Option<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(SENTINEL_TABLE)
            .fetch_optional(&mut *conn)
            .await?;

    Ok(found.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{acquire, memory_pool};

    #[tokio::test]
    async fn bootstrap_runs_only_once() {
        let pool = memory_pool().await;
        let mut conn = acquire(&pool).await.unwrap();

        assert!(ensure_schema(&mut conn).await.unwrap());

        sqlx::query("INSERT INTO guild (id) VALUES (42)")
            .execute(&mut *conn)
            .await
            .unwrap();

        assert!(!ensure_schema(&mut conn).await.unwrap());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM guild")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn bootstrap_creates_every_table() {
        let pool = memory_pool().await;
        let mut conn = acquire(&pool).await.unwrap();
        ensure_schema(&mut conn).await.unwrap();

        for table in ["guild", "channel_guild", "mvp_guild", "mining_guild"] {
            let found: Option<String> = sqlx::query_scalar(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
            )
            .bind(table)
            .fetch_optional(&mut *conn)
            .await
            .unwrap();
            assert!(found.is_some(), "missing table {}", table);
        }
    }
}
