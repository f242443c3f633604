use crate::database::models::{ChannelKind, ChannelRow, GuildRow};
use anyhow::Result;
use sqlx::{Connection, SqliteConnection};

// Guild queries
pub async fn fetch_guilds(conn: &mut SqliteConnection) -> Result<Vec<GuildRow>> {
    let guilds = sqlx::query_as::<_, GuildRow>(
        "SELECT id, talonro, id_member_channel FROM guild ORDER BY id ASC",
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(guilds)
}

pub async fn fetch_guild(conn: &mut SqliteConnection, guild_id: i64) -> Result<Option<GuildRow>> {
    let guild = sqlx::query_as::<_, GuildRow>(
        "SELECT id, talonro, id_member_channel FROM guild WHERE id = ?",
    )
    .bind(guild_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(guild)
}

/// Inserts the guild row unless it already exists. Returns whether a row was
/// created.
pub async fn upsert_guild(conn: &mut SqliteConnection, guild_id: i64) -> Result<bool> {
    let result = sqlx::query("INSERT INTO guild (id) VALUES (?) ON CONFLICT (id) DO NOTHING")
        .bind(guild_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Removes a guild and everything scoped to it. Children go first so the
/// foreign keys on `guild` are never violated.
pub async fn delete_guild_cascade(conn: &mut SqliteConnection, guild_id: i64) -> Result<()> {
    let mut tx = conn.begin().await?;

    for sql in [
        "DELETE FROM mvp_guild WHERE id_guild = ?",
        "DELETE FROM mining_guild WHERE id_guild = ?",
        "DELETE FROM channel_guild WHERE id_guild = ?",
        "DELETE FROM guild WHERE id = ?",
    ] {
        sqlx::query(sql).bind(guild_id).execute(&mut *tx).await?;
    }

    tx.commit().await?;
    Ok(())
}

pub async fn set_tracking_enabled(
    conn: &mut SqliteConnection,
    guild_id: i64,
    enabled: bool,
) -> Result<()> {
    sqlx::query("UPDATE guild SET talonro = ? WHERE id = ?")
        .bind(enabled)
        .bind(guild_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub async fn set_member_channel(
    conn: &mut SqliteConnection,
    guild_id: i64,
    channel_id: Option<i64>,
) -> Result<()> {
    sqlx::query("UPDATE guild SET id_member_channel = ? WHERE id = ?")
        .bind(channel_id)
        .bind(guild_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

// Channel queries
pub async fn fetch_channels_for_guild(
    conn: &mut SqliteConnection,
    guild_id: i64,
) -> Result<Vec<ChannelRow>> {
    let channels = sqlx::query_as::<_, ChannelRow>(
        "SELECT id_guild, id_channel, kind FROM channel_guild
         WHERE id_guild = ?
         ORDER BY id_channel ASC",
    )
    .bind(guild_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(channels)
}

/// Registers a channel, or changes the kind of an already registered one.
pub async fn insert_channel(
    conn: &mut SqliteConnection,
    guild_id: i64,
    channel_id: i64,
    kind: ChannelKind,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO channel_guild (id_guild, id_channel, kind) VALUES (?, ?, ?)
         ON CONFLICT (id_guild, id_channel) DO UPDATE SET kind = excluded.kind",
    )
    .bind(guild_id)
    .bind(channel_id)
    .bind(kind.as_str())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn delete_channel(
    conn: &mut SqliteConnection,
    guild_id: i64,
    channel_id: i64,
) -> Result<bool> {
    let result = sqlx::query("DELETE FROM channel_guild WHERE id_guild = ? AND id_channel = ?")
        .bind(guild_id)
        .bind(channel_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

// Target catalog queries
pub async fn fetch_targets(
    conn: &mut SqliteConnection,
    guild_id: i64,
    kind: ChannelKind,
) -> Result<Vec<String>> {
    let sql = format!(
        "SELECT name FROM {} WHERE id_guild = ? ORDER BY name COLLATE NOCASE ASC",
        kind.catalog_table()
    );
    let names = sqlx::query_scalar::<_, String>(&sql)
        .bind(guild_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(names)
}

pub async fn insert_target(
    conn: &mut SqliteConnection,
    guild_id: i64,
    kind: ChannelKind,
    name: &str,
) -> Result<bool> {
    let sql = format!(
        "INSERT INTO {} (id_guild, name) VALUES (?, ?) ON CONFLICT DO NOTHING",
        kind.catalog_table()
    );
    let result = sqlx::query(&sql)
        .bind(guild_id)
        .bind(name)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_target(
    conn: &mut SqliteConnection,
    guild_id: i64,
    kind: ChannelKind,
    name: &str,
) -> Result<bool> {
    let sql = format!(
        "DELETE FROM {} WHERE id_guild = ? AND name = ?",
        kind.catalog_table()
    );
    let result = sqlx::query(&sql)
        .bind(guild_id)
        .bind(name)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}
