pub mod errors;

use crate::bot::{Data, Error};
use crate::database::{self, migrations};
use crate::state::{GuildStateStore, Lifecycle};
use anyhow::Result;
use poise::serenity_prelude as serenity;
use sqlx::SqlitePool;

pub async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            if let Err(e) = on_ready(ctx, data_about_bot, data).await {
                tracing::error!("Startup reconciliation failed: {:?}", e);
                data.record_fatal(e).await;
                framework.shard_manager().shutdown_all().await;
            }
        }
        serenity::FullEvent::GuildCreate { guild, is_new } => {
            if *is_new == Some(true) {
                tracing::info!("Joined {} ({})", guild.name, guild.id);
                if let Err(e) = data.store.on_guild_join(&data.pool, guild.id).await {
                    tracing::error!("Failed to set up guild {}: {:?}", guild.id, e);
                }
            }
        }
        serenity::FullEvent::GuildDelete { incomplete, .. } => {
            if !incomplete.unavailable {
                tracing::info!("Withdrawn from guild {}", incomplete.id);
                if let Err(e) = data.store.on_guild_leave(&data.pool, incomplete.id).await {
                    tracing::error!("Failed to remove guild {}: {:?}", incomplete.id, e);
                }
            }
        }
        _ => {}
    }
    Ok(())
}

async fn on_ready(ctx: &serenity::Context, ready: &serenity::Ready, data: &Data) -> Result<()> {
    tracing::info!("Bot logged in as {}", ready.user.name);
    tracing::info!("Connected to {} guild(s)", ready.guilds.len());

    data.board.attach(ctx.http.clone());

    let joined: Vec<serenity::GuildId> = ready.guilds.iter().map(|guild| guild.id).collect();
    reconcile(&data.pool, &data.store, &joined).await
}

/// Rebuilds guild state from scratch. Readiness stays off until the schema,
/// guild rows and channel states are all loaded, and stays off if any step
/// fails.
pub async fn reconcile(
    pool: &SqlitePool,
    store: &GuildStateStore,
    joined: &[serenity::GuildId],
) -> Result<()> {
    store.begin_reconcile().await;

    {
        let mut conn = database::acquire(pool).await?;
        migrations::ensure_schema(&mut conn).await?;
    }

    store.initialize(pool, joined).await?;
    store.set_lifecycle(Lifecycle::Ready);

    tracing::info!("Guild state loaded");
    Ok(())
}
