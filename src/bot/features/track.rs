use super::board::StatusBoard;
use super::{BoxFuture, Feature, Tickable};
use crate::bot::{Context, Data, Error};
use crate::config::Config;
use crate::database::{self, models::to_db, queries};
use crate::state::{Entry, GuildStateStore};
use crate::utils::format::{format_channel_status, format_error_message, format_success_message};
use crate::utils::reply::say_and_clean;
use crate::utils::time::format_time;
use anyhow::Result;
use chrono::{DateTime, FixedOffset, Utc};
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Spawn tracking: the `track`/`untrack` commands and the timer that expires
/// entries and keeps each channel's pinned table current.
pub struct TrackFeature {
    store: GuildStateStore,
    board: Arc<dyn StatusBoard>,
    display_offset: FixedOffset,
    prefix: String,
}

struct PendingRender {
    guild_id: serenity::GuildId,
    channel_id: serenity::ChannelId,
    previous: Option<serenity::MessageId>,
    content: String,
}

impl TrackFeature {
    pub fn new(store: GuildStateStore, config: &Config, board: Arc<dyn StatusBoard>) -> Self {
        Self {
            store,
            board,
            display_offset: config.display_offset,
            prefix: config.command_prefix.clone(),
        }
    }

    pub async fn refresh(&self, now: DateTime<Utc>) -> Result<()> {
        if !self.store.is_ready() {
            debug!("Guild state is still loading, skipping refresh");
            return Ok(());
        }

        let pending = self.collect(now).await;
        let mut published = 0;

        for render in pending {
            match self
                .board
                .publish(render.channel_id, render.previous, render.content)
                .await
            {
                Ok(message_id) => {
                    let channel_id = render.channel_id;
                    self.store
                        .update(render.guild_id, |guild| {
                            if let Some(channel) = guild.channel_states.get_mut(&channel_id) {
                                channel.last_message_id = Some(message_id);
                            }
                        })
                        .await;
                    published += 1;
                }
                Err(e) => warn!(
                    "Failed to publish tracker table for channel {}: {:?}",
                    render.channel_id, e
                ),
            }
        }

        debug!("Refreshed {} tracker table(s)", published);
        Ok(())
    }

    /// Drops expired entries and renders every tracker channel of every guild
    /// with tracking enabled. Nothing here awaits while holding guild state.
    async fn collect(&self, now: DateTime<Utc>) -> Vec<PendingRender> {
        let mut pending = Vec::new();

        for guild_id in self.store.guild_ids().await {
            self.store
                .update(guild_id, |guild| {
                    if !guild.tracking_enabled {
                        return;
                    }

                    for channel in guild.channel_states.values_mut() {
                        let expired = channel.purge_expired(now);
                        if expired > 0 {
                            info!(
                                "Expired {} entr(ies) in channel {} of guild {}",
                                expired, channel.channel_id, channel.guild_id
                            );
                        }

                        pending.push(PendingRender {
                            guild_id,
                            channel_id: channel.channel_id,
                            previous: channel.last_message_id,
                            content: format_channel_status(
                                channel,
                                now,
                                self.display_offset,
                                &self.prefix,
                            ),
                        });
                    }
                })
                .await;
        }

        pending
    }
}

impl Tickable for TrackFeature {
    fn name(&self) -> &'static str {
        "track"
    }

    fn tick(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.refresh(Utc::now()))
    }
}

impl Feature for TrackFeature {
    fn name(&self) -> &'static str {
        "track"
    }

    fn commands(&self) -> Vec<poise::Command<Data, Error>> {
        vec![track(), untrack()]
    }

    fn tickable(self: Arc<Self>) -> Option<Arc<dyn Tickable>> {
        Some(self)
    }
}

/// Tracks a spawn in this channel until it expires
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn track(
    ctx: Context<'_>,
    #[description = "Name of the MVP or mining spot"]
    #[rest]
    name: String,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let channel_id = ctx.channel_id();
    let data = ctx.data();
    let name = name.trim().to_string();

    if name.is_empty() {
        return say_and_clean(
            ctx,
            format_error_message("Give the name of the spawn to track."),
        )
        .await;
    }

    if !Entry::name_fits(&name) {
        let msg = format_error_message(&format!(
            "Names are limited to {} characters.",
            Entry::MAX_NAME_CHARS
        ));
        return say_and_clean(ctx, msg).await;
    }

    if !data.store.is_ready() {
        return say_and_clean(
            ctx,
            format_error_message("Still loading, try again in a moment."),
        )
        .await;
    }

    let Some(guild) = data.store.get(guild_id).await else {
        warn!("No state for guild {} while tracking", guild_id);
        return Ok(());
    };

    if !guild.tracking_enabled {
        return say_and_clean(
            ctx,
            format_error_message("Tracking is disabled on this server."),
        )
        .await;
    }

    let Some(kind) = guild.channel_states.get(&channel_id).map(|c| c.kind) else {
        return say_and_clean(
            ctx,
            format_error_message("This channel is not a tracker channel."),
        )
        .await;
    };

    let catalog = {
        let mut conn = database::acquire(&data.pool).await?;
        queries::fetch_targets(&mut conn, to_db(guild_id.get()), kind).await?
    };

    let name = if catalog.is_empty() {
        name
    } else {
        match catalog.into_iter().find(|target| target.eq_ignore_ascii_case(&name)) {
            Some(target) => target,
            None => {
                let msg = format_error_message(&format!(
                    "{} is not on this server's {} list.",
                    name,
                    kind.title()
                ));
                return say_and_clean(ctx, msg).await;
            }
        }
    };

    let now = Utc::now();
    let author = ctx.author().id;
    let entry = Entry::new(name.clone(), author, now, data.config.entry_expiration);
    let expires_at = entry.expires_at;

    let reports = data
        .store
        .update(guild_id, |guild| match guild.channel_states.get_mut(&channel_id) {
            Some(channel) => {
                channel.track(entry);
                let user = guild.user_mut(author);
                let first_today = user
                    .last_report_at
                    .is_none_or(|last| last.date_naive() != now.date_naive());
                user.reports = if first_today { 1 } else { user.reports + 1 };
                user.last_report_at = Some(now);
                Some(user.reports)
            }
            None => None,
        })
        .await
        .flatten();

    let Some(reports) = reports else {
        return say_and_clean(
            ctx,
            format_error_message("This channel is not a tracker channel."),
        )
        .await;
    };

    info!("{} tracked {} in channel {}", ctx.author().name, name, channel_id);

    let msg = format_success_message(&format!(
        "Tracking **{}** until {}. Reports today: {}.",
        name,
        format_time(expires_at, data.config.display_offset),
        reports
    ));
    say_and_clean(ctx, msg).await
}

/// Stops tracking a spawn in this channel
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn untrack(
    ctx: Context<'_>,
    #[description = "Name of the tracked spawn"]
    #[rest]
    name: String,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let channel_id = ctx.channel_id();
    let name = name.trim().to_string();

    let removed = ctx
        .data()
        .store
        .update(guild_id, |guild| {
            guild
                .channel_states
                .get_mut(&channel_id)
                .and_then(|channel| channel.untrack(&name))
        })
        .await
        .flatten();

    let msg = match removed {
        Some(entry) => format_success_message(&format!("Stopped tracking **{}**.", entry.name)),
        None => format_error_message(&format!("**{}** is not tracked here.", name)),
    };
    say_and_clean(ctx, msg).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::database::models::ChannelKind;
    use crate::state::{ChannelState, Lifecycle};
    use chrono::TimeZone;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingBoard {
        published: Mutex<Vec<(serenity::ChannelId, Option<serenity::MessageId>, String)>>,
        fail_channel: Option<serenity::ChannelId>,
    }

    impl StatusBoard for RecordingBoard {
        fn publish(
            &self,
            channel_id: serenity::ChannelId,
            previous: Option<serenity::MessageId>,
            content: String,
        ) -> BoxFuture<'_, Result<serenity::MessageId>> {
            Box::pin(async move {
                if self.fail_channel == Some(channel_id) {
                    anyhow::bail!("missing access");
                }
                let mut published = self.published.lock().unwrap();
                published.push((channel_id, previous, content));
                Ok(serenity::MessageId::new(1000 + published.len() as u64))
            })
        }
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap()
    }

    async fn store_with_channels(guild: u64, channels: &[u64]) -> GuildStateStore {
        let pool = crate::database::bootstrapped_pool().await;
        let store = GuildStateStore::new();
        let guild_id = serenity::GuildId::new(guild);
        store.on_guild_join(&pool, guild_id).await.unwrap();
        store
            .update(guild_id, |state| {
                for &channel in channels {
                    let channel_id = serenity::ChannelId::new(channel);
                    state
                        .channel_states
                        .insert(
                            channel_id,
                            ChannelState::new(guild_id, channel_id, ChannelKind::Mvp),
                        );
                }
            })
            .await;
        store.set_lifecycle(Lifecycle::Ready);
        store
    }

    fn feature(store: &GuildStateStore, board: Arc<RecordingBoard>) -> TrackFeature {
        TrackFeature::new(store.clone(), &test_config(), board)
    }

    #[tokio::test]
    async fn refresh_expires_entries_and_remembers_message() {
        let store = store_with_channels(1, &[10]).await;
        let guild_id = serenity::GuildId::new(1);
        let channel_id = serenity::ChannelId::new(10);
        let ttl = chrono::Duration::minutes(30);
        store
            .update(guild_id, |state| {
                let channel = state.channel_states.get_mut(&channel_id).unwrap();
                channel.track(Entry::new("Osiris", serenity::UserId::new(5), at(0), ttl));
                channel.track(Entry::new("Eddga", serenity::UserId::new(5), at(20), ttl));
            })
            .await;
        let board = Arc::new(RecordingBoard::default());
        let feature = feature(&store, board.clone());

        feature.refresh(at(40)).await.unwrap();

        let state = store.get(guild_id).await.unwrap();
        let channel = &state.channel_states[&channel_id];
        assert_eq!(channel.entries.len(), 1);
        assert_eq!(channel.entries[0].name, "Eddga");
        assert_eq!(channel.last_message_id, Some(serenity::MessageId::new(1001)));

        let published = board.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].1, None);
        assert!(published[0].2.contains("Eddga"));
        assert!(!published[0].2.contains("Osiris"));
    }

    #[tokio::test]
    async fn refresh_edits_previous_message() {
        let store = store_with_channels(1, &[10]).await;
        let board = Arc::new(RecordingBoard::default());
        let feature = feature(&store, board.clone());

        feature.refresh(at(0)).await.unwrap();
        feature.refresh(at(1)).await.unwrap();

        let published = board.published.lock().unwrap();
        assert_eq!(published.len(), 2);
        assert_eq!(published[1].1, Some(serenity::MessageId::new(1001)));
    }

    #[tokio::test]
    async fn refresh_waits_until_ready() {
        let store = store_with_channels(1, &[10]).await;
        store.set_lifecycle(Lifecycle::Reconciling);
        let board = Arc::new(RecordingBoard::default());

        feature(&store, board.clone()).refresh(at(0)).await.unwrap();

        assert!(board.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn refresh_skips_guilds_with_tracking_disabled() {
        let store = store_with_channels(1, &[10]).await;
        store
            .update(serenity::GuildId::new(1), |state| state.tracking_enabled = false)
            .await;
        let board = Arc::new(RecordingBoard::default());

        feature(&store, board.clone()).refresh(at(0)).await.unwrap();

        assert!(board.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_channel_does_not_block_others() {
        let store = store_with_channels(1, &[10, 20]).await;
        let board = Arc::new(RecordingBoard {
            fail_channel: Some(serenity::ChannelId::new(10)),
            ..Default::default()
        });

        feature(&store, board.clone()).refresh(at(0)).await.unwrap();

        let published = board.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, serenity::ChannelId::new(20));

        let state = store.get(serenity::GuildId::new(1)).await.unwrap();
        assert_eq!(state.channel_states[&serenity::ChannelId::new(10)].last_message_id, None);
    }
}
