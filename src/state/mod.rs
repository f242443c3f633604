//! In-memory guild state, kept in step with the `guild` and `channel_guild`
//! tables.
//!
//! The store is a cheap handle: clones share the same map. Guards on the map
//! are never held across database calls, so each mutation between two
//! suspension points is atomic for every other task.

pub mod models;

use crate::database::{self, models::to_db, queries};
use anyhow::Result;
use poise::serenity_prelude as serenity;
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

pub use models::{ChannelState, Entry, GuildState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Lifecycle {
    NotReady = 0,
    Reconciling = 1,
    Ready = 2,
}

impl Lifecycle {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Lifecycle::Reconciling,
            2 => Lifecycle::Ready,
            _ => Lifecycle::NotReady,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Membership {
    Joined,
    Left,
}

#[derive(Clone, Default)]
pub struct GuildStateStore {
    guilds: Arc<RwLock<HashMap<serenity::GuildId, GuildState>>>,
    lifecycle: Arc<AtomicU8>,
    /// Joins and leaves seen since the current reconciliation began. The
    /// Ready payload predates them, so they override it.
    changes: Arc<Mutex<HashMap<serenity::GuildId, Membership>>>,
    /// Held by `initialize` and by join/leave so they never interleave.
    sync: Arc<Mutex<()>>,
}

impl GuildStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::from_u8(self.lifecycle.load(Ordering::Acquire))
    }

    pub fn set_lifecycle(&self, lifecycle: Lifecycle) {
        self.lifecycle.store(lifecycle as u8, Ordering::Release);
    }

    /// Starts a reconciliation against a fresh Ready payload. Membership
    /// changes recorded before this point are already reflected in it.
    pub async fn begin_reconcile(&self) {
        self.changes.lock().await.clear();
        self.set_lifecycle(Lifecycle::Reconciling);
    }

    /// Features reading tracked entries must wait for this.
    pub fn is_ready(&self) -> bool {
        self.lifecycle() == Lifecycle::Ready
    }

    /// Rebuilds the whole map for the guilds the bot is currently in: the
    /// `ready` guilds, adjusted by any join or leave handled since the
    /// reconciliation began.
    ///
    /// Joined guilds without a row get one, joined guilds with a row take its
    /// settings, and rows of guilds the bot has left are cascade-deleted.
    /// Channel states are hydrated from `channel_guild` last.
    pub async fn initialize(&self, pool: &SqlitePool, ready: &[serenity::GuildId]) -> Result<()> {
        let _sync = self.sync.lock().await;
        let changes = std::mem::take(&mut *self.changes.lock().await);

        let mut joined: Vec<serenity::GuildId> = ready
            .iter()
            .copied()
            .filter(|id| changes.get(id) != Some(&Membership::Left))
            .collect();
        for (&guild_id, &membership) in &changes {
            if membership == Membership::Joined && !joined.contains(&guild_id) {
                joined.push(guild_id);
            }
        }
        let joined = joined.as_slice();

        self.guilds.write().await.clear();

        let mut conn = database::acquire(pool).await?;
        let rows = queries::fetch_guilds(&mut conn).await?;
        let persisted: HashMap<i64, _> = rows.iter().map(|row| (row.id, row)).collect();
        let joined_ids: HashSet<i64> = joined.iter().map(|id| to_db(id.get())).collect();

        let mut inserted = 0;
        for &guild_id in joined {
            let mut state = GuildState::new(guild_id);
            match persisted.get(&to_db(guild_id.get())) {
                Some(row) => state.apply_row(row),
                None => {
                    queries::upsert_guild(&mut conn, to_db(guild_id.get())).await?;
                    inserted += 1;
                }
            }
            self.guilds.write().await.insert(guild_id, state);
        }

        let mut removed = 0;
        for row in rows.iter().filter(|row| !joined_ids.contains(&row.id)) {
            queries::delete_guild_cascade(&mut conn, row.id).await?;
            removed += 1;
        }

        for &guild_id in joined {
            let channels =
                queries::fetch_channels_for_guild(&mut conn, to_db(guild_id.get())).await?;
            let mut channel_states = HashMap::with_capacity(channels.len());
            for row in &channels {
                match ChannelState::from_row(row) {
                    Ok(channel) => {
                        channel_states.insert(channel.channel_id, channel);
                    }
                    Err(e) => {
                        warn!("Skipping channel {} of guild {}: {}", row.id_channel, guild_id, e)
                    }
                }
            }

            if let Some(state) = self.guilds.write().await.get_mut(&guild_id) {
                state.channel_states = channel_states;
            }
        }

        info!(
            "Reconciled {} guild(s): {} inserted, {} orphaned removed",
            joined.len(),
            inserted,
            removed
        );
        Ok(())
    }

    /// Sets up state for a guild the bot has just joined. Calling it again
    /// for the same guild never creates a second row.
    pub async fn on_guild_join(
        &self,
        pool: &SqlitePool,
        guild_id: serenity::GuildId,
    ) -> Result<()> {
        let _sync = self.sync.lock().await;
        self.changes.lock().await.insert(guild_id, Membership::Joined);

        self.guilds.write().await.insert(guild_id, GuildState::new(guild_id));

        let mut conn = database::acquire(pool).await?;
        let row = queries::fetch_guild(&mut conn, to_db(guild_id.get())).await?;
        match row {
            Some(row) => {
                if let Some(state) = self.guilds.write().await.get_mut(&guild_id) {
                    state.apply_row(&row);
                }
            }
            None => {
                queries::upsert_guild(&mut conn, to_db(guild_id.get())).await?;
            }
        }

        Ok(())
    }

    pub async fn on_guild_leave(
        &self,
        pool: &SqlitePool,
        guild_id: serenity::GuildId,
    ) -> Result<()> {
        let _sync = self.sync.lock().await;
        self.changes.lock().await.insert(guild_id, Membership::Left);

        self.guilds.write().await.remove(&guild_id);

        let mut conn = database::acquire(pool).await?;
        queries::delete_guild_cascade(&mut conn, to_db(guild_id.get())).await?;

        Ok(())
    }

    pub async fn get(&self, guild_id: serenity::GuildId) -> Option<GuildState> {
        self.guilds.read().await.get(&guild_id).cloned()
    }

    #[cfg(test)]
    pub async fn snapshot(&self) -> HashMap<serenity::GuildId, GuildState> {
        self.guilds.read().await.clone()
    }

    pub async fn guild_ids(&self) -> Vec<serenity::GuildId> {
        self.guilds.read().await.keys().copied().collect()
    }

    /// Runs `f` against one guild's state under the write lock. Returns
    /// `None` when the guild is unknown.
    pub async fn update<F, T>(&self, guild_id: serenity::GuildId, f: F) -> Option<T>
    where
        F: FnOnce(&mut GuildState) -> T,
    {
        self.guilds.write().await.get_mut(&guild_id).map(f)
    }
}
