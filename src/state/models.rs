use crate::database::models::{ChannelKind, ChannelRow, GuildRow};
use anyhow::Result;
use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct GuildState {
    pub guild_id: serenity::GuildId,
    pub tracking_enabled: bool,
    pub member_channel_id: Option<serenity::ChannelId>,
    pub user_states: HashMap<serenity::UserId, UserState>,
    pub channel_states: HashMap<serenity::ChannelId, ChannelState>,
}

impl GuildState {
    pub fn new(guild_id: serenity::GuildId) -> Self {
        Self {
            guild_id,
            tracking_enabled: true,
            member_channel_id: None,
            user_states: HashMap::new(),
            channel_states: HashMap::new(),
        }
    }

    /// Copies the persisted settings of a `guild` row onto this state.
    pub fn apply_row(&mut self, row: &GuildRow) {
        self.tracking_enabled = row.talonro;
        self.member_channel_id = row.member_channel_id();
    }

    pub fn user_mut(&mut self, user_id: serenity::UserId) -> &mut UserState {
        self.user_states.entry(user_id).or_default()
    }
}

/// Reports made today by one member.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserState {
    pub reports: u32,
    pub last_report_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelState {
    pub channel_id: serenity::ChannelId,
    pub guild_id: serenity::GuildId,
    pub kind: ChannelKind,
    pub last_message_id: Option<serenity::MessageId>,
    pub entries: Vec<Entry>,
}

impl ChannelState {
    pub fn new(
        guild_id: serenity::GuildId,
        channel_id: serenity::ChannelId,
        kind: ChannelKind,
    ) -> Self {
        Self {
            channel_id,
            guild_id,
            kind,
            last_message_id: None,
            entries: Vec::new(),
        }
    }

    pub fn from_row(row: &ChannelRow) -> Result<Self> {
        Ok(Self::new(row.guild_id()?, row.channel_id()?, row.kind()?))
    }

    /// Adds an entry, replacing any entry with the same name, and keeps the
    /// list ordered by expiration.
    pub fn track(&mut self, entry: Entry) {
        self.untrack(&entry.name);
        let position = self
            .entries
            .partition_point(|existing| existing.expires_at <= entry.expires_at);
        self.entries.insert(position, entry);
    }

    pub fn untrack(&mut self, name: &str) -> Option<Entry> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.name.eq_ignore_ascii_case(name))?;
        Some(self.entries.remove(index))
    }

    /// Drops every entry that has expired at `now`, returning how many were
    /// removed.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| !entry.is_expired(now));
        before - self.entries.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub name: String,
    pub reported_by: serenity::UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Entry {
    /// Longest name a member can track or add to a catalog.
    pub const MAX_NAME_CHARS: usize = 48;

    pub fn name_fits(name: &str) -> bool {
        name.chars().count() <= Self::MAX_NAME_CHARS
    }

    pub fn new(
        name: impl Into<String>,
        reported_by: serenity::UserId,
        created_at: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Self {
        Self {
            name: name.into(),
            reported_by,
            created_at,
            expires_at: created_at + ttl,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn remaining(&self, now: DateTime<Utc>) -> chrono::Duration {
        self.expires_at.signed_duration_since(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap()
    }

    fn channel() -> ChannelState {
        ChannelState::new(
            serenity::GuildId::new(1),
            serenity::ChannelId::new(2),
            ChannelKind::Mvp,
        )
    }

    #[test]
    fn entries_expire_after_ttl() {
        let user = serenity::UserId::new(3);
        let entry = Entry::new("Baphomet", user, at(0), chrono::Duration::minutes(30));

        assert_eq!(entry.expires_at, at(30));
        assert!(!entry.is_expired(at(29)));
        assert!(entry.is_expired(at(30)));
        assert_eq!(entry.remaining(at(10)), chrono::Duration::minutes(20));
    }

    #[test]
    fn names_are_capped() {
        assert!(Entry::name_fits("Baphomet"));
        assert!(Entry::name_fits(&"é".repeat(Entry::MAX_NAME_CHARS)));
        assert!(!Entry::name_fits(&"a".repeat(Entry::MAX_NAME_CHARS + 1)));
    }

    #[test]
    fn entries_stay_ordered_by_expiration() {
        let user = serenity::UserId::new(3);
        let ttl = chrono::Duration::minutes(30);
        let mut channel = channel();

        channel.track(Entry::new("Eddga", user, at(10), ttl));
        channel.track(Entry::new("Osiris", user, at(0), ttl));
        channel.track(Entry::new("Phreeoni", user, at(5), ttl));

        let names: Vec<_> = channel.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Osiris", "Phreeoni", "Eddga"]);
    }

    #[test]
    fn tracking_same_name_replaces_entry() {
        let user = serenity::UserId::new(3);
        let ttl = chrono::Duration::minutes(30);
        let mut channel = channel();

        channel.track(Entry::new("Osiris", user, at(0), ttl));
        channel.track(Entry::new("osiris", user, at(20), ttl));

        assert_eq!(channel.entries.len(), 1);
        assert_eq!(channel.entries[0].expires_at, at(50));
    }

    #[test]
    fn purge_drops_only_expired_entries() {
        let user = serenity::UserId::new(3);
        let ttl = chrono::Duration::minutes(30);
        let mut channel = channel();
        channel.track(Entry::new("Osiris", user, at(0), ttl));
        channel.track(Entry::new("Eddga", user, at(20), ttl));

        assert_eq!(channel.purge_expired(at(35)), 1);
        assert_eq!(channel.entries[0].name, "Eddga");
        assert_eq!(channel.purge_expired(at(35)), 0);
    }

    #[test]
    fn row_settings_overlay_defaults() {
        let mut state = GuildState::new(serenity::GuildId::new(9));
        assert!(state.tracking_enabled);

        state.apply_row(&GuildRow {
            id: 9,
            talonro: false,
            id_member_channel: Some(77),
        });

        assert!(!state.tracking_enabled);
        assert_eq!(state.member_channel_id, Some(serenity::ChannelId::new(77)));
    }
}
