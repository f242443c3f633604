use anyhow::Result;
use poise::serenity_prelude as serenity;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::num::NonZeroU64;

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct GuildRow {
    pub id: i64,
    pub talonro: bool,
    pub id_member_channel: Option<i64>,
}

impl GuildRow {
    pub fn member_channel_id(&self) -> Option<serenity::ChannelId> {
        self.id_member_channel.and_then(|id| snowflake(id).map(serenity::ChannelId::from))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ChannelRow {
    pub id_guild: i64,
    pub id_channel: i64,
    pub kind: String,
}

impl ChannelRow {
    pub fn guild_id(&self) -> Result<serenity::GuildId> {
        snowflake(self.id_guild)
            .map(serenity::GuildId::from)
            .ok_or_else(|| anyhow::anyhow!("Invalid guild id: {}", self.id_guild))
    }

    pub fn channel_id(&self) -> Result<serenity::ChannelId> {
        snowflake(self.id_channel)
            .map(serenity::ChannelId::from)
            .ok_or_else(|| anyhow::anyhow!("Invalid channel id: {}", self.id_channel))
    }

    pub fn kind(&self) -> Result<ChannelKind> {
        ChannelKind::try_from(self.kind.as_str())
    }
}

/// What a tracked channel lists, and which per-guild catalog table backs it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, poise::ChoiceParameter,
)]
pub enum ChannelKind {
    #[name = "mvp"]
    Mvp,
    #[name = "mining"]
    Mining,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Mvp => "mvp",
            ChannelKind::Mining => "mining",
        }
    }

    pub fn catalog_table(&self) -> &'static str {
        match self {
            ChannelKind::Mvp => "mvp_guild",
            ChannelKind::Mining => "mining_guild",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ChannelKind::Mvp => "MVP",
            ChannelKind::Mining => "Mining",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ChannelKind {
    type Error = anyhow::Error;

    fn try_from(s: &str) -> Result<Self> {
        match s {
            "mvp" => Ok(ChannelKind::Mvp),
            "mining" => Ok(ChannelKind::Mining),
            _ => Err(anyhow::anyhow!("Invalid channel kind: {}", s)),
        }
    }
}

/// Snowflakes are stored as SQLite INTEGER, which is signed.
pub fn to_db(id: u64) -> i64 {
    id as i64
}

/// Reads a stored snowflake back. Zero is never a valid id.
fn snowflake(id: i64) -> Option<NonZeroU64> {
    NonZeroU64::new(id as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_ids_are_rejected() {
        let row = ChannelRow {
            id_guild: 0,
            id_channel: 0,
            kind: "mvp".to_string(),
        };
        assert!(row.guild_id().is_err());
        assert!(row.channel_id().is_err());

        let guild = GuildRow {
            id: 1,
            talonro: true,
            id_member_channel: Some(0),
        };
        assert_eq!(guild.member_channel_id(), None);
    }

    #[test]
    fn stored_ids_round_trip_through_signed_integers() {
        let row = ChannelRow {
            id_guild: to_db(u64::MAX),
            id_channel: 42,
            kind: "mining".to_string(),
        };
        assert_eq!(row.guild_id().unwrap(), serenity::GuildId::new(u64::MAX));
        assert_eq!(row.channel_id().unwrap(), serenity::ChannelId::new(42));
        assert_eq!(row.kind().unwrap(), ChannelKind::Mining);
    }
}
