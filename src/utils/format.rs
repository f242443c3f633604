use crate::state::ChannelState;
use crate::utils::time::{format_remaining, format_time};
use chrono::{DateTime, FixedOffset, Utc};

/// Discord rejects message content longer than this many characters.
pub const MESSAGE_LIMIT: usize = 2000;

/// Room kept for the "and N more" line when a table is cut short.
const OVERFLOW_RESERVE: usize = 32;

/// Renders the pinned status message of a tracker channel. Entries that do
/// not fit in one message are summarised in a final count.
pub fn format_channel_status(
    channel: &ChannelState,
    now: DateTime<Utc>,
    offset: FixedOffset,
    prefix: &str,
) -> String {
    let mut status = format!("**{} tracker**\n", channel.kind.title());

    if channel.entries.is_empty() {
        status.push_str(&format!(
            "Nothing tracked right now. Use `{}track <name>` to add a spawn.",
            prefix
        ));
        return status;
    }

    let footer = format!("\n_Updated {}_", format_time(now, offset));
    let mut used = status.chars().count() + footer.chars().count();

    for (shown, entry) in channel.entries.iter().enumerate() {
        let line = format!(
            "• **{}** | {} ({}) | <@{}> at {}\n",
            entry.name,
            format_time(entry.expires_at, offset),
            format_remaining(entry.remaining(now)),
            entry.reported_by,
            format_time(entry.created_at, offset)
        );
        let len = line.chars().count();
        if used + len + OVERFLOW_RESERVE > MESSAGE_LIMIT {
            status.push_str(&format!("…and {} more\n", channel.entries.len() - shown));
            break;
        }
        used += len;
        status.push_str(&line);
    }

    status.push_str(&footer);
    status
}

pub fn format_success_message(message: &str) -> String {
    format!("✅ {}", message)
}

pub fn format_error_message(message: &str) -> String {
    format!("❌ {}", message)
}
