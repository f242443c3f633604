use crate::bot::{Context, Error};
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use std::time::Duration;

/// Replies to a command without leaving clutter behind.
///
/// Slash command replies are ephemeral. For prefix commands both the reply
/// and the invoking message are deleted once the configured delay elapses.
pub async fn say_and_clean(ctx: Context<'_>, content: impl Into<String>) -> Result<(), Error> {
    let reply = poise::CreateReply::default()
        .content(content)
        .ephemeral(true);
    let handle = ctx.send(reply).await?;

    if let poise::Context::Prefix(prefix_ctx) = ctx {
        let delay = ctx.data().config.delete_message_after;
        let http = ctx.serenity_context().http.clone();
        let message = handle.message().await?;

        delete_after(http.clone(), message.channel_id, message.id, delay);
        delete_after(http, prefix_ctx.msg.channel_id, prefix_ctx.msg.id, delay);
    }

    Ok(())
}

pub fn delete_after(
    http: Arc<serenity::Http>,
    channel_id: serenity::ChannelId,
    message_id: serenity::MessageId,
    delay: Duration,
) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Err(e) = channel_id.delete_message(&http, message_id).await {
            tracing::debug!("Could not delete message {} in {}: {:?}", message_id, channel_id, e);
        }
    });
}
