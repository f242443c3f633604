use super::BoxFuture;
use anyhow::{Result, anyhow};
use poise::serenity_prelude as serenity;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

/// Where rendered tracker tables end up.
pub trait StatusBoard: Send + Sync {
    /// Replaces the previous status message of a channel, or posts a new one,
    /// and returns the id of the message now holding `content`.
    fn publish(
        &self,
        channel_id: serenity::ChannelId,
        previous: Option<serenity::MessageId>,
        content: String,
    ) -> BoxFuture<'_, Result<serenity::MessageId>>;
}

/// Publishes status messages through the gateway client's HTTP handle, which
/// only exists once the bot has connected.
#[derive(Default)]
pub struct HttpBoard {
    http: OnceLock<Arc<serenity::Http>>,
}

impl HttpBoard {
    pub fn attach(&self, http: Arc<serenity::Http>) {
        if self.http.set(http).is_err() {
            debug!("Status board already attached");
        }
    }
}

impl StatusBoard for HttpBoard {
    fn publish(
        &self,
        channel_id: serenity::ChannelId,
        previous: Option<serenity::MessageId>,
        content: String,
    ) -> BoxFuture<'_, Result<serenity::MessageId>> {
        Box::pin(async move {
            let http = self
                .http
                .get()
                .ok_or_else(|| anyhow!("status board is not attached to a client yet"))?;

            if let Some(message_id) = previous {
                let edit = serenity::EditMessage::new().content(content.clone());
                match channel_id.edit_message(http, message_id, edit).await {
                    Ok(message) => return Ok(message.id),
                    Err(e) => warn!(
                        "Could not edit status message {} in {}, posting a new one: {:?}",
                        message_id, channel_id, e
                    ),
                }
            }

            let message = channel_id
                .send_message(http, serenity::CreateMessage::new().content(content))
                .await?;

            if let Err(e) = message.pin(http).await {
                warn!("Could not pin status message in {}: {:?}", channel_id, e);
            }

            Ok(message.id)
        })
    }
}
