use super::Feature;
use crate::bot::{Context, Data, Error};
use crate::database::models::{ChannelKind, to_db};
use crate::database::{self, queries};
use crate::state::{ChannelState, Entry};
use crate::utils::format::{format_error_message, format_success_message};
use crate::utils::reply::say_and_clean;
use poise::serenity_prelude as serenity;

/// Server configuration commands. Has no timer.
pub struct AdminFeature;

impl Feature for AdminFeature {
    fn name(&self) -> &'static str {
        "admin"
    }

    fn commands(&self) -> Vec<poise::Command<Data, Error>> {
        vec![channel(), tracking(), memberchannel(), target()]
    }
}

/// Manages tracker channels
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    subcommands("channel_add", "channel_remove"),
    subcommand_required
)]
pub async fn channel(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Turns this channel into a tracker channel
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    rename = "add"
)]
pub async fn channel_add(
    ctx: Context<'_>,
    #[description = "What the channel tracks"] kind: ChannelKind,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let channel_id = ctx.channel_id();
    let data = ctx.data();

    {
        let mut conn = database::acquire(&data.pool).await?;
        queries::upsert_guild(&mut conn, to_db(guild_id.get())).await?;
        queries::insert_channel(&mut conn, to_db(guild_id.get()), to_db(channel_id.get()), kind)
            .await?;
    }

    data.store
        .update(guild_id, |guild| {
            guild
                .channel_states
                .entry(channel_id)
                .and_modify(|channel| channel.kind = kind)
                .or_insert_with(|| ChannelState::new(guild_id, channel_id, kind));
        })
        .await;

    tracing::info!("Channel {} of guild {} now tracks {}", channel_id, guild_id, kind);

    say_and_clean(
        ctx,
        format_success_message(&format!("This channel now tracks {} spawns.", kind.title())),
    )
    .await
}

/// Stops using this channel as a tracker channel
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    rename = "remove"
)]
pub async fn channel_remove(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let channel_id = ctx.channel_id();
    let data = ctx.data();

    let removed = {
        let mut conn = database::acquire(&data.pool).await?;
        queries::delete_channel(&mut conn, to_db(guild_id.get()), to_db(channel_id.get())).await?
    };

    data.store
        .update(guild_id, |guild| guild.channel_states.remove(&channel_id))
        .await;

    let msg = if removed {
        format_success_message("This channel is no longer a tracker channel.")
    } else {
        format_error_message("This channel is not a tracker channel.")
    };
    say_and_clean(ctx, msg).await
}

/// Turns spawn tracking on or off for this server
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn tracking(
    ctx: Context<'_>,
    #[description = "Whether tracking is enabled"] enabled: bool,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let data = ctx.data();

    {
        let mut conn = database::acquire(&data.pool).await?;
        queries::upsert_guild(&mut conn, to_db(guild_id.get())).await?;
        queries::set_tracking_enabled(&mut conn, to_db(guild_id.get()), enabled).await?;
    }

    data.store
        .update(guild_id, |guild| guild.tracking_enabled = enabled)
        .await;

    let msg = if enabled {
        "Tracking enabled."
    } else {
        "Tracking disabled."
    };
    say_and_clean(ctx, format_success_message(msg)).await
}

/// Sets or clears the member channel of this server
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn memberchannel(
    ctx: Context<'_>,
    #[description = "Member channel, omit to clear"] channel: Option<serenity::GuildChannel>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let data = ctx.data();
    let channel_id = channel.map(|channel| channel.id);

    {
        let mut conn = database::acquire(&data.pool).await?;
        queries::upsert_guild(&mut conn, to_db(guild_id.get())).await?;
        queries::set_member_channel(
            &mut conn,
            to_db(guild_id.get()),
            channel_id.map(|id| to_db(id.get())),
        )
        .await?;
    }

    data.store
        .update(guild_id, |guild| guild.member_channel_id = channel_id)
        .await;

    let msg = match channel_id {
        Some(id) => format!("Member channel set to <#{}>.", id),
        None => "Member channel cleared.".to_string(),
    };
    say_and_clean(ctx, format_success_message(&msg)).await
}

/// Manages the list of MVPs and mining spots this server may track
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    subcommands("target_add", "target_remove", "target_list"),
    subcommand_required
)]
pub async fn target(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    rename = "add"
)]
pub async fn target_add(
    ctx: Context<'_>,
    #[description = "Catalog to add to"] kind: ChannelKind,
    #[description = "Target name"]
    #[rest]
    name: String,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let name = name.trim();
    if name.is_empty() {
        return say_and_clean(ctx, format_error_message("Give the name of the target.")).await;
    }
    if !Entry::name_fits(name) {
        let msg = format_error_message(&format!(
            "Names are limited to {} characters.",
            Entry::MAX_NAME_CHARS
        ));
        return say_and_clean(ctx, msg).await;
    }

    let added = {
        let mut conn = database::acquire(&ctx.data().pool).await?;
        queries::upsert_guild(&mut conn, to_db(guild_id.get())).await?;
        queries::insert_target(&mut conn, to_db(guild_id.get()), kind, name).await?
    };

    let msg = if added {
        format_success_message(&format!("Added **{}** to the {} list.", name, kind.title()))
    } else {
        format_error_message(&format!("**{}** is already on the {} list.", name, kind.title()))
    };
    say_and_clean(ctx, msg).await
}

#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    rename = "remove"
)]
pub async fn target_remove(
    ctx: Context<'_>,
    #[description = "Catalog to remove from"] kind: ChannelKind,
    #[description = "Target name"]
    #[rest]
    name: String,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let name = name.trim();

    let removed = {
        let mut conn = database::acquire(&ctx.data().pool).await?;
        queries::delete_target(&mut conn, to_db(guild_id.get()), kind, name).await?
    };

    let msg = if removed {
        format_success_message(&format!("Removed **{}** from the {} list.", name, kind.title()))
    } else {
        format_error_message(&format!("**{}** is not on the {} list.", name, kind.title()))
    };
    say_and_clean(ctx, msg).await
}

#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    rename = "list"
)]
pub async fn target_list(
    ctx: Context<'_>,
    #[description = "Catalog to show"] kind: ChannelKind,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let names = {
        let mut conn = database::acquire(&ctx.data().pool).await?;
        queries::fetch_targets(&mut conn, to_db(guild_id.get()), kind).await?
    };

    let msg = if names.is_empty() {
        format!("The {} list is empty, any name can be tracked.", kind.title())
    } else {
        format!("**{} list:** {}", kind.title(), names.join(", "))
    };
    say_and_clean(ctx, msg).await
}
