mod bot;
mod config;
mod database;
mod state;
mod utils;

use anyhow::Result;
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "yellow_tracker=info,poise=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    let bot::Bot {
        mut client,
        data,
        tickables,
    } = bot::create_bot(config.clone()).await?;

    let refresh = tokio::spawn(bot::refresh::run(
        tickables,
        config.refresh_interval,
        config.hook_timeout,
    ));

    tracing::info!("Starting Discord bot...");

    if let Err(why) = client.start().await {
        tracing::error!("Client error: {:?}", why);
    }

    refresh.abort();

    if let Some(fatal) = data.take_fatal().await {
        return Err(fatal);
    }

    Ok(())
}
