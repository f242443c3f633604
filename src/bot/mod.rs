pub mod features;
pub mod handlers;
pub mod refresh;

use crate::config::Config;
use crate::database;
use crate::state::GuildStateStore;
use anyhow::Result;
use features::admin::AdminFeature;
use features::board::HttpBoard;
use features::track::TrackFeature;
use features::{Feature, FeatureSet, Tickable};
use poise::serenity_prelude as serenity;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Mutex;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

#[derive(Clone)]
pub struct Data {
    pub pool: SqlitePool,
    pub config: Config,
    pub store: GuildStateStore,
    pub board: Arc<HttpBoard>,
    fatal: Arc<Mutex<Option<anyhow::Error>>>,
}

impl Data {
    pub fn new(
        pool: SqlitePool,
        config: Config,
        store: GuildStateStore,
        board: Arc<HttpBoard>,
    ) -> Self {
        Self {
            pool,
            config,
            store,
            board,
            fatal: Arc::default(),
        }
    }

    /// Remembers an error that must end the process once the client stops.
    pub async fn record_fatal(&self, error: anyhow::Error) {
        *self.fatal.lock().await = Some(error);
    }

    pub async fn take_fatal(&self) -> Option<anyhow::Error> {
        self.fatal.lock().await.take()
    }
}

pub struct Bot {
    pub client: serenity::Client,
    pub data: Data,
    pub tickables: Vec<Arc<dyn Tickable>>,
}

pub async fn create_bot(config: Config) -> Result<Bot> {
    let pool = database::create_connection(&config.database_url).await?;
    let store = GuildStateStore::new();
    let board = Arc::new(HttpBoard::default());

    let data = Data::new(pool, config.clone(), store.clone(), board.clone());

    let features: Vec<Arc<dyn Feature>> = vec![
        Arc::new(TrackFeature::new(store, &config, board)),
        Arc::new(AdminFeature),
    ];
    let FeatureSet {
        commands,
        tickables,
    } = FeatureSet::load(features);

    let intents =
        serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::MESSAGE_CONTENT;

    let setup_data = data.clone();
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands,
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(config.command_prefix.clone()),
                ..Default::default()
            },
            on_error: |error| Box::pin(handlers::errors::on_error(error)),
            event_handler: |ctx, event, framework, data| {
                Box::pin(handlers::event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                Ok(setup_data)
            })
        })
        .build();

    let client = serenity::ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .await?;

    Ok(Bot {
        client,
        data,
        tickables,
    })
}
