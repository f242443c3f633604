//! Feature modules plugged into the bot.
//!
//! A feature contributes commands and may declare a timer hook. The hook is
//! looked up once when features are loaded; the refresh loop only ever sees
//! the resulting list of [`Tickable`]s.

pub mod admin;
pub mod board;
pub mod track;

use crate::bot::{Data, Error};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::info;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A periodic hook run by the refresh loop.
pub trait Tickable: Send + Sync {
    fn name(&self) -> &'static str;

    fn tick(&self) -> BoxFuture<'_, anyhow::Result<()>>;
}

pub trait Feature: Send + Sync {
    fn name(&self) -> &'static str;

    fn commands(&self) -> Vec<poise::Command<Data, Error>>;

    fn tickable(self: Arc<Self>) -> Option<Arc<dyn Tickable>> {
        None
    }
}

pub struct FeatureSet {
    pub commands: Vec<poise::Command<Data, Error>>,
    pub tickables: Vec<Arc<dyn Tickable>>,
}

impl FeatureSet {
    pub fn load(features: Vec<Arc<dyn Feature>>) -> Self {
        let mut commands = Vec::new();
        let mut tickables = Vec::new();

        for feature in features {
            let name = feature.name();
            let feature_commands = feature.commands();
            let command_count = feature_commands.len();
            commands.extend(feature_commands);

            let has_timer = match feature.tickable() {
                Some(tickable) => {
                    tickables.push(tickable);
                    true
                }
                None => false,
            };

            info!(
                "Loaded feature {} ({} command(s), timer: {})",
                name, command_count, has_timer
            );
        }

        Self {
            commands,
            tickables,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Quiet;

    impl Feature for Quiet {
        fn name(&self) -> &'static str {
            "quiet"
        }

        fn commands(&self) -> Vec<poise::Command<Data, Error>> {
            Vec::new()
        }
    }

    struct Ticking;

    impl Tickable for Ticking {
        fn name(&self) -> &'static str {
            "ticking"
        }

        fn tick(&self) -> BoxFuture<'_, anyhow::Result<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    impl Feature for Ticking {
        fn name(&self) -> &'static str {
            "ticking"
        }

        fn commands(&self) -> Vec<poise::Command<Data, Error>> {
            Vec::new()
        }

        fn tickable(self: Arc<Self>) -> Option<Arc<dyn Tickable>> {
            Some(self)
        }
    }

    #[test]
    fn only_declared_timers_are_collected() {
        let features: Vec<Arc<dyn Feature>> = vec![Arc::new(Quiet), Arc::new(Ticking)];
        let set = FeatureSet::load(features);

        assert_eq!(set.tickables.len(), 1);
        assert_eq!(set.tickables[0].name(), "ticking");
    }

    #[test]
    fn commands_of_every_feature_are_registered() {
        let features: Vec<Arc<dyn Feature>> = vec![Arc::new(admin::AdminFeature), Arc::new(Quiet)];
        let set = FeatureSet::load(features);

        let names: Vec<_> = set.commands.iter().map(|c| c.name.as_str()).collect();
        assert!(names.contains(&"channel"));
        assert!(names.contains(&"tracking"));
        assert!(set.tickables.is_empty());
    }
}
