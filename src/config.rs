use chrono::FixedOffset;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),
    #[error("{key} environment variable has an invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub database_url: String,
    pub command_prefix: String,
    /// How long command replies stay in the channel before being deleted.
    pub delete_message_after: Duration,
    pub entry_expiration: chrono::Duration,
    pub refresh_interval: Duration,
    pub hook_timeout: Duration,
    pub display_offset: FixedOffset,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));

        let discord_token = required("BOT_USER_TOKEN")?;
        let database_url = required("DATABASE_URL")?;

        let del_msg_after_secs: u64 = parse("DEL_MSG_AFTER_SECS", required("DEL_MSG_AFTER_SECS")?)?;
        let expiration_mins: i64 = parse(
            "TABLE_ENTRY_EXPIRATION_MINS",
            required("TABLE_ENTRY_EXPIRATION_MINS")?,
        )?;
        let refresh_secs: u64 = parse(
            "TABLE_REFRESH_RATE_SECS",
            required("TABLE_REFRESH_RATE_SECS")?,
        )?;

        if expiration_mins <= 0 {
            return Err(ConfigError::Invalid {
                key: "TABLE_ENTRY_EXPIRATION_MINS",
                value: expiration_mins.to_string(),
            });
        }
        if refresh_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "TABLE_REFRESH_RATE_SECS",
                value: refresh_secs.to_string(),
            });
        }

        let command_prefix = lookup("COMMAND_PREFIX").unwrap_or_else(|| "!".to_string());

        let hook_timeout_secs: u64 = match lookup("HOOK_TIMEOUT_SECS") {
            Some(value) => parse("HOOK_TIMEOUT_SECS", value)?,
            None => 30,
        };

        let offset_mins: i32 = match lookup("DISPLAY_UTC_OFFSET_MINS") {
            Some(value) => parse("DISPLAY_UTC_OFFSET_MINS", value)?,
            None => 60,
        };
        let display_offset =
            FixedOffset::east_opt(offset_mins * 60).ok_or_else(|| ConfigError::Invalid {
                key: "DISPLAY_UTC_OFFSET_MINS",
                value: offset_mins.to_string(),
            })?;

        Ok(Config {
            discord_token,
            database_url,
            command_prefix,
            delete_message_after: Duration::from_secs(del_msg_after_secs),
            entry_expiration: chrono::Duration::minutes(expiration_mins),
            refresh_interval: Duration::from_secs(refresh_secs),
            hook_timeout: Duration::from_secs(hook_timeout_secs),
            display_offset,
        })
    }
}

fn parse<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    let parsed = value.trim().parse();
    parsed.map_err(|_| ConfigError::Invalid { key, value })
}

#[cfg(test)]
pub fn test_config() -> Config {
    Config {
        discord_token: "token".to_string(),
        database_url: "sqlite::memory:".to_string(),
        command_prefix: "!".to_string(),
        delete_message_after: Duration::from_secs(10),
        entry_expiration: chrono::Duration::minutes(30),
        refresh_interval: Duration::from_secs(60),
        hook_timeout: Duration::from_secs(5),
        display_offset: FixedOffset::east_opt(0).unwrap(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn required_vars() -> HashMap<String, String> {
        vars(&[
            ("BOT_USER_TOKEN", "abc"),
            ("DATABASE_URL", "sqlite:tracker.db"),
            ("DEL_MSG_AFTER_SECS", "15"),
            ("TABLE_ENTRY_EXPIRATION_MINS", "90"),
            ("TABLE_REFRESH_RATE_SECS", "20"),
        ])
    }

    #[test]
    fn reads_required_values_and_defaults() {
        let env = required_vars();
        let config = Config::from_lookup(|key| env.get(key).cloned()).unwrap();

        assert_eq!(config.discord_token, "abc");
        assert_eq!(config.database_url, "sqlite:tracker.db");
        assert_eq!(config.delete_message_after, Duration::from_secs(15));
        assert_eq!(config.entry_expiration, chrono::Duration::minutes(90));
        assert_eq!(config.refresh_interval, Duration::from_secs(20));
        assert_eq!(config.command_prefix, "!");
        assert_eq!(config.hook_timeout, Duration::from_secs(30));
        assert_eq!(config.display_offset.local_minus_utc(), 3600);
    }

    #[test]
    fn missing_variable_fails() {
        let mut env = required_vars();
        env.remove("TABLE_REFRESH_RATE_SECS");

        let err = Config::from_lookup(|key| env.get(key).cloned()).unwrap_err();
        assert_eq!(err, ConfigError::Missing("TABLE_REFRESH_RATE_SECS"));
    }

    #[test]
    fn unparsable_variable_fails() {
        let mut env = required_vars();
        env.insert("DEL_MSG_AFTER_SECS".to_string(), "soon".to_string());

        let err = Config::from_lookup(|key| env.get(key).cloned()).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "DEL_MSG_AFTER_SECS",
                value: "soon".to_string()
            }
        );
    }

    #[test]
    fn zero_refresh_interval_is_rejected() {
        let mut env = required_vars();
        env.insert("TABLE_REFRESH_RATE_SECS".to_string(), "0".to_string());

        assert!(Config::from_lookup(|key| env.get(key).cloned()).is_err());
    }
}
