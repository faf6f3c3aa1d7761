use crate::default_struct;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

default_struct! {
    #[derive(Clone, Debug)]
    pub struct Config {
        pub discord_token: String,
        pub api_base_url: String = "https://mcapi.shit.vc".to_string(),
        pub api_timeout: Duration = Duration::from_secs(10),
        pub presence_interval: Duration = Duration::from_secs(300),
        pub bot_author: String = "<@521371256763711489> (Reimopro)".to_string(),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        config.discord_token = lookup("DISCORD_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::Missing("DISCORD_TOKEN"))?;

        if let Some(url) = lookup("MCAPI_BASE_URL") {
            config.api_base_url = url;
        }
        if let Some(secs) = lookup("MCAPI_TIMEOUT_SECS") {
            config.api_timeout = parse_secs("MCAPI_TIMEOUT_SECS", secs)?;
        }
        if let Some(secs) = lookup("PRESENCE_INTERVAL_SECS") {
            config.presence_interval = parse_secs("PRESENCE_INTERVAL_SECS", secs)?;
        }
        if let Some(author) = lookup("BOT_AUTHOR") {
            config.bot_author = author;
        }

        Ok(config)
    }
}

fn parse_secs(key: &'static str, value: String) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::Invalid { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn token_is_required() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DISCORD_TOKEN")));
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup(&[("DISCORD_TOKEN", "abc")])).unwrap();
        assert_eq!(config.discord_token, "abc");
        assert_eq!(config.api_base_url, "https://mcapi.shit.vc");
        assert_eq!(config.api_timeout, Duration::from_secs(10));
        assert_eq!(config.presence_interval, Duration::from_secs(300));
    }

    #[test]
    fn overrides_and_rejects_bad_durations() {
        let config = Config::from_lookup(lookup(&[
            ("DISCORD_TOKEN", "abc"),
            ("MCAPI_BASE_URL", "http://localhost:8080"),
            ("PRESENCE_INTERVAL_SECS", "60"),
            ("BOT_AUTHOR", "someone"),
        ]))
        .unwrap();
        assert_eq!(config.api_base_url, "http://localhost:8080");
        assert_eq!(config.presence_interval, Duration::from_secs(60));
        assert_eq!(config.bot_author, "someone");

        let err = Config::from_lookup(lookup(&[
            ("DISCORD_TOKEN", "abc"),
            ("MCAPI_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "MCAPI_TIMEOUT_SECS", .. }));
    }
}
