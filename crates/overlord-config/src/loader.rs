//! Configuration loading: YAML file plus environment overrides.

use crate::schema::Config;
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error when reading configuration file
    #[error("Failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parsing error
    #[error("Failed to parse YAML configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Configuration validation error
    #[error("Configuration validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Environment variable parsing error
    #[error("Failed to parse environment variable '{var}': {message}")]
    EnvParse { var: String, message: String },

    /// File watcher setup error
    #[error("Failed to watch configuration file: {0}")]
    Watch(#[from] notify::Error),
}

impl From<ConfigError> for overlord_common::OverlordError {
    fn from(err: ConfigError) -> Self {
        overlord_common::OverlordError::config(err.to_string())
    }
}

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "OVERLORD_CONFIG_PATH";

/// Configuration loader for the application
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a YAML file with environment variable overrides
    pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse(&content)?;
        Self::apply_env_overrides(&mut config)?;
        config.validate()?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse YAML text without touching the environment.
    pub fn parse(content: &str) -> Result<Config, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Config::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Resolve which file to load, if any.
    pub fn locate() -> Option<PathBuf> {
        if let Ok(path) = env::var(CONFIG_PATH_ENV) {
            return Some(PathBuf::from(path));
        }
        ["config.yaml", "config.yml"]
            .into_iter()
            .map(PathBuf::from)
            .find(|candidate| candidate.exists())
    }

    /// Load configuration from the located file, or from defaults plus environment.
    pub fn load() -> Result<(Config, Option<PathBuf>), ConfigError> {
        match Self::locate() {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                Ok((Self::load_config(&path)?, Some(path)))
            }
            None => {
                info!("No configuration file found; using defaults and environment");
                let mut config = Config::default();
                Self::apply_env_overrides(&mut config)?;
                config.validate()?;
                Ok((config, None))
            }
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(config: &mut Config) -> Result<(), ConfigError> {
        Self::apply_overrides_from(config, |var| env::var(var).ok())
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn apply_overrides_from<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("TWITCH_OAUTH_TOKEN") {
            config.twitch.oauth_token = token;
        }
        if let Some(channel) = lookup("TWITCH_CHANNEL") {
            config.twitch.channel = channel.trim_start_matches('#').to_lowercase();
        }
        if let Some(name) = lookup("TWITCH_BOT_NAME") {
            config.twitch.bot_name = name.to_lowercase();
        }
        if let Some(client_id) = lookup("TWITCH_CLIENT_ID") {
            config.twitch.client_id = client_id;
        }
        if let Some(broadcaster_id) = lookup("TWITCH_BROADCASTER_ID") {
            config.twitch.broadcaster_id = broadcaster_id;
        }
        if let Some(bot_user_id) = lookup("TWITCH_BOT_USER_ID") {
            config.twitch.bot_user_id = bot_user_id;
        }
        if let Some(prefix) = lookup("BOT_PREFIX") {
            config.chat.prefix = prefix;
        }
        if let Some(words) = lookup("BOT_TRIGGER_WORDS") {
            config.chat.trigger_words = words
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(timeout) = lookup("HANDLER_TIMEOUT_MS") {
            config.dispatch.handler_timeout_ms =
                timeout.parse().map_err(|e: std::num::ParseIntError| ConfigError::EnvParse {
                    var: "HANDLER_TIMEOUT_MS".to_string(),
                    message: e.to_string(),
                })?;
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            config.openai.api_key = key;
        }
        if let Some(model) = lookup("OPENAI_MODEL") {
            config.openai.model = model;
        }
        if let Some(key) = lookup("CHECKWX_API_KEY") {
            config.checkwx.api_key = key;
        }
        if let Some(url) = lookup("LITTLENAVMAP_URL") {
            config.littlenavmap.base_url = url;
        }
        if let Some(url) = lookup("STREAMERBOT_URL") {
            config.speech.base_url = url;
            config.speech.enabled = true;
        }
        if let Some(level) = lookup("OVERLORD_LOG_LEVEL") {
            config.logging.level = level;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = ConfigLoader::parse("chat:\n  prefix: \"?\"\nspam:\n  max_repeats: 5\n").unwrap();
        assert_eq!(config.chat.prefix, "?");
        assert_eq!(config.chat.max_message_length, 500);
        assert_eq!(config.spam.max_repeats, 5);
        assert_eq!(config.spam.window_secs, 30);
    }

    #[test]
    fn test_command_overrides_parse() {
        let yaml = "commands:\n  stats:\n    permission: subscriber\n    global_cooldown_secs: 60\n";
        let config = ConfigLoader::parse(yaml).unwrap();
        let stats = &config.commands["stats"];
        assert_eq!(stats.permission, Some(overlord_common::PermissionTier::Subscriber));
        assert_eq!(stats.global_cooldown_secs, Some(60));
        assert_eq!(stats.user_cooldown_secs, None);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("TWITCH_CHANNEL", "#FlightDeck"),
            ("BOT_TRIGGER_WORDS", "Overlord, bot ,,"),
            ("HANDLER_TIMEOUT_MS", "2500"),
            ("CHECKWX_API_KEY", "wx-key"),
        ]
        .into_iter()
        .collect();
        let mut config = Config::default();
        ConfigLoader::apply_overrides_from(&mut config, |v| vars.get(v).map(|s| s.to_string()))
            .unwrap();

        assert_eq!(config.twitch.channel, "flightdeck");
        assert_eq!(config.chat.trigger_words, vec!["overlord", "bot"]);
        assert_eq!(config.dispatch.handler_timeout_ms, 2500);
        assert_eq!(config.checkwx.api_key, "wx-key");
    }

    #[test]
    fn test_env_parse_error() {
        let mut config = Config::default();
        let result = ConfigLoader::apply_overrides_from(&mut config, |v| {
            (v == "HANDLER_TIMEOUT_MS").then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(ConfigError::EnvParse { .. })));
    }
}
