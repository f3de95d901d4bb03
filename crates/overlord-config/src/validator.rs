//! Runtime validation of a loaded configuration.

use crate::loader::ConfigError;
use crate::schema::Config;

/// Longest accepted cooldown, one week.
pub const MAX_COOLDOWN_SECS: u64 = 7 * 86_400;
/// Longest accepted spam window, one day.
pub const MAX_SPAM_WINDOW_SECS: u64 = 86_400;

impl Config {
    /// Validates the configuration, reporting every problem found at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        if self.chat.prefix.trim().is_empty() {
            problems.push("chat.prefix cannot be empty".to_string());
        }
        if self.chat.prefix.chars().any(char::is_whitespace) {
            problems.push("chat.prefix cannot contain whitespace".to_string());
        }
        if self.chat.max_message_length < 16 {
            problems.push("chat.max_message_length must be at least 16".to_string());
        }
        if self.chat.messages_per_30s == 0 {
            problems.push("chat.messages_per_30s must be greater than 0".to_string());
        }
        if self.spam.window_secs == 0 {
            problems.push("spam.window_secs must be greater than 0".to_string());
        }
        if self.spam.window_secs > MAX_SPAM_WINDOW_SECS {
            problems.push(format!("spam.window_secs cannot exceed {MAX_SPAM_WINDOW_SECS}"));
        }
        if self.spam.max_repeats == 0 {
            problems.push("spam.max_repeats must be greater than 0".to_string());
        }
        if self.spam.max_messages_per_second == 0 {
            problems.push("spam.max_messages_per_second must be greater than 0".to_string());
        }
        if self.dispatch.handler_timeout_ms == 0 {
            problems.push("dispatch.handler_timeout_ms must be greater than 0".to_string());
        }
        if !self.twitch.oauth_token.is_empty() && !self.twitch.oauth_token.starts_with("oauth:") {
            problems.push("twitch.oauth_token must start with 'oauth:'".to_string());
        }
        if self.checkwx.timeout_secs == 0 {
            problems.push("checkwx.timeout_secs must be greater than 0".to_string());
        }
        if self.littlenavmap.timeout_secs == 0 {
            problems.push("littlenavmap.timeout_secs must be greater than 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.speech.volume) {
            problems.push("speech.volume must be between 0.0 and 1.0".to_string());
        }
        if self.speech.speed <= 0.0 {
            problems.push("speech.speed must be positive".to_string());
        }
        for (name, over) in &self.commands {
            if name.is_empty() || name.chars().any(char::is_whitespace) {
                problems.push(format!("commands.'{name}' is not a valid command name"));
            }
            for (field, secs) in [
                ("user_cooldown_secs", over.user_cooldown_secs),
                ("global_cooldown_secs", over.global_cooldown_secs),
            ] {
                if secs.is_some_and(|secs| secs > MAX_COOLDOWN_SECS) {
                    problems.push(format!(
                        "commands.{name}.{field} cannot exceed {MAX_COOLDOWN_SECS}"
                    ));
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(problems))
        }
    }

    /// Whether the chat transport has enough to connect to Twitch.
    pub fn has_twitch_credentials(&self) -> bool {
        !self.twitch.oauth_token.is_empty() && !self.twitch.channel.is_empty()
    }
}
