//! Configuration schema definitions using serde.
//!
//! Every section is `#[serde(default)]` so a YAML file only needs to name the
//! values it changes.

use overlord_common::{LoggingConfig, PermissionTier};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Overlord Bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Twitch connection and API credentials.
    pub twitch: TwitchConfig,
    /// Chat surface settings.
    pub chat: ChatConfig,
    /// Spam filter policy.
    pub spam: SpamConfig,
    /// Dispatch engine settings.
    pub dispatch: DispatchConfig,
    /// Per-command permission and cooldown overrides, keyed by canonical name.
    pub commands: HashMap<String, CommandOverride>,
    /// File locations for persisted state.
    pub storage: StorageConfig,
    /// Little Navmap flight data source.
    pub littlenavmap: LittleNavmapConfig,
    /// METAR weather reports.
    pub checkwx: CheckWxConfig,
    /// Language model settings.
    pub openai: OpenAiConfig,
    /// Text-to-speech bridge.
    pub speech: SpeechConfig,
    /// Logging setup.
    pub logging: LoggingConfig,
}

/// Twitch configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TwitchConfig {
    /// Chat OAuth token, `oauth:` prefixed.
    pub oauth_token: String,
    /// Channel to join, without `#`.
    pub channel: String,
    /// Login of the bot account.
    pub bot_name: String,
    /// Helix client ID.
    pub client_id: String,
    /// Numeric broadcaster user ID.
    pub broadcaster_id: String,
    /// Numeric user ID of the bot account (acts as moderator for Helix calls).
    pub bot_user_id: String,
    /// IRC host.
    pub irc_host: String,
    /// IRC port (plain TCP).
    pub irc_port: u16,
    /// Helix API base URL.
    pub helix_url: String,
}

/// Chat surface configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Command prefix.
    pub prefix: String,
    /// Maximum characters per outbound chat message.
    pub max_message_length: usize,
    /// Words that summon the chat-engagement responder.
    pub trigger_words: Vec<String>,
    /// Logins whose messages are ignored entirely.
    pub ignore_list: Vec<String>,
    /// Outbound message budget per 30 seconds.
    pub messages_per_30s: u32,
}

/// Spam filter policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpamConfig {
    /// Rolling window length in seconds.
    pub window_secs: u64,
    /// Allowed occurrences of identical normalized text within the window.
    pub max_repeats: usize,
    /// Allowed messages per user in any trailing second.
    pub max_messages_per_second: usize,
    /// Drop long messages built from very few distinct characters.
    pub reject_low_diversity: bool,
}

/// Dispatch engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Timeout for native handlers, in milliseconds.
    pub handler_timeout_ms: u64,
    /// Reply with a short notice on permission denial.
    pub permission_notice: bool,
    /// Reply with a short notice on cooldown denial.
    pub cooldown_notice: bool,
    /// Chunk emitted when a handler times out or its upstream fails.
    pub fallback_message: String,
    /// Chunk emitted when a custom command template cannot be rendered.
    pub malformed_template_message: String,
    /// Loyalty points credited per successful command.
    pub loyalty_points_per_command: i64,
    /// Seconds in-flight handlers get to finish on shutdown.
    pub shutdown_grace_secs: u64,
    /// Per-user cooldown given to new custom commands.
    pub custom_user_cooldown_secs: u64,
    /// Global cooldown given to new custom commands.
    pub custom_global_cooldown_secs: u64,
}

impl DispatchConfig {
    /// Handler timeout as a `Duration`.
    pub fn handler_timeout(&self) -> Duration {
        Duration::from_millis(self.handler_timeout_ms)
    }

    /// Shutdown grace period as a `Duration`.
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// Override for a single command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandOverride {
    /// Required tier.
    pub permission: Option<PermissionTier>,
    /// Per-user cooldown in seconds.
    pub user_cooldown_secs: Option<u64>,
    /// Global cooldown in seconds.
    pub global_cooldown_secs: Option<u64>,
}

/// Persisted state locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Custom commands and aliases.
    pub commands_path: PathBuf,
    /// Saved alerts.
    pub alerts_path: PathBuf,
    /// Loyalty ledger snapshot.
    pub loyalty_path: PathBuf,
}

/// Little Navmap web API configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LittleNavmapConfig {
    /// Base URL of the Little Navmap web server.
    pub base_url: String,
    /// How long a fetched snapshot is reused, in seconds.
    pub cache_ttl_secs: u64,
    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,
}

/// CheckWX METAR API configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckWxConfig {
    /// API key; `!metar` finds no reports when empty.
    pub api_key: String,
    /// API base URL.
    pub base_url: String,
    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,
    /// How long a fetched report is reused, in seconds.
    pub cache_ttl_secs: u64,
}

/// Language model configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API key; the responder is disabled when empty.
    pub api_key: String,
    /// Chat completions base URL.
    pub base_url: String,
    /// Model name.
    pub model: String,
    /// Completion token cap.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// System prompt describing the bot persona.
    pub personality: String,
    /// Conversation turns kept as context.
    pub history_turns: usize,
    /// Seconds a mention response is cached.
    pub response_cache_secs: u64,
}

/// Speech bridge configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Whether speech output is active.
    pub enabled: bool,
    /// Streamer.bot HTTP server URL.
    pub base_url: String,
    /// Streamer.bot action that performs the speech.
    pub action: String,
    /// Streamer.bot action that empties the pending speech queue.
    pub clear_action: String,
    /// Initial voice.
    pub voice: String,
    /// Initial speed multiplier.
    pub speed: f32,
    /// Initial volume, 0.0 to 1.0.
    pub volume: f32,
}
