//! Default values for every configuration section.

use crate::schema::*;
use overlord_common::LoggingConfig;
use std::collections::HashMap;
use std::path::PathBuf;

impl Default for Config {
    fn default() -> Self {
        Self {
            twitch: TwitchConfig::default(),
            chat: ChatConfig::default(),
            spam: SpamConfig::default(),
            dispatch: DispatchConfig::default(),
            commands: HashMap::new(),
            storage: StorageConfig::default(),
            littlenavmap: LittleNavmapConfig::default(),
            checkwx: CheckWxConfig::default(),
            openai: OpenAiConfig::default(),
            speech: SpeechConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for TwitchConfig {
    fn default() -> Self {
        Self {
            oauth_token: String::new(),
            channel: String::new(),
            bot_name: "overlord".to_string(),
            client_id: String::new(),
            broadcaster_id: String::new(),
            bot_user_id: String::new(),
            irc_host: "irc.chat.twitch.tv".to_string(),
            irc_port: 6667,
            helix_url: "https://api.twitch.tv/helix".to_string(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            prefix: "!".to_string(),
            max_message_length: 500,
            trigger_words: vec!["bot".to_string(), "assistant".to_string()],
            ignore_list: Vec::new(),
            messages_per_30s: 20,
        }
    }
}

impl Default for SpamConfig {
    fn default() -> Self {
        Self {
            window_secs: 30,
            max_repeats: 3,
            max_messages_per_second: 3,
            reject_low_diversity: true,
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            handler_timeout_ms: 5_000,
            permission_notice: false,
            cooldown_notice: false,
            fallback_message: "That data is unavailable right now.".to_string(),
            malformed_template_message: "That command is misconfigured. A moderator should fix it."
                .to_string(),
            loyalty_points_per_command: 1,
            shutdown_grace_secs: 5,
            custom_user_cooldown_secs: 5,
            custom_global_cooldown_secs: 0,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data = PathBuf::from("data");
        Self {
            commands_path: data.join("commands.json"),
            alerts_path: data.join("alerts.json"),
            loyalty_path: data.join("loyalty.json"),
        }
    }
}

impl Default for LittleNavmapConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8965".to_string(),
            cache_ttl_secs: 2,
            timeout_secs: 4,
        }
    }
}

impl Default for CheckWxConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.checkwx.com".to_string(),
            timeout_secs: 10,
            cache_ttl_secs: 300,
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 150,
            temperature: 0.7,
            personality: "You are an AI Overlord managing a flight simulation Twitch channel."
                .to_string(),
            history_turns: 5,
            response_cache_secs: 300,
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "http://127.0.0.1:7474".to_string(),
            action: "Speak".to_string(),
            clear_action: "Clear Speech Queue".to_string(),
            voice: "default".to_string(),
            speed: 1.0,
            volume: 1.0,
        }
    }
}
