//! Conversational replies to chatter that mentions the bot.

use crate::traits::{ChatEngagement, ChatTurn, LanguageModel, TurnRole};
use async_trait::async_trait;
use moka::future::Cache;
use overlord_common::{normalize_text, ChatMessage};
use overlord_config::ConfigCache;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const CACHE_CAPACITY: u64 = 1_000;

/// Whether `text` addresses the bot by name or uses a trigger word.
///
/// The bot name matches anywhere (so `@overlord` counts); trigger words
/// must appear as whole words.
pub fn is_mention(text: &str, bot_name: &str, trigger_words: &[String]) -> bool {
    let text = text.to_lowercase();
    let bot_name = bot_name.trim().to_lowercase();
    if !bot_name.is_empty() && text.contains(&bot_name) {
        return true;
    }
    text.split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|word| !word.is_empty())
        .any(|word| trigger_words.iter().any(|t| t.eq_ignore_ascii_case(word)))
}

/// Answers mentions through a [`LanguageModel`].
///
/// Identical questions within the cache lifetime get the cached answer. A
/// short rolling history of exchanges is sent with each new prompt.
pub struct LanguageEngagement {
    model: Arc<dyn LanguageModel>,
    config: Arc<ConfigCache>,
    responses: Cache<String, String>,
    history: Mutex<VecDeque<ChatTurn>>,
}

impl LanguageEngagement {
    /// Responder using the cache lifetime from the current configuration.
    pub fn new(model: Arc<dyn LanguageModel>, config: Arc<ConfigCache>) -> Self {
        let ttl = Duration::from_secs(config.get().openai.response_cache_secs.max(1));
        Self {
            model,
            config,
            responses: Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(ttl)
                .build(),
            history: Mutex::new(VecDeque::new()),
        }
    }

    /// Conversation turns currently remembered.
    pub fn history(&self) -> Vec<ChatTurn> {
        self.history.lock().iter().cloned().collect()
    }

    fn remember(&self, prompt: String, reply: String, max_turns: usize) {
        let mut history = self.history.lock();
        history.push_back(ChatTurn {
            role: TurnRole::User,
            content: prompt,
        });
        history.push_back(ChatTurn {
            role: TurnRole::Assistant,
            content: reply,
        });
        while history.len() > max_turns * 2 {
            history.pop_front();
        }
    }
}

#[async_trait]
impl ChatEngagement for LanguageEngagement {
    async fn engage(&self, message: &ChatMessage) -> Option<String> {
        let config = self.config.get();
        if !is_mention(&message.text, &config.twitch.bot_name, &config.chat.trigger_words) {
            return None;
        }

        let key = normalize_text(&message.text);
        if let Some(cached) = self.responses.get(&key).await {
            debug!(user = %message.login, "Engagement cache hit");
            return Some(cached);
        }

        let prompt = format!("{}: {}", message.display_name, message.text.trim());
        let history = self.history();
        match self.model.generate(&prompt, &history).await {
            Ok(reply) => {
                let reply = reply.trim().to_string();
                if reply.is_empty() {
                    return None;
                }
                self.remember(prompt, reply.clone(), config.openai.history_turns);
                self.responses.insert(key, reply.clone()).await;
                Some(reply)
            }
            Err(e) => {
                warn!(user = %message.login, "Engagement reply failed: {}", e);
                None
            }
        }
    }
}
