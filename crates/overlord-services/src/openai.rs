//! Chat completions client.

use crate::http::{HttpService, HttpSettings};
use async_trait::async_trait;
use overlord_commands::{ChatTurn, LanguageModel, ServiceError, TurnRole};
use overlord_common::Result;
use overlord_config::OpenAiConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const REQUESTS_PER_SECOND: u32 = 2;

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Language model backed by an OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct OpenAiClient {
    http: HttpService,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    personality: String,
}

impl OpenAiClient {
    /// Creates a client from the language model settings.
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        let settings = HttpSettings::new(&config.base_url)
            .with_timeout(REQUEST_TIMEOUT)
            .with_rate_limit(REQUESTS_PER_SECOND);
        Ok(Self {
            http: HttpService::new(&settings)?,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            personality: config.personality.clone(),
        })
    }

    fn messages<'a>(&'a self, prompt: &'a str, history: &'a [ChatTurn]) -> Vec<Message<'a>> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        if !self.personality.trim().is_empty() {
            messages.push(Message {
                role: "system",
                content: &self.personality,
            });
        }
        messages.extend(history.iter().map(|turn| Message {
            role: match turn.role {
                TurnRole::User => "user",
                TurnRole::Assistant => "assistant",
            },
            content: &turn.content,
        }));
        messages.push(Message {
            role: "user",
            content: prompt,
        });
        messages
    }
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    #[instrument(skip(self, prompt, history), fields(turns = history.len()))]
    async fn generate(&self, prompt: &str, history: &[ChatTurn]) -> std::result::Result<String, ServiceError> {
        let body = CompletionRequest {
            model: &self.model,
            messages: self.messages(prompt, history),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };
        let request = self
            .http
            .client()
            .post(self.http.url("chat/completions")?)
            .bearer_auth(&self.api_key)
            .json(&body);

        let response: CompletionResponse = self.http.json(request).await?;
        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ServiceError::Unavailable("completion contained no text".to_string()))?;

        debug!(chars = text.chars().count(), "Completion received");
        Ok(text)
    }
}
