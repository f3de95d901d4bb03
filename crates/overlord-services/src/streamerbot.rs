//! Speech output through a Streamer.bot HTTP server.

use crate::http::{HttpService, HttpSettings};
use async_trait::async_trait;
use overlord_commands::{ServiceError, SpeechOutput, VoiceParams};
use overlord_common::Result;
use overlord_config::SpeechConfig;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
struct DoAction<'a, A> {
    action: ActionRef<'a>,
    args: A,
}

#[derive(Debug, Serialize)]
struct ActionRef<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct SpeechArgs<'a> {
    message: &'a str,
    voice: &'a str,
    speed: f32,
    volume: f32,
}

#[derive(Debug, Serialize)]
struct NoArgs {}

/// Runs the configured Streamer.bot action with the text to speak, and a
/// second action that drops whatever is still queued.
///
/// When speech is disabled every request succeeds without a call.
#[derive(Clone)]
pub struct StreamerBotSpeech {
    http: HttpService,
    action: String,
    clear_action: String,
    enabled: bool,
}

impl StreamerBotSpeech {
    /// Creates the bridge from speech settings.
    pub fn new(config: &SpeechConfig) -> Result<Self> {
        let settings = HttpSettings::new(&config.base_url).with_timeout(REQUEST_TIMEOUT);
        Ok(Self {
            http: HttpService::new(&settings)?,
            action: config.action.clone(),
            clear_action: config.clear_action.clone(),
            enabled: config.enabled,
        })
    }
}

#[async_trait]
impl SpeechOutput for StreamerBotSpeech {
    #[instrument(skip(self, text, voice), fields(voice = %voice.voice))]
    async fn speak(&self, text: &str, voice: &VoiceParams) -> std::result::Result<(), ServiceError> {
        if !self.enabled || text.trim().is_empty() {
            return Ok(());
        }
        let body = DoAction {
            action: ActionRef { name: &self.action },
            args: SpeechArgs {
                message: text,
                voice: &voice.voice,
                speed: voice.speed,
                volume: voice.volume,
            },
        };
        let request = self.http.client().post(self.http.url("DoAction")?).json(&body);
        self.http.send(request).await?;
        debug!("Speech action triggered");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn clear_queue(&self) -> std::result::Result<(), ServiceError> {
        if !self.enabled {
            return Ok(());
        }
        let body = DoAction {
            action: ActionRef { name: &self.clear_action },
            args: NoArgs {},
        };
        let request = self.http.client().post(self.http.url("DoAction")?).json(&body);
        self.http.send(request).await?;
        debug!("Speech queue clear triggered");
        Ok(())
    }
}
