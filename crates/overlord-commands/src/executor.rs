//! Handler execution shell: template rendering and native handlers under a
//! timeout with a single retry on transient failures.

use crate::builtins;
use crate::command::{Command, Handler};
use crate::context::{ChannelState, InvocationContext};
use crate::error::ExecutionError;
use crate::loyalty::LoyaltyLevel;
use crate::registry::CommandRegistry;
use crate::template::{Template, TemplateVars};
use crate::traits::{
    AlertStore, ChannelActions, FlightDataProvider, LanguageModel, LoyaltyStore, MetarProvider,
    MetricsSink, SpeechOutput, VoiceParams,
};
use overlord_common::format_uptime;
use overlord_config::ConfigCache;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, warn};

/// External collaborators used by handlers.
#[derive(Clone)]
pub struct Collaborators {
    /// Flight simulator data.
    pub flight: Arc<dyn FlightDataProvider>,
    /// METAR observations.
    pub metar: Arc<dyn MetarProvider>,
    /// Text generation.
    pub language: Arc<dyn LanguageModel>,
    /// Speech output.
    pub speech: Arc<dyn SpeechOutput>,
    /// Channel management.
    pub channel: Arc<dyn ChannelActions>,
    /// Saved alerts.
    pub alerts: Arc<dyn AlertStore>,
    /// Loyalty points.
    pub loyalty: Arc<dyn LoyaltyStore>,
    /// Counters.
    pub metrics: Arc<dyn MetricsSink>,
}

/// Shared state handlers run against.
pub struct ExecutionEnv {
    /// Live configuration.
    pub config: Arc<ConfigCache>,
    /// Command catalog.
    pub registry: Arc<CommandRegistry>,
    /// External collaborators.
    pub services: Collaborators,
    /// Stream metadata.
    pub channel_state: RwLock<ChannelState>,
    /// Current voice settings.
    pub voice: RwLock<VoiceParams>,
}

impl ExecutionEnv {
    /// Speaks `text`, logging instead of failing when speech is unavailable.
    pub async fn speak_best_effort(&self, text: &str) {
        if !self.config.get().speech.enabled {
            return;
        }
        let voice = self.voice.read().clone();
        if let Err(e) = self.services.speech.speak(text, &voice).await {
            warn!("Speech output failed: {}", e);
        }
    }
}

/// Runs handlers for admitted invocations.
#[derive(Clone)]
pub struct Executor {
    env: Arc<ExecutionEnv>,
}

impl Executor {
    /// Executor over a shared environment.
    pub fn new(env: Arc<ExecutionEnv>) -> Self {
        Self { env }
    }

    /// The shared environment.
    pub fn env(&self) -> &Arc<ExecutionEnv> {
        &self.env
    }

    /// Produces the reply text for one invocation.
    pub async fn execute(
        &self,
        command: &Command,
        ctx: &InvocationContext,
    ) -> Result<String, ExecutionError> {
        match &command.handler {
            Handler::Template(source) => self.render_template(source, ctx).await,
            Handler::Native(builtin) => {
                let timeout = self.env.config.get().dispatch.handler_timeout();
                let attempt = async {
                    match builtins::run(*builtin, &self.env, ctx).await {
                        Err(e) if e.is_transient() => {
                            debug!(command = %builtin, "Transient failure, retrying once: {}", e);
                            builtins::run(*builtin, &self.env, ctx).await
                        }
                        other => other,
                    }
                };
                match tokio::time::timeout(timeout, attempt).await {
                    Ok(Ok(text)) => Ok(text),
                    Ok(Err(e)) => Err(ExecutionError::UpstreamFailure(e)),
                    Err(_) => Err(ExecutionError::Timeout),
                }
            }
        }
    }

    async fn render_template(
        &self,
        source: &str,
        ctx: &InvocationContext,
    ) -> Result<String, ExecutionError> {
        let template = Template::parse(source)?;
        let mut vars = {
            let state = self.env.channel_state.read();
            TemplateVars {
                user: ctx.display_name.clone(),
                args: ctx.args.clone(),
                channel: state.channel.clone(),
                uptime: format_uptime(ctx.timestamp - state.started_at),
                game: state.game.clone(),
                title: state.title.clone(),
                user_title: String::new(),
                points: 0,
            }
        };
        if template.uses_loyalty() {
            let timeout = self.env.config.get().dispatch.handler_timeout();
            let lookup = self.env.services.loyalty.profile(&ctx.user_id);
            match tokio::time::timeout(timeout, lookup).await {
                Ok(Ok(profile)) => {
                    vars.user_title = profile.title;
                    vars.points = profile.points;
                }
                Ok(Err(e)) => {
                    warn!(user = %ctx.user_id, "Loyalty lookup failed: {}", e);
                    vars.user_title = LoyaltyLevel::Drone.title().to_string();
                }
                Err(_) => {
                    warn!(user = %ctx.user_id, "Loyalty lookup timed out");
                    vars.user_title = LoyaltyLevel::Drone.title().to_string();
                }
            }
        }
        Ok(template.render(&vars))
    }
}
