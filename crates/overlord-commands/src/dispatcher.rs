//! The dispatch engine.
//!
//! Dispatch is split in two so the runtime can keep admission strictly
//! ordered while handlers run concurrently:
//!
//! - [`Dispatcher::admit`] is synchronous. It applies the pre-filter, the spam
//!   filter, tokenizing, resolution and the permission/cooldown gate, all
//!   under one lock, and stamps cooldowns before returning.
//! - [`Dispatcher::run`] executes an admitted invocation and formats its reply
//!   into chat-safe chunks.

use crate::command::Command;
use crate::context::{parse_command, InvocationContext};
use crate::cooldown::{CooldownKey, CooldownTracker};
use crate::error::FailureKind;
use crate::executor::Executor;
use crate::formatter::split;
use crate::metrics::RejectionKind;
use crate::permissions::{admit_invocation, GateDenial};
use crate::registry::CommandRegistry;
use crate::spam::{SpamFilter, SpamVerdict};
use crate::traits::{ChatEngagement, LoyaltyStore, MetricsSink};
use chrono::{DateTime, Utc};
use overlord_common::{truncate_chars, ChatMessage, UserId};
use overlord_config::ConfigCache;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info_span, trace, warn, Instrument};

/// Cooldown records are pruned once per this many admissions.
const PRUNE_EVERY: u64 = 256;

/// An admitted command, ready to execute.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Command definition with configured overrides applied.
    pub command: Command,
    /// Invocation context.
    pub context: InvocationContext,
}

/// Outcome of the admission step.
#[derive(Debug, Clone)]
pub enum Admission {
    /// From the bot itself or an ignored user.
    Ignored,
    /// Dropped by the spam filter.
    Suppressed,
    /// Not a command; a candidate for chat engagement.
    Chatter,
    /// Prefixed, but names no known command.
    NotFound,
    /// Refused by the gate, with the notice to send if one is configured.
    Denied(Option<String>),
    /// Admitted; cooldowns are already stamped.
    Execute(Box<Invocation>),
}

#[derive(Debug, Default)]
struct AdmissionState {
    spam: SpamFilter,
    cooldowns: CooldownTracker,
    admitted: u64,
}

/// Routes chat lines to commands.
pub struct Dispatcher {
    config: Arc<ConfigCache>,
    registry: Arc<CommandRegistry>,
    executor: Executor,
    metrics: Arc<dyn MetricsSink>,
    loyalty: Arc<dyn LoyaltyStore>,
    engagement: Option<Arc<dyn ChatEngagement>>,
    state: Mutex<AdmissionState>,
}

impl Dispatcher {
    /// Dispatcher over the executor's environment.
    pub fn new(executor: Executor) -> Self {
        let env = executor.env().clone();
        Self {
            config: env.config.clone(),
            registry: env.registry.clone(),
            metrics: env.services.metrics.clone(),
            loyalty: env.services.loyalty.clone(),
            executor,
            engagement: None,
            state: Mutex::new(AdmissionState::default()),
        }
    }

    /// Answers non-command chatter through `engagement`.
    #[must_use]
    pub fn with_engagement(mut self, engagement: Arc<dyn ChatEngagement>) -> Self {
        self.engagement = Some(engagement);
        self
    }

    /// The command catalog.
    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// When a cooldown scope was last stamped.
    pub fn last_invoked(&self, key: &CooldownKey) -> Option<DateTime<Utc>> {
        self.state.lock().cooldowns.last_invoked(key)
    }

    /// Decides what to do with one chat line.
    pub fn admit(&self, message: &ChatMessage) -> Admission {
        let config = self.config.get();

        let login = message.login.to_lowercase();
        if login == config.twitch.bot_name.to_lowercase()
            || config
                .chat
                .ignore_list
                .iter()
                .any(|ignored| ignored.eq_ignore_ascii_case(&login))
        {
            trace!(user = %login, "Ignoring message");
            self.metrics.record_rejection(RejectionKind::Ignored);
            return Admission::Ignored;
        }

        let mut state = self.state.lock();
        let verdict = state
            .spam
            .admit(&message.user_id, &message.text, message.timestamp, &config.spam);
        if let SpamVerdict::Suppress(_) = verdict {
            self.metrics.record_rejection(RejectionKind::Suppressed);
            return Admission::Suppressed;
        }

        let Some(parsed) = parse_command(&message.text, &config.chat.prefix) else {
            return Admission::Chatter;
        };
        let Some(command) = self.registry.lookup(&parsed.token) else {
            debug!(token = %parsed.token, user = %login, "Unknown command");
            self.metrics.record_rejection(RejectionKind::NotFound);
            return Admission::NotFound;
        };
        let overrides = config.commands.get(&command.name).cloned();
        let command = command.with_override(overrides.as_ref());

        if let Err(denial) = admit_invocation(
            &mut state.cooldowns,
            &command,
            &message.user_id,
            message.tier,
            message.timestamp,
        ) {
            drop(state);
            let (kind, notify) = match &denial {
                GateDenial::Permission { .. } => {
                    (RejectionKind::Permission, config.dispatch.permission_notice)
                }
                GateDenial::Cooldown(_) => (RejectionKind::Cooldown, config.dispatch.cooldown_notice),
            };
            debug!(command = %command.name, user = %login, "Denied: {}", denial);
            self.metrics.record_rejection(kind);
            return Admission::Denied(notify.then(|| denial.notice(&message.display_name)));
        }

        state.admitted += 1;
        if state.admitted % PRUNE_EVERY == 0 {
            state.cooldowns.prune(message.timestamp);
        }
        drop(state);

        let context = InvocationContext::new(message, parsed, command.name.clone());
        Admission::Execute(Box::new(Invocation { command, context }))
    }

    /// Executes an admitted invocation and returns its reply chunks.
    pub async fn run(&self, invocation: Invocation) -> Vec<String> {
        let Invocation { command, context } = invocation;
        let span = info_span!(
            "invocation",
            id = %context.id,
            user = %context.login,
            command = %command.name,
        );

        async move {
            let result = self.executor.execute(&command, &context).await;
            let config = self.config.get();
            let max = config.chat.max_message_length;
            match result {
                Ok(text) => {
                    self.metrics.increment_invocation(&command.name);
                    self.reward(&context.user_id, config.dispatch.loyalty_points_per_command);
                    split(&text, max)
                }
                Err(e) => {
                    let kind = e.kind();
                    self.metrics.record_failure(&command.name, kind);
                    warn!(%kind, "Command failed: {}", e);
                    let message = match kind {
                        FailureKind::MalformedTemplate => &config.dispatch.malformed_template_message,
                        FailureKind::Timeout | FailureKind::UpstreamFailure => {
                            &config.dispatch.fallback_message
                        }
                    };
                    if message.trim().is_empty() {
                        Vec::new()
                    } else {
                        vec![truncate_chars(message.trim(), max)]
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Passes non-command chatter to the engagement responder, if any.
    pub async fn engage(&self, message: &ChatMessage) -> Vec<String> {
        let Some(engagement) = &self.engagement else {
            return Vec::new();
        };
        match engagement.engage(message).await {
            Some(reply) => split(&reply, self.config.get().chat.max_message_length),
            None => Vec::new(),
        }
    }

    /// Admits and, when admitted, runs one chat line.
    pub async fn handle(&self, message: &ChatMessage) -> Vec<String> {
        match self.admit(message) {
            Admission::Execute(invocation) => self.run(*invocation).await,
            Admission::Chatter => self.engage(message).await,
            Admission::Denied(Some(notice)) => vec![notice],
            Admission::Ignored
            | Admission::Suppressed
            | Admission::NotFound
            | Admission::Denied(None) => Vec::new(),
        }
    }

    fn reward(&self, user_id: &UserId, points: i64) {
        if points == 0 {
            return;
        }
        let loyalty = self.loyalty.clone();
        let user_id = user_id.clone();
        tokio::spawn(
            async move {
                if let Err(e) = loyalty.increment_loyalty(&user_id, points).await {
                    warn!(user = %user_id, "Loyalty update failed: {}", e);
                }
            }
            .in_current_span(),
        );
    }
}
