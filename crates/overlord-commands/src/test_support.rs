//! In-memory collaborators and a ready-made execution environment for tests.
//!
//! Enabled for other crates through the `testing` feature.

use crate::context::{parse_command, ChannelState, InvocationContext};
use crate::error::ServiceError;
use crate::executor::{Collaborators, ExecutionEnv, Executor};
use crate::loyalty::LoyaltyLedger;
use crate::metrics::MetricsManager;
use crate::registry::CommandRegistry;
use crate::store::{MemoryAlertStore, MemoryCommandStore};
use crate::traits::{
    AirportInfo, ChannelActions, ChatTurn, FlightDataProvider, FlightSnapshot, LanguageModel,
    MetarProvider, MetarReport, SpeechOutput, VoiceParams,
};
use async_trait::async_trait;
use overlord_common::test_utils::base_time;
use overlord_common::ChatMessage;
use overlord_config::{Config, ConfigCache};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Scripted flight simulator.
#[derive(Debug, Default)]
pub struct FakeFlight {
    snapshot: Mutex<FlightSnapshot>,
    airports: Mutex<HashMap<String, AirportInfo>>,
    failures: Mutex<VecDeque<ServiceError>>,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl FakeFlight {
    /// Simulator with no active flight.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the reading returned by `fetch`.
    pub fn set_snapshot(&self, snapshot: FlightSnapshot) {
        *self.snapshot.lock() = snapshot;
    }

    /// Makes an airport known.
    pub fn add_airport(&self, info: AirportInfo) {
        self.airports.lock().insert(info.ident.clone(), info);
    }

    /// Queues a failure for the next call.
    pub fn fail_next(&self, error: ServiceError) {
        self.failures.lock().push_back(error);
    }

    /// Makes every call sleep first.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn begin(&self) -> Result<(), ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.failures.lock().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl FlightDataProvider for FakeFlight {
    async fn fetch(&self) -> Result<FlightSnapshot, ServiceError> {
        self.begin().await?;
        Ok(self.snapshot.lock().clone())
    }

    async fn airport(&self, ident: &str) -> Result<Option<AirportInfo>, ServiceError> {
        self.begin().await?;
        Ok(self.airports.lock().get(ident).cloned())
    }
}

/// METAR source with scripted reports.
#[derive(Debug, Default)]
pub struct FakeMetar {
    reports: Mutex<HashMap<String, MetarReport>>,
    fail: Mutex<Option<ServiceError>>,
    requested: Mutex<Vec<String>>,
}

impl FakeMetar {
    /// Source with no reports.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes a station report `raw_text`.
    pub fn add_report(&self, icao: &str, raw_text: &str) {
        self.reports.lock().insert(
            icao.to_string(),
            MetarReport {
                icao: icao.to_string(),
                raw_text: raw_text.to_string(),
            },
        );
    }

    /// Makes every call fail.
    pub fn set_failure(&self, error: ServiceError) {
        *self.fail.lock() = Some(error);
    }

    /// Stations asked for, in order.
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().clone()
    }
}

#[async_trait]
impl MetarProvider for FakeMetar {
    async fn metar(&self, icao: &str) -> Result<Option<MetarReport>, ServiceError> {
        self.requested.lock().push(icao.to_string());
        if let Some(error) = self.fail.lock().clone() {
            return Err(error);
        }
        Ok(self.reports.lock().get(icao).cloned())
    }
}

/// Language model with a fixed answer.
#[derive(Debug)]
pub struct FakeLanguage {
    reply: Mutex<Result<String, ServiceError>>,
    prompts: Mutex<Vec<(String, Vec<ChatTurn>)>>,
}

impl Default for FakeLanguage {
    fn default() -> Self {
        Self::replying("Aircraft wings are designed to flex in turbulence.")
    }
}

impl FakeLanguage {
    /// Model that always answers `reply`.
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Mutex::new(Ok(reply.to_string())),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Makes every call fail.
    pub fn set_failure(&self, error: ServiceError) {
        *self.reply.lock() = Err(error);
    }

    /// Prompts received, with the history length given alongside each.
    pub fn prompts(&self) -> Vec<(String, Vec<ChatTurn>)> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl LanguageModel for FakeLanguage {
    async fn generate(&self, prompt: &str, history: &[ChatTurn]) -> Result<String, ServiceError> {
        self.prompts.lock().push((prompt.to_string(), history.to_vec()));
        self.reply.lock().clone()
    }
}

/// Speech output that records what it was asked to say.
#[derive(Debug, Default)]
pub struct RecordingSpeech {
    spoken: Mutex<Vec<(String, VoiceParams)>>,
    fail: Mutex<Option<ServiceError>>,
    clears: AtomicUsize,
}

impl RecordingSpeech {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail.
    pub fn set_failure(&self, error: ServiceError) {
        *self.fail.lock() = Some(error);
    }

    /// Texts spoken so far.
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().iter().map(|(text, _)| text.clone()).collect()
    }

    /// Times the queue was cleared.
    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    /// Voice used for the most recent utterance.
    pub fn last_voice(&self) -> Option<VoiceParams> {
        self.spoken.lock().last().map(|(_, voice)| voice.clone())
    }
}

#[async_trait]
impl SpeechOutput for RecordingSpeech {
    async fn speak(&self, text: &str, voice: &VoiceParams) -> Result<(), ServiceError> {
        if let Some(error) = self.fail.lock().clone() {
            return Err(error);
        }
        self.spoken.lock().push((text.to_string(), voice.clone()));
        Ok(())
    }

    async fn clear_queue(&self) -> Result<(), ServiceError> {
        if let Some(error) = self.fail.lock().clone() {
            return Err(error);
        }
        self.clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Channel actions that record each call.
#[derive(Debug, Default)]
pub struct RecordingChannel {
    actions: Mutex<Vec<String>>,
    reject: Mutex<Option<String>>,
}

impl RecordingChannel {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail as rejected with `reason`.
    pub fn reject_with(&self, reason: &str) {
        *self.reject.lock() = Some(reason.to_string());
    }

    /// Recorded calls, formatted as `action:args`.
    pub fn actions(&self) -> Vec<String> {
        self.actions.lock().clone()
    }

    fn record(&self, action: String) -> Result<(), ServiceError> {
        if let Some(reason) = self.reject.lock().clone() {
            return Err(ServiceError::Rejected(reason));
        }
        self.actions.lock().push(action);
        Ok(())
    }
}

#[async_trait]
impl ChannelActions for RecordingChannel {
    async fn set_title(&self, title: &str) -> Result<(), ServiceError> {
        self.record(format!("title:{title}"))
    }

    async fn set_category(&self, name: &str) -> Result<String, ServiceError> {
        self.record(format!("category:{name}"))?;
        Ok(name.to_string())
    }

    async fn timeout_user(&self, login: &str, seconds: u64, reason: &str) -> Result<(), ServiceError> {
        self.record(format!("timeout:{login}:{seconds}:{reason}"))
    }

    async fn clear_chat(&self) -> Result<(), ServiceError> {
        self.record("clear".to_string())
    }
}

/// An execution environment wired to in-memory collaborators.
pub struct TestHarness {
    /// Shared environment.
    pub env: Arc<ExecutionEnv>,
    /// Live configuration.
    pub config: Arc<ConfigCache>,
    /// Command catalog.
    pub registry: Arc<CommandRegistry>,
    /// Backing command store.
    pub store: Arc<MemoryCommandStore>,
    /// Flight simulator.
    pub flight: Arc<FakeFlight>,
    /// METAR source.
    pub metar: Arc<FakeMetar>,
    /// Language model.
    pub language: Arc<FakeLanguage>,
    /// Speech output.
    pub speech: Arc<RecordingSpeech>,
    /// Channel actions.
    pub channel: Arc<RecordingChannel>,
    /// Alerts.
    pub alerts: Arc<MemoryAlertStore>,
    /// Loyalty ledger.
    pub loyalty: Arc<LoyaltyLedger>,
    /// Counters.
    pub metrics: Arc<MetricsManager>,
}

impl TestHarness {
    /// Harness with the default configuration.
    pub async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    /// Harness with a specific configuration.
    pub async fn with_config(config: Config) -> Self {
        let store = Arc::new(MemoryCommandStore::new());
        let registry = Arc::new(
            CommandRegistry::load(store.clone())
                .await
                .expect("memory store always loads"),
        );
        let channel_name = if config.twitch.channel.is_empty() {
            "overlord_test".to_string()
        } else {
            config.twitch.channel.clone()
        };
        let voice = VoiceParams {
            voice: config.speech.voice.clone(),
            speed: config.speech.speed,
            volume: config.speech.volume,
        };
        let config = Arc::new(ConfigCache::new(config));

        let flight = Arc::new(FakeFlight::new());
        let metar = Arc::new(FakeMetar::new());
        let language = Arc::new(FakeLanguage::default());
        let speech = Arc::new(RecordingSpeech::new());
        let channel = Arc::new(RecordingChannel::new());
        let alerts = Arc::new(MemoryAlertStore::new());
        let loyalty = Arc::new(LoyaltyLedger::new());
        let metrics = Arc::new(MetricsManager::new());

        let services = Collaborators {
            flight: flight.clone(),
            metar: metar.clone(),
            language: language.clone(),
            speech: speech.clone(),
            channel: channel.clone(),
            alerts: alerts.clone(),
            loyalty: loyalty.clone(),
            metrics: metrics.clone(),
        };
        let env = Arc::new(ExecutionEnv {
            config: config.clone(),
            registry: registry.clone(),
            services,
            channel_state: RwLock::new(ChannelState::new(channel_name, base_time())),
            voice: RwLock::new(voice),
        });

        Self {
            env,
            config,
            registry,
            store,
            flight,
            metar,
            language,
            speech,
            channel,
            alerts,
            loyalty,
            metrics,
        }
    }

    /// Executor over the harness environment.
    pub fn executor(&self) -> Executor {
        Executor::new(self.env.clone())
    }

    /// Context for a chat line, when it names a known command.
    pub fn context(&self, message: &ChatMessage) -> Option<InvocationContext> {
        let prefix = self.config.get().chat.prefix.clone();
        let parsed = parse_command(&message.text, &prefix)?;
        let command = self.registry.lookup(&parsed.token)?;
        Some(InvocationContext::new(message, parsed, command.name))
    }

    /// Resolves and executes a chat line, returning the reply or the error text.
    pub async fn run(&self, message: &ChatMessage) -> Result<String, crate::error::ExecutionError> {
        let ctx = self
            .context(message)
            .expect("message should name a known command");
        let command = self
            .registry
            .get(&ctx.command)
            .expect("resolved command exists");
        self.executor().execute(&command, &ctx).await
    }
}
