//! Shared wiring for the engine integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use overlord_commands::{
    AirportInfo, ChannelActions, ChannelState, ChatTurn, Collaborators, CommandRegistry,
    Dispatcher, ExecutionEnv, Executor, FlightDataProvider, FlightSnapshot, LanguageModel,
    LoyaltyLedger, MemoryAlertStore, MemoryCommandStore, MetarProvider, MetarReport,
    MetricsManager, ServiceError, SpeechOutput, VoiceParams,
};
use overlord_common::test_utils::base_time;
use overlord_config::{Config, ConfigCache};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Flight data source that answers after a fixed delay.
#[derive(Default)]
pub struct SlowFlight {
    pub delay: Mutex<Duration>,
    pub calls: AtomicUsize,
}

#[async_trait]
impl FlightDataProvider for SlowFlight {
    async fn fetch(&self) -> Result<FlightSnapshot, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        tokio::time::sleep(delay).await;
        Ok(FlightSnapshot {
            active: true,
            indicated_altitude: 10_000.0,
            altitude_above_ground: 3_000.0,
            ground_speed: 120.0,
            ..FlightSnapshot::default()
        })
    }

    async fn airport(&self, _ident: &str) -> Result<Option<AirportInfo>, ServiceError> {
        Ok(None)
    }
}

pub struct NoMetar;

#[async_trait]
impl MetarProvider for NoMetar {
    async fn metar(&self, _icao: &str) -> Result<Option<MetarReport>, ServiceError> {
        Ok(None)
    }
}

pub struct QuietLanguage;

#[async_trait]
impl LanguageModel for QuietLanguage {
    async fn generate(&self, _prompt: &str, _history: &[ChatTurn]) -> Result<String, ServiceError> {
        Err(ServiceError::Unavailable("offline".to_string()))
    }
}

pub struct NoSpeech;

#[async_trait]
impl SpeechOutput for NoSpeech {
    async fn speak(&self, _text: &str, _voice: &VoiceParams) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn clear_queue(&self) -> Result<(), ServiceError> {
        Ok(())
    }
}

#[derive(Default)]
pub struct CountingChannel {
    pub calls: AtomicUsize,
}

#[async_trait]
impl ChannelActions for CountingChannel {
    async fn set_title(&self, _title: &str) -> Result<(), ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn set_category(&self, name: &str) -> Result<String, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(name.to_string())
    }

    async fn timeout_user(&self, _login: &str, _seconds: u64, _reason: &str) -> Result<(), ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn clear_chat(&self) -> Result<(), ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A dispatcher plus handles on its collaborators.
pub struct Engine {
    pub dispatcher: Dispatcher,
    pub registry: Arc<CommandRegistry>,
    pub store: Arc<MemoryCommandStore>,
    pub flight: Arc<SlowFlight>,
    pub channel: Arc<CountingChannel>,
    pub metrics: Arc<MetricsManager>,
    pub loyalty: Arc<LoyaltyLedger>,
}

pub async fn engine() -> Engine {
    engine_with(Config::default(), Arc::new(MemoryCommandStore::new())).await
}

pub async fn engine_with(config: Config, store: Arc<MemoryCommandStore>) -> Engine {
    let registry = Arc::new(CommandRegistry::load(store.clone()).await.unwrap());
    let flight = Arc::new(SlowFlight::default());
    let channel = Arc::new(CountingChannel::default());
    let metrics = Arc::new(MetricsManager::new());
    let loyalty = Arc::new(LoyaltyLedger::new());

    let env = ExecutionEnv {
        config: Arc::new(ConfigCache::new(config)),
        registry: registry.clone(),
        services: Collaborators {
            flight: flight.clone(),
            metar: Arc::new(NoMetar),
            language: Arc::new(QuietLanguage),
            speech: Arc::new(NoSpeech),
            channel: channel.clone(),
            alerts: Arc::new(MemoryAlertStore::new()),
            loyalty: loyalty.clone(),
            metrics: metrics.clone(),
        },
        channel_state: RwLock::new(ChannelState::new("overlord_test", base_time())),
        voice: RwLock::new(VoiceParams::default()),
    };
    let dispatcher = Dispatcher::new(Executor::new(Arc::new(env)));

    Engine {
        dispatcher,
        registry,
        store,
        flight,
        channel,
        metrics,
        loyalty,
    }
}
