//! Main entry point for Overlord Bot.

use anyhow::Context;
use chrono::Utc;
use overlord_bot::{irc, ConsoleSink, ConsoleSource, Runtime};
use overlord_commands::{
    ChannelState, Collaborators, CommandRegistry, Dispatcher, ExecutionEnv, Executor,
    JsonAlertStore, JsonCommandStore, LanguageEngagement, LoyaltyLedger, MetricsManager,
    MetricsSink, VoiceParams,
};
use overlord_common::init_logging;
use overlord_config::{ConfigCache, ConfigLoader, ConfigWatcher};
use overlord_services::RemoteServices;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (config, config_path) = ConfigLoader::load().context("failed to load configuration")?;
    let _log_guard = init_logging(&config.logging).context("failed to initialize logging")?;

    info!("Starting Overlord Bot v{}", env!("CARGO_PKG_VERSION"));

    let cache = Arc::new(ConfigCache::new(config.clone()));
    let _watcher = match &config_path {
        Some(path) => match ConfigWatcher::start(path, cache.clone()) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                warn!("Hot reload disabled: {}", e);
                None
            }
        },
        None => None,
    };

    let commands = Arc::new(JsonCommandStore::new(&config.storage.commands_path));
    let registry = Arc::new(
        CommandRegistry::load(commands)
            .await
            .context("failed to load custom commands")?,
    );
    let alerts = Arc::new(
        JsonAlertStore::open(&config.storage.alerts_path).context("failed to open alert store")?,
    );
    let loyalty = Arc::new(
        LoyaltyLedger::load(&config.storage.loyalty_path)
            .context("failed to load loyalty ledger")?,
    );
    let metrics = Arc::new(MetricsManager::new());
    let remote = RemoteServices::from_config(&config).context("failed to build service clients")?;

    let env = Arc::new(ExecutionEnv {
        config: cache.clone(),
        registry,
        services: Collaborators {
            flight: remote.flight,
            metar: remote.metar,
            language: remote.language.clone(),
            speech: remote.speech,
            channel: remote.channel,
            alerts,
            loyalty: loyalty.clone(),
            metrics: metrics.clone(),
        },
        channel_state: RwLock::new(ChannelState::new(&config.twitch.channel, Utc::now())),
        voice: RwLock::new(VoiceParams {
            voice: config.speech.voice.clone(),
            speed: config.speech.speed,
            volume: config.speech.volume,
        }),
    });

    let mut dispatcher = Dispatcher::new(Executor::new(env));
    if config.openai.api_key.is_empty() {
        info!("No language model key configured; chat engagement disabled");
    } else {
        dispatcher = dispatcher.with_engagement(Arc::new(LanguageEngagement::new(
            remote.language,
            cache.clone(),
        )));
    }

    let runtime = Runtime::new(Arc::new(dispatcher), cache.clone());
    let shutdown = runtime.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.cancel();
        }
    });

    let outcome = if config.has_twitch_credentials() {
        let (source, sink) = irc::connect(&config.twitch).await?;
        runtime.run(source, sink).await
    } else {
        info!("No Twitch credentials; reading chat from the console as 'name[@tier]: text'");
        let source = ConsoleSource::new(BufReader::new(tokio::io::stdin()));
        let sink = ConsoleSink::new(tokio::io::stdout(), config.twitch.bot_name.clone());
        runtime.run(source, sink).await
    };

    if let Err(e) = loyalty.save(&config.storage.loyalty_path) {
        error!("Failed to save loyalty ledger: {}", e);
    }
    let totals = metrics.snapshot();
    info!(
        invocations = totals.total_invocations,
        top = totals.most_used().unwrap_or("none"),
        "Overlord Bot stopped"
    );

    outcome.map(|_| ()).map_err(Into::into)
}
