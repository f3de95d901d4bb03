//! The command engine driven through the real HTTP adapters.

use overlord_commands::{
    ChannelState, Collaborators, CommandRegistry, Dispatcher, ExecutionEnv, Executor, LoyaltyLedger,
    MemoryAlertStore, MemoryCommandStore, MetricsManager, VoiceParams,
};
use overlord_common::test_utils::base_time;
use overlord_common::test_utils::chat_fixtures::{moderator_message, viewer_message};
use overlord_config::{Config, ConfigCache};
use overlord_services::RemoteServices;
use parking_lot::RwLock;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn dispatcher(server: &MockServer) -> Dispatcher {
    let mut config = Config::default();
    config.littlenavmap.base_url = server.uri();
    config.checkwx.base_url = server.uri();
    config.checkwx.api_key = "wx-key".to_string();
    config.twitch.helix_url = format!("{}/helix", server.uri());
    config.speech.base_url = server.uri();
    config.speech.enabled = false;

    let remote = RemoteServices::from_config(&config).unwrap();
    let registry = Arc::new(
        CommandRegistry::load(Arc::new(MemoryCommandStore::new()))
            .await
            .unwrap(),
    );
    let env = ExecutionEnv {
        config: Arc::new(ConfigCache::new(config)),
        registry,
        services: Collaborators {
            flight: remote.flight,
            metar: remote.metar,
            language: remote.language,
            speech: remote.speech,
            channel: remote.channel,
            alerts: Arc::new(MemoryAlertStore::new()),
            loyalty: Arc::new(LoyaltyLedger::new()),
            metrics: Arc::new(MetricsManager::new()),
        },
        channel_state: RwLock::new(ChannelState::new("overlord_test", base_time())),
        voice: RwLock::new(VoiceParams::default()),
    };
    Dispatcher::new(Executor::new(Arc::new(env)))
}

#[tokio::test]
async fn test_brief_from_simulator() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/sim/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "active": true,
            "indicated_altitude": 10000.0,
            "altitude_above_ground": 3000.0,
            "ground_speed": 120.0
        })))
        .mount(&server)
        .await;

    let dispatcher = dispatcher(&server).await;
    let chunks = dispatcher.handle(&viewer_message("a", "!brief")).await;
    assert_eq!(chunks, vec!["Cruise: 10,000 ft, 233 knots".to_string()]);
}

#[tokio::test]
async fn test_metar_from_checkwx() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/metar/EGLL"))
        .and(header("x-api-key", "wx-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": 1,
            "data": ["EGLL 121450Z 27015G25KT 9999 FEW040 18/09 Q1013"]
        })))
        .mount(&server)
        .await;

    let dispatcher = dispatcher(&server).await;
    let chunks = dispatcher.handle(&viewer_message("a", "!metar egll")).await;
    assert_eq!(
        chunks.concat(),
        "METAR for E G L L at 121450Z Zulu. : Wind 270 degrees at 15 knots, gusts to 25 knots. : \
         Visibility 9999 meters. : Altimeter 1013 hectopascals. : \
         Temperature 18 degrees Celsius, dewpoint 9 degrees Celsius."
    );
}

#[tokio::test]
async fn test_simulator_outage_gives_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/sim/info"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let dispatcher = dispatcher(&server).await;
    let chunks = dispatcher.handle(&viewer_message("a", "!status")).await;
    assert_eq!(chunks, vec!["That data is unavailable right now.".to_string()]);
}

#[tokio::test]
async fn test_settitle_through_helix() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/helix/channels"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = dispatcher(&server).await;
    let chunks = dispatcher
        .handle(&moderator_message("mod", "!settitle Alps crossing"))
        .await;
    assert_eq!(
        chunks,
        vec!["Stream title updated to: Alps crossing. Compliance acknowledged.".to_string()]
    );
}

#[tokio::test]
async fn test_unknown_airport() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/airport/info"))
        .and(query_param("ident", "XXXX"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dispatcher = dispatcher(&server).await;
    let chunks = dispatcher.handle(&viewer_message("a", "!airport xxxx")).await;
    assert_eq!(
        chunks,
        vec!["No data found for airport XXXX. Verify identifier.".to_string()]
    );
}
