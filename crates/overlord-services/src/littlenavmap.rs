//! Little Navmap web API client.

use crate::http::{HttpService, HttpSettings};
use async_trait::async_trait;
use moka::future::Cache;
use overlord_commands::{AirportInfo, FlightDataProvider, FlightSnapshot, ServiceError};
use overlord_common::Result;
use overlord_config::LittleNavmapConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

const AIRPORT_TTL: Duration = Duration::from_secs(3600);
const AIRPORT_CAPACITY: u64 = 500;

/// Flight data read from a running Little Navmap instance.
///
/// Snapshots are shared for a short time so a burst of flight commands
/// costs one request. Concurrent misses wait on the same fetch.
#[derive(Clone)]
pub struct LittleNavmapClient {
    http: HttpService,
    snapshots: Cache<(), FlightSnapshot>,
    airports: Cache<String, Option<AirportInfo>>,
}

impl LittleNavmapClient {
    /// Creates a client for the configured web server.
    pub fn new(config: &LittleNavmapConfig) -> Result<Self> {
        let settings = HttpSettings::new(&config.base_url)
            .with_timeout(Duration::from_secs(config.timeout_secs.max(1)));
        info!("Little Navmap client for {}", config.base_url);

        Ok(Self {
            http: HttpService::new(&settings)?,
            snapshots: Cache::builder()
                .max_capacity(1)
                .time_to_live(Duration::from_secs(config.cache_ttl_secs.max(1)))
                .build(),
            airports: Cache::builder()
                .max_capacity(AIRPORT_CAPACITY)
                .time_to_live(AIRPORT_TTL)
                .build(),
        })
    }

    async fn fetch_snapshot(&self) -> std::result::Result<FlightSnapshot, ServiceError> {
        let url = self.http.url("api/sim/info")?;
        let snapshot: FlightSnapshot = self.http.json(self.http.client().get(url)).await?;
        debug!(active = snapshot.active, "Fetched simulator snapshot");
        Ok(snapshot)
    }

    async fn fetch_airport(&self, ident: &str) -> std::result::Result<Option<AirportInfo>, ServiceError> {
        let url = self.http.url("api/airport/info")?;
        let request = self.http.client().get(url).query(&[("ident", ident)]);
        let airport: Option<AirportInfo> = self.http.optional_json(request).await?;
        Ok(airport.filter(|a| !a.ident.is_empty() || !a.name.is_empty()))
    }
}

fn unshare(err: Arc<ServiceError>) -> ServiceError {
    (*err).clone()
}

#[async_trait]
impl FlightDataProvider for LittleNavmapClient {
    #[instrument(skip(self))]
    async fn fetch(&self) -> std::result::Result<FlightSnapshot, ServiceError> {
        self.snapshots
            .try_get_with((), self.fetch_snapshot())
            .await
            .map_err(unshare)
    }

    #[instrument(skip(self))]
    async fn airport(&self, ident: &str) -> std::result::Result<Option<AirportInfo>, ServiceError> {
        let ident = ident.trim().to_uppercase();
        if ident.is_empty() {
            return Ok(None);
        }
        self.airports
            .try_get_with(ident.clone(), self.fetch_airport(&ident))
            .await
            .map_err(unshare)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> LittleNavmapClient {
        LittleNavmapClient::new(&LittleNavmapConfig {
            base_url: server.uri(),
            cache_ttl_secs: 60,
            timeout_secs: 2,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_snapshot_is_decoded_and_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/sim/info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "active": true,
                "indicated_altitude": 12000.0,
                "altitude_above_ground": 3500.0,
                "ground_speed": 120.5,
                "heading": 271.0,
                "position": { "lat": 51.47, "lon": -0.45 },
                "on_ground": false
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        let first = client.fetch().await.unwrap();
        let second = client.fetch().await.unwrap();

        assert!(first.active);
        assert!((first.indicated_altitude - 12000.0).abs() < f64::EPSILON);
        assert_eq!(first.position.map(|p| p.lat), Some(51.47));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_airport_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/airport/info"))
            .and(query_param("ident", "EGLL"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ident": "EGLL",
                "name": "London Heathrow",
                "elevation": 83.0,
                "runways": [{ "designator": "09L/27R", "surface": "Asphalt", "length": 12799.0, "longestRunwayHeading": 89.0 }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/airport/info"))
            .and(query_param("ident", "ZZZZ"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client(&server);
        let airport = client.airport("egll").await.unwrap().unwrap();
        assert_eq!(airport.name, "London Heathrow");
        assert_eq!(airport.runways[0].designator, "09L/27R");
        assert_eq!(client.airport("ZZZZ").await.unwrap(), None);
        assert_eq!(client.airport("  ").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_server_error_is_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/sim/info"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/sim/info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "active": false })))
            .mount(&server)
            .await;

        let client = client(&server);
        assert!(client.fetch().await.unwrap_err().is_transient());
        assert!(!client.fetch().await.unwrap().active);
    }
}
