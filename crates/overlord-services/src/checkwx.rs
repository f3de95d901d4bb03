//! CheckWX aviation weather client.

use crate::http::{HttpService, HttpSettings};
use async_trait::async_trait;
use moka::future::Cache;
use overlord_commands::{MetarProvider, MetarReport, ServiceError};
use overlord_common::Result;
use overlord_config::CheckWxConfig;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const REPORT_CAPACITY: u64 = 200;

#[derive(Debug, Deserialize)]
struct MetarResponse {
    #[serde(default)]
    results: u32,
    #[serde(default)]
    data: Vec<String>,
}

/// Raw METAR text from the CheckWX API.
///
/// Reports are reused for the configured time so a chat full of `!metar`
/// requests for the same field costs one call.
#[derive(Clone)]
pub struct CheckWxClient {
    http: HttpService,
    api_key: String,
    reports: Cache<String, Option<MetarReport>>,
}

impl CheckWxClient {
    /// Creates a client for the configured API.
    pub fn new(config: &CheckWxConfig) -> Result<Self> {
        let settings = HttpSettings::new(&config.base_url)
            .with_timeout(Duration::from_secs(config.timeout_secs.max(1)));
        if config.api_key.is_empty() {
            info!("CheckWX API key not set, METAR lookups are disabled");
        }

        Ok(Self {
            http: HttpService::new(&settings)?,
            api_key: config.api_key.clone(),
            reports: Cache::builder()
                .max_capacity(REPORT_CAPACITY)
                .time_to_live(Duration::from_secs(config.cache_ttl_secs.max(1)))
                .build(),
        })
    }

    async fn fetch_report(&self, icao: &str) -> std::result::Result<Option<MetarReport>, ServiceError> {
        let url = self.http.url(&format!("metar/{icao}"))?;
        let request = self
            .http
            .client()
            .get(url)
            .header("X-API-Key", &self.api_key)
            .header("Accept", "application/json");
        let Some(response) = self.http.optional_json::<MetarResponse>(request).await? else {
            return Ok(None);
        };
        let raw = match response.data.into_iter().next() {
            Some(raw) if response.results > 0 && !raw.trim().is_empty() => raw,
            _ => {
                debug!("No METAR published for {}", icao);
                return Ok(None);
            }
        };
        Ok(Some(MetarReport {
            icao: station_of(&raw).unwrap_or(icao).to_string(),
            raw_text: raw,
        }))
    }
}

/// The reporting station: the first four-letter upper-case group.
fn station_of(raw: &str) -> Option<&str> {
    raw.split_whitespace()
        .find(|token| token.len() == 4 && token.chars().all(|c| c.is_ascii_uppercase()))
}

fn unshare(err: Arc<ServiceError>) -> ServiceError {
    (*err).clone()
}

#[async_trait]
impl MetarProvider for CheckWxClient {
    #[instrument(skip(self))]
    async fn metar(&self, icao: &str) -> std::result::Result<Option<MetarReport>, ServiceError> {
        let icao = icao.trim().to_uppercase();
        if icao.is_empty() {
            return Ok(None);
        }
        if self.api_key.is_empty() {
            warn!("METAR requested for {} but no CheckWX API key is configured", icao);
            return Ok(None);
        }
        self.reports
            .try_get_with(icao.clone(), self.fetch_report(&icao))
            .await
            .map_err(unshare)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, api_key: &str) -> CheckWxClient {
        CheckWxClient::new(&CheckWxConfig {
            api_key: api_key.to_string(),
            base_url: server.uri(),
            timeout_secs: 2,
            cache_ttl_secs: 60,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_report_is_decoded_and_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/metar/EGLL"))
            .and(header("x-api-key", "wx-key"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": 1,
                "data": ["METAR EGLL 121450Z 27015KT 9999 18/09 Q1013"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server, "wx-key");
        let first = client.metar("egll").await.unwrap().unwrap();
        let second = client.metar("EGLL").await.unwrap();

        assert_eq!(first.icao, "EGLL");
        assert_eq!(first.raw_text, "METAR EGLL 121450Z 27015KT 9999 18/09 Q1013");
        assert_eq!(second, Some(first));
    }

    #[tokio::test]
    async fn test_unknown_station_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/metar/ZZZZ"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/metar/XXXX"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": 0, "data": [] })))
            .mount(&server)
            .await;

        let client = client(&server, "wx-key");
        assert_eq!(client.metar("ZZZZ").await.unwrap(), None);
        assert_eq!(client.metar("XXXX").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_key_makes_no_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        assert_eq!(client(&server, "").metar("EGLL").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_bad_key_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/metar/EGLL"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client(&server, "wrong").metar("EGLL").await.unwrap_err();
        assert!(matches!(err, ServiceError::Rejected(_)));
    }

    #[test]
    fn test_station_of() {
        assert_eq!(station_of("METAR KJFK 121451Z 10SM"), Some("KJFK"));
        assert_eq!(station_of("SPECI 121451Z"), None);
    }
}
