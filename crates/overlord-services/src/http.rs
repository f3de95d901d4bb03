//! Shared HTTP plumbing: one pooled client per service, a request rate
//! limiter, and mapping of transport and status failures onto [`ServiceError`].
//!
//! Adapters never retry on their own. The execution shell retries a
//! transient failure once, inside the handler timeout.

use governor::{DefaultDirectRateLimiter, Quota};
use overlord_commands::ServiceError;
use overlord_common::{truncate_chars, OverlordError, Result};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};
use url::Url;

const MAX_ERROR_BODY: usize = 200;

/// Settings for one upstream service.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Service root; relative paths are joined onto it.
    pub base_url: String,
    /// Whole-request timeout.
    pub timeout: Duration,
    /// Requests allowed per second.
    pub requests_per_second: u32,
}

impl HttpSettings {
    /// Settings with a 10 second timeout and 10 requests per second.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(10),
            requests_per_second: 10,
        }
    }

    /// Set the request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the rate limit
    #[must_use]
    pub fn with_rate_limit(mut self, requests_per_second: u32) -> Self {
        self.requests_per_second = requests_per_second;
        self
    }
}

/// Rate-limited client bound to one service root.
#[derive(Debug, Clone)]
pub struct HttpService {
    client: Client,
    base_url: Url,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
}

impl HttpService {
    /// Builds the client.
    pub fn new(settings: &HttpSettings) -> Result<Self> {
        let mut root = settings.base_url.trim().to_string();
        if !root.ends_with('/') {
            root.push('/');
        }
        let base_url = Url::parse(&root)
            .map_err(|e| OverlordError::config_with_source(format!("Invalid service URL '{root}'"), e))?;

        let client = Client::builder()
            .timeout(settings.timeout)
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| OverlordError::network_with_source("Failed to create HTTP client", e))?;

        let quota = Quota::per_second(
            NonZeroU32::new(settings.requests_per_second)
                .ok_or_else(|| OverlordError::config("Rate limit must be greater than 0"))?,
        );

        Ok(Self {
            client,
            base_url,
            rate_limiter: Arc::new(DefaultDirectRateLimiter::direct(quota)),
        })
    }

    /// The underlying client, for building requests.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Absolute URL for a path relative to the service root.
    pub fn url(&self, path: &str) -> std::result::Result<Url, ServiceError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ServiceError::Rejected(format!("bad request path '{path}': {e}")))
    }

    /// Sends a request once the rate limiter allows it.
    pub async fn send(&self, request: RequestBuilder) -> std::result::Result<Response, ServiceError> {
        self.rate_limiter.until_ready().await;
        let response = request.send().await.map_err(classify)?;
        check_status(response).await
    }

    /// Sends a request and decodes a JSON body.
    pub async fn json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> std::result::Result<T, ServiceError> {
        let response = self.send(request).await?;
        response.json::<T>().await.map_err(classify)
    }

    /// Like [`json`](Self::json), but a 404 answer is `None`.
    pub async fn optional_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> std::result::Result<Option<T>, ServiceError> {
        self.rate_limiter.until_ready().await;
        let response = request.send().await.map_err(classify)?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("Resource not found");
            return Ok(None);
        }
        let response = check_status(response).await?;
        response.json::<T>().await.map(Some).map_err(classify)
    }
}

/// Maps a transport failure.
pub fn classify(err: reqwest::Error) -> ServiceError {
    if err.is_timeout() {
        warn!("Request timed out: {}", err);
        ServiceError::Timeout
    } else if err.is_connect() {
        warn!("Connection failed: {}", err);
        ServiceError::Unavailable(format!("connection failed: {err}"))
    } else if err.is_decode() {
        error!("Malformed response body: {}", err);
        ServiceError::Unavailable(format!("malformed response: {err}"))
    } else {
        error!("Request failed: {}", err);
        ServiceError::Unavailable(err.to_string())
    }
}

/// Client errors are rejections and are not retried; server errors and
/// throttling are transient.
async fn check_status(response: Response) -> std::result::Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        debug!("Request successful: {}", status);
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = format!("{status}: {}", truncate_chars(body.trim(), MAX_ERROR_BODY));
    if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
        error!("Client error: {}", detail);
        Err(ServiceError::Rejected(detail))
    } else {
        warn!("Server error: {}", detail);
        Err(ServiceError::Unavailable(detail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn service(server: &MockServer) -> HttpService {
        HttpService::new(&HttpSettings::new(server.uri()).with_timeout(Duration::from_millis(500)))
            .unwrap()
    }

    #[test]
    fn test_url_join_keeps_base_path() {
        let service = HttpService::new(&HttpSettings::new("https://api.twitch.tv/helix")).unwrap();
        assert_eq!(
            service.url("/channels").unwrap().as_str(),
            "https://api.twitch.tv/helix/channels"
        );
    }

    #[test]
    fn test_invalid_settings() {
        assert!(HttpService::new(&HttpSettings::new("not a url")).is_err());
        assert!(HttpService::new(&HttpSettings::new("http://localhost").with_rate_limit(0)).is_err());
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bad"))
            .respond_with(ResponseTemplate::new(400).set_body_string("missing field"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/down"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/busy"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let service = service(&server).await;
        let get = |p: &str| service.client().get(service.url(p).unwrap());

        let bad = service.send(get("bad")).await.unwrap_err();
        assert_eq!(bad, ServiceError::Rejected("400 Bad Request: missing field".to_string()));
        assert!(!bad.is_transient());
        assert!(service.send(get("down")).await.unwrap_err().is_transient());
        assert!(service.send(get("busy")).await.unwrap_err().is_transient());
    }

    #[tokio::test]
    async fn test_slow_response_is_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let service = service(&server).await;
        let request = service.client().get(service.url("slow").unwrap());
        assert_eq!(service.send(request).await.unwrap_err(), ServiceError::Timeout);
    }

    #[tokio::test]
    async fn test_unreachable_is_unavailable() {
        let service = HttpService::new(&HttpSettings::new("http://127.0.0.1:9")).unwrap();
        let request = service.client().get(service.url("x").unwrap());
        assert!(matches!(
            service.send(request).await.unwrap_err(),
            ServiceError::Unavailable(_)
        ));
    }
}
