/*
[INPUT]:  HTTP configuration (base URL, timeouts), API key, rate limiter
[OUTPUT]: Parameterized GET transport decoding the standard response envelope
[POS]:    HTTP layer - core client implementation
[UPDATE]: When changing headers, status mapping or envelope handling
*/

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::http::limiter::RateLimiter;
use crate::http::{BirdeyeError, Result};
use crate::types::{ApiResponse, Chain};

/// Base URL for the Birdeye public API
pub const BASE_URL: &str = "https://public-api.birdeye.so";

/// Environment variable read by [`api_key_from_env`]
pub const API_KEY_ENV: &str = "BIRDEYE_API_KEY";

const API_KEY_HEADER: &str = "x-api-key";
const CHAIN_HEADER: &str = "x-chain";

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Read the API key from `BIRDEYE_API_KEY`.
pub fn api_key_from_env() -> Result<String> {
    match std::env::var(API_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(BirdeyeError::Config(format!("{API_KEY_ENV} is not set"))),
    }
}

/// REST transport for the Birdeye API
pub struct BirdeyeClient {
    http_client: Client,
    base_url: Url,
    api_key: String,
    limiter: Arc<dyn RateLimiter>,
    timeout: Duration,
}

impl std::fmt::Debug for BirdeyeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BirdeyeClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl BirdeyeClient {
    /// Create a new client with default configuration
    pub fn new(api_key: impl Into<String>, limiter: Arc<dyn RateLimiter>) -> Result<Self> {
        Self::with_config(api_key, limiter, ClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(
        api_key: impl Into<String>,
        limiter: Arc<dyn RateLimiter>,
        config: ClientConfig,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(BirdeyeError::Config("api key is required".to_string()));
        }

        let http_client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: Url::parse(&config.base_url)?,
            api_key,
            limiter,
            timeout: config.timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Issue a GET request and unwrap the `data` field of the envelope.
    ///
    /// Waits on the rate limiter first. `chains` is sent comma-joined in the
    /// `x-chain` header and omitted when empty.
    pub async fn get<D: DeserializeOwned>(
        &self,
        path: &str,
        chains: &[Chain],
        params: &[(&str, String)],
    ) -> Result<D> {
        self.limiter.acquire().await;

        let mut url = self.base_url.join(path)?;
        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(key, value)| (*key, value.as_str())));
        }

        let mut builder = self
            .http_client
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");
        if !chains.is_empty() {
            let joined = chains
                .iter()
                .map(|chain| chain.as_str())
                .collect::<Vec<_>>()
                .join(",");
            builder = builder.header(CHAIN_HEADER, joined);
        }

        self.send_json(builder).await
    }

    async fn send_json<D: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<D> {
        let response = builder
            .send()
            .await
            .map_err(|err| self.transport_error(err))?;
        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());
        let body = response
            .bytes()
            .await
            .map_err(|err| self.transport_error(err))?;
        debug!(status = status.as_u16(), bytes = body.len(), "rest response received");

        if !status.is_success() {
            let message = serde_json::from_slice::<ApiResponse<serde_json::Value>>(&body)
                .ok()
                .and_then(|envelope| envelope.message)
                .unwrap_or_else(|| default_status_message(status).to_string());
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    BirdeyeError::Authentication { message }
                }
                StatusCode::TOO_MANY_REQUESTS => BirdeyeError::RateLimit {
                    retry_after: retry_after.unwrap_or(1),
                },
                _ => BirdeyeError::api_error(status, message),
            });
        }

        let envelope: ApiResponse<D> = serde_json::from_slice(&body)?;
        if !envelope.success {
            return Err(BirdeyeError::api_error(
                status,
                envelope
                    .message
                    .unwrap_or_else(|| "request was not successful".to_string()),
            ));
        }
        envelope
            .data
            .ok_or_else(|| BirdeyeError::api_error(status, "response envelope has no data"))
    }

    fn transport_error(&self, err: reqwest::Error) -> BirdeyeError {
        if err.is_timeout() {
            BirdeyeError::Timeout {
                duration: self.timeout.as_secs(),
            }
        } else {
            BirdeyeError::Http(err)
        }
    }
}

fn default_status_message(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "invalid request parameters or payload",
        StatusCode::UNAUTHORIZED => "authentication required",
        StatusCode::FORBIDDEN => "you don't have permission to access this resource",
        StatusCode::UNPROCESSABLE_ENTITY => "please check the provided data and try again",
        StatusCode::TOO_MANY_REQUESTS => "too many requests",
        StatusCode::INTERNAL_SERVER_ERROR => "something went wrong on the server",
        _ => "unexpected response status",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::limiter::Unlimited;
    use serde::Deserialize;
    use wiremock::matchers::{header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> BirdeyeClient {
        BirdeyeClient::with_config(
            "test-key",
            Arc::new(Unlimited),
            ClientConfig {
                base_url: server.uri(),
                ..ClientConfig::default()
            },
        )
        .expect("client init")
    }

    #[tokio::test]
    async fn test_get_unwraps_envelope_and_sends_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/defi/price"))
            .and(query_param("address", "So11111111111111111111111111111111111111112"))
            .and(query_param("check_liquidity", "1000"))
            .and(header("x-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "data": { "value": 142.5, "updateUnixTime": 1_700_000_000 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let data: serde_json::Value = client
            .get(
                "/defi/price",
                &[Chain::Solana, Chain::Bsc],
                &[
                    ("address", "So11111111111111111111111111111111111111112".to_string()),
                    ("check_liquidity", "1000".to_string()),
                ],
            )
            .await
            .expect("get failed");

        assert_eq!(data["value"], 142.5);
        assert_eq!(data["updateUnixTime"], 1_700_000_000);

        let requests = server.received_requests().await.expect("recording enabled");
        let chain = requests[0]
            .headers
            .get("x-chain")
            .and_then(|value| value.to_str().ok());
        assert_eq!(chain, Some("solana,bsc"));
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct PriceQuote {
        value: f64,
        update_unix_time: i64,
    }

    #[tokio::test]
    async fn test_get_decodes_typed_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/defi/price"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "data": { "value": 0.25, "updateUnixTime": 1_700_000_100 }
            })))
            .mount(&server)
            .await;

        let quote: PriceQuote = client_for(&server)
            .get("/defi/price", &[Chain::Solana], &[])
            .await
            .expect("get failed");
        assert_eq!(quote.value, 0.25);
        assert_eq!(quote.update_unix_time, 1_700_000_100);
    }

    #[tokio::test]
    async fn test_slow_response_maps_to_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "success": true, "data": 1 }))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let client = BirdeyeClient::with_config(
            "test-key",
            Arc::new(Unlimited),
            ClientConfig {
                base_url: server.uri(),
                timeout: Duration::from_secs(1),
                ..ClientConfig::default()
            },
        )
        .expect("client init");

        let err = client
            .get::<serde_json::Value>("/defi/price", &[], &[])
            .await
            .expect_err("slow response must time out");
        assert!(matches!(err, BirdeyeError::Timeout { duration: 1 }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_get_without_chains_omits_chain_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/defi/networks"))
            .and(header_exists("x-api-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "data": ["solana", "ethereum"]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let networks: Vec<String> = client
            .get("/defi/networks", &[], &[])
            .await
            .expect("get failed");
        assert_eq!(networks, vec!["solana".to_string(), "ethereum".to_string()]);

        let requests = server.received_requests().await.expect("recording enabled");
        assert!(requests[0].headers.get("x-chain").is_none());
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "success": false,
                "message": "Unauthorized"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get::<serde_json::Value>("/defi/price", &[Chain::Solana], &[])
            .await
            .expect_err("401 must fail");
        assert!(err.is_auth_error());
        assert_eq!(err.to_string(), "Authentication failed: Unauthorized");
    }

    #[tokio::test]
    async fn test_too_many_requests_reads_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get::<serde_json::Value>("/defi/price", &[], &[])
            .await
            .expect_err("429 must fail");
        assert!(matches!(err, BirdeyeError::RateLimit { retry_after: 7 }));
        assert_eq!(err.retry_delay(), Some(7));
    }

    #[tokio::test]
    async fn test_unsuccessful_envelope_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false,
                "message": "address not found"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get::<serde_json::Value>("/defi/token_overview", &[Chain::Solana], &[])
            .await
            .expect_err("success=false must fail");
        match err {
            BirdeyeError::Api { code, message } => {
                assert_eq!(code, 200);
                assert_eq!(message, "address not found");
            }
            other => panic!("Expected Api error variant, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_api_key_rejected() {
        let err = BirdeyeClient::new("  ", Arc::new(Unlimited)).expect_err("empty key");
        assert!(matches!(err, BirdeyeError::Config(_)));
    }
}
