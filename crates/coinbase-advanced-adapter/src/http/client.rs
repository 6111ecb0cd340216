/*
[INPUT]:  HTTP configuration (base URL, timeouts) and a token provider
[OUTPUT]: Configured reqwest client ready for API calls
[POS]:    HTTP layer - core client implementation
[UPDATE]: When adding connection options or changing client behavior
*/

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::TokenProvider;
use crate::config::duration_ms;
use crate::http::{CoinbaseError, Result};

/// Base URL for the Advanced Trade REST API
pub const DEFAULT_REST_URL: &str = "https://api.coinbase.com";
const DEFAULT_RATE_LIMIT_RETRY_SECONDS: u64 = 1;

/// HTTP client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(with = "duration_ms", rename = "timeout_ms")]
    pub timeout: Duration,
    #[serde(with = "duration_ms", rename = "connect_timeout_ms")]
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_REST_URL.to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Main HTTP client for the Advanced Trade API
pub struct CoinbaseClient {
    http_client: Client,
    base_url: Url,
    token_provider: Option<Arc<dyn TokenProvider>>,
}

impl std::fmt::Debug for CoinbaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoinbaseClient")
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.token_provider.is_some())
            .finish()
    }
}

impl CoinbaseClient {
    /// Create a new client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: Url::parse(&config.base_url)?,
            token_provider: None,
        })
    }

    /// Attach the provider used to sign authenticated requests
    pub fn with_token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.token_provider = Some(provider);
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.token_provider.is_some()
    }

    /// Build request builder for public endpoints
    pub(crate) fn public_request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder> {
        let url = self.base_url.join(endpoint)?;
        Ok(self.http_client.request(method, url))
    }

    /// Build a request carrying a bearer JWT scoped to this method and path
    pub(crate) async fn authed_request(
        &self,
        method: Method,
        endpoint: &str,
    ) -> Result<RequestBuilder> {
        let provider = self
            .token_provider
            .as_ref()
            .ok_or_else(|| CoinbaseError::Authentication {
                message: "no token provider configured".to_string(),
            })?;

        let url = self.base_url.join(endpoint)?;
        let target = token_target(&method, &url);
        let token = provider.token(Some(&target)).await?;
        Ok(self.http_client.request(method, url).bearer_auth(token))
    }

    /// Send a request and decode a JSON body, mapping non-2xx to errors
    pub(crate) async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse().ok())
                .unwrap_or(DEFAULT_RATE_LIMIT_RETRY_SECONDS);
            return Err(CoinbaseError::RateLimit { retry_after });
        }

        let body = response.text().await?;
        if !status.is_success() {
            debug!(status = %status, bytes = body.len(), "rest request failed");
            return Err(CoinbaseError::api_error(status, error_message(&body)));
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// `"<METHOD> <host><path>"` as expected in the JWT `uri` claim
fn token_target(method: &Method, url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{method} {host}:{port}{}", url.path()),
        None => format!("{method} {host}{}", url.path()),
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    error: String,
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) if !parsed.message.is_empty() => parsed.message,
        Ok(parsed) if !parsed.error.is_empty() => parsed.error,
        _ => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_target_format() {
        let url = Url::parse("https://api.coinbase.com/api/v3/brokerage/accounts?limit=5").unwrap();
        assert_eq!(
            token_target(&Method::GET, &url),
            "GET api.coinbase.com/api/v3/brokerage/accounts"
        );

        let url = Url::parse("http://127.0.0.1:8080/api/v3/brokerage/orders/batch_cancel").unwrap();
        assert_eq!(
            token_target(&Method::POST, &url),
            "POST 127.0.0.1:8080/api/v3/brokerage/orders/batch_cancel"
        );
    }

    #[test]
    fn test_error_message_prefers_structured_fields() {
        assert_eq!(
            error_message(r#"{"error":"NOT_FOUND","message":"order not found"}"#),
            "order not found"
        );
        assert_eq!(error_message(r#"{"error":"unauthorized"}"#), "unauthorized");
        assert_eq!(error_message("plain text"), "plain text");
    }
}
