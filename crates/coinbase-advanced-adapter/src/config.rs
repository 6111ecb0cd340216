/*
[INPUT]:  YAML configuration file or programmatic defaults
[OUTPUT]: Credentials, WebSocket and REST settings
[POS]:    Configuration layer - shared by stream and REST clients
[UPDATE]: When adding new configuration options
*/

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::http::{ClientConfig, CoinbaseError, Result};

pub const DEFAULT_WS_URL: &str = "wss://advanced-trade-ws.coinbase.com";
/// Large enough for a full level2 snapshot of a busy product
pub const DEFAULT_RECEIVE_BUFFER_SIZE: usize = 5 * 1024 * 1024;

/// API key identity and secret handed to the token provider
#[derive(Clone, Default, Deserialize, Serialize)]
pub struct Credentials {
    /// Key name, e.g. `organizations/{org_id}/apiKeys/{key_id}`
    pub api_key_name: String,
    /// Base64 Ed25519 secret
    pub api_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key_name", &self.api_key_name)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Streaming connection settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WsConfig {
    pub url: String,
    pub receive_buffer_size: usize,
    #[serde(with = "duration_ms", rename = "reconnect_poll_interval_ms")]
    pub reconnect_poll_interval: Duration,
    #[serde(with = "duration_ms", rename = "reconnect_delay_ms")]
    pub reconnect_delay: Duration,
    #[serde(with = "duration_ms", rename = "connect_timeout_ms")]
    pub connect_timeout: Duration,
    #[serde(with = "duration_ms", rename = "close_timeout_ms")]
    pub close_timeout: Duration,
    /// Buffered events per consumer before it starts lagging
    pub event_capacity: usize,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_WS_URL.to_string(),
            receive_buffer_size: DEFAULT_RECEIVE_BUFFER_SIZE,
            reconnect_poll_interval: Duration::from_millis(250),
            reconnect_delay: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(10),
            close_timeout: Duration::from_secs(5),
            event_capacity: 1024,
        }
    }
}

impl WsConfig {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.url)?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(CoinbaseError::Config(format!(
                "websocket url must use ws or wss, got {}",
                url.scheme()
            )));
        }
        if self.receive_buffer_size == 0 {
            return Err(CoinbaseError::Config(
                "receive_buffer_size must be positive".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(CoinbaseError::Config(
                "event_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Top-level adapter configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AdapterConfig {
    pub credentials: Credentials,
    #[serde(default)]
    pub websocket: WsConfig,
    #[serde(default)]
    pub rest: ClientConfig,
}

impl AdapterConfig {
    /// Load configuration from YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoinbaseError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.credentials.api_key_name.trim().is_empty() {
            return Err(CoinbaseError::Config(
                "credentials.api_key_name is required".to_string(),
            ));
        }
        self.websocket.validate()?;
        url::Url::parse(&self.rest.base_url)?;
        Ok(())
    }
}

pub(crate) mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_defaults() {
        let config = WsConfig::default();
        assert_eq!(config.url, DEFAULT_WS_URL);
        assert_eq!(config.receive_buffer_size, 5 * 1024 * 1024);
        assert_eq!(config.reconnect_poll_interval, Duration::from_millis(250));
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_overrides_and_defaults() {
        let yaml = r#"
credentials:
  api_key_name: organizations/org/apiKeys/key
  api_secret: c2VjcmV0
websocket:
  url: ws://127.0.0.1:9000
  reconnect_delay_ms: 100
rest:
  timeout_ms: 2500
"#;
        let config = AdapterConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.websocket.url, "ws://127.0.0.1:9000");
        assert_eq!(config.websocket.reconnect_delay, Duration::from_millis(100));
        assert_eq!(
            config.websocket.reconnect_poll_interval,
            Duration::from_millis(250)
        );
        assert_eq!(config.rest.timeout, Duration::from_millis(2500));
        assert_eq!(config.rest.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_yaml_rejects_http_stream_url() {
        let yaml = r#"
credentials:
  api_key_name: key
  api_secret: c2VjcmV0
websocket:
  url: https://example.com
"#;
        let err = AdapterConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, CoinbaseError::Config(_)));
    }

    #[test]
    fn test_missing_key_name_is_rejected() {
        let err = AdapterConfig::from_yaml("credentials:\n  api_key_name: ''\n  api_secret: x\n")
            .unwrap_err();
        assert!(matches!(err, CoinbaseError::Config(msg) if msg.contains("api_key_name")));
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let credentials = Credentials {
            api_key_name: "key".to_string(),
            api_secret: "super-secret".to_string(),
        };
        let rendered = format!("{credentials:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
