/*
[INPUT]:  API key identity and an optional request target
[OUTPUT]: Time-boxed credential strings for control messages and REST calls
[POS]:    Auth layer - credential provider abstraction
[UPDATE]: When adding new key types or changing token format
*/

use async_trait::async_trait;

use crate::http::Result;

/// Produces the signed credential attached to every authenticated request
///
/// The trait is async to support external signers (KMS, hardware keys).
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Key identity sent alongside the token
    fn api_key(&self) -> &str;

    /// Mint a fresh token
    ///
    /// `target` is `"<METHOD> <host><path>"` for REST calls and `None` for
    /// the streaming connection.
    async fn token(&self, target: Option<&str>) -> Result<String>;
}

/// Token provider returning a fixed token, for tests and unauthenticated use
#[derive(Debug, Clone)]
pub struct MockTokenProvider {
    api_key: String,
    token: String,
}

impl MockTokenProvider {
    /// Create a new mock provider with a predetermined token
    pub fn new(api_key: &str, token: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            token: token.to_string(),
        }
    }
}

#[async_trait]
impl TokenProvider for MockTokenProvider {
    fn api_key(&self) -> &str {
        &self.api_key
    }

    async fn token(&self, _target: Option<&str>) -> Result<String> {
        Ok(self.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_provider() {
        let provider = MockTokenProvider::new("organizations/org/apiKeys/key", "mock.jwt.token");

        assert_eq!(provider.api_key(), "organizations/org/apiKeys/key");
        assert_eq!(provider.token(None).await.unwrap(), "mock.jwt.token");
        assert_eq!(
            provider
                .token(Some("GET api.coinbase.com/api/v3/brokerage/accounts"))
                .await
                .unwrap(),
            "mock.jwt.token"
        );
    }
}
