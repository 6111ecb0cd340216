/*
[INPUT]:  API key name, Ed25519 signer, optional request target
[OUTPUT]: EdDSA-signed JWTs with short expiry
[POS]:    Auth layer - per-request token minting for REST and stream control messages
[UPDATE]: When claims, algorithm or token lifetime change
*/

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Credentials;
use crate::http::Result;

use super::{Ed25519Signer, TokenProvider};

const TOKEN_ISSUER: &str = "cdp";
const TOKEN_LIFETIME_SECONDS: i64 = 120;

#[derive(Debug, Serialize, Deserialize)]
struct JwtHeader {
    alg: String,
    typ: String,
    kid: String,
    nonce: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct JwtClaims {
    iss: String,
    sub: String,
    nbf: i64,
    exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    uri: Option<String>,
}

/// Minted token with its expiry
#[derive(Debug, Clone)]
pub struct TokenData {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Mints EdDSA JWTs for an API key
#[derive(Debug, Clone)]
pub struct JwtTokenProvider {
    key_name: String,
    signer: Ed25519Signer,
}

impl JwtTokenProvider {
    pub fn new(key_name: impl Into<String>, signer: Ed25519Signer) -> Self {
        Self {
            key_name: key_name.into(),
            signer,
        }
    }

    /// Build a provider from configured credentials
    pub fn from_credentials(credentials: &Credentials) -> Result<Self> {
        let signer = Ed25519Signer::from_base64_secret(&credentials.api_secret)?;
        Ok(Self::new(credentials.api_key_name.clone(), signer))
    }

    /// Sign a token valid from `now` for the fixed lifetime
    pub fn mint(&self, target: Option<&str>, now: DateTime<Utc>) -> Result<TokenData> {
        let header = JwtHeader {
            alg: "EdDSA".to_string(),
            typ: "JWT".to_string(),
            kid: self.key_name.clone(),
            nonce: Uuid::new_v4().simple().to_string(),
        };
        let expires_at = now + Duration::seconds(TOKEN_LIFETIME_SECONDS);
        let claims = JwtClaims {
            iss: TOKEN_ISSUER.to_string(),
            sub: self.key_name.clone(),
            nbf: now.timestamp(),
            exp: expires_at.timestamp(),
            uri: target.map(str::to_string),
        };

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?)
        );
        let signature = self.signer.sign(signing_input.as_bytes());
        let token = format!(
            "{signing_input}.{}",
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        );

        Ok(TokenData { token, expires_at })
    }
}

#[async_trait]
impl TokenProvider for JwtTokenProvider {
    fn api_key(&self) -> &str {
        &self.key_name
    }

    /// Every call signs a new token with its own nonce
    async fn token(&self, target: Option<&str>) -> Result<String> {
        Ok(self.mint(target, Utc::now())?.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::Signature;

    const KEY_NAME: &str = "organizations/org-id/apiKeys/key-id";

    fn decode_part<T: serde::de::DeserializeOwned>(part: &str) -> T {
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(part).unwrap()).unwrap()
    }

    #[test]
    fn test_minted_token_is_signed_and_scoped() {
        let signer = Ed25519Signer::generate();
        let provider = JwtTokenProvider::new(KEY_NAME, signer.clone());
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        let data = provider
            .mint(Some("GET api.coinbase.com/api/v3/brokerage/accounts"), now)
            .unwrap();
        let parts: Vec<&str> = data.token.split('.').collect();
        assert_eq!(parts.len(), 3);

        let header: JwtHeader = decode_part(parts[0]);
        assert_eq!(header.alg, "EdDSA");
        assert_eq!(header.kid, KEY_NAME);
        assert_eq!(header.nonce.len(), 32);

        let claims: JwtClaims = decode_part(parts[1]);
        assert_eq!(claims.iss, "cdp");
        assert_eq!(claims.sub, KEY_NAME);
        assert_eq!(claims.nbf, 1_700_000_000);
        assert_eq!(claims.exp, 1_700_000_120);
        assert_eq!(
            claims.uri.as_deref(),
            Some("GET api.coinbase.com/api/v3/brokerage/accounts")
        );

        let signature_bytes: [u8; 64] = URL_SAFE_NO_PAD
            .decode(parts[2])
            .unwrap()
            .try_into()
            .unwrap();
        let signature = Signature::from_bytes(&signature_bytes);
        let signing_input = format!("{}.{}", parts[0], parts[1]);
        assert!(signer.verify(signing_input.as_bytes(), &signature));
    }

    #[test]
    fn test_stream_token_has_no_uri_claim() {
        let provider = JwtTokenProvider::new(KEY_NAME, Ed25519Signer::generate());
        let data = provider.mint(None, Utc::now()).unwrap();
        let payload = data.token.split('.').nth(1).unwrap();
        let claims: serde_json::Value = decode_part(payload);
        assert!(claims.get("uri").is_none());
    }

    #[tokio::test]
    async fn test_each_stream_token_is_freshly_minted() {
        let provider = JwtTokenProvider::new(KEY_NAME, Ed25519Signer::generate());

        let first = provider.token(None).await.unwrap();
        let second = provider.token(None).await.unwrap();
        assert_ne!(first, second);

        let first_header: JwtHeader = decode_part(first.split('.').next().unwrap());
        let second_header: JwtHeader = decode_part(second.split('.').next().unwrap());
        assert_ne!(first_header.nonce, second_header.nonce);
    }
}
