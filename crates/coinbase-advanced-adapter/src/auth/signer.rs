/*
[INPUT]:  Message bytes and Ed25519 secret key material
[OUTPUT]: Ed25519 signatures for credential tokens
[POS]:    Auth layer - cryptographic signing for token generation
[UPDATE]: When changing signing algorithm or key format
*/

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use ed25519_dalek::{SECRET_KEY_LENGTH, Signature, Signer, SigningKey, Verifier};
use rand::rngs::OsRng;

use crate::http::{CoinbaseError, Result};

/// Ed25519 signer backing the API key's JWTs
#[derive(Debug, Clone)]
pub struct Ed25519Signer {
    signing_key: SigningKey,
}

impl Ed25519Signer {
    /// Generate a new random keypair
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    /// Create signer from existing secret key bytes (32 bytes)
    pub fn from_secret_key(bytes: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(bytes);
        Self { signing_key }
    }

    /// Create signer from a base64 API secret
    ///
    /// Accepts a bare 32-byte seed or the 64-byte seed+public key form
    /// issued with Ed25519 API keys.
    pub fn from_base64_secret(secret: &str) -> Result<Self> {
        let bytes = BASE64
            .decode(secret.trim())
            .map_err(|e| CoinbaseError::Authentication {
                message: format!("API secret is not valid base64: {e}"),
            })?;

        let seed: [u8; SECRET_KEY_LENGTH] = match bytes.len() {
            32 | 64 => {
                let mut seed = [0u8; SECRET_KEY_LENGTH];
                seed.copy_from_slice(&bytes[..SECRET_KEY_LENGTH]);
                seed
            }
            other => {
                return Err(CoinbaseError::Authentication {
                    message: format!("API secret must decode to 32 or 64 bytes, got {other}"),
                });
            }
        };

        let signer = Self::from_secret_key(&seed);
        if bytes.len() == 64 && bytes[SECRET_KEY_LENGTH..] != signer.public_key_bytes() {
            return Err(CoinbaseError::Authentication {
                message: "API secret public half does not match its seed".to_string(),
            });
        }
        Ok(signer)
    }

    /// Sign a message and return the signature
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }

    /// Get the raw public key bytes
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Get the raw secret key bytes
    pub fn secret_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Verify a signature against a message
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        self.signing_key
            .verifying_key()
            .verify(message, signature)
            .is_ok()
    }
}
