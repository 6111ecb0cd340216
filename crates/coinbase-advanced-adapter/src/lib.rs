/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public Coinbase Advanced Trade adapter crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod auth;
pub mod config;
pub mod http;
pub mod types;
pub mod ws;

// Re-export commonly used types from auth
pub use auth::{Ed25519Signer, JwtTokenProvider, MockTokenProvider, TokenData, TokenProvider};

// Re-export configuration
pub use config::{AdapterConfig, Credentials, WsConfig, DEFAULT_WS_URL};

// Re-export commonly used types from http
pub use http::{ClientConfig, CoinbaseClient, CoinbaseError, Result};

// Re-export all types
pub use types::*;

// Re-export commonly used types from ws
pub use ws::{CoinbaseWebSocket, ControlKind, ControlMessage, StreamEvent, SubscriptionEntry};
