/*
[INPUT]:  API key name and Ed25519 secret
[OUTPUT]: Signed JWT credentials and auth errors
[POS]:    Auth layer - token provider for stream and REST authentication
[UPDATE]: When auth flow or signature methods change
*/

pub mod jwt;
pub mod provider;
pub mod signer;

pub use jwt::{JwtTokenProvider, TokenData};
pub use provider::{MockTokenProvider, TokenProvider};
pub use signer::Ed25519Signer;
