//! Token and secret primitives shared by Bazari services.
//!
//! - `jwt`: HS256 access/refresh token issue and validation
//! - `secrets`: strength classification for HMAC secrets

pub mod jwt;
pub mod secrets;

pub use jwt::{Claims, JwtConfig, JwtError, JwtManager, TokenPair, TokenType};
pub use secrets::{secret_strength, SecretStrength};
