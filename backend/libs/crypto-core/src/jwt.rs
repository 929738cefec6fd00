/// JWT issue and validation for Bazari services
///
/// Access and refresh tokens are HS256-signed with two *different* secrets so a
/// leaked refresh secret cannot mint access tokens and vice versa. Each token
/// carries a `token_type` claim and validation rejects the wrong type.
///
/// ## Usage
///
/// ```rust,no_run
/// use crypto_core::jwt::{JwtConfig, JwtManager};
/// use uuid::Uuid;
///
/// let manager = JwtManager::new(JwtConfig {
///     access_secret: std::env::var("JWT_ACCESS_SECRET").unwrap(),
///     refresh_secret: std::env::var("JWT_REFRESH_SECRET").unwrap(),
///     access_ttl_secs: 900,
///     refresh_ttl_secs: 604_800,
/// })
/// .unwrap();
///
/// let pair = manager.issue_pair(Uuid::new_v4(), "amina@example.com", "user").unwrap();
/// let claims = manager.verify_access(&pair.access_token).unwrap();
/// ```
use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

pub const DEFAULT_ACCESS_TTL_SECS: i64 = 15 * 60;
pub const DEFAULT_REFRESH_TTL_SECS: i64 = 7 * 24 * 3600;

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("token expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(String),
    #[error("unexpected token type: expected {expected}")]
    WrongTokenType { expected: TokenType },
    #[error("token signing failed: {0}")]
    Signing(String),
    #[error("invalid JWT configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, JwtError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::Access => f.write_str("access"),
            TokenType::Refresh => f.write_str("refresh"),
        }
    }
}

/// JWT claims: registered claims plus the Bazari user fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    pub email: String,
    /// `user` or `admin`
    pub role: String,
    pub token_type: TokenType,
    pub iat: i64,
    pub exp: i64,
    /// Unique token id, so two pairs issued in the same second still differ
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.sub).map_err(|e| JwtError::Invalid(format!("malformed sub: {e}")))
    }
}

/// Token pair returned by register/login/refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

#[derive(Clone)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("access_secret", &"[REDACTED]")
            .field("refresh_secret", &"[REDACTED]")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish()
    }
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Issues and validates access/refresh tokens.
///
/// Cheap to share behind an `Arc`; keys are immutable after construction.
pub struct JwtManager {
    access: KeyPair,
    refresh: KeyPair,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl JwtManager {
    pub fn new(config: JwtConfig) -> Result<Self> {
        if config.access_secret.is_empty() || config.refresh_secret.is_empty() {
            return Err(JwtError::Config("JWT secrets must not be empty".into()));
        }
        if config.access_secret == config.refresh_secret {
            return Err(JwtError::Config(
                "access and refresh secrets must differ".into(),
            ));
        }
        if config.access_ttl_secs <= 0 || config.refresh_ttl_secs <= 0 {
            return Err(JwtError::Config("token lifetimes must be positive".into()));
        }

        Ok(Self {
            access: KeyPair::from_secret(&config.access_secret),
            refresh: KeyPair::from_secret(&config.refresh_secret),
            access_ttl_secs: config.access_ttl_secs,
            refresh_ttl_secs: config.refresh_ttl_secs,
        })
    }

    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl_secs
    }

    /// Generate both access and refresh tokens for a user
    pub fn issue_pair(&self, user_id: Uuid, email: &str, role: &str) -> Result<TokenPair> {
        let access_token = self.issue(TokenType::Access, user_id, email, role)?;
        let refresh_token = self.issue(TokenType::Refresh, user_id, email, role)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_ttl_secs,
        })
    }

    pub fn issue(
        &self,
        token_type: TokenType,
        user_id: Uuid,
        email: &str,
        role: &str,
    ) -> Result<String> {
        let now = Utc::now().timestamp();
        let ttl = match token_type {
            TokenType::Access => self.access_ttl_secs,
            TokenType::Refresh => self.refresh_ttl_secs,
        };

        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            role: role.to_string(),
            token_type,
            iat: now,
            exp: now + ttl,
            jti: Uuid::new_v4().to_string(),
        };

        self.encode_claims(&claims)
    }

    fn encode_claims(&self, claims: &Claims) -> Result<String> {
        let keys = self.keys(claims.token_type);
        encode(&Header::new(JWT_ALGORITHM), claims, &keys.encoding)
            .map_err(|e| JwtError::Signing(e.to_string()))
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims> {
        self.verify(TokenType::Access, token)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims> {
        self.verify(TokenType::Refresh, token)
    }

    fn verify(&self, expected: TokenType, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.validate_exp = true;
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.keys(expected).decoding, &validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::Invalid(e.to_string()),
            },
        )?;

        // Signature already binds the secret to the type; the claim check catches
        // deployments that misconfigure both secrets to the same value.
        if data.claims.token_type != expected {
            return Err(JwtError::WrongTokenType { expected });
        }

        Ok(data.claims)
    }

    fn keys(&self, token_type: TokenType) -> &KeyPair {
        match token_type {
            TokenType::Access => &self.access,
            TokenType::Refresh => &self.refresh,
        }
    }
}
