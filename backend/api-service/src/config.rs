/// Configuration management for the Bazari API service
///
/// Everything is read from environment variables (a `.env` file is loaded by
/// `main` through dotenvy). Development gets usable defaults; production
/// refuses to start with weak secrets or an open CORS policy.
use crypto_core::jwt::{JwtConfig, DEFAULT_ACCESS_TTL_SECS, DEFAULT_REFRESH_TTL_SECS};
use crypto_core::{secret_strength, SecretStrength};
use db_pool::env_utils::parse_env_with_default;
use std::fmt;

const DEV_ACCESS_SECRET: &str = "dev-only-access-secret-change-me-0123456789abcdef";
const DEV_REFRESH_SECRET: &str = "dev-only-refresh-secret-change-me-fedcba9876543210";
const DEV_COMPANION_KEY: &str = "dev-companion-key";

pub const DEFAULT_UPLOAD_MAX_BYTES: usize = 5 * 1024 * 1024;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub cors: CorsConfig,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub upload: UploadConfig,
    pub oauth: OAuthConfig,
    pub payments: PaymentConfig,
}

/// Application settings
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    pub host: String,
    pub port: u16,
    /// Emit JSON log lines instead of the human-readable format
    pub json_logs: bool,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }
}

/// CORS configuration
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins
    pub allowed_origins: String,
}

/// Azure Blob Storage account used for listing images
#[derive(Clone)]
pub struct StorageConfig {
    pub account: String,
    /// Base64 account key, used to sign SAS tokens
    pub account_key: String,
    pub container: String,
    /// Blob service endpoint, e.g. `https://{account}.blob.core.windows.net`
    pub endpoint: String,
    /// Lifetime of read SAS URLs handed to clients
    pub sas_ttl_secs: i64,
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("account", &self.account)
            .field("account_key", &"[REDACTED]")
            .field("container", &self.container)
            .field("endpoint", &self.endpoint)
            .field("sas_ttl_secs", &self.sas_ttl_secs)
            .finish()
    }
}

/// Image upload limits
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub max_bytes: usize,
    /// Retries after the first failed blob PUT
    pub max_retries: u32,
    /// Files accepted in one multipart request
    pub max_files: usize,
}

/// OAuth provider profile endpoints
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub google_userinfo_url: String,
    pub microsoft_userinfo_url: String,
    pub facebook_userinfo_url: String,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            google_userinfo_url: "https://www.googleapis.com/oauth2/v3/userinfo".to_string(),
            microsoft_userinfo_url: "https://graph.microsoft.com/v1.0/me".to_string(),
            facebook_userinfo_url: "https://graph.facebook.com/me?fields=id,name,email,picture"
                .to_string(),
        }
    }
}

/// Mobile-money visibility tiers and companion-app settings
#[derive(Clone)]
pub struct PaymentConfig {
    /// Shared key the SMS companion app sends in `X-Companion-Key`
    pub companion_key: String,
    /// Mobile-money number payers transfer to
    pub merchant_number: String,
    pub currency: String,
    /// Pending payments older than this are expired
    pub pending_ttl_secs: i64,
    pub standard_price: i64,
    pub standard_days: i64,
    pub premium_price: i64,
    pub premium_days: i64,
}

impl fmt::Debug for PaymentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentConfig")
            .field("companion_key", &"[REDACTED]")
            .field("merchant_number", &self.merchant_number)
            .field("currency", &self.currency)
            .field("pending_ttl_secs", &self.pending_ttl_secs)
            .field("standard_price", &self.standard_price)
            .field("standard_days", &self.standard_days)
            .field("premium_price", &self.premium_price)
            .field("premium_days", &self.premium_days)
            .finish()
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            companion_key: DEV_COMPANION_KEY.to_string(),
            merchant_number: "+237600000000".to_string(),
            currency: "XAF".to_string(),
            pending_ttl_secs: 30 * 60,
            standard_price: 1_000,
            standard_days: 7,
            premium_price: 2_500,
            premium_days: 30,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let production = app_env.eq_ignore_ascii_case("production");

        let app = AppConfig {
            env: app_env.clone(),
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_env_with_default("API_PORT", 8080),
            json_logs: json_logs_from_env(),
        };

        let cors = {
            let allowed_origins = match std::env::var("CORS_ALLOWED_ORIGINS") {
                Ok(value) => value,
                Err(_) if production => {
                    return Err("CORS_ALLOWED_ORIGINS must be set in production".to_string())
                }
                Err(_) => "http://localhost:5173,http://localhost:3000".to_string(),
            };

            if production && allowed_origins.split(',').any(|o| o.trim() == "*") {
                return Err("CORS_ALLOWED_ORIGINS cannot be '*' in production".to_string());
            }

            CorsConfig { allowed_origins }
        };

        let jwt = JwtConfig {
            access_secret: load_secret("JWT_ACCESS_SECRET", DEV_ACCESS_SECRET, production)?,
            refresh_secret: load_secret("JWT_REFRESH_SECRET", DEV_REFRESH_SECRET, production)?,
            access_ttl_secs: parse_env_with_default("JWT_ACCESS_TTL_SECS", DEFAULT_ACCESS_TTL_SECS),
            refresh_ttl_secs: parse_env_with_default(
                "JWT_REFRESH_TTL_SECS",
                DEFAULT_REFRESH_TTL_SECS,
            ),
        };
        if jwt.access_secret == jwt.refresh_secret {
            return Err("JWT_ACCESS_SECRET and JWT_REFRESH_SECRET must differ".to_string());
        }

        let storage = {
            let account = std::env::var("AZURE_STORAGE_ACCOUNT")
                .map_err(|_| "AZURE_STORAGE_ACCOUNT must be set".to_string())?;
            let account_key = std::env::var("AZURE_STORAGE_KEY")
                .map_err(|_| "AZURE_STORAGE_KEY must be set".to_string())?;
            let endpoint = std::env::var("AZURE_STORAGE_ENDPOINT")
                .unwrap_or_else(|_| format!("https://{account}.blob.core.windows.net"));

            StorageConfig {
                account,
                account_key,
                container: std::env::var("AZURE_STORAGE_CONTAINER")
                    .unwrap_or_else(|_| "listings".to_string()),
                endpoint: endpoint.trim_end_matches('/').to_string(),
                sas_ttl_secs: parse_env_with_default("AZURE_SAS_TTL_SECS", 3600),
            }
        };

        let upload = UploadConfig {
            max_bytes: parse_env_with_default("UPLOAD_MAX_BYTES", DEFAULT_UPLOAD_MAX_BYTES),
            max_retries: parse_env_with_default("UPLOAD_MAX_RETRIES", 3),
            max_files: 10,
        };

        let oauth = {
            let defaults = OAuthConfig::default();
            OAuthConfig {
                google_userinfo_url: std::env::var("OAUTH_GOOGLE_USERINFO_URL")
                    .unwrap_or(defaults.google_userinfo_url),
                microsoft_userinfo_url: std::env::var("OAUTH_MICROSOFT_USERINFO_URL")
                    .unwrap_or(defaults.microsoft_userinfo_url),
                facebook_userinfo_url: std::env::var("OAUTH_FACEBOOK_USERINFO_URL")
                    .unwrap_or(defaults.facebook_userinfo_url),
            }
        };

        let payments = {
            let defaults = PaymentConfig::default();
            let companion_key = match std::env::var("PAYMENT_COMPANION_KEY") {
                Ok(key) if key.trim().is_empty() => {
                    return Err("PAYMENT_COMPANION_KEY must not be empty".to_string())
                }
                Ok(key) if production && key.len() < 24 => {
                    return Err(
                        "PAYMENT_COMPANION_KEY must be at least 24 characters in production"
                            .to_string(),
                    )
                }
                Ok(key) => key,
                Err(_) if production => {
                    return Err("PAYMENT_COMPANION_KEY must be set in production".to_string())
                }
                Err(_) => defaults.companion_key,
            };

            PaymentConfig {
                companion_key,
                merchant_number: std::env::var("PAYMENT_MERCHANT_NUMBER")
                    .unwrap_or(defaults.merchant_number),
                currency: defaults.currency,
                pending_ttl_secs: parse_env_with_default(
                    "PAYMENT_PENDING_TTL_SECS",
                    defaults.pending_ttl_secs,
                ),
                standard_price: parse_env_with_default(
                    "PAYMENT_STANDARD_PRICE",
                    defaults.standard_price,
                ),
                standard_days: defaults.standard_days,
                premium_price: parse_env_with_default(
                    "PAYMENT_PREMIUM_PRICE",
                    defaults.premium_price,
                ),
                premium_days: defaults.premium_days,
            }
        };

        Ok(Config {
            app,
            cors,
            jwt,
            storage,
            upload,
            oauth,
            payments,
        })
    }
}

/// `LOG_FORMAT=json`, defaulting to JSON in production
pub fn json_logs_from_env() -> bool {
    match std::env::var("LOG_FORMAT") {
        Ok(format) => format.eq_ignore_ascii_case("json"),
        Err(_) => std::env::var("APP_ENV")
            .map(|env| env.eq_ignore_ascii_case("production"))
            .unwrap_or(false),
    }
}

fn load_secret(key: &str, dev_default: &str, production: bool) -> Result<String, String> {
    match std::env::var(key) {
        Ok(secret) => {
            if production && secret_strength(&secret) == SecretStrength::Weak {
                return Err(format!(
                    "{key} is too weak for production (min 32 bytes, no repeated or sequential runs)"
                ));
            }
            Ok(secret)
        }
        Err(_) if production => Err(format!("{key} must be set in production")),
        Err(_) => {
            tracing::warn!("{} not set; using development default", key);
            Ok(dev_default.to_string())
        }
    }
}
