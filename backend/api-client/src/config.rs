/// Client configuration
use resilience::presets::api_client_config;
use resilience::RetryConfig;
use std::time::Duration;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root including the version prefix, e.g. `https://api.bazari.app/api/v1`
    pub base_url: String,
    /// Per-attempt request timeout
    pub timeout: Duration,
    pub retry: RetryConfig,
    /// How long fetched listings stay in the local cache
    pub cache_ttl: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let preset = api_client_config();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: preset.timeout,
            retry: preset.retry,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    /// `BAZARI_API_URL`, falling back to a local server
    pub fn from_env() -> Self {
        let base_url = std::env::var("BAZARI_API_URL")
            .unwrap_or_else(|_| "http://localhost:8080/api/v1".to_string());
        Self::new(base_url)
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_api_client_preset() {
        let config = ClientConfig::new("https://api.bazari.app/api/v1/");
        assert_eq!(config.base_url, "https://api.bazari.app/api/v1");
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.initial_backoff, Duration::from_millis(500));
        assert_eq!(config.retry.max_backoff, Duration::from_secs(5));
        assert!(!config.retry.jitter);
    }

    #[test]
    fn test_url_joins_paths() {
        let config = ClientConfig::new("http://localhost:8080/api/v1");
        assert_eq!(config.url("/posts"), "http://localhost:8080/api/v1/posts");
        assert_eq!(config.url("posts/liked"), "http://localhost:8080/api/v1/posts/liked");
    }
}
