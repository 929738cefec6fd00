/// Preset configurations for the outbound calls Bazari makes
use crate::retry::RetryConfig;
use std::time::Duration;

/// Per-attempt timeout plus retry policy for one kind of dependency
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub timeout: Duration,
    pub retry: RetryConfig,
}

/// Marketplace API calls made by the client library
///
/// - Timeout: 30s per attempt
/// - Retry: 3 retries, 500ms doubling, capped at 5s, no jitter
pub fn api_client_config() -> ServiceConfig {
    ServiceConfig {
        timeout: Duration::from_secs(30),
        retry: RetryConfig {
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter: false,
        },
    }
}

/// Azure Blob Storage uploads and deletes
///
/// - Timeout: 120s (large images on slow links)
/// - Retry: 3 retries with jittered backoff
pub fn blob_storage_config() -> ServiceConfig {
    ServiceConfig {
        timeout: Duration::from_secs(120),
        retry: RetryConfig {
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter: true,
        },
    }
}

/// OAuth provider userinfo lookups
///
/// - Timeout: 10s
/// - Retry: 2 retries; a rejected token is never retried by callers
pub fn oauth_provider_config() -> ServiceConfig {
    ServiceConfig {
        timeout: Duration::from_secs(10),
        retry: RetryConfig {
            max_retries: 2,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(2),
            backoff_multiplier: 2.0,
            jitter: true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_client_config() {
        let config = api_client_config();
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.initial_backoff, Duration::from_millis(500));
        assert_eq!(config.retry.max_backoff, Duration::from_secs(5));
        assert!(!config.retry.jitter);
    }

    #[test]
    fn test_blob_storage_config() {
        let config = blob_storage_config();
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert_eq!(config.retry.max_retries, 3);
    }

    #[test]
    fn test_oauth_provider_config() {
        let config = oauth_provider_config();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(config.retry.max_retries < api_client_config().retry.max_retries);
    }
}
