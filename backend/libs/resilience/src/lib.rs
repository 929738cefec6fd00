/// Retry helpers for outbound calls
///
/// - **Retry**: exponential backoff, optionally jittered, with a predicate
///   deciding which errors are transient
/// - **Preset Configurations**: tuned settings for the API client, blob
///   storage and OAuth providers
///
/// # Example: retry only server errors
///
/// ```rust,no_run
/// use resilience::{presets, with_retry_if};
///
/// #[tokio::main]
/// async fn main() {
///     let config = presets::api_client_config();
///
///     let result = with_retry_if(
///         config.retry,
///         |status: &u16| *status >= 500,
///         || async { Ok::<_, u16>(()) },
///     )
///     .await;
/// }
/// ```

pub mod presets;
pub mod retry;

pub use presets::{api_client_config, blob_storage_config, oauth_provider_config, ServiceConfig};
pub use retry::{with_retry, with_retry_if, RetryConfig, RetryError};
