//! # Bazari API client
//!
//! Typed access to the Bazari REST API for Rust front ends and tools.
//!
//! - Every call decodes the `{ success, data | error }` envelope
//! - The stored access token is attached as a bearer token
//! - A 401 triggers one single-flight refresh and one replay
//! - Network errors, timeouts, 5xx, 408 and 429 are retried with backoff
//! - Fetched listings are cached, and likes are applied optimistically
//!
//! ```rust,ignore
//! let client = ApiClient::new(ClientConfig::new("https://api.bazari.app/api/v1"))?;
//! client.auth().login("amina@example.com", "market2024").await?;
//! let page = client.posts().list(&PostQuery::default()).await?;
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod services;
pub mod token_store;

pub use cache::{LikeSnapshot, PostCache};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use http::{FilePart, HttpClient, RequestSpec};
pub use models::*;
pub use services::{
    AuthApi, CategoriesApi, MessagesApi, PaymentsApi, PostsApi, UploadsApi, UsersApi,
    COMPANION_KEY_HEADER,
};
pub use token_store::{FileTokenStore, MemoryTokenStore, Session, TokenStore};

use std::sync::Arc;

/// Entry point: one HTTP pipeline and one listing cache shared by every service
#[derive(Clone)]
pub struct ApiClient {
    http: Arc<HttpClient>,
    cache: Arc<PostCache>,
}

impl ApiClient {
    /// Client with an in-memory token store
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_store(config, Arc::new(MemoryTokenStore::new()))
    }

    pub fn with_store(config: ClientConfig, tokens: Arc<dyn TokenStore>) -> Result<Self> {
        let cache = Arc::new(PostCache::new(config.cache_ttl));
        Ok(Self {
            http: Arc::new(HttpClient::new(config, tokens)?),
            cache,
        })
    }

    pub fn http(&self) -> &Arc<HttpClient> {
        &self.http
    }

    pub fn cache(&self) -> &Arc<PostCache> {
        &self.cache
    }

    pub fn is_authenticated(&self) -> bool {
        self.http.tokens().load().is_some()
    }

    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.http.clone(), self.cache.clone())
    }

    pub fn users(&self) -> UsersApi {
        UsersApi::new(self.http.clone())
    }

    pub fn posts(&self) -> PostsApi {
        PostsApi::new(self.http.clone(), self.cache.clone())
    }

    pub fn messages(&self) -> MessagesApi {
        MessagesApi::new(self.http.clone())
    }

    pub fn payments(&self) -> PaymentsApi {
        PaymentsApi::new(self.http.clone())
    }

    pub fn categories(&self) -> CategoriesApi {
        CategoriesApi::new(self.http.clone())
    }

    pub fn uploads(&self) -> UploadsApi {
        UploadsApi::new(self.http.clone())
    }
}
