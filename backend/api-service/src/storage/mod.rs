//! Image blob storage
//!
//! `BlobStore` is the seam between the upload service and Azure; tests swap in
//! an in-memory store or point `AzureBlobStore` at a wiremock server.

pub mod azure;
pub mod memory;
pub mod sas;

pub use azure::AzureBlobStore;
pub use memory::MemoryBlobStore;

use actix_web::web::Bytes;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("blob service returned {status}: {body}")]
    Http { status: u16, body: String },
    #[error("blob service unreachable: {0}")]
    Transport(String),
    #[error("SAS signing failed: {0}")]
    Signing(String),
}

impl StorageError {
    /// Worth another attempt: connection problems, throttling and server errors
    pub fn is_transient(&self) -> bool {
        match self {
            StorageError::Transport(_) => true,
            StorageError::Http { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            StorageError::Signing(_) => false,
        }
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        StorageError::Transport(err.to_string())
    }
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, name: &str, content_type: &str, body: Bytes) -> Result<(), StorageError>;

    /// Deleting a blob that does not exist succeeds
    async fn delete(&self, name: &str) -> Result<(), StorageError>;

    /// Time-limited read URL for `name`
    fn read_url(&self, name: &str, expires_at: DateTime<Utc>) -> Result<String, StorageError>;
}
