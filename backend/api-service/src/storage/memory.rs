use super::{BlobStore, StorageError};
use actix_web::web::Bytes;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// In-process blob store for tests and local runs without Azure
///
/// `fail_next_puts(n)` makes the next `n` uploads fail with a 503. Every
/// delete request is recorded, whether or not the blob existed.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, (String, Bytes)>>,
    failing_puts: AtomicU32,
    put_attempts: AtomicU32,
    deletes: Mutex<Vec<String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_puts(&self, count: u32) {
        self.failing_puts.store(count, Ordering::SeqCst);
    }

    pub fn put_attempts(&self) -> u32 {
        self.put_attempts.load(Ordering::SeqCst)
    }

    /// Names passed to `delete`, in call order
    pub fn deleted(&self) -> Vec<String> {
        self.deletes
            .lock()
            .map(|deletes| deletes.clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.blobs
            .lock()
            .map(|blobs| blobs.contains_key(name))
            .unwrap_or(false)
    }

    pub fn content_type(&self, name: &str) -> Option<String> {
        self.blobs
            .lock()
            .ok()
            .and_then(|blobs| blobs.get(name).map(|(ct, _)| ct.clone()))
    }

    fn lock_error() -> StorageError {
        StorageError::Transport("memory store lock poisoned".to_string())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, name: &str, content_type: &str, body: Bytes) -> Result<(), StorageError> {
        self.put_attempts.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .failing_puts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StorageError::Http {
                status: 503,
                body: "ServerBusy".to_string(),
            });
        }

        self.blobs
            .lock()
            .map_err(|_| Self::lock_error())?
            .insert(name.to_string(), (content_type.to_string(), body));
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        self.deletes
            .lock()
            .map_err(|_| Self::lock_error())?
            .push(name.to_string());
        self.blobs
            .lock()
            .map_err(|_| Self::lock_error())?
            .remove(name);
        Ok(())
    }

    fn read_url(&self, name: &str, expires_at: DateTime<Utc>) -> Result<String, StorageError> {
        Ok(format!("memory://{name}?se={}", expires_at.timestamp()))
    }
}
