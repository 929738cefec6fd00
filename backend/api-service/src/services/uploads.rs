/// Listing image uploads to blob storage
use crate::config::UploadConfig;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{SignedUrl, UploadedImage};
use crate::storage::{BlobStore, StorageError};
use actix_web::web::Bytes;
use chrono::{Duration, Utc};
use resilience::{presets, with_retry_if, RetryConfig, RetryError};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageKind {
    pub fn mime(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
            ImageKind::Gif => "image/gif",
            ImageKind::Webp => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
            ImageKind::Gif => "gif",
            ImageKind::Webp => "webp",
        }
    }

    fn from_declared(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(ImageKind::Jpeg),
            "image/png" => Some(ImageKind::Png),
            "image/gif" => Some(ImageKind::Gif),
            "image/webp" => Some(ImageKind::Webp),
            _ => None,
        }
    }
}

/// Identify an image by its magic number
pub fn sniff_image(bytes: &[u8]) -> Option<ImageKind> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some(ImageKind::Jpeg),
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some(ImageKind::Png),
        [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some(ImageKind::Gif),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(ImageKind::Webp),
        _ => None,
    }
}

/// Size and type checks for one uploaded file
///
/// A declared type of `application/octet-stream` (or none) defers to the
/// sniffed type; any other declared type must agree with it.
pub fn validate_image(declared: Option<&str>, bytes: &[u8], max_bytes: usize) -> Result<ImageKind> {
    if bytes.is_empty() {
        return Err(AppError::Validation("File is empty".to_string()));
    }
    if bytes.len() > max_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "File exceeds the {} byte limit",
            max_bytes
        )));
    }

    let sniffed = sniff_image(bytes).ok_or_else(|| {
        AppError::UnsupportedMediaType("Only JPEG, PNG, GIF and WebP images are accepted".to_string())
    })?;

    match declared.map(str::trim).filter(|ct| !ct.is_empty()) {
        None => Ok(sniffed),
        Some(ct) if ct.eq_ignore_ascii_case(mime::APPLICATION_OCTET_STREAM.essence_str()) => Ok(sniffed),
        Some(ct) => match ImageKind::from_declared(ct) {
            Some(kind) if kind == sniffed => Ok(sniffed),
            _ => Err(AppError::UnsupportedMediaType(format!(
                "Declared type {ct} does not match file content ({})",
                sniffed.mime()
            ))),
        },
    }
}

/// Blob names are `{user_id}/{file}` with a single path segment after the owner
pub fn validate_blob_name(name: &str) -> Result<()> {
    let valid = match name.split_once('/') {
        Some((owner, file)) => {
            Uuid::parse_str(owner).is_ok()
                && !file.is_empty()
                && !file.contains('/')
                && !file.contains("..")
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(AppError::Validation(format!("Invalid blob name: {name}")))
    }
}

#[derive(Clone)]
pub struct UploadService {
    store: Arc<dyn BlobStore>,
    config: UploadConfig,
    retry: RetryConfig,
    sas_ttl: Duration,
}

impl UploadService {
    pub fn new(store: Arc<dyn BlobStore>, config: UploadConfig, sas_ttl_secs: i64) -> Self {
        let retry = RetryConfig {
            max_retries: config.max_retries,
            ..presets::blob_storage_config().retry
        };
        Self {
            store,
            config,
            retry,
            sas_ttl: Duration::seconds(sas_ttl_secs),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn max_bytes(&self) -> usize {
        self.config.max_bytes
    }

    pub fn max_files(&self) -> usize {
        self.config.max_files
    }

    /// Validate and store one image, retrying transient storage failures
    pub async fn upload(
        &self,
        user_id: Uuid,
        declared_type: Option<&str>,
        bytes: Bytes,
    ) -> Result<UploadedImage> {
        let kind = validate_image(declared_type, &bytes, self.config.max_bytes)?;
        let name = format!("{}/{}.{}", user_id, Uuid::new_v4(), kind.extension());
        let size = bytes.len();

        let outcome = with_retry_if(self.retry.clone(), StorageError::is_transient, || {
            let body = bytes.clone();
            let name = name.as_str();
            async move {
                let result = self.store.put(name, kind.mime(), body).await;
                metrics::record_blob_upload_attempt(if result.is_ok() { "ok" } else { "error" });
                result
            }
        })
        .await;

        if let Err(err) = outcome {
            let attempts = match &err {
                RetryError::Exhausted { attempts, .. } => *attempts,
                RetryError::Permanent(_) => 1,
            };
            tracing::error!(blob = %name, attempts, error = %err, "Image upload failed");

            if let Err(cleanup) = self.store.delete(&name).await {
                tracing::warn!(blob = %name, error = %cleanup, "Cleanup after failed upload failed");
            }
            return Err(AppError::ExternalService(
                "Image storage is unavailable, please retry".to_string(),
            ));
        }

        tracing::info!(blob = %name, size, content_type = kind.mime(), "Image uploaded");
        Ok(UploadedImage {
            url: self.store.read_url(&name, Utc::now() + self.sas_ttl)?,
            name,
            content_type: kind.mime().to_string(),
            size,
        })
    }

    pub fn signed_url(&self, name: &str) -> Result<SignedUrl> {
        validate_blob_name(name)?;
        let expires_at = Utc::now() + self.sas_ttl;
        Ok(SignedUrl {
            url: self.store.read_url(name, expires_at)?,
            name: name.to_string(),
            expires_at,
        })
    }

    /// Owner only: the blob name must start with the caller's id
    pub async fn delete(&self, user_id: Uuid, name: &str) -> Result<()> {
        validate_blob_name(name)?;
        if !name.starts_with(&format!("{user_id}/")) {
            return Err(AppError::Forbidden(
                "You can only delete your own uploads".to_string(),
            ));
        }

        self.store.delete(name).await?;
        tracing::info!(blob = %name, "Image deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBlobStore;

    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];
    const WEBP: &[u8] = b"RIFF\x24\x00\x00\x00WEBPVP8 ";

    fn service(store: Arc<MemoryBlobStore>) -> UploadService {
        UploadService::new(
            store,
            UploadConfig {
                max_bytes: 64,
                max_retries: 3,
                max_files: 10,
            },
            3600,
        )
        .with_retry(RetryConfig {
            max_retries: 3,
            initial_backoff: std::time::Duration::from_millis(1),
            max_backoff: std::time::Duration::from_millis(5),
            backoff_multiplier: 2.0,
            jitter: false,
        })
    }

    #[test]
    fn test_sniffing() {
        assert_eq!(sniff_image(JPEG), Some(ImageKind::Jpeg));
        assert_eq!(sniff_image(PNG), Some(ImageKind::Png));
        assert_eq!(sniff_image(b"GIF89a\x01\x00"), Some(ImageKind::Gif));
        assert_eq!(sniff_image(WEBP), Some(ImageKind::Webp));
        assert_eq!(sniff_image(b"%PDF-1.7"), None);
        assert_eq!(sniff_image(&[0xFF, 0xD8]), None);
    }

    #[test]
    fn test_validate_image_rules() {
        assert!(matches!(
            validate_image(Some("image/jpeg"), &[], 64),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            validate_image(Some("image/jpeg"), &[0xFF; 65], 64),
            Err(AppError::PayloadTooLarge(_))
        ));
        assert!(matches!(
            validate_image(Some("application/pdf"), b"%PDF-1.7", 64),
            Err(AppError::UnsupportedMediaType(_))
        ));
        assert!(matches!(
            validate_image(Some("image/png"), JPEG, 64),
            Err(AppError::UnsupportedMediaType(_))
        ));
        assert_eq!(validate_image(Some("image/jpg"), JPEG, 64).unwrap(), ImageKind::Jpeg);
        assert_eq!(
            validate_image(Some("application/octet-stream"), PNG, 64).unwrap(),
            ImageKind::Png
        );
        assert_eq!(validate_image(None, WEBP, 64).unwrap(), ImageKind::Webp);
    }

    #[test]
    fn test_blob_name_validation() {
        let user = Uuid::new_v4();
        assert!(validate_blob_name(&format!("{user}/a.jpg")).is_ok());
        assert!(validate_blob_name("a.jpg").is_err());
        assert!(validate_blob_name("not-a-uuid/a.jpg").is_err());
        assert!(validate_blob_name(&format!("{user}/../b.jpg")).is_err());
        assert!(validate_blob_name(&format!("{user}/x/b.jpg")).is_err());
    }

    #[tokio::test]
    async fn test_upload_names_blob_under_user() {
        let store = Arc::new(MemoryBlobStore::new());
        let user = Uuid::new_v4();

        let image = service(store.clone())
            .upload(user, Some("image/png"), Bytes::from_static(PNG))
            .await
            .unwrap();

        assert!(image.name.starts_with(&format!("{user}/")));
        assert!(image.name.ends_with(".png"));
        assert_eq!(image.size, PNG.len());
        assert!(store.contains(&image.name));
        assert_eq!(store.content_type(&image.name).as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let store = Arc::new(MemoryBlobStore::new());
        store.fail_next_puts(2);

        let image = service(store.clone())
            .upload(Uuid::new_v4(), Some("image/jpeg"), Bytes::from_static(JPEG))
            .await
            .unwrap();

        assert_eq!(store.put_attempts(), 3);
        assert!(store.contains(&image.name));
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_external_error() {
        let store = Arc::new(MemoryBlobStore::new());
        store.fail_next_puts(10);

        let user_id = Uuid::new_v4();
        let err = service(store.clone())
            .upload(user_id, Some("image/jpeg"), Bytes::from_static(JPEG))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ExternalService(_)));
        assert_eq!(store.put_attempts(), 4);

        // the half-written blob is removed once retries run out
        let deleted = store.deleted();
        assert_eq!(deleted.len(), 1);
        assert!(deleted[0].starts_with(&format!("{user_id}/")));
        assert!(deleted[0].ends_with(".jpg"));
    }

    #[tokio::test]
    async fn test_delete_requires_ownership() {
        let store = Arc::new(MemoryBlobStore::new());
        let owner = Uuid::new_v4();
        let svc = service(store.clone());

        let image = svc
            .upload(owner, None, Bytes::from_static(JPEG))
            .await
            .unwrap();

        let err = svc.delete(Uuid::new_v4(), &image.name).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(store.contains(&image.name));

        svc.delete(owner, &image.name).await.unwrap();
        assert!(!store.contains(&image.name));
    }
}
