use crate::error::Result;
use crate::http::{FilePart, HttpClient, RequestSpec};
use crate::models::{SignedUrl, UploadedImage};
use std::sync::Arc;

pub struct UploadsApi {
    http: Arc<HttpClient>,
}

impl UploadsApi {
    pub(crate) fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    /// Upload one or more images as `file` parts
    ///
    /// Returns the blob names to attach to a listing, in upload order.
    pub async fn upload_images(&self, files: Vec<FilePart>) -> Result<Vec<UploadedImage>> {
        self.http
            .execute(RequestSpec::post("/upload").files(files))
            .await
    }

    /// Fresh read URL for a stored blob
    pub async fn signed_url(&self, blob: &str) -> Result<SignedUrl> {
        self.http
            .execute(RequestSpec::get(format!("/upload/url/{}", blob.trim_start_matches('/'))))
            .await
    }

    /// Delete one of the caller's blobs
    pub async fn delete(&self, blob: &str) -> Result<()> {
        self.http
            .execute::<serde_json::Value>(RequestSpec::delete(format!(
                "/upload/{}",
                blob.trim_start_matches('/')
            )))
            .await?;
        Ok(())
    }
}
