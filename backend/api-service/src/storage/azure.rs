/// Azure Blob Storage over its REST API
///
/// Writes and deletes authenticate with short-lived SAS tokens (`cw`, `d`)
/// signed locally with the account key, the same mechanism used for the read
/// URLs handed to clients, so no shared-key request signing is needed.
use super::sas::{self, SasParams, SasPermission};
use super::{BlobStore, StorageError};
use crate::config::StorageConfig;
use actix_web::web::Bytes;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::StatusCode;

/// Lifetime of the SAS used for a single write or delete request
const OPERATION_SAS_MINUTES: i64 = 5;
/// Backdate `st` to tolerate clock skew between us and Azure
const CLOCK_SKEW_MINUTES: i64 = 5;

#[derive(Clone)]
pub struct AzureBlobStore {
    http: reqwest::Client,
    config: StorageConfig,
}

impl AzureBlobStore {
    pub fn new(http: reqwest::Client, config: StorageConfig) -> Self {
        Self { http, config }
    }

    fn protocol(&self) -> &'static str {
        if self.config.endpoint.starts_with("http://") {
            "https,http"
        } else {
            "https"
        }
    }

    fn blob_path(&self, name: &str) -> String {
        let encoded: Vec<String> = name
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!(
            "{}/{}/{}",
            self.config.endpoint,
            self.config.container,
            encoded.join("/")
        )
    }

    fn signed_url(
        &self,
        name: &str,
        permission: SasPermission,
        expiry: DateTime<Utc>,
    ) -> Result<String, StorageError> {
        let params = SasParams {
            account: &self.config.account,
            container: &self.config.container,
            blob: name,
            permission,
            start: Utc::now() - Duration::minutes(CLOCK_SKEW_MINUTES),
            expiry,
            protocol: self.protocol(),
        };
        let query = sas::query_string(&self.config.account_key, &params)?;
        Ok(format!("{}?{}", self.blob_path(name), query))
    }

    fn operation_expiry() -> DateTime<Utc> {
        Utc::now() + Duration::minutes(OPERATION_SAS_MINUTES)
    }
}

async fn error_from_response(resp: reqwest::Response) -> StorageError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    StorageError::Http { status, body }
}

#[async_trait]
impl BlobStore for AzureBlobStore {
    async fn put(&self, name: &str, content_type: &str, body: Bytes) -> Result<(), StorageError> {
        let url = self.signed_url(name, SasPermission::CreateWrite, Self::operation_expiry())?;

        let resp = self
            .http
            .put(url)
            .header("x-ms-blob-type", "BlockBlob")
            .header("x-ms-version", sas::SAS_VERSION)
            .header("x-ms-blob-content-type", content_type)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;

        if resp.status().is_success() {
            tracing::debug!(blob = %name, "Blob uploaded");
            Ok(())
        } else {
            Err(error_from_response(resp).await)
        }
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        let url = self.signed_url(name, SasPermission::Delete, Self::operation_expiry())?;

        let resp = self
            .http
            .delete(url)
            .header("x-ms-version", sas::SAS_VERSION)
            .send()
            .await?;

        match resp.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Ok(()),
            _ => Err(error_from_response(resp).await),
        }
    }

    fn read_url(&self, name: &str, expires_at: DateTime<Utc>) -> Result<String, StorageError> {
        self.signed_url(name, SasPermission::Read, expires_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(endpoint: &str) -> AzureBlobStore {
        AzureBlobStore::new(
            reqwest::Client::new(),
            StorageConfig {
                account: "bazaridev".into(),
                account_key: "YmF6YXJpLXRlc3QtYWNjb3VudC1rZXktMDEyMzQ1Njc4OQ==".into(),
                container: "listings".into(),
                endpoint: endpoint.into(),
                sas_ttl_secs: 3600,
            },
        )
    }

    #[tokio::test]
    async fn test_put_sends_block_blob_with_write_sas() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/listings/u1/photo.jpg"))
            .and(header("x-ms-blob-type", "BlockBlob"))
            .and(query_param("sp", "cw"))
            .and(query_param("sr", "b"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        store(&server.uri())
            .put("u1/photo.jpg", "image/jpeg", Bytes::from_static(b"\xFF\xD8\xFF"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_put_surfaces_server_errors_as_transient() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(503).set_body_string("ServerBusy"))
            .mount(&server)
            .await;

        let err = store(&server.uri())
            .put("u1/photo.jpg", "image/jpeg", Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert!(matches!(err, StorageError::Http { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_delete_missing_blob_is_ok() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(query_param("sp", "d"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        store(&server.uri()).delete("u1/gone.png").await.unwrap();
    }

    #[test]
    fn test_read_url_shape() {
        let store = store("https://bazaridev.blob.core.windows.net");
        let url = store
            .read_url("u1/photo.jpg", Utc::now() + Duration::hours(1))
            .unwrap();

        assert!(url.starts_with("https://bazaridev.blob.core.windows.net/listings/u1/photo.jpg?sv="));
        assert!(url.contains("&sp=r&spr=https&"));
    }

    #[test]
    fn test_http_endpoint_allows_http_protocol() {
        let store = store("http://127.0.0.1:10000/bazaridev");
        let url = store
            .read_url("a.png", Utc::now() + Duration::hours(1))
            .unwrap();
        assert!(url.contains("spr=https%2Chttp"));
    }
}
