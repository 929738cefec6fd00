//! Request pipeline
//!
//! Every call goes through [`HttpClient::execute`]:
//!
//! 1. attach `Authorization: Bearer <access>` when a session is stored
//! 2. send, retrying network errors, timeouts, 5xx, 408 and 429
//! 3. on 401 for a request that carried a token, refresh once (single-flight)
//!    and replay the request once with the new token
//! 4. decode the `{ success, data | error }` envelope
//!
//! Concurrent 401s share one refresh: callers queue on `refresh_lock`, and a
//! caller that finds the stored access token already differs from the one it
//! was rejected with reuses it instead of refreshing again.

use crate::config::ClientConfig;
use crate::error::{is_retryable_status, ClientError, Result};
use crate::models::AuthResponse;
use crate::token_store::{Session, TokenStore};
use error_types::ApiEnvelope;
use reqwest::{multipart, Method, StatusCode};
use resilience::with_retry_if;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

const REFRESH_PATH: &str = "/auth/refresh";

/// One file part of a multipart upload
#[derive(Debug, Clone)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FilePart {
    /// A `file` part as expected by the upload endpoint
    pub fn image(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            field: "file".to_string(),
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Body {
    Empty,
    Json(serde_json::Value),
    Multipart(Vec<FilePart>),
}

/// Everything needed to (re)build a request for each attempt
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Body,
    /// Never attach a bearer token nor refresh on 401 (the refresh call itself)
    pub anonymous: bool,
}

impl RequestSpec {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: Body::Empty,
            anonymous: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Body::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Query parameters from a serializable struct; `None` fields are skipped
    pub fn query<T: Serialize>(mut self, params: &T) -> Result<Self> {
        self.query = query_pairs(params)?;
        Ok(self)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn files(mut self, parts: Vec<FilePart>) -> Self {
        self.body = Body::Multipart(parts);
        self
    }

    pub fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }
}

/// Flatten a struct into `key=value` pairs
pub fn query_pairs<T: Serialize>(params: &T) -> Result<Vec<(String, String)>> {
    let value = serde_json::to_value(params)?;
    let object = match value {
        serde_json::Value::Object(map) => map,
        serde_json::Value::Null => return Ok(Vec::new()),
        other => {
            return Err(ClientError::InvalidRequest(format!(
                "query parameters must be a struct, got {other}"
            )))
        }
    };

    Ok(object
        .into_iter()
        .filter_map(|(key, value)| match value {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some((key, s)),
            other => Some((key, other.to_string())),
        })
        .collect())
}

pub struct HttpClient {
    http: reqwest::Client,
    config: ClientConfig,
    tokens: Arc<dyn TokenStore>,
    refresh_lock: Mutex<()>,
}

impl HttpClient {
    pub fn new(config: ClientConfig, tokens: Arc<dyn TokenStore>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ClientError::from)?;

        Ok(Self {
            http,
            config,
            tokens,
            refresh_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    /// Run the full pipeline and decode the envelope's `data`
    pub async fn execute<T: DeserializeOwned>(&self, spec: RequestSpec) -> Result<T> {
        let access = if spec.anonymous {
            None
        } else {
            self.tokens.load().map(|s| s.access_token)
        };

        let response = self.send_with_retry(&spec, access.as_deref()).await?;

        match access {
            Some(stale) if response.status() == StatusCode::UNAUTHORIZED => {
                tracing::debug!(path = %spec.path, "Access token rejected; refreshing");
                let fresh = self.refresh_access(&stale).await?;
                let replay = self.send_with_retry(&spec, Some(&fresh)).await?;
                decode(replay).await
            }
            _ => decode(response).await,
        }
    }

    /// Exchange the stored refresh token for a new pair
    pub async fn refresh_session(&self) -> Result<AuthResponse> {
        let _guard = self.refresh_lock.lock().await;
        let session = self.tokens.load().ok_or(ClientError::SessionExpired)?;
        self.refresh_locked(&session).await
    }

    async fn refresh_access(&self, stale_access: &str) -> Result<String> {
        let _guard = self.refresh_lock.lock().await;

        let session = match self.tokens.load() {
            Some(session) if session.access_token != stale_access => {
                // refreshed by another request while we waited
                return Ok(session.access_token);
            }
            Some(session) => session,
            None => return Err(ClientError::SessionExpired),
        };

        let response = self.refresh_locked(&session).await?;
        Ok(response.tokens.access_token)
    }

    /// Caller must hold `refresh_lock`
    async fn refresh_locked(&self, session: &Session) -> Result<AuthResponse> {
        let spec = RequestSpec::post(REFRESH_PATH)
            .anonymous()
            .json(&serde_json::json!({ "refresh_token": session.refresh_token }))?;

        let outcome = match self.send_with_retry(&spec, None).await {
            Ok(response) => decode::<AuthResponse>(response).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(auth) => {
                self.tokens.save(&Session {
                    access_token: auth.tokens.access_token.clone(),
                    refresh_token: auth.tokens.refresh_token.clone(),
                })?;
                tracing::debug!("Session refreshed");
                Ok(auth)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed; clearing session");
                self.tokens.clear()?;
                Err(ClientError::SessionExpired)
            }
        }
    }

    /// Send with retries; a non-retryable response (success or error) is returned as is
    async fn send_with_retry(
        &self,
        spec: &RequestSpec,
        access: Option<&str>,
    ) -> Result<reqwest::Response> {
        with_retry_if(self.config.retry.clone(), ClientError::is_retryable, || async move {
            let response = self.build(spec, access)?.send().await?;
            let status = response.status().as_u16();
            if is_retryable_status(status) {
                return Err(error_from_response(response).await);
            }
            Ok::<_, ClientError>(response)
        })
        .await
        .map_err(|e| e.into_inner())
    }

    fn build(&self, spec: &RequestSpec, access: Option<&str>) -> Result<reqwest::RequestBuilder> {
        let mut builder = self
            .http
            .request(spec.method.clone(), self.config.url(&spec.path));

        if !spec.query.is_empty() {
            builder = builder.query(&spec.query);
        }
        for (name, value) in &spec.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(token) = access {
            builder = builder.bearer_auth(token);
        }

        builder = match &spec.body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(value),
            Body::Multipart(parts) => {
                let mut form = multipart::Form::new();
                for part in parts {
                    let file = multipart::Part::bytes(part.bytes.clone())
                        .file_name(part.file_name.clone())
                        .mime_str(&part.content_type)
                        .map_err(|e| ClientError::InvalidRequest(e.to_string()))?;
                    form = form.part(part.field.clone(), file);
                }
                builder.multipart(form)
            }
        };

        Ok(builder)
    }
}

async fn error_from_response(response: reqwest::Response) -> ClientError {
    let status = response.status().as_u16();
    match response.bytes().await {
        Ok(bytes) => match serde_json::from_slice::<ApiEnvelope<serde_json::Value>>(&bytes) {
            Ok(envelope) => match envelope.into_result() {
                Err(body) => ClientError::from_body(status, body),
                Ok(_) => ClientError::from_status(status, String::new()),
            },
            Err(_) => ClientError::from_status(status, String::from_utf8_lossy(&bytes).into_owned()),
        },
        Err(e) => ClientError::from(e),
    }
}

/// Decode a response envelope into its `data`
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(error_from_response(response).await);
    }

    let bytes = response.bytes().await?;
    let envelope: ApiEnvelope<T> = serde_json::from_slice(&bytes)?;
    match envelope.into_result() {
        Ok(Some(data)) => Ok(data),
        Ok(None) => Err(ClientError::Decode(
            "success envelope without data".to_string(),
        )),
        Err(body) => Err(ClientError::from_body(status.as_u16(), body)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Filters {
        q: Option<String>,
        min_price: Option<i64>,
        page: i64,
    }

    #[test]
    fn test_query_pairs_skip_none() {
        let pairs = query_pairs(&Filters {
            q: Some("corolla".into()),
            min_price: None,
            page: 2,
        })
        .unwrap();

        assert_eq!(
            pairs,
            vec![
                ("page".to_string(), "2".to_string()),
                ("q".to_string(), "corolla".to_string()),
            ]
        );
    }

    #[test]
    fn test_query_pairs_reject_scalars() {
        assert!(query_pairs(&42).is_err());
    }
}
