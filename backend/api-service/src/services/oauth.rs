/// OAuth provider profile lookup
///
/// The front end completes the provider's OAuth flow and hands us the
/// provider access token. We exchange it for the user's profile by calling
/// the provider's userinfo endpoint with that token.
use crate::config::OAuthConfig;
use crate::error::{AppError, Result};
use crate::models::AuthProvider;
use resilience::{presets, with_retry_if, RetryConfig, RetryError};
use serde::Deserialize;

/// Provider profile reduced to what account linking needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthProfile {
    pub provider: AuthProvider,
    pub provider_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, thiserror::Error)]
enum FetchError {
    #[error("provider rejected the token ({0})")]
    Rejected(u16),
    #[error("provider returned {0}")]
    Status(u16),
    #[error("provider unreachable: {0}")]
    Transport(String),
    #[error("unexpected profile payload: {0}")]
    Decode(String),
}

impl FetchError {
    fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport(_) => true,
            FetchError::Status(status) => *status >= 500 || *status == 429,
            FetchError::Rejected(_) | FetchError::Decode(_) => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GoogleProfile {
    sub: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MicrosoftProfile {
    id: String,
    display_name: Option<String>,
    mail: Option<String>,
    user_principal_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FacebookPictureData {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FacebookPicture {
    data: Option<FacebookPictureData>,
}

#[derive(Debug, Deserialize)]
struct FacebookProfile {
    id: String,
    name: Option<String>,
    email: Option<String>,
    picture: Option<FacebookPicture>,
}

/// Parse a provider's userinfo JSON into an [`OAuthProfile`]
pub fn normalize_profile(
    provider: AuthProvider,
    body: serde_json::Value,
) -> std::result::Result<OAuthProfile, serde_json::Error> {
    let profile = match provider {
        AuthProvider::Google => {
            let p: GoogleProfile = serde_json::from_value(body)?;
            OAuthProfile {
                provider,
                provider_id: p.sub,
                email: p.email,
                name: p.name,
                avatar_url: p.picture,
            }
        }
        AuthProvider::Microsoft => {
            let p: MicrosoftProfile = serde_json::from_value(body)?;
            OAuthProfile {
                provider,
                provider_id: p.id,
                // Work accounts often leave `mail` empty; the UPN is an address there
                email: p.mail.or(p.user_principal_name.filter(|upn| upn.contains('@'))),
                name: p.display_name,
                avatar_url: None,
            }
        }
        AuthProvider::Facebook | AuthProvider::Local => {
            let p: FacebookProfile = serde_json::from_value(body)?;
            OAuthProfile {
                provider,
                provider_id: p.id,
                email: p.email,
                name: p.name,
                avatar_url: p.picture.and_then(|pic| pic.data).and_then(|d| d.url),
            }
        }
    };

    Ok(OAuthProfile {
        email: profile
            .email
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty()),
        ..profile
    })
}

#[derive(Clone)]
pub struct OAuthClient {
    http: reqwest::Client,
    config: OAuthConfig,
    retry: RetryConfig,
}

impl OAuthClient {
    pub fn new(http: reqwest::Client, config: OAuthConfig) -> Self {
        Self {
            http,
            config,
            retry: presets::oauth_provider_config().retry,
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn userinfo_url(&self, provider: AuthProvider) -> Result<&str> {
        match provider {
            AuthProvider::Google => Ok(&self.config.google_userinfo_url),
            AuthProvider::Microsoft => Ok(&self.config.microsoft_userinfo_url),
            AuthProvider::Facebook => Ok(&self.config.facebook_userinfo_url),
            AuthProvider::Local => Err(AppError::Validation(
                "local is not an OAuth provider".to_string(),
            )),
        }
    }

    async fn fetch_once(&self, url: &str, access_token: &str) -> std::result::Result<serde_json::Value, FetchError> {
        let resp = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .timeout(presets::oauth_provider_config().timeout)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = resp.status().as_u16();
        if status == 401 || status == 403 {
            return Err(FetchError::Rejected(status));
        }
        if !resp.status().is_success() {
            return Err(FetchError::Status(status));
        }

        resp.json::<serde_json::Value>()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }

    /// Fetch and normalize the profile behind `access_token`
    ///
    /// Transport errors, 429 and 5xx are retried. A rejected token maps to
    /// `InvalidCredentials`; anything else the provider does wrong maps to
    /// `ExternalService`.
    pub async fn fetch_profile(
        &self,
        provider: AuthProvider,
        access_token: &str,
    ) -> Result<OAuthProfile> {
        let url = self.userinfo_url(provider)?;

        let body = with_retry_if(
            self.retry.clone(),
            FetchError::is_transient,
            || self.fetch_once(url, access_token),
        )
        .await
        .map_err(|err: RetryError<FetchError>| {
            match err.into_inner() {
                FetchError::Rejected(status) => {
                    tracing::info!(%provider, status, "OAuth provider rejected access token");
                    AppError::InvalidCredentials
                }
                other => AppError::ExternalService(format!("{provider}: {other}")),
            }
        })?;

        normalize_profile(provider, body).map_err(|e| {
            AppError::ExternalService(format!("{provider}: unexpected profile payload: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{bearer_token, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> OAuthClient {
        OAuthClient::new(
            reqwest::Client::new(),
            OAuthConfig {
                google_userinfo_url: format!("{}/google/userinfo", server.uri()),
                microsoft_userinfo_url: format!("{}/graph/me", server.uri()),
                facebook_userinfo_url: format!("{}/fb/me", server.uri()),
            },
        )
        .with_retry(RetryConfig {
            max_retries: 2,
            initial_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(10),
            backoff_multiplier: 2.0,
            jitter: false,
        })
    }

    #[test]
    fn test_normalize_microsoft_falls_back_to_upn() {
        let profile = normalize_profile(
            AuthProvider::Microsoft,
            json!({"id": "ms-1", "displayName": "Awa N.", "mail": null, "userPrincipalName": "Awa@Contoso.com"}),
        )
        .unwrap();
        assert_eq!(profile.email.as_deref(), Some("awa@contoso.com"));
        assert_eq!(profile.name.as_deref(), Some("Awa N."));
    }

    #[test]
    fn test_normalize_facebook_picture() {
        let profile = normalize_profile(
            AuthProvider::Facebook,
            json!({"id": "fb-9", "name": "Jean", "picture": {"data": {"url": "https://fb/p.jpg"}}}),
        )
        .unwrap();
        assert_eq!(profile.provider_id, "fb-9");
        assert!(profile.email.is_none());
        assert_eq!(profile.avatar_url.as_deref(), Some("https://fb/p.jpg"));
    }

    #[tokio::test]
    async fn test_google_profile_fetched_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/google/userinfo"))
            .and(bearer_token("ya29.token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sub": "g-123",
                "email": "seller@gmail.com",
                "name": "Seller",
                "picture": "https://lh3/photo.jpg"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let profile = client(&server)
            .fetch_profile(AuthProvider::Google, "ya29.token")
            .await
            .unwrap();
        assert_eq!(profile.provider_id, "g-123");
        assert_eq!(profile.email.as_deref(), Some("seller@gmail.com"));
    }

    #[tokio::test]
    async fn test_rejected_token_is_invalid_credentials_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/graph/me"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server)
            .fetch_profile(AuthProvider::Microsoft, "bad")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_provider_outage_is_retried_then_external_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fb/me"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let err = client(&server)
            .fetch_profile(AuthProvider::Facebook, "token")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ExternalService(_)));
    }
}
