use crate::cache::PostCache;
use crate::error::Result;
use crate::http::{HttpClient, RequestSpec};
use crate::models::{Ack, AuthProvider, AuthResponse, LoginRequest, RegisterRequest, UserProfile};
use crate::token_store::Session;
use std::sync::Arc;

pub struct AuthApi {
    http: Arc<HttpClient>,
    cache: Arc<PostCache>,
}

impl AuthApi {
    pub(crate) fn new(http: Arc<HttpClient>, cache: Arc<PostCache>) -> Self {
        Self { http, cache }
    }

    /// Create an account and sign in
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse> {
        let spec = RequestSpec::post("/auth/register").anonymous().json(request)?;
        let response: AuthResponse = self.http.execute(spec).await?;
        self.store_session(&response)?;
        Ok(response)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let spec = RequestSpec::post("/auth/login").anonymous().json(&request)?;
        let response: AuthResponse = self.http.execute(spec).await?;
        self.store_session(&response)?;
        Ok(response)
    }

    /// Exchange a provider access token obtained by the OAuth flow
    pub async fn oauth_login(
        &self,
        provider: AuthProvider,
        access_token: &str,
    ) -> Result<AuthResponse> {
        let spec = RequestSpec::post(format!("/auth/oauth/{}", provider.as_str()))
            .anonymous()
            .json(&serde_json::json!({ "access_token": access_token }))?;
        let response: AuthResponse = self.http.execute(spec).await?;
        self.store_session(&response)?;
        Ok(response)
    }

    /// Rotate the stored token pair
    pub async fn refresh(&self) -> Result<AuthResponse> {
        self.http.refresh_session().await
    }

    pub async fn me(&self) -> Result<UserProfile> {
        self.http.execute(RequestSpec::get("/auth/me")).await
    }

    /// Sign out; local tokens and cached listings are dropped even if the call fails
    pub async fn logout(&self) -> Result<()> {
        let outcome = self
            .http
            .execute::<Ack>(RequestSpec::post("/auth/logout"))
            .await;
        if let Err(e) = &outcome {
            tracing::warn!(error = %e, "Logout request failed; clearing local session");
        }

        self.http.tokens().clear()?;
        self.cache.clear();
        Ok(())
    }

    fn store_session(&self, response: &AuthResponse) -> Result<()> {
        self.http.tokens().save(&Session {
            access_token: response.tokens.access_token.clone(),
            refresh_token: response.tokens.refresh_token.clone(),
        })?;
        // liked_by_me differs per account
        self.cache.clear();
        Ok(())
    }
}
