/// Authentication: local accounts, OAuth sign-in and token rotation
use crate::db::users::{self, NewUser};
use crate::error::{AppError, Result};
use crate::models::{AuthProvider, AuthResponse, RegisterRequest, User, UserProfile};
use crate::security::{hash_password, verify_password};
use crate::services::oauth::{OAuthClient, OAuthProfile};
use crypto_core::{JwtManager, TokenPair};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct AuthService {
    pool: PgPool,
    jwt: Arc<JwtManager>,
    oauth: OAuthClient,
}

impl AuthService {
    pub fn new(pool: PgPool, jwt: Arc<JwtManager>, oauth: OAuthClient) -> Self {
        Self { pool, jwt, oauth }
    }

    fn issue_tokens(&self, user: &User) -> Result<TokenPair> {
        Ok(self
            .jwt
            .issue_pair(user.id, &user.email, user.role.as_str())?)
    }

    fn respond(&self, user: &User) -> Result<AuthResponse> {
        Ok(AuthResponse {
            user: user.profile_for(Some(user.id)),
            tokens: self.issue_tokens(user)?,
        })
    }

    pub async fn register(&self, req: &RegisterRequest) -> Result<AuthResponse> {
        let email = req.email.trim().to_lowercase();

        if users::find_by_email(&self.pool, &email).await?.is_some() {
            return Err(AppError::EmailAlreadyExists);
        }

        let password_hash = hash_password(&req.password)?;
        let phone = req.phone.as_deref().map(str::trim).filter(|p| !p.is_empty());

        let user = users::create(
            &self.pool,
            NewUser {
                email: &email,
                name: req.name.trim(),
                phone,
                password_hash: Some(&password_hash),
                avatar_url: None,
                auth_provider: AuthProvider::Local,
                provider_id: None,
            },
        )
        .await
        .map_err(|e| match e {
            // Lost a race with a concurrent registration for the same email
            AppError::Conflict(_) => AppError::EmailAlreadyExists,
            other => other,
        })?;

        tracing::info!(user_id = %user.id, "User registered");
        self.respond(&user)
    }

    /// Unknown email, OAuth-only account and wrong password are indistinguishable
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let user = users::find_by_email(&self.pool, email.trim())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let hash = user
            .password_hash
            .as_deref()
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(password, hash)? {
            tracing::info!(user_id = %user.id, "Login rejected: wrong password");
            return Err(AppError::InvalidCredentials);
        }

        self.respond(&user)
    }

    /// Exchange a refresh token for a fresh pair
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthResponse> {
        let claims = self.jwt.verify_refresh(refresh_token)?;
        let user_id = claims.user_id()?;

        let user = users::find_by_id(&self.pool, user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Account no longer exists".to_string()))?;

        self.respond(&user)
    }

    pub async fn oauth_login(
        &self,
        provider: AuthProvider,
        provider_access_token: &str,
    ) -> Result<AuthResponse> {
        let profile = self
            .oauth
            .fetch_profile(provider, provider_access_token)
            .await?;
        let user = self.resolve_oauth_user(profile).await?;
        self.respond(&user)
    }

    /// Existing identity, else link by email, else a new OAuth-only account
    async fn resolve_oauth_user(&self, profile: OAuthProfile) -> Result<User> {
        if let Some(user) =
            users::find_by_provider(&self.pool, profile.provider, &profile.provider_id).await?
        {
            return Ok(user);
        }

        let email = profile.email.as_deref().ok_or_else(|| {
            AppError::Validation(format!(
                "{} account has no email address; grant the email permission",
                profile.provider
            ))
        })?;

        if let Some(existing) = users::find_by_email(&self.pool, email).await? {
            tracing::info!(
                user_id = %existing.id,
                provider = %profile.provider,
                "Linking OAuth identity to existing account"
            );
            return users::link_provider(
                &self.pool,
                existing.id,
                profile.provider,
                &profile.provider_id,
                profile.avatar_url.as_deref(),
            )
            .await;
        }

        let name = profile
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| n.chars().count() >= 2)
            .map(str::to_owned)
            .unwrap_or_else(|| email.split('@').next().unwrap_or(email).to_string());

        let user = users::create(
            &self.pool,
            NewUser {
                email,
                name: &name,
                phone: None,
                password_hash: None,
                avatar_url: profile.avatar_url.as_deref(),
                auth_provider: profile.provider,
                provider_id: Some(&profile.provider_id),
            },
        )
        .await?;

        tracing::info!(user_id = %user.id, provider = %profile.provider, "User created via OAuth");
        Ok(user)
    }

    pub async fn me(&self, user_id: Uuid) -> Result<UserProfile> {
        let user = users::find_by_id(&self.pool, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        Ok(user.profile_for(Some(user_id)))
    }
}
