/// Authentication handlers - registration, login, token refresh and OAuth
use crate::error::{AppError, Result};
use crate::models::{AuthProvider, LoginRequest, OAuthLoginRequest, RefreshRequest, RegisterRequest};
use crate::services::AuthService;
use actix_middleware::{AuthUser, UserId};
use actix_web::{web, HttpResponse};
use error_types::ApiEnvelope;
use validator::Validate;

pub async fn register(
    auth: web::Data<AuthService>,
    req: web::Json<RegisterRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let response = auth.register(&req).await?;
    Ok(HttpResponse::Created().json(ApiEnvelope::ok(response)))
}

pub async fn login(
    auth: web::Data<AuthService>,
    req: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let response = auth.login(&req.email, &req.password).await?;
    Ok(HttpResponse::Ok().json(ApiEnvelope::ok(response)))
}

/// Exchange a refresh token for a new pair
pub async fn refresh(
    auth: web::Data<AuthService>,
    req: web::Json<RefreshRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let response = auth.refresh(req.refresh_token.trim()).await?;
    Ok(HttpResponse::Ok().json(ApiEnvelope::ok(response)))
}

/// Tokens are stateless; the client discards them
pub async fn logout(user: Option<AuthUser>) -> HttpResponse {
    if let Some(user) = user {
        tracing::info!(user_id = %user.user_id, "User logged out");
    }
    HttpResponse::Ok().json(ApiEnvelope::ok(serde_json::json!({
        "message": "Logged out"
    })))
}

pub async fn me(auth: web::Data<AuthService>, user_id: UserId) -> Result<HttpResponse> {
    let profile = auth.me(user_id.0).await?;
    Ok(HttpResponse::Ok().json(ApiEnvelope::ok(profile)))
}

pub async fn oauth_login(
    auth: web::Data<AuthService>,
    provider: web::Path<String>,
    req: web::Json<OAuthLoginRequest>,
) -> Result<HttpResponse> {
    let provider: AuthProvider = provider.parse().map_err(AppError::Validation)?;
    req.validate()?;

    let response = auth.oauth_login(provider, req.access_token.trim()).await?;
    Ok(HttpResponse::Ok().json(ApiEnvelope::ok(response)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/refresh", web::post().to(refresh))
            .route("/logout", web::post().to(logout))
            .route("/me", web::get().to(me))
            .route("/oauth/{provider}", web::post().to(oauth_login)),
    );
}
