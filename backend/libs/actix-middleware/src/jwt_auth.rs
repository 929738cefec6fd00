//! Bearer-token authentication
//!
//! The middleware never rejects a request for *lacking* credentials; public
//! routes such as listing browsing read `Option<AuthUser>`. A request that
//! *presents* a token must present a valid access token, otherwise it gets a
//! 401 envelope (`TOKEN_EXPIRED` or `UNAUTHORIZED`).
//!
//! Handlers that require a user take `AuthUser` (or `UserId`), whose extractor
//! fails with 401 when the middleware did not attach one.

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::StatusCode,
    Error, HttpMessage, HttpResponse, ResponseError,
};
use crypto_core::jwt::{JwtError, JwtManager};
use error_types::{ApiEnvelope, ErrorBody, ErrorCode};
use futures::future::{ready, Ready};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use uuid::Uuid;

/// Authenticated caller, attached to request extensions by [`JwtAuthMiddleware`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

/// User ID extracted from JWT
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserId(pub Uuid);

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authentication required")]
    Missing,
    #[error("Invalid Authorization header format")]
    MalformedHeader,
    #[error("Access token expired")]
    Expired,
    #[error("Invalid access token")]
    InvalidToken,
}

impl AuthError {
    fn code(&self) -> ErrorCode {
        match self {
            AuthError::Expired => ErrorCode::TokenExpired,
            _ => ErrorCode::Unauthorized,
        }
    }
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::Unauthorized().json(ApiEnvelope::failure(ErrorBody::new(
            self.code(),
            self.to_string(),
        )))
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::Expired,
            _ => AuthError::InvalidToken,
        }
    }
}

/// JWT Authentication Middleware
///
/// ```rust,ignore
/// App::new().wrap(JwtAuthMiddleware::new(jwt_manager.clone()))
/// ```
#[derive(Clone)]
pub struct JwtAuthMiddleware {
    jwt: Arc<JwtManager>,
}

impl JwtAuthMiddleware {
    pub fn new(jwt: Arc<JwtManager>) -> Self {
        Self { jwt }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = JwtAuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddlewareService {
            service: Rc::new(service),
            jwt: self.jwt.clone(),
        }))
    }
}

pub struct JwtAuthMiddlewareService<S> {
    service: Rc<S>,
    jwt: Arc<JwtManager>,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let jwt = self.jwt.clone();

        Box::pin(async move {
            let header = req
                .headers()
                .get("Authorization")
                .map(|h| h.to_str().map(str::to_owned));

            if let Some(header) = header {
                let outcome = header
                    .map_err(|_| AuthError::MalformedHeader)
                    .and_then(|h| authenticate(&jwt, &h));

                match outcome {
                    Ok(user) => {
                        req.extensions_mut().insert(UserId(user.user_id));
                        req.extensions_mut().insert(user);
                    }
                    Err(err) => {
                        let response = err.error_response();
                        return Ok(req.into_response(response).map_into_right_body());
                    }
                }
            }

            service.call(req).await.map(ServiceResponse::map_into_left_body)
        })
    }
}

/// Validate an `Authorization` header value against the access secret
pub fn authenticate(jwt: &JwtManager, header: &str) -> Result<AuthUser, AuthError> {
    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MalformedHeader)?;

    let claims = jwt.verify_access(token).map_err(|e| {
        tracing::warn!("JWT validation failed: {}", e);
        AuthError::from(e)
    })?;

    let user_id = claims.user_id().map_err(|e| {
        tracing::error!("Invalid user_id UUID in token: {}", e);
        AuthError::InvalidToken
    })?;

    Ok(AuthUser {
        user_id,
        email: claims.email,
        role: claims.role,
    })
}

impl actix_web::FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(
        req: &actix_web::HttpRequest,
        _payload: &mut actix_web::dev::Payload,
    ) -> Self::Future {
        match req.extensions().get::<AuthUser>() {
            Some(user) => ready(Ok(user.clone())),
            None => ready(Err(AuthError::Missing.into())),
        }
    }
}

impl actix_web::FromRequest for UserId {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(
        req: &actix_web::HttpRequest,
        _payload: &mut actix_web::dev::Payload,
    ) -> Self::Future {
        match req.extensions().get::<UserId>() {
            Some(user_id) => ready(Ok(*user_id)),
            None => ready(Err(AuthError::Missing.into())),
        }
    }
}
