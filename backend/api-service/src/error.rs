/// Error types for the API service
///
/// Every failure leaves the service as a `{ success: false, error }` envelope.
/// Internal details (SQL errors, upstream bodies) are logged, never returned.
use crate::storage::StorageError;
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use crypto_core::JwtError;
use error_types::{ApiEnvelope, ErrorBody, ErrorCode};

/// Result type for API service operations
pub type Result<T> = std::result::Result<T, AppError>;

const PG_UNIQUE_VIOLATION: &str = "23505";
const PG_FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Validation failed")]
    InvalidFields(serde_json::Value),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    Unauthorized(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("An account with this email already exists")]
    EmailAlreadyExists,

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    UnsupportedMediaType(String),

    #[error("{0}")]
    ExternalService(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation(_) | AppError::InvalidFields(_) => ErrorCode::ValidationError,
            AppError::InvalidCredentials => ErrorCode::InvalidCredentials,
            AppError::Unauthorized(_) => ErrorCode::Unauthorized,
            AppError::TokenExpired => ErrorCode::TokenExpired,
            AppError::Forbidden(_) => ErrorCode::Forbidden,
            AppError::NotFound(_) => ErrorCode::ResourceNotFound,
            AppError::EmailAlreadyExists => ErrorCode::EmailAlreadyExists,
            AppError::Conflict(_) => ErrorCode::Conflict,
            AppError::PayloadTooLarge(_) => ErrorCode::PayloadTooLarge,
            AppError::UnsupportedMediaType(_) => ErrorCode::UnsupportedMediaType,
            AppError::ExternalService(_) => ErrorCode::ExternalServiceError,
            AppError::Database(_) | AppError::Internal(_) => ErrorCode::InternalError,
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            AppError::InvalidFields(details) => {
                ErrorBody::new(self.code(), self.to_string()).with_details(details.clone())
            }
            AppError::Database(_) | AppError::Internal(_) => {
                ErrorBody::new(self.code(), "Internal server error")
            }
            _ => ErrorBody::new(self.code(), self.to_string()),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.code().status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Database(e) => tracing::error!(error = %e, "Database error"),
            AppError::Internal(msg) => tracing::error!(error = %msg, "Internal error"),
            AppError::ExternalService(msg) => tracing::warn!(error = %msg, "Upstream failure"),
            _ => {}
        }

        HttpResponse::build(self.status_code()).json(ApiEnvelope::failure(self.body()))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some(PG_UNIQUE_VIOLATION) => AppError::Conflict(match db_err.constraint() {
                    Some(constraint) => format!("Duplicate value violates {constraint}"),
                    None => "Resource already exists".to_string(),
                }),
                Some(PG_FOREIGN_KEY_VIOLATION) => {
                    AppError::Validation("Referenced resource does not exist".to_string())
                }
                _ => AppError::Database(err),
            },
            _ => AppError::Database(err),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages: Vec<String> = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect();
                (field.to_string(), serde_json::json!(messages))
            })
            .collect::<serde_json::Map<_, _>>();

        AppError::InvalidFields(serde_json::Value::Object(details))
    }
}

impl From<JwtError> for AppError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AppError::TokenExpired,
            JwtError::Signing(msg) | JwtError::Config(msg) => AppError::Internal(msg),
            other => AppError::Unauthorized(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::ExternalService(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Signing(msg) => AppError::Internal(format!("SAS signing failed: {msg}")),
            other => AppError::ExternalService(format!("Blob storage: {other}")),
        }
    }
}
