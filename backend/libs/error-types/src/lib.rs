//! Shared error codes and the `{ success, data | error }` response envelope.
//!
//! Every Bazari HTTP response body uses one of two shapes:
//!
//! ```json
//! { "success": true,  "data": { ... } }
//! { "success": false, "error": { "code": "RESOURCE_NOT_FOUND", "message": "..." } }
//! ```
//!
//! The server renders them, the middleware renders its 401s with them, and the
//! client decodes them back into typed errors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable, client-facing error categories.
///
/// Each code maps to exactly one HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    InvalidCredentials,
    Unauthorized,
    TokenExpired,
    Forbidden,
    ResourceNotFound,
    EmailAlreadyExists,
    Conflict,
    PayloadTooLarge,
    UnsupportedMediaType,
    ExternalServiceError,
    InternalError,
}

impl ErrorCode {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 400,
            ErrorCode::InvalidCredentials | ErrorCode::Unauthorized | ErrorCode::TokenExpired => 401,
            ErrorCode::Forbidden => 403,
            ErrorCode::ResourceNotFound => 404,
            ErrorCode::EmailAlreadyExists | ErrorCode::Conflict => 409,
            ErrorCode::PayloadTooLarge => 413,
            ErrorCode::UnsupportedMediaType => 415,
            ErrorCode::ExternalServiceError => 502,
            ErrorCode::InternalError => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::InvalidCredentials => "INVALID_CREDENTIALS",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::TokenExpired => "TOKEN_EXPIRED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::ResourceNotFound => "RESOURCE_NOT_FOUND",
            ErrorCode::EmailAlreadyExists => "EMAIL_ALREADY_EXISTS",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ErrorCode::UnsupportedMediaType => "UNSUPPORTED_MEDIA_TYPE",
            ErrorCode::ExternalServiceError => "EXTERNAL_SERVICE_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error payload carried inside a failed envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    /// Field-level detail (validation failures), never internal diagnostics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorBody {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Uniform response envelope.
///
/// Serialized untagged on `success`: `data` is present only when `success` is
/// true, `error` only when it is false.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn into_result(self) -> Result<Option<T>, ErrorBody> {
        match (self.success, self.error) {
            (true, _) => Ok(self.data),
            (false, Some(err)) => Err(err),
            (false, None) => Err(ErrorBody::new(
                ErrorCode::InternalError,
                "response reported failure without an error body",
            )),
        }
    }
}

impl ApiEnvelope<()> {
    pub fn failure(error: ErrorBody) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_code_serializes_screaming_snake() {
        let value = serde_json::to_value(ErrorCode::ResourceNotFound).unwrap();
        assert_eq!(value, json!("RESOURCE_NOT_FOUND"));
        assert_eq!(ErrorCode::ResourceNotFound.as_str(), "RESOURCE_NOT_FOUND");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ErrorCode::ValidationError.status_code(), 400);
        assert_eq!(ErrorCode::InvalidCredentials.status_code(), 401);
        assert_eq!(ErrorCode::Forbidden.status_code(), 403);
        assert_eq!(ErrorCode::EmailAlreadyExists.status_code(), 409);
        assert_eq!(ErrorCode::ExternalServiceError.status_code(), 502);
    }

    #[test]
    fn test_failure_envelope_shape() {
        let envelope = ApiEnvelope::failure(ErrorBody::new(ErrorCode::Forbidden, "not yours"));
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            value,
            json!({
                "success": false,
                "error": { "code": "FORBIDDEN", "message": "not yours" }
            })
        );
    }

    #[test]
    fn test_success_envelope_into_result() {
        let raw = json!({ "success": true, "data": { "id": 7 } });
        let envelope: ApiEnvelope<serde_json::Value> = serde_json::from_value(raw).unwrap();
        let data = envelope.into_result().unwrap().unwrap();
        assert_eq!(data["id"], 7);
    }

    #[test]
    fn test_failure_without_body_is_internal() {
        let raw = json!({ "success": false });
        let envelope: ApiEnvelope<serde_json::Value> = serde_json::from_value(raw).unwrap();
        let err = envelope.into_result().unwrap_err();
        assert_eq!(err.code, ErrorCode::InternalError);
    }
}
