/// Client-side error type
use error_types::{ErrorBody, ErrorCode};

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server answered with a failure envelope (or a non-envelope error body)
    #[error("{code} ({status}): {message}")]
    Api {
        status: u16,
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// The refresh token was rejected or refreshing failed; stored tokens were cleared
    #[error("Session expired, please sign in again")]
    SessionExpired,

    #[error("Token storage error: {0}")]
    Storage(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    pub fn from_body(status: u16, body: ErrorBody) -> Self {
        ClientError::Api {
            status,
            code: body.code,
            message: body.message,
            details: body.details,
        }
    }

    /// Error for a failed response whose body is not an envelope
    pub fn from_status(status: u16, text: String) -> Self {
        let message = if text.trim().is_empty() {
            format!("HTTP {status}")
        } else {
            text
        };
        ClientError::Api {
            status,
            code: code_for_status(status),
            message,
            details: None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ClientError::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Network failures, timeouts, 5xx, 408 and 429
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Network(_) | ClientError::Timeout => true,
            ClientError::Api { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }
}

pub fn is_retryable_status(status: u16) -> bool {
    status >= 500 || status == 408 || status == 429
}

fn code_for_status(status: u16) -> ErrorCode {
    match status {
        400 | 422 => ErrorCode::ValidationError,
        401 => ErrorCode::Unauthorized,
        403 => ErrorCode::Forbidden,
        404 => ErrorCode::ResourceNotFound,
        409 => ErrorCode::Conflict,
        413 => ErrorCode::PayloadTooLarge,
        415 => ErrorCode::UnsupportedMediaType,
        502..=504 => ErrorCode::ExternalServiceError,
        _ => ErrorCode::InternalError,
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}
