//! # Actix Middleware Library
//!
//! Middleware shared by Bazari Actix services
//!
//! ## Modules
//! - `jwt_auth`: bearer-token authentication and the `AuthUser` extractor
//! - `correlation_id`: `X-Correlation-ID` propagation
//! - `metrics`: Prometheus request counters and latency histograms

pub mod correlation_id;
pub mod jwt_auth;
pub mod metrics;

pub use correlation_id::{get_correlation_id, CorrelationId, CorrelationIdMiddleware};
pub use jwt_auth::{AuthError, AuthUser, JwtAuthMiddleware, UserId};
pub use metrics::MetricsMiddleware;
