/// HTTP handlers, one module per resource
///
/// Each module exposes a `configure` function mounted under `/api/v1` by
/// [`crate::routes::configure_routes`].
pub mod auth;
pub mod categories;
pub mod health;
pub mod messages;
pub mod payments;
pub mod posts;
pub mod uploads;
pub mod users;

pub use health::{health_summary, liveness_check, readiness_summary, HealthState};
