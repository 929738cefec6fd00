//! Route configuration
//!
//! Each resource module under `handlers` owns its own scope; this file only
//! mounts them.

use crate::handlers;
use crate::metrics::serve_metrics;
use actix_web::web;

/// Configure all routes for the application
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/metrics", web::get().to(serve_metrics)).service(
        web::scope("/api/v1")
            .route("/health", web::get().to(handlers::health_summary))
            .route("/health/ready", web::get().to(handlers::readiness_summary))
            .route("/health/live", web::get().to(handlers::liveness_check))
            .configure(handlers::auth::configure)
            .configure(handlers::users::configure)
            .configure(handlers::posts::configure)
            .configure(handlers::messages::configure)
            .configure(handlers::payments::configure)
            .configure(handlers::categories::configure)
            .configure(handlers::uploads::configure),
    );
}
