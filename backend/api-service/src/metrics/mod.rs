//! Prometheus metrics for api-service.
//!
//! HTTP request metrics come from `actix_middleware::MetricsMiddleware`; the
//! collectors here cover payments, the expiry job and blob uploads.

use actix_web::HttpResponse;
use prometheus::{Encoder, TextEncoder};

pub mod payments;
pub mod uploads;

pub use payments::{record_expiry_run, record_payment_confirmation, record_payments_expired};
pub use uploads::record_blob_upload_attempt;

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
