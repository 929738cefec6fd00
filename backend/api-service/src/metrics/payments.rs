//! Payment confirmation and expiry metrics

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, HistogramVec,
    IntCounter, IntCounterVec,
};
use std::time::Duration;

/// Companion-app confirmations by outcome (confirmed/duplicate/underpaid/expired/conflict)
static PAYMENT_CONFIRMATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "payment_confirmations_total",
        "Payment confirmation requests by outcome",
        &["outcome"]
    )
    .expect("failed to register payment_confirmations_total")
});

static PAYMENTS_EXPIRED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "payments_expired_total",
        "Pending payments expired by the background job"
    )
    .expect("failed to register payments_expired_total")
});

static EXPIRY_RUN_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "payment_expiry_run_duration_seconds",
        "Duration of payment expiry runs",
        &["status"],
        vec![0.001, 0.01, 0.1, 0.5, 1.0, 5.0]
    )
    .expect("failed to register payment_expiry_run_duration_seconds")
});

pub fn record_payment_confirmation(outcome: &str) {
    PAYMENT_CONFIRMATIONS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_payments_expired(count: u64) {
    PAYMENTS_EXPIRED_TOTAL.inc_by(count);
}

pub fn record_expiry_run(status: &str, duration: Duration) {
    EXPIRY_RUN_DURATION_SECONDS
        .with_label_values(&[status])
        .observe(duration.as_secs_f64());
}
