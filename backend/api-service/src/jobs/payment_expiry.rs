//! Pending payment expiry
//!
//! A payer has `PAYMENT_PENDING_TTL_SECS` to send the money. Once a minute,
//! pending payments older than that are marked `expired` so their reference
//! can no longer be confirmed.

use crate::metrics;
use crate::services::PaymentService;
use std::time::{Duration, Instant};
use tokio::time::sleep;

pub const CHECK_INTERVAL: Duration = Duration::from_secs(60);

pub async fn start_payment_expiry(payments: PaymentService) {
    tracing::info!(
        "Starting payment expiry job (check_interval={}s)",
        CHECK_INTERVAL.as_secs()
    );

    loop {
        sleep(CHECK_INTERVAL).await;
        run_once(&payments).await;
    }
}

/// One expiry pass; failures are logged and retried on the next tick
pub async fn run_once(payments: &PaymentService) {
    let started = Instant::now();

    match payments.expire_stale().await {
        Ok(expired) => {
            metrics::record_expiry_run("success", started.elapsed());
            if expired > 0 {
                metrics::record_payments_expired(expired);
                tracing::info!(expired, "Expired stale pending payments");
            }
        }
        Err(e) => {
            metrics::record_expiry_run("error", started.elapsed());
            tracing::error!(error = %e, "Payment expiry run failed");
        }
    }
}
