//! Blob upload metrics

use once_cell::sync::Lazy;
use prometheus::{register_int_counter_vec, IntCounterVec};

/// Individual PUT attempts against blob storage, retries included
static BLOB_UPLOAD_ATTEMPTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "blob_upload_attempts_total",
        "Blob storage upload attempts by result",
        &["result"]
    )
    .expect("failed to register blob_upload_attempts_total")
});

pub fn record_blob_upload_attempt(result: &str) {
    BLOB_UPLOAD_ATTEMPTS_TOTAL.with_label_values(&[result]).inc();
}
