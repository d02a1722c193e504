use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec, TextEncoder};

// Prometheus metrics (default registry)
pub static REMOTE_CALLS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "posts_remote_calls_total",
        "Total calls made to the remote posts API",
        &["op"]
    )
    .expect("register remote_calls_total")
});

pub static REMOTE_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "posts_remote_failures_total",
        "Total failed calls to the remote posts API",
        &["op"]
    )
    .expect("register remote_failures_total")
});

pub static SEEDED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "posts_seeded_total",
        "Total posts imported from the remote source into the local store"
    )
    .expect("register seeded_total")
});

/// Record one remote call and whether it failed.
pub fn record_remote_call(op: &str, ok: bool) {
    REMOTE_CALLS_TOTAL.with_label_values(&[op]).inc();
    if !ok {
        REMOTE_FAILURES_TOTAL.with_label_values(&[op]).inc();
    }
}

pub fn encode_metrics() -> (axum::http::StatusCode, String) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encode error: {e}"),
        );
    }
    (
        axum::http::StatusCode::OK,
        String::from_utf8(buffer).unwrap_or_default(),
    )
}
