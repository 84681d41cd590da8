use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, IntCounter, IntCounterVec, IntGauge, TextEncoder, register_histogram,
    register_int_counter, register_int_counter_vec, register_int_gauge,
};

lazy_static! {
    pub static ref WISHES_TOTAL: IntCounter =
        register_int_counter!("wishwall_wishes_total", "Total accepted wishes").unwrap();
    pub static ref HEARTS_TOTAL: IntCounter =
        register_int_counter!("wishwall_hearts_total", "Total accepted hearts").unwrap();
    pub static ref REJECTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "wishwall_rejections_total",
        "Rejected commands by reason",
        &["reason"]
    )
    .unwrap();
    pub static ref SESSIONS_ACTIVE: IntGauge =
        register_int_gauge!("wishwall_sessions_active", "Currently connected sessions").unwrap();
    pub static ref PERSIST_FAILURES: IntCounter = register_int_counter!(
        "wishwall_persist_failures_total",
        "Snapshot writes that failed"
    )
    .unwrap();
    pub static ref BROADCAST_DROPPED: IntCounter = register_int_counter!(
        "wishwall_broadcast_dropped_total",
        "Events not delivered because the session was gone"
    )
    .unwrap();
    pub static ref COMMAND_LATENCY: Histogram = register_histogram!(
        "wishwall_command_latency_seconds",
        "Time to validate, apply and fan out one command"
    )
    .unwrap();
}

pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %err, "failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, String::new());
    }
    (
        StatusCode::OK,
        String::from_utf8(buffer).unwrap_or_default(),
    )
}
