//! Prometheus exposition.
//!
//! Scan and repair metrics live in the engine's registry; the server adds
//! its own counters to the same registry and serves it as text.
//!
//! The `/metrics` endpoint is unauthenticated. It carries replica ids and
//! counts but no filenames; restrict it to the scraper's network.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use bitpres_engine::metrics::REGISTRY;
use prometheus::{Encoder, IntCounterVec, Opts, TextEncoder};
use std::sync::{LazyLock, Once};

pub static AUTH_FAILURES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "bitpres_auth_failures_total",
            "Operator requests rejected for a missing or invalid token",
        ),
        &["reason"],
    )
    .expect("metric creation failed")
});

static REGISTER_ONCE: Once = Once::new();

/// Register engine and server metrics. Safe to call repeatedly.
pub fn register_metrics() {
    bitpres_engine::metrics::register_metrics();
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(AUTH_FAILURES.clone()))
            .expect("metric registration failed");
    });
}

/// Prometheus metrics endpoint handler.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}
