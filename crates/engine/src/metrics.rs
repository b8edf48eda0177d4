//! Prometheus metrics for scans and repairs.

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

pub static SCANS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "bitpres_scans_total",
            "Replica scans by kind and outcome",
        ),
        &["kind", "outcome"],
    )
    .expect("metric creation failed")
});

pub static SCAN_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "bitpres_scan_duration_seconds",
            "Replica scan duration by kind",
        )
        .buckets(vec![
            1.0, 10.0, 60.0, 300.0, 1800.0, 3600.0, 14400.0, 43200.0, 86400.0,
        ]),
        &["kind"],
    )
    .expect("metric creation failed")
});

pub static REPAIRS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "bitpres_repairs_total",
            "Per-file repair outcomes by repair kind",
        ),
        &["kind", "outcome"],
    )
    .expect("metric creation failed")
});

pub static CACHED_MISSING_FILES: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    IntGaugeVec::new(
        Opts::new(
            "bitpres_cached_missing_files",
            "Missing files per replica at the last completed scan",
        ),
        &["replica"],
    )
    .expect("metric creation failed")
});

pub static CACHED_CHANGED_FILES: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    IntGaugeVec::new(
        Opts::new(
            "bitpres_cached_changed_files",
            "Changed files per replica at the last completed scan",
        ),
        &["replica"],
    )
    .expect("metric creation failed")
});

static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry. Safe to call repeatedly.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(SCANS_TOTAL.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(SCAN_DURATION.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(REPAIRS_TOTAL.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(CACHED_MISSING_FILES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(CACHED_CHANGED_FILES.clone()))
            .expect("metric registration failed");
    });
}

pub(crate) fn record_scan(kind: &str, outcome: &str, seconds: f64) {
    SCANS_TOTAL.with_label_values(&[kind, outcome]).inc();
    SCAN_DURATION.with_label_values(&[kind]).observe(seconds);
}

pub(crate) fn record_repair(kind: &str, outcome: &str) {
    REPAIRS_TOTAL.with_label_values(&[kind, outcome]).inc();
}
