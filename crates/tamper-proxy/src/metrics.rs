//! Prometheus metrics for tamper-proxy.
//!
//! Tracks proxied traffic, applied patches, recordings, and config reloads.
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};
use tracing::warn;

lazy_static! {
    /// Total number of requests processed
    pub static ref REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "tamper_requests_total",
        "Total number of requests processed by the proxy",
        &["method", "status"]
    )
    .unwrap();

    /// Patches applied, by phase
    pub static ref PATCHES_TOTAL: CounterVec = register_counter_vec!(
        "tamper_patches_total",
        "Total number of patches applied",
        &["phase"]  // phase: request|response
    )
    .unwrap();

    /// Rules that matched but could not be applied
    pub static ref RULE_ERRORS_TOTAL: CounterVec = register_counter_vec!(
        "tamper_rule_errors_total",
        "Total number of rule evaluations that degraded to no match",
        &["kind"]  // kind: invalid_pattern|body_unavailable|invalid_status
    )
    .unwrap();

    /// Recorded upstream responses
    pub static ref RECORDINGS_TOTAL: CounterVec = register_counter_vec!(
        "tamper_recordings_total",
        "Total number of upstream responses recorded to disk",
        &["result"]  // result: written|failed
    )
    .unwrap();

    /// Config hot reloads
    pub static ref CONFIG_RELOADS_TOTAL: CounterVec = register_counter_vec!(
        "tamper_config_reloads_total",
        "Total number of configuration reload attempts",
        &["result"]  // result: success|error
    )
    .unwrap();

    /// Upstream request duration
    pub static ref UPSTREAM_REQUEST_DURATION_MS: HistogramVec = register_histogram_vec!(
        "tamper_upstream_request_duration_ms",
        "Duration of upstream requests in milliseconds",
        &["method", "status"],
        vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0]
    )
    .unwrap();
}

/// Collect and return all metrics in Prometheus text format
pub fn collect_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

pub fn record_request(method: &str, status: u16) {
    REQUESTS_TOTAL
        .with_label_values(&[method, &status.to_string()])
        .inc();
}

pub fn record_patch(phase: &str) {
    PATCHES_TOTAL.with_label_values(&[phase]).inc();
}

pub fn record_rule_error(kind: &str) {
    RULE_ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn record_recording(success: bool) {
    let result = if success { "written" } else { "failed" };
    RECORDINGS_TOTAL.with_label_values(&[result]).inc();
}

pub fn record_config_reload(success: bool) {
    let result = if success { "success" } else { "error" };
    CONFIG_RELOADS_TOTAL.with_label_values(&[result]).inc();
}

pub fn record_upstream_duration(method: &str, status: u16, duration_ms: f64) {
    UPSTREAM_REQUEST_DURATION_MS
        .with_label_values(&[method, &status.to_string()])
        .observe(duration_ms);
}
