//! Prometheus Metrics Module
//!
//! Provides relay-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - HTTP request counts by method, path, and status
//! - HTTP request latency histograms
//! - Relay gauges: sessions, rooms, peer links
//! - Inbound frames by type and rejected frames by reason
//! - Heartbeat evictions and session replacements
//! - Message store latency

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry,
    TextEncoder,
};

const NAMESPACE: &str = "relay";

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// HTTP request counter - tracks total requests by method, path, and status code
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests").namespace(NAMESPACE),
        &["method", "path", "status"],
    )
    .expect("Failed to create HTTP_REQUESTS_TOTAL metric")
});

/// HTTP request latency histogram - tracks request duration in seconds
pub static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];
    HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
        )
        .namespace(NAMESPACE)
        .buckets(buckets),
        &["method", "path"],
    )
    .expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric")
});

/// Relay state gauges
pub static RELAY_STATE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("state", "Current relay state sizes").namespace(NAMESPACE),
        &["kind"], // "sessions", "rooms", "peer_links"
    )
    .expect("Failed to create RELAY_STATE metric")
});

/// Inbound frames by wire type
pub static INBOUND_FRAMES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("inbound_frames_total", "Decoded inbound frames by type").namespace(NAMESPACE),
        &["type"],
    )
    .expect("Failed to create INBOUND_FRAMES_TOTAL metric")
});

/// Rejected frames by reason
pub static REJECTED_FRAMES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("rejected_frames_total", "Inbound frames that failed validation or routing")
            .namespace(NAMESPACE),
        &["reason"],
    )
    .expect("Failed to create REJECTED_FRAMES_TOTAL metric")
});

pub static HEARTBEAT_EVICTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new("heartbeat_evictions_total", "Sessions evicted by the liveness monitor")
            .namespace(NAMESPACE),
    )
    .expect("Failed to create HEARTBEAT_EVICTIONS_TOTAL metric")
});

pub static SESSIONS_REPLACED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new("sessions_replaced_total", "Sessions displaced by a newer connection")
            .namespace(NAMESPACE),
    )
    .expect("Failed to create SESSIONS_REPLACED_TOTAL metric")
});

/// Message store latency
pub static STORE_OPERATION_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5];
    HistogramVec::new(
        HistogramOpts::new(
            "store_operation_duration_seconds",
            "Message store latency in seconds",
        )
        .namespace(NAMESPACE)
        .buckets(buckets),
        &["backend", "operation"],
    )
    .expect("Failed to create STORE_OPERATION_DURATION_SECONDS metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("Failed to register HTTP_REQUESTS_TOTAL");
    registry
        .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
        .expect("Failed to register HTTP_REQUEST_DURATION_SECONDS");
    registry
        .register(Box::new(RELAY_STATE.clone()))
        .expect("Failed to register RELAY_STATE");
    registry
        .register(Box::new(INBOUND_FRAMES_TOTAL.clone()))
        .expect("Failed to register INBOUND_FRAMES_TOTAL");
    registry
        .register(Box::new(REJECTED_FRAMES_TOTAL.clone()))
        .expect("Failed to register REJECTED_FRAMES_TOTAL");
    registry
        .register(Box::new(HEARTBEAT_EVICTIONS_TOTAL.clone()))
        .expect("Failed to register HEARTBEAT_EVICTIONS_TOTAL");
    registry
        .register(Box::new(SESSIONS_REPLACED_TOTAL.clone()))
        .expect("Failed to register SESSIONS_REPLACED_TOTAL");
    registry
        .register(Box::new(STORE_OPERATION_DURATION_SECONDS.clone()))
        .expect("Failed to register STORE_OPERATION_DURATION_SECONDS");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Helper to record HTTP request metrics
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration_secs);
}

/// Helper to update the relay state gauges
pub fn set_relay_gauges(sessions: usize, rooms: usize, peer_links: usize) {
    RELAY_STATE.with_label_values(&["sessions"]).set(sessions as i64);
    RELAY_STATE.with_label_values(&["rooms"]).set(rooms as i64);
    RELAY_STATE
        .with_label_values(&["peer_links"])
        .set(peer_links as i64);
}

pub fn record_inbound(kind: &str) {
    INBOUND_FRAMES_TOTAL.with_label_values(&[kind]).inc();
}

pub fn record_rejected(reason: &str) {
    REJECTED_FRAMES_TOTAL.with_label_values(&[reason]).inc();
}

pub fn record_eviction() {
    HEARTBEAT_EVICTIONS_TOTAL.inc();
}

pub fn record_session_replaced() {
    SESSIONS_REPLACED_TOTAL.inc();
}

/// Helper to record message store metrics
pub fn record_store_operation(backend: &str, operation: &str, duration_secs: f64) {
    STORE_OPERATION_DURATION_SECONDS
        .with_label_values(&[backend, operation])
        .observe(duration_secs);
}
