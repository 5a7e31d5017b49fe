//! Prometheus Metrics for the querybot gateway
//!
//! Exports metrics for:
//! - Message routing decisions
//! - Remote endpoint calls and latency
//! - Authentication negotiation and probes
//! - Session store size

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Encoder, Gauge,
    HistogramVec, TextEncoder,
};
use tracing::warn;

// ═══════════════════════════════════════════════════════════════════════════
// ROUTING METRICS
// ═══════════════════════════════════════════════════════════════════════════

/// Inbound messages by route (command name or natural_language)
pub static MESSAGES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "querybot_messages_total",
        "Inbound messages by route",
        &["route"]
    )
    .unwrap()
});

// ═══════════════════════════════════════════════════════════════════════════
// REMOTE ENDPOINT METRICS
// ═══════════════════════════════════════════════════════════════════════════

/// Remote calls by query kind and outcome
pub static REMOTE_CALLS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "querybot_remote_calls_total",
        "Remote endpoint calls by query kind and outcome",
        &["query_kind", "outcome"]
    )
    .unwrap()
});

/// Remote call latency
pub static REMOTE_LATENCY_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "querybot_remote_latency_seconds",
        "Remote endpoint call latency in seconds",
        &["query_kind"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 15.0, 30.0]
    )
    .unwrap()
});

// ═══════════════════════════════════════════════════════════════════════════
// AUTH METRICS
// ═══════════════════════════════════════════════════════════════════════════

/// Completed negotiations by outcome
pub static NEGOTIATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "querybot_negotiations_total",
        "Auth negotiations by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Individual probes by candidate kind and outcome
pub static AUTH_PROBES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "querybot_auth_probes_total",
        "Auth probes by candidate and outcome",
        &["candidate", "outcome"]
    )
    .unwrap()
});

// ═══════════════════════════════════════════════════════════════════════════
// SESSION METRICS
// ═══════════════════════════════════════════════════════════════════════════

pub static ACTIVE_SESSIONS: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!("querybot_active_sessions", "Sessions held in memory").unwrap()
});

/// Initialize all metrics (call at startup)
pub fn init_metrics() {
    let _ = &*MESSAGES_TOTAL;
    let _ = &*REMOTE_CALLS_TOTAL;
    let _ = &*REMOTE_LATENCY_SECONDS;
    let _ = &*NEGOTIATIONS_TOTAL;
    let _ = &*AUTH_PROBES_TOTAL;
    let _ = &*ACTIVE_SESSIONS;
}

/// Encode all metrics in Prometheus text format
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Record a routed message
pub fn record_message(route: &str) {
    MESSAGES_TOTAL.with_label_values(&[route]).inc();
}

/// Record a completed remote call
pub fn record_remote_call(query_kind: &str, outcome: &str, duration_secs: f64) {
    REMOTE_CALLS_TOTAL
        .with_label_values(&[query_kind, outcome])
        .inc();
    REMOTE_LATENCY_SECONDS
        .with_label_values(&[query_kind])
        .observe(duration_secs);
}

/// Record a finished negotiation
pub fn record_negotiation(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    NEGOTIATIONS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_auth_probe(candidate: &str, outcome: &str) {
    AUTH_PROBES_TOTAL
        .with_label_values(&[candidate, outcome])
        .inc();
}

pub fn set_active_sessions(count: usize) {
    ACTIVE_SESSIONS.set(count as f64);
}
