//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, latency, failures, rewrites)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `gateway_requests_total` (counter): total requests by method, status
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_signature_failures_total` (counter): rejected signatures
//! - `gateway_upstream_errors_total` (counter): transport failures by kind
//! - `gateway_body_rewrites_total` (counter): responses changed by the strategy
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Low-overhead metric updates (atomic operations)

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_signature_failure() {
    counter!("gateway_signature_failures_total").increment(1);
}

pub fn record_upstream_error(kind: &'static str) {
    counter!("gateway_upstream_errors_total", "kind" => kind).increment(1);
}

pub fn record_body_rewrite(strategy: &'static str) {
    counter!("gateway_body_rewrites_total", "strategy" => strategy).increment(1);
}
