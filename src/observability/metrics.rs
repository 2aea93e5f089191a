//! Metrics collection and exposition.
//!
//! # Metrics
//! - `switchyard_requests_total` (counter): dispatched requests by method, status, route
//! - `switchyard_request_duration_seconds` (histogram): dispatch latency by method
//! - `switchyard_rate_limited_total` (counter): rejected requests by reason
//! - `switchyard_validation_failures_total` (counter): failing fields
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Route label is the pattern template, never the raw path, to bound cardinality

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    counter!(
        "switchyard_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "route" => route.to_string()
    )
    .increment(1);

    histogram!("switchyard_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited(reason: &'static str) {
    counter!("switchyard_rate_limited_total", "reason" => reason).increment(1);
}

pub fn record_validation_failures(fields: usize) {
    counter!("switchyard_validation_failures_total").increment(fields as u64);
}
