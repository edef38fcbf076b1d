//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_breaker_rejections_total` (counter): requests refused by an open circuit
//! - `gateway_breaker_transitions_total` (counter): state changes by target state
//! - `gateway_upstream_errors_total` (counter): transport failures by kind
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a finished gateway request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record a request refused by the breaker.
pub fn record_rejection() {
    metrics::counter!("gateway_breaker_rejections_total").increment(1);
}

/// Record a breaker state change.
pub fn record_transition(to: &'static str) {
    metrics::counter!("gateway_breaker_transitions_total", "to" => to).increment(1);
}

/// Record an upstream transport failure.
pub fn record_upstream_error(kind: &'static str) {
    metrics::counter!("gateway_upstream_errors_total", "kind" => kind).increment(1);
}

/// Track how many endpoints the registry currently knows about.
pub fn record_tracked_endpoints(count: usize) {
    metrics::gauge!("gateway_breaker_endpoints").set(count as f64);
}
