//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): inbound requests by method, status, streaming
//! - `relay_request_duration_seconds` (histogram): time to response headers
//! - `relay_upstream_retries_total` (counter): retried attempts by failure reason
//! - `relay_upstream_exhausted_total` (counter): requests answered 502 after
//!   every attempt failed
//!
//! Recording is a no-op until a recorder is installed by [`init_metrics`].

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, streaming: bool, start: Instant) {
    counter!(
        "relay_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "streaming" => streaming.to_string()
    )
    .increment(1);
    histogram!("relay_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_retry(reason: &'static str) {
    counter!("relay_upstream_retries_total", "reason" => reason).increment(1);
}

pub fn record_exhausted() {
    counter!("relay_upstream_exhausted_total").increment(1);
}
