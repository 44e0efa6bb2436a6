//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_upstream_requests_total` (counter): proxied requests by upstream, status
//! - `edge_upstream_duration_seconds` (histogram): time to upstream response headers
//! - `edge_upstream_failures_total` (counter): transport failures by kind
//! - `edge_rate_limited_total` (counter): requests denied by the rate limiter
//! - `edge_rate_limit_clients` (gauge): client buckets currently tracked
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Prometheus exporter runs on its own listener, off the request path

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Prometheus metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_upstream_response(upstream: &str, status: u16, start: Instant) {
    counter!(
        "edge_upstream_requests_total",
        "upstream" => upstream.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("edge_upstream_duration_seconds", "upstream" => upstream.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_failure(kind: &'static str) {
    counter!("edge_upstream_failures_total", "kind" => kind).increment(1);
}

pub fn record_rate_limited() {
    counter!("edge_rate_limited_total").increment(1);
}

pub fn record_tracked_clients(count: usize) {
    gauge!("edge_rate_limit_clients").set(count as f64);
}
