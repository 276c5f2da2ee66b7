//! Prometheus metrics for proxied traffic.
//!
//! Recording goes through the `metrics` facade and is a no-op until
//! [`install_exporter`] registers a recorder.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder with its own scrape listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn install_exporter(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()
}

/// Count one proxied request by kind (`manifest`, `segment`, `invalid`) and status.
pub fn record_request(kind: &'static str, status: u16) {
    counter!("hls_proxy_requests_total", "kind" => kind, "status" => status.to_string())
        .increment(1);
}

pub fn record_duration(kind: &'static str, start: Instant) {
    histogram!("hls_proxy_request_duration_seconds", "kind" => kind)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_origin_error() {
    counter!("hls_proxy_origin_errors_total").increment(1);
}

pub fn record_rewritten_lines(count: usize) {
    counter!("hls_proxy_rewritten_lines_total").increment(count as u64);
}
