//! Prometheus metrics for the edge gatekeeper.
//!
//! Metrics are exposed by a dedicated listener when `METRICS_PORT > 0`.
//! Recording functions are cheap no-ops until the exporter is installed.
//!
//! # Available Metrics
//!
//! ## Counters
//! - `edge_requests_total` - Completed requests (labels: method, path, status)
//! - `edge_rate_limited_total` - Throttled requests (label: path)
//! - `edge_upstream_unavailable_total` - Relay calls that never reached the backend (label: endpoint)
//!
//! ## Histograms
//! - `edge_request_duration_seconds` - Request duration (labels: method, path, status)
//!
//! ## Gauges
//! - `edge_rate_limit_records` - Live rate-limit records after the last sweep

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{error, info};

/// Metric names as constants for consistency.
pub mod names {
    pub const REQUESTS_TOTAL: &str = "edge_requests_total";
    pub const REQUEST_DURATION_SECONDS: &str = "edge_request_duration_seconds";
    pub const RATE_LIMITED_TOTAL: &str = "edge_rate_limited_total";
    pub const UPSTREAM_UNAVAILABLE_TOTAL: &str = "edge_upstream_unavailable_total";
    pub const RATE_LIMIT_RECORDS: &str = "edge_rate_limit_records";
}

/// Install the Prometheus exporter and describe every metric.
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(names::REQUESTS_TOTAL, "Total number of completed edge requests");
    describe_counter!(
        names::RATE_LIMITED_TOTAL,
        "Total number of requests rejected by the rate limiter"
    );
    describe_counter!(
        names::UPSTREAM_UNAVAILABLE_TOTAL,
        "Total number of relay calls that could not reach the backend"
    );
    describe_histogram!(
        names::REQUEST_DURATION_SECONDS,
        "Edge request duration in seconds"
    );
    describe_gauge!(
        names::RATE_LIMIT_RECORDS,
        "Rate-limit records held in memory after the last sweep"
    );

    info!(addr = %metrics_addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Try to initialize metrics, logging any errors but not failing.
pub fn try_init_metrics(metrics_addr: SocketAddr) {
    if let Err(e) = init_metrics(metrics_addr) {
        error!(error = %e, "Failed to initialize metrics, continuing without metrics");
    }
}

pub fn record_request(method: &str, path: &str, status: u16) {
    counter!(names::REQUESTS_TOTAL, "method" => method.to_string(), "path" => path.to_string(), "status" => status.to_string())
        .increment(1);
}

pub fn record_request_duration(method: &str, path: &str, status: u16, duration_secs: f64) {
    histogram!(names::REQUEST_DURATION_SECONDS, "method" => method.to_string(), "path" => path.to_string(), "status" => status.to_string())
        .record(duration_secs);
}

pub fn record_rate_limited(path: &str) {
    counter!(names::RATE_LIMITED_TOTAL, "path" => path.to_string()).increment(1);
}

pub fn record_upstream_unavailable(endpoint: &str) {
    counter!(names::UPSTREAM_UNAVAILABLE_TOTAL, "endpoint" => endpoint.to_string()).increment(1);
}

// Precision loss above 2^53 records is irrelevant here
#[allow(clippy::cast_precision_loss)]
pub fn set_rate_limit_records(count: usize) {
    gauge!(names::RATE_LIMIT_RECORDS).set(count as f64);
}
