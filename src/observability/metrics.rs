//! Metrics collection and exposition.
//!
//! # Metrics
//! - `hostgate_requests_total` (counter): requests by dispatch branch, status
//! - `hostgate_request_duration_seconds` (histogram): latency by branch
//! - `hostgate_active_connections` (gauge): accepted, not yet closed
//! - `hostgate_websocket_sessions` (gauge): sessions owned by a handler
//! - `hostgate_handler_faults_total` (counter): handler errors and panics
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - The Prometheus exporter is opt-in via configuration

use std::net::SocketAddr;
use std::time::Instant;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder with its own HTTP listener.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed request.
pub fn record_request(branch: &'static str, status: u16, start: Instant) {
    counter!(
        "hostgate_requests_total",
        "branch" => branch,
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("hostgate_request_duration_seconds", "branch" => branch)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_handler_fault(kind: &'static str) {
    counter!("hostgate_handler_faults_total", "kind" => kind).increment(1);
}

pub fn connection_opened() {
    gauge!("hostgate_active_connections").increment(1.0);
}

pub fn connection_closed() {
    gauge!("hostgate_active_connections").decrement(1.0);
}

pub fn websocket_opened() {
    gauge!("hostgate_websocket_sessions").increment(1.0);
}

pub fn websocket_closed() {
    gauge!("hostgate_websocket_sessions").decrement(1.0);
}
