//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define proxy metrics (connections, rejections, sessions, bytes)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `proxy_connections_total` (counter): accepted connections
//! - `proxy_handshakes_rejected_total` (counter): refused handshakes by reason
//! - `proxy_sessions_total` (counter): routed sessions by kind and route
//! - `proxy_session_errors_total` (counter): failed sessions by kind
//! - `proxy_backend_dial_failures_total` (counter): failed dials by route
//! - `proxy_relay_bytes_total` (counter): relayed bytes by direction
//! - `proxy_active_connections` (gauge): current session count
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until an
//!   exporter is installed
//! - Labels for route, session kind, rejection reason

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter and serve it on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_connection() {
    metrics::counter!("proxy_connections_total").increment(1);
}

pub fn record_rejected_handshake(reason: &'static str) {
    metrics::counter!("proxy_handshakes_rejected_total", "reason" => reason).increment(1);
}

pub fn record_session(kind: &'static str, route: &str) {
    metrics::counter!("proxy_sessions_total", "kind" => kind, "route" => route.to_string()).increment(1);
}

pub fn record_session_error(kind: &'static str) {
    metrics::counter!("proxy_session_errors_total", "kind" => kind).increment(1);
}

pub fn record_dial_failure(route: &str) {
    metrics::counter!("proxy_backend_dial_failures_total", "route" => route.to_string()).increment(1);
}

pub fn record_relay_bytes(direction: &'static str, bytes: u64) {
    metrics::counter!("proxy_relay_bytes_total", "direction" => direction).increment(bytes);
}

pub fn set_active_connections(count: u64) {
    metrics::gauge!("proxy_active_connections").set(count as f64);
}
