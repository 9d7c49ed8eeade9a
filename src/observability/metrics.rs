//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): completed requests by method, status,
//!   route
//! - `proxy_request_duration_seconds` (histogram): end-to-end latency
//! - `proxy_forward_attempts_total` (counter): per-attempt outcomes by
//!   backend and result (ok / error / timeout / retryable_status)
//! - `proxy_backend_health` (gauge): 1=healthy, 0=unhealthy per backend
//! - `proxy_circuit_state` (gauge): 0=closed, 1=open, 2=half_open
//!
//! # Design Decisions
//! - The `metrics` facade keeps recording sites cheap and decoupled from the
//!   exporter; recorder installation happens once at startup
//! - Label cardinality stays bounded: backend addresses and service names
//!   only, never request paths

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::resilience::CircuitState;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(address: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(address)
        .install()?;
    tracing::info!(%address, "Metrics endpoint listening");
    Ok(())
}

/// Record a completed (or refused) client request.
pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "route" => route.to_string(),
    )
    .increment(1);
    histogram!(
        "proxy_request_duration_seconds",
        "route" => route.to_string(),
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record one forwarding attempt against a backend.
pub fn record_attempt(service: &str, backend: &str, outcome: &'static str) {
    counter!(
        "proxy_forward_attempts_total",
        "service" => service.to_string(),
        "backend" => backend.to_string(),
        "outcome" => outcome,
    )
    .increment(1);
}

/// Record a backend's health flag.
pub fn record_backend_health(service: &str, backend: &str, healthy: bool) {
    gauge!(
        "proxy_backend_health",
        "service" => service.to_string(),
        "backend" => backend.to_string(),
    )
    .set(if healthy { 1.0 } else { 0.0 });
}

/// Record a backend's circuit state.
pub fn record_circuit_state(service: &str, backend: &str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::Open => 1.0,
        CircuitState::HalfOpen => 2.0,
    };
    gauge!(
        "proxy_circuit_state",
        "service" => service.to_string(),
        "backend" => backend.to_string(),
    )
    .set(value);
}
