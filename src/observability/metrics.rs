//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dispatch_requests_total` (counter): requests routed, by route
//! - `dispatch_fallback_total` (counter): requests handed to the fallback
//! - `dispatch_handler_swaps_total` (counter): pipeline detach/attach swaps
//! - `dispatch_continue_total` (counter): `100-continue` short-circuits
//! - `dispatch_instantiation_failures_total` (counter): factory failures, by route
//! - `connections_active` (gauge): open connections
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; no-ops until a recorder is installed
//! - Prometheus exporter is optional

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_dispatch(route: &str) {
    counter!("dispatch_requests_total", "route" => route.to_string()).increment(1);
}

pub fn record_fallback() {
    counter!("dispatch_fallback_total").increment(1);
}

pub fn record_swap() {
    counter!("dispatch_handler_swaps_total").increment(1);
}

pub fn record_continue() {
    counter!("dispatch_continue_total").increment(1);
}

pub fn record_instantiation_failure(route: &str) {
    counter!("dispatch_instantiation_failures_total", "route" => route.to_string()).increment(1);
}

pub fn connection_opened() {
    gauge!("connections_active").increment(1.0);
}

pub fn connection_closed() {
    gauge!("connections_active").decrement(1.0);
}
