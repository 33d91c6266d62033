//! Prometheus metrics for the bingo server.
//!
//! When `METRICS_BIND` is configured, a Prometheus scrape endpoint is
//! served on that address and the counters below are exported.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus exporter on `addr`. Metrics are served at
/// `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("failed to install Prometheus exporter: {e}"))
}

/// A round was created by an administrator.
pub fn round_created() {
    metrics::counter!("bingo_rounds_created_total").increment(1);
}

/// A user registered for a round.
pub fn registration_completed() {
    metrics::counter!("bingo_registrations_total").increment(1);
}

/// A claim resolved, accepted or rejected.
pub fn claim_resolved(accepted: bool) {
    let outcome = if accepted { "accepted" } else { "rejected" };
    metrics::counter!("bingo_claims_total", "outcome" => outcome).increment(1);
}

/// A WebSocket session joined a round channel.
pub fn ws_session_opened() {
    metrics::gauge!("bingo_ws_sessions").increment(1.0);
}

/// A WebSocket session left a round channel.
pub fn ws_session_closed() {
    metrics::gauge!("bingo_ws_sessions").decrement(1.0);
}
