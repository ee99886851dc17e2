//! Prometheus metrics for the game server.
//!
//! Metrics are recorded through the `metrics` facade and rendered in
//! Prometheus text format by the `/metrics` endpoint.
//!
//! # Metrics Categories
//!
//! - **Game Metrics**: Games created, active games, players joined
//! - **WebSocket Metrics**: Active and total connections, messages received
//! - **Protection Metrics**: Malformed and rate-limited messages

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the global Prometheus recorder.
///
/// The returned handle renders the current metric values on demand.
pub fn install_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))
}

// ============================================================================
// Game Metrics
// ============================================================================

pub fn games_created_total() {
    metrics::counter!("games_created_total").increment(1);
}

pub fn active_games(count: usize) {
    metrics::gauge!("active_games").set(count as f64);
}

pub fn players_joined_total() {
    metrics::counter!("players_joined_total").increment(1);
}

/// Count a game action the engine refused.
pub fn actions_rejected_total(reported: bool) {
    metrics::counter!("actions_rejected_total",
        "reported" => reported.to_string()
    )
    .increment(1);
}

// ============================================================================
// WebSocket Metrics
// ============================================================================

pub fn websocket_connected() {
    metrics::counter!("websocket_connections_total").increment(1);
    metrics::gauge!("websocket_connections_active").increment(1.0);
}

pub fn websocket_disconnected() {
    metrics::gauge!("websocket_connections_active").decrement(1.0);
}

pub fn websocket_messages_received() {
    metrics::counter!("websocket_messages_received").increment(1);
}

// ============================================================================
// Protection Metrics
// ============================================================================

pub fn malformed_messages_total() {
    metrics::counter!("malformed_messages_total").increment(1);
}

pub fn rate_limit_hits_total(limiter: &str) {
    metrics::counter!("rate_limit_hits_total",
        "limiter" => limiter.to_string()
    )
    .increment(1);
}
