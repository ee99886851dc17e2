//! HTTP/WebSocket API for the game server.
//!
//! # Modules
//!
//! - [`games`]: Game directory (create, join, list)
//! - [`websocket`]: Real-time play over one WebSocket per player
//! - [`rate_limiter`]: Per-connection message rate limiting
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /health                          - Health check
//! GET  /metrics                         - Prometheus metrics
//! GET  /api/games                       - List games
//! POST /api/games                       - Create game
//! POST /api/games/join                  - Join game
//! GET  /ws?gameId=<id>&playerId=<id>    - WebSocket
//! GET  /*                               - Static assets
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively. Browsers load the client from the same
//! origin in the default setup.

pub mod games;
pub mod rate_limiter;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use liars_deck::GameManager;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::{path::PathBuf, sync::Arc};
use tower_http::{cors::CorsLayer, services::ServeDir};

/// Application state shared across all HTTP handlers and WebSocket connections.
#[derive(Clone)]
pub struct AppState {
    pub game_manager: Arc<GameManager>,
    /// `None` when metrics are disabled
    pub metrics_handle: Option<PrometheusHandle>,
    pub static_dir: PathBuf,
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.static_dir);

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/games", get(games::list_games).post(games::create_game))
        .route("/api/games/join", post(games::join_game))
        .route("/ws", get(websocket::websocket_handler))
        .fallback_service(static_files)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","version":"0.1.0","games":{"active_count":3},"timestamp":"..."}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let game_count = state.game_manager.game_count().await;

    let response = json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "games": {
            "active_count": game_count
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (StatusCode::OK, Json(response))
}

/// Render metrics in Prometheus text format.
async fn metrics_endpoint(State(state): State<AppState>) -> Response {
    match &state.metrics_handle {
        Some(handle) => (StatusCode::OK, handle.render()).into_response(),
        None => (StatusCode::NOT_FOUND, "Metrics are disabled").into_response(),
    }
}
