//! Game directory API handlers.
//!
//! # Examples
//!
//! Create a game:
//! ```bash
//! curl -X POST http://localhost:8080/api/games
//! ```
//!
//! Join it:
//! ```bash
//! curl -X POST http://localhost:8080/api/games/join \
//!   -H "Content-Type: application/json" \
//!   -d '{"gameId": "<id>", "playerName": "alice"}'
//! ```

use axum::{Json, extract::State, http::StatusCode};
use liars_deck::{GameId, GameSummary, ManagerError, PlayerId};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::metrics;

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameResponse {
    pub game_id: GameId,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinGameRequest {
    pub game_id: GameId,
    pub player_name: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinGameResponse {
    pub player_id: PlayerId,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

/// Create an empty game.
///
/// # Response
///
/// Returns `200 OK` with `{"gameId": "..."}`.
///
/// # Errors
///
/// - `503 Service Unavailable`: The server is at its game limit
pub async fn create_game(
    State(state): State<AppState>,
) -> Result<Json<CreateGameResponse>, ApiError> {
    match state.game_manager.create_game().await {
        Ok(game_id) => {
            metrics::games_created_total();
            metrics::active_games(state.game_manager.game_count().await);
            Ok(Json(CreateGameResponse { game_id }))
        }
        Err(e) => {
            warn!("Failed to create game: {}", e);
            Err(api_error(StatusCode::SERVICE_UNAVAILABLE, e))
        }
    }
}

/// Join a waiting game under a display name.
///
/// # Response
///
/// Returns `200 OK` with `{"playerId": "..."}`.
///
/// # Errors
///
/// - `404 Not Found`: Game doesn't exist
/// - `400 Bad Request`: Game is full or started, or the name is empty
pub async fn join_game(
    State(state): State<AppState>,
    Json(request): Json<JoinGameRequest>,
) -> Result<Json<JoinGameResponse>, ApiError> {
    match state
        .game_manager
        .join_game(request.game_id, &request.player_name)
        .await
    {
        Ok(player_id) => {
            info!(
                "{} joined game {} as {}",
                request.player_name, request.game_id, player_id
            );
            metrics::players_joined_total();
            Ok(Json(JoinGameResponse { player_id }))
        }
        Err(e @ ManagerError::GameNotFound) => Err(api_error(StatusCode::NOT_FOUND, e)),
        Err(e) => Err(api_error(StatusCode::BAD_REQUEST, e)),
    }
}

/// List every game with its roster and state.
pub async fn list_games(State(state): State<AppState>) -> Json<Vec<GameSummary>> {
    Json(state.game_manager.list_games().await)
}
