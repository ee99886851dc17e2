//! WebSocket transport for live play.
//!
//! # Connection Flow
//!
//! 1. Client joins over HTTP and gets a `playerId`
//! 2. Client connects via `GET /ws?gameId=<id>&playerId=<id>`
//! 3. Server attaches an outbound channel to the game and sends a snapshot
//! 4. A send task drains the channel into text frames while the receive loop
//!    forwards parsed client messages to the game
//! 5. On disconnect the channel is detached. The player stays in the game.
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket(`ws://localhost:8080/ws?gameId=${gameId}&playerId=${playerId}`);
//!
//! ws.onmessage = (event) => {
//!   const data = JSON.parse(event.data);
//!   if (data.type === "game_state") {
//!     render(data.state);
//!   }
//! };
//!
//! ws.send(JSON.stringify({ type: "play_cards", cards: ["Q", "Joker"] }));
//! ```

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use liars_deck::{ClientMessage, GameId, GameTable, PlayerId, ServerMessage};
use log::{error, info, warn};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::{AppState, rate_limiter::RateLimiter};
use crate::{logging, metrics};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsQuery {
    game_id: Option<String>,
    player_id: Option<String>,
}

/// Upgrade HTTP connection to WebSocket for a joined player.
///
/// # Response
///
/// - `400 Bad Request` if either query parameter is missing
/// - `101 Switching Protocols` otherwise. An unknown game or player gets an
///   `error` frame and the socket is closed.
pub async fn websocket_handler(
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Response {
    let (Some(game_id), Some(player_id)) = (query.game_id, query.player_id) else {
        return (StatusCode::BAD_REQUEST, "Missing gameId or playerId").into_response();
    };

    ws.on_upgrade(move |socket| handle_socket(socket, game_id, player_id, state))
}

/// Look up the game and check that the player belongs to it.
async fn resolve(
    state: &AppState,
    game_id: &str,
    player_id: &str,
) -> Result<(Arc<GameTable>, PlayerId), &'static str> {
    let game_id: GameId = game_id.parse().map_err(|_| "Invalid gameId")?;
    let player_id: PlayerId = player_id.parse().map_err(|_| "Invalid playerId")?;
    let table = state
        .game_manager
        .get_game(game_id)
        .await
        .ok_or("Game not found")?;
    Ok((table, player_id))
}

/// Send an `error` frame and close the socket.
async fn reject(mut sender: SplitSink<WebSocket, Message>, reason: &str) {
    if let Ok(json) = ServerMessage::error(reason).to_json() {
        let _ = sender.send(Message::Text(json.into())).await;
    }
    let _ = sender.close().await;
}

async fn handle_socket(socket: WebSocket, game_id: String, player_id: String, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let (table, player) = match resolve(&state, &game_id, &player_id).await {
        Ok(resolved) => resolved,
        Err(reason) => {
            warn!("Rejected WebSocket for game {}: {}", game_id, reason);
            reject(sender, reason).await;
            return;
        }
    };

    // Every outbound message for this player goes through this channel so
    // frames keep the order the game produced them in.
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let replies = tx.clone();
    if let Err(e) = table.connect(player, tx).await {
        warn!("Rejected WebSocket for game {}: {}", game_id, e);
        reject(sender, "Player not found").await;
        return;
    }

    logging::log_connection_event("connected", &game_id, &player_id);
    metrics::websocket_connected();

    let send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let json = match message.to_json() {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize {} message: {}", message.kind(), e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let mut burst_limiter = RateLimiter::burst();
    let mut sustained_limiter = RateLimiter::sustained();

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                metrics::websocket_messages_received();

                if !burst_limiter.check() {
                    logging::log_rate_limited("burst", &game_id, &player_id);
                    metrics::rate_limit_hits_total("burst");
                    let _ = replies.send(ServerMessage::error(
                        "Rate limit exceeded. Please slow down.",
                    ));
                    continue;
                }

                if !sustained_limiter.check() {
                    logging::log_rate_limited("sustained", &game_id, &player_id);
                    metrics::rate_limit_hits_total("sustained");
                    let _ = replies.send(ServerMessage::error(
                        "Too many messages. Please wait before sending more.",
                    ));
                    continue;
                }

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(message) => {
                        if let Err(e) = table.handle_message(&player, message).await {
                            metrics::actions_rejected_total(e.is_reported());
                        }
                    }
                    Err(e) => {
                        warn!("Failed to parse message from {}: {}", player_id, e);
                        metrics::malformed_messages_total();
                        let _ = replies.send(ServerMessage::error("Invalid message format"));
                    }
                }
            }
            Ok(Message::Close(_)) => {
                info!("WebSocket closed: game={}, player={}", game_id, player_id);
                break;
            }
            Err(e) => {
                warn!("WebSocket error: {}", e);
                break;
            }
            _ => {}
        }
    }

    table.disconnect(&player, &replies).await;
    drop(replies);
    send_task.abort();

    metrics::websocket_disconnected();
    logging::log_connection_event("disconnected", &game_id, &player_id);
}
