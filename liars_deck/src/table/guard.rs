//! A game session behind a lock, with its players' connections.

use log::debug;
use std::collections::HashMap;
use tokio::sync::{RwLock, mpsc};

use super::manager::GameSummary;
use crate::{
    game::{
        Dispatch, GameError, GameId, GameRecord, GameSession, GameSettings, GameView, Outbox,
        PlayerId,
    },
    net::messages::{ClientMessage, ServerMessage},
};

/// Outgoing half of a player's connection.
pub type Outgoing = mpsc::UnboundedSender<ServerMessage>;

struct TableInner {
    session: GameSession,
    connections: HashMap<PlayerId, Outgoing>,
}

impl TableInner {
    /// Deliver `outbox` in order. Connections whose receiver is gone are
    /// dropped along the way.
    async fn flush(&mut self, outbox: Outbox) {
        for dispatch in outbox {
            match dispatch {
                Dispatch::To(player_id, message) => self.send(&player_id, message),
                Dispatch::All(message) => self.broadcast(&message),
                Dispatch::Pause(delay) => tokio::time::sleep(delay).await,
            }
        }
    }

    fn send(&mut self, player_id: &PlayerId, message: ServerMessage) {
        let Some(sender) = self.connections.get(player_id) else {
            return;
        };
        if sender.send(message).is_err() {
            debug!("Player {} disconnected, removing connection", player_id);
            self.connections.remove(player_id);
        }
    }

    fn broadcast(&mut self, message: &ServerMessage) {
        self.connections
            .retain(|player_id, sender| match sender.send(message.clone()) {
                Ok(()) => true,
                Err(_) => {
                    debug!("Player {} disconnected, removing connection", player_id);
                    false
                }
            });
    }
}

/// One game: the session plus the outgoing channel of every connected
/// player.
pub struct GameTable {
    id: GameId,
    inner: RwLock<TableInner>,
}

impl GameTable {
    #[must_use]
    pub fn new(id: GameId, settings: GameSettings) -> Self {
        Self::from_session(GameSession::new(id, settings))
    }

    #[must_use]
    pub fn from_session(session: GameSession) -> Self {
        Self {
            id: session.id(),
            inner: RwLock::new(TableInner {
                session,
                connections: HashMap::new(),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> GameId {
        self.id
    }

    /// Add a player to the roster and tell connected players about it.
    pub async fn join(&self, name: &str) -> Result<PlayerId, GameError> {
        let mut inner = self.inner.write().await;
        let (player_id, outbox) = inner.session.join(name)?;
        inner.flush(outbox).await;
        Ok(player_id)
    }

    /// Attach `sender` as `player_id`'s connection, replacing any previous
    /// one, and send them a snapshot of the game.
    pub async fn connect(&self, player_id: PlayerId, sender: Outgoing) -> Result<(), GameError> {
        let mut inner = self.inner.write().await;
        if inner.session.player(&player_id).is_none() {
            return Err(GameError::UnknownPlayer);
        }

        let snapshot = ServerMessage::GameState {
            state: Box::new(inner.session.view_for(&player_id)),
        };
        if inner.connections.insert(player_id, sender).is_some() {
            debug!("Game {}: player {} reconnected", self.id, player_id);
        }
        inner.send(&player_id, snapshot);
        Ok(())
    }

    /// Detach `player_id` if `sender` is still their connection. A socket
    /// that was replaced by a reconnect leaves the newer one alone.
    pub async fn disconnect(&self, player_id: &PlayerId, sender: &Outgoing) {
        let mut inner = self.inner.write().await;
        if inner
            .connections
            .get(player_id)
            .is_some_and(|current| current.same_channel(sender))
        {
            inner.connections.remove(player_id);
            debug!("Game {}: player {} disconnected", self.id, player_id);
        }
    }

    /// Run one inbound message through the session and deliver the result.
    ///
    /// Illegal plays are answered with an `error` message to the sender.
    /// Every other refusal is dropped without a reply. Either way the error
    /// is returned so the transport can account for it.
    pub async fn handle_message(
        &self,
        player_id: &PlayerId,
        message: ClientMessage,
    ) -> Result<(), GameError> {
        let mut inner = self.inner.write().await;
        match inner.session.handle_message(player_id, message) {
            Ok(outbox) => {
                inner.flush(outbox).await;
                Ok(())
            }
            Err(error) => {
                if error.is_reported() {
                    inner.send(player_id, ServerMessage::error(error.to_string()));
                } else {
                    debug!(
                        "Game {}: ignored message from {}: {}",
                        self.id, player_id, error
                    );
                }
                Err(error)
            }
        }
    }

    pub async fn view(&self, viewer: &PlayerId) -> GameView {
        self.inner.read().await.session.view_for(viewer)
    }

    pub async fn record(&self) -> GameRecord {
        self.inner.read().await.session.record().clone()
    }

    pub async fn connected_count(&self) -> usize {
        self.inner.read().await.connections.len()
    }

    pub async fn summary(&self) -> GameSummary {
        let inner = self.inner.read().await;
        let session = &inner.session;
        GameSummary {
            id: self.id,
            state: session.state(),
            players: session.players().map(|p| p.name.clone()).collect(),
            max_players: session.settings().max_players,
            connected: inner.connections.len(),
            round_count: session.round_count(),
            winner: session.winner().map(|p| p.name.clone()),
        }
    }
}
