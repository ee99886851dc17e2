//! Directory of active games.

use log::info;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tokio::sync::RwLock;

use super::guard::GameTable;
use crate::game::{GameError, GameId, GameSettings, PlayerId, SessionState};

/// Game metadata for discovery
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub id: GameId,
    pub state: SessionState,
    pub players: Vec<String>,
    pub max_players: usize,
    pub connected: usize,
    pub round_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ManagerError {
    #[error("game not found")]
    GameNotFound,
    #[error("too many active games")]
    TooManyGames,
    #[error(transparent)]
    Game(#[from] GameError),
}

/// Creates, finds and removes games. Cheap to clone.
#[derive(Clone)]
pub struct GameManager {
    tables: Arc<RwLock<HashMap<GameId, Arc<GameTable>>>>,
    settings: GameSettings,
    max_games: usize,
}

impl GameManager {
    #[must_use]
    pub fn new(settings: GameSettings, max_games: usize) -> Self {
        Self {
            tables: Arc::new(RwLock::new(HashMap::new())),
            settings,
            max_games,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    /// Create an empty game in the waiting state.
    pub async fn create_game(&self) -> Result<GameId, ManagerError> {
        let mut tables = self.tables.write().await;
        if tables.len() >= self.max_games {
            return Err(ManagerError::TooManyGames);
        }

        let id = GameId::new();
        tables.insert(id, Arc::new(GameTable::new(id, self.settings.clone())));
        info!("Created game {} ({} active)", id, tables.len());
        Ok(id)
    }

    pub async fn get_game(&self, id: GameId) -> Option<Arc<GameTable>> {
        self.tables.read().await.get(&id).cloned()
    }

    /// Add `name` to a waiting game.
    pub async fn join_game(&self, id: GameId, name: &str) -> Result<PlayerId, ManagerError> {
        let table = self.get_game(id).await.ok_or(ManagerError::GameNotFound)?;
        Ok(table.join(name).await?)
    }

    /// Snapshot of the directory. The directory lock is released before any
    /// game's own lock is taken, so a game in its reveal pause only delays
    /// the caller.
    fn tables_snapshot(tables: &HashMap<GameId, Arc<GameTable>>) -> Vec<Arc<GameTable>> {
        tables.values().cloned().collect()
    }

    pub async fn list_games(&self) -> Vec<GameSummary> {
        let tables = Self::tables_snapshot(&*self.tables.read().await);
        let mut summaries = Vec::with_capacity(tables.len());
        for table in tables {
            summaries.push(table.summary().await);
        }
        summaries
    }

    pub async fn remove_game(&self, id: GameId) -> Result<(), ManagerError> {
        match self.tables.write().await.remove(&id) {
            Some(_) => {
                info!("Removed game {}", id);
                Ok(())
            }
            None => Err(ManagerError::GameNotFound),
        }
    }

    /// Drop finished games nobody is connected to. Returns how many went.
    pub async fn prune_finished(&self) -> usize {
        let tables = Self::tables_snapshot(&*self.tables.read().await);
        let mut stale = Vec::new();
        for table in tables {
            let summary = table.summary().await;
            if summary.state == SessionState::Finished && summary.connected == 0 {
                stale.push(summary.id);
            }
        }

        let mut tables = self.tables.write().await;
        for id in &stale {
            tables.remove(id);
        }
        if !stale.is_empty() {
            info!("Pruned {} finished game(s)", stale.len());
        }
        stale.len()
    }

    pub async fn game_count(&self) -> usize {
        self.tables.read().await.len()
    }
}
