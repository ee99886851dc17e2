//! Per-player projections of a game session.
//!
//! A view is derived fresh from the session whenever it's sent. The viewer's
//! own entry carries their hand, their elimination mechanism state, and their
//! opinions; every other entry only exposes a hand count.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::{
    entities::{Card, GameId, Player, PlayerId, SessionState},
    session::GameSession,
};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub alive: bool,
    pub hand_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hand: Option<Vec<Card>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bullet_position: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_bullet_position: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opinions: Option<HashMap<PlayerId, String>>,
}

impl PlayerView {
    fn project(player: &Player, is_viewer: bool) -> Self {
        let mut view = Self {
            id: player.id,
            name: player.name.clone(),
            alive: player.alive,
            hand_count: player.hand.len(),
            hand: None,
            bullet_position: None,
            current_bullet_position: None,
            opinions: None,
        };
        if is_viewer {
            view.hand = Some(player.hand.clone());
            view.bullet_position = Some(player.revolver.bullet_position());
            view.current_bullet_position = Some(player.revolver.current_position());
            view.opinions = Some(player.opinions.clone());
        }
        view
    }
}

/// Everything one player is allowed to know about a game.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub id: GameId,
    pub state: SessionState,
    pub current_player_idx: usize,
    pub round_count: u32,
    pub game_over: bool,
    pub target_card: Option<Card>,
    pub players: BTreeMap<PlayerId, PlayerView>,
    pub player_order: Vec<PlayerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
}

impl GameView {
    /// The viewer's own entry, if they're part of the game.
    #[must_use]
    pub fn me(&self, viewer: &PlayerId) -> Option<&PlayerView> {
        self.players.get(viewer)
    }
}

/// Project `session` for `viewer`. Unknown viewers see every hand hidden.
#[must_use]
pub fn project(session: &GameSession, viewer: &PlayerId) -> GameView {
    let players = session
        .players()
        .map(|player| (player.id, PlayerView::project(player, &player.id == viewer)))
        .collect();

    GameView {
        id: session.id(),
        state: session.state(),
        current_player_idx: session.current_player_idx(),
        round_count: session.round_count(),
        game_over: session.is_game_over(),
        target_card: session.target_card(),
        players,
        player_order: session.player_order().to_vec(),
        winner: session.winner().map(|player| player.name.clone()),
    }
}
