//! Audit log of a game, one record per round.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::entities::{Card, GameId, PlayerId};

/// A player's private state when a round was dealt.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInitialState {
    pub player_id: PlayerId,
    pub player_name: String,
    pub bullet_position: u8,
    pub current_gun_position: u8,
    pub initial_hand: Vec<Card>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayAction {
    pub player_id: PlayerId,
    pub player_name: String,
    pub played_cards: Vec<Card>,
    pub remaining_cards: Vec<Card>,
    pub next_player_id: Option<PlayerId>,
    pub next_player_name: Option<String>,
    pub was_challenged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge_reason: Option<String>,
    /// Whether the challenge caught a bluff.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge_result: Option<bool>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShootingResult {
    pub shooter_id: PlayerId,
    pub shooter_name: String,
    pub bullet_hit: bool,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundRecord {
    pub round_id: u32,
    pub target_card: Card,
    pub round_players: Vec<PlayerId>,
    pub starting_player_id: PlayerId,
    pub starting_player_name: String,
    pub player_initial_states: Vec<PlayerInitialState>,
    pub player_opinions: HashMap<PlayerId, HashMap<PlayerId, String>>,
    pub play_history: Vec<PlayAction>,
    /// Set when the round ended in a penalty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_result: Option<ShootingResult>,
    pub started_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub game_id: GameId,
    pub player_names: Vec<String>,
    pub rounds: Vec<RoundRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
}

impl GameRecord {
    #[must_use]
    pub fn new(game_id: GameId) -> Self {
        Self {
            game_id,
            player_names: Vec::new(),
            rounds: Vec::new(),
            winner: None,
        }
    }

    pub fn current_round_mut(&mut self) -> Option<&mut RoundRecord> {
        self.rounds.last_mut()
    }

    /// The most recent play of the current round.
    pub fn last_play_mut(&mut self) -> Option<&mut PlayAction> {
        self.current_round_mut()
            .and_then(|round| round.play_history.last_mut())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
