//! JSON message protocol spoken between players and a game session.
//!
//! Both directions are internally tagged by a `type` field. Outbound field
//! names are camelCase to match the browser client.

use serde::{Deserialize, Serialize};

use crate::game::{
    entities::{Card, PlayerId},
    views::GameView,
};

/// Messages a player sends to their game.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    StartGame,
    PlayCards {
        cards: Vec<Card>,
    },
    Challenge {
        challenge: bool,
        #[serde(default)]
        reason: String,
    },
    /// Free-text note about another player, kept on the sender's record.
    Opinion {
        about: PlayerId,
        opinion: String,
    },
}

/// Messages a game sends to its players.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// The recipient's own snapshot of the game.
    GameState { state: Box<GameView> },
    PlayAction {
        player_name: String,
        card_count: usize,
        target_card: Card,
        next_player: String,
        /// Only present in the copy sent to the player who made the play.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        played_cards: Option<Vec<Card>>,
    },
    ChallengeRequest {
        player_name: String,
        card_count: usize,
        target_card: Card,
    },
    ChallengeResult {
        challenger_name: String,
        was_challenged: bool,
        challenge_reason: String,
        /// Whether the accusation was right, i.e. the play was a bluff.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        challenge_success: Option<bool>,
    },
    ShootingResult {
        shooter_name: String,
        bullet_hit: bool,
    },
    SystemChallenge {
        player_name: String,
        /// True when the play broke the rules and the player gets penalized.
        challenge_valid: bool,
        played_cards: Vec<Card>,
    },
    GameOver { winner_name: String },
    YourTurn { message: String },
    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Wire name of this message, as found in its `type` field.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GameState { .. } => "game_state",
            Self::PlayAction { .. } => "play_action",
            Self::ChallengeRequest { .. } => "challenge_request",
            Self::ChallengeResult { .. } => "challenge_result",
            Self::ShootingResult { .. } => "shooting_result",
            Self::SystemChallenge { .. } => "system_challenge",
            Self::GameOver { .. } => "game_over",
            Self::YourTurn { .. } => "your_turn",
            Self::Error { .. } => "error",
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
