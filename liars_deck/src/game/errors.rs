//! Errors produced by game session operations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::entities::Card;

/// Reasons a session operation was refused. A refused operation never
/// leaves a partial mutation behind.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum GameError {
    #[error("game is full")]
    CapacityReached,
    #[error("game already in progress")]
    GameAlreadyStarted,
    #[error("game is over")]
    GameOver,
    #[error("game is not in progress")]
    NotPlaying,
    #[error("need {min}-{max} players to start")]
    PlayerCountOutOfRange { min: usize, max: usize },
    #[error("player name can't be empty")]
    EmptyName,
    #[error("not your turn")]
    OutOfTurnAction,
    #[error("waiting on a challenge decision")]
    AwaitingChallenge,
    #[error("no play to challenge")]
    NoPendingPlay,
    #[error("must play at least one card")]
    NoCardsPlayed,
    #[error("you don't have a {0}")]
    CardNotInHand(Card),
    #[error("player does not exist")]
    UnknownPlayer,
    #[error("player has been eliminated")]
    PlayerEliminated,
    #[error("no eligible player made the previous play")]
    NoPreviousPlayer,
}

impl GameError {
    /// Whether the offending player should get an `error` reply. Everything
    /// else (out-of-turn and out-of-state actions) is dropped silently.
    #[must_use]
    pub fn is_reported(&self) -> bool {
        matches!(self, Self::CardNotInHand(_) | Self::NoCardsPlayed)
    }
}
