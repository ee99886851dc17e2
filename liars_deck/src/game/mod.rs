//! Game engine for the bluffing card game.
//!
//! This module provides:
//! - Card, deck and elimination mechanism primitives
//! - The session state machine with the play and challenge protocol
//! - Per-player views and the per-round audit record

pub mod constants;
pub mod entities;
pub mod errors;
pub mod outbox;
pub mod record;
pub mod session;
pub mod views;

pub use entities::{Card, Deck, GameId, Player, PlayerId, Revolver, SessionState};
pub use errors::GameError;
pub use outbox::{Dispatch, Outbox};
pub use record::GameRecord;
pub use session::{GameSession, GameSettings};
pub use views::{GameView, PlayerView};
