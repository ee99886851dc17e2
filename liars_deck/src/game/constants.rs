//! Fixed game parameters.

use std::time::Duration;

/// Copies of each of Q, K and A in a fresh deck.
pub const FACE_CARD_COPIES: usize = 6;

/// Wildcards in a fresh deck.
pub const WILDCARD_COPIES: usize = 2;

/// Size of the full card pool.
pub const DECK_SIZE: usize = 3 * FACE_CARD_COPIES + WILDCARD_COPIES;

/// Cards each living player receives at the start of a round.
pub const HAND_SIZE: usize = 5;

pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 4;

/// Positions on the elimination mechanism's cylinder.
pub const CHAMBER_COUNT: u8 = 6;

/// Pause after an elimination check so clients can render the outcome.
pub const DEFAULT_REVEAL_DELAY: Duration = Duration::from_secs(2);
