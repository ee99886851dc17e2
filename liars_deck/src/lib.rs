//! # Liar's Deck
//!
//! A rule engine for a 2-4 player bluffing card game.
//!
//! Each round every living player is dealt five cards and a target rank is
//! announced. Players take turns playing cards face down while claiming they
//! all match the target. The next player may let the play stand or call it
//! out. Whoever is caught (the bluffer, or a wrong challenger) is penalized by
//! a six-position elimination mechanism. The last player alive wins.
//!
//! ## Core Modules
//!
//! - [`game`]: Session state machine, entities, views and audit record
//! - [`net`]: JSON message protocol shared with transports
//! - [`table`]: Concurrency guard around a session and the game directory
//!
//! ## Example
//!
//! ```
//! use liars_deck::{GameId, GameSession, GameSettings};
//!
//! let mut session = GameSession::new(GameId::new(), GameSettings::instant());
//! let (alice, _) = session.join("alice").unwrap();
//! session.join("bob").unwrap();
//! session.start(&alice).unwrap();
//! assert_eq!(session.round_count(), 1);
//! ```

/// Core game logic, entities, and state machine.
pub mod game;
pub use game::{
    Card, GameError, GameId, GameSession, GameSettings, GameView, Outbox, PlayerId,
    SessionState,
    constants::{self, MAX_PLAYERS, MIN_PLAYERS},
};

/// Message protocol for client-server communication.
pub mod net;
pub use net::messages::{self, ClientMessage, ServerMessage};

/// Shared game tables and the directory that hands them out.
pub mod table;
pub use table::{GameManager, GameSummary, GameTable, ManagerError};
