//! Shared game tables.
//!
//! This module implements:
//! - GameTable: one session plus the outgoing channel of every connected
//!   player, behind a single lock
//! - GameManager: the directory that creates, finds and removes tables
//!
//! ## Architecture
//!
//! Every inbound message takes the table's write lock, runs the session
//! operation, and delivers the resulting outbox before releasing it. Two
//! messages for the same game are therefore never interleaved, and every
//! player sees deliveries in the order the session produced them. Reveal
//! pauses are slept while the lock is held.
//!
//! ## Example
//!
//! ```ignore
//! use liars_deck::{GameManager, GameSettings};
//! use tokio::sync::mpsc;
//!
//! let manager = GameManager::new(GameSettings::default(), 100);
//! let game_id = manager.create_game().await?;
//! let player_id = manager.join_game(game_id, "alice").await?;
//!
//! let (tx, mut rx) = mpsc::unbounded_channel();
//! let table = manager.get_game(game_id).await.unwrap();
//! table.connect(player_id, tx).await?;
//! ```

pub mod guard;
pub mod manager;

pub use guard::{GameTable, Outgoing};
pub use manager::{GameManager, GameSummary, ManagerError};
