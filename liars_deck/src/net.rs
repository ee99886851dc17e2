//! Wire protocol shared by the engine and any transport.

pub mod messages;

pub use messages::{ClientMessage, ServerMessage};
