//! Ordered deliveries produced by a session operation.
//!
//! Engine operations never talk to connections directly. They append to an
//! [`Outbox`], and whoever holds the session lock flushes it in order.

use std::time::Duration;

use super::entities::PlayerId;
use crate::net::messages::ServerMessage;

#[derive(Clone, Debug, PartialEq)]
pub enum Dispatch {
    /// Deliver to one player.
    To(PlayerId, ServerMessage),
    /// Deliver the same message to every connected player.
    All(ServerMessage),
    /// Hold further deliveries so clients can render what they just got.
    Pause(Duration),
}

#[derive(Debug, Default)]
pub struct Outbox {
    dispatches: Vec<Dispatch>,
}

impl Outbox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to(&mut self, player_id: PlayerId, message: ServerMessage) {
        self.dispatches.push(Dispatch::To(player_id, message));
    }

    pub fn all(&mut self, message: ServerMessage) {
        self.dispatches.push(Dispatch::All(message));
    }

    pub fn pause(&mut self, delay: Duration) {
        if !delay.is_zero() {
            self.dispatches.push(Dispatch::Pause(delay));
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dispatches.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.dispatches.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Dispatch> {
        self.dispatches.iter()
    }

    /// Messages `player_id` would receive, in order, ignoring pauses.
    #[must_use]
    pub fn messages_for(&self, player_id: &PlayerId) -> Vec<&ServerMessage> {
        self.dispatches
            .iter()
            .filter_map(|dispatch| match dispatch {
                Dispatch::To(id, message) if id == player_id => Some(message),
                Dispatch::All(message) => Some(message),
                _ => None,
            })
            .collect()
    }
}

impl IntoIterator for Outbox {
    type Item = Dispatch;
    type IntoIter = std::vec::IntoIter<Dispatch>;

    fn into_iter(self) -> Self::IntoIter {
        self.dispatches.into_iter()
    }
}
