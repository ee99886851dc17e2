use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, str::FromStr};
use uuid::Uuid;

use super::constants::{CHAMBER_COUNT, DECK_SIZE, FACE_CARD_COPIES, WILDCARD_COPIES};

/// A card from the game's 20-card pool.
///
/// The wildcard travels as `"Joker"` on the wire; `"Wildcard"` is accepted
/// when deserializing.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Card {
    Q,
    K,
    A,
    #[serde(rename = "Joker", alias = "Wildcard")]
    Wildcard,
}

impl Card {
    /// Values a round's target card is drawn from. The wildcard never is.
    pub const TARGETS: [Card; 3] = [Card::Q, Card::K, Card::A];

    /// Whether this card is an honest play when `target` is the round's
    /// target card.
    #[must_use]
    pub fn satisfies(self, target: Card) -> bool {
        self == Card::Wildcard || self == target
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Q => "Q",
            Self::K => "K",
            Self::A => "A",
            Self::Wildcard => "Joker",
        };
        write!(f, "{repr}")
    }
}

/// The card pool. Instantiated once per session and reshuffled each deal.
#[derive(Debug)]
pub struct Deck {
    cards: [Card; DECK_SIZE],
    pub deck_idx: usize,
}

impl Deck {
    /// Draw from the top of the deck, or `None` once it's exhausted.
    pub fn deal_card(&mut self) -> Option<Card> {
        let card = self.cards.get(self.deck_idx).copied()?;
        self.deck_idx += 1;
        Some(card)
    }

    /// Restore every card to the deck and apply a uniform random permutation.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cards.shuffle(rng);
        self.deck_idx = 0;
    }

    /// Undealt cards, top first.
    #[must_use]
    pub fn undealt(&self) -> &[Card] {
        &self.cards[self.deck_idx..]
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        DECK_SIZE - self.deck_idx
    }
}

impl Default for Deck {
    fn default() -> Self {
        let mut cards = [Card::Wildcard; DECK_SIZE];
        for (i, value) in Card::TARGETS.into_iter().enumerate() {
            for j in 0..FACE_CARD_COPIES {
                cards[i * FACE_CARD_COPIES + j] = value;
            }
        }
        debug_assert_eq!(
            cards.iter().filter(|c| **c == Card::Wildcard).count(),
            WILDCARD_COPIES
        );
        Self { cards, deck_idx: 0 }
    }
}

/// The elimination mechanism: a six-position cylinder with one fixed hazard
/// slot. Each penalty advances the cylinder by one position.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Revolver {
    bullet_position: u8,
    current_position: u8,
}

impl Revolver {
    #[must_use]
    pub fn new(bullet_position: u8) -> Self {
        Self {
            bullet_position: bullet_position % CHAMBER_COUNT,
            current_position: 0,
        }
    }

    /// Load the hazard slot uniformly at random.
    pub fn loaded<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::new(rng.random_range(0..CHAMBER_COUNT))
    }

    #[must_use]
    pub fn bullet_position(&self) -> u8 {
        self.bullet_position
    }

    #[must_use]
    pub fn current_position(&self) -> u8 {
        self.current_position
    }

    /// Advance the cylinder and report whether it landed on the hazard slot.
    pub fn pull_trigger(&mut self) -> bool {
        self.current_position = (self.current_position + 1) % CHAMBER_COUNT;
        self.current_position == self.bullet_position
    }
}

/// Unique identifier handed out when a player joins a game.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct PlayerId(Uuid);

impl PlayerId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PlayerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Unique identifier of a game instance.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct GameId(Uuid);

impl GameId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GameId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GameId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Lifecycle of a game session.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    #[default]
    Waiting,
    /// Reserved; starting a game currently moves straight to `Playing`.
    Starting,
    Playing,
    Finished,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Waiting => "waiting",
            Self::Starting => "starting",
            Self::Playing => "playing",
            Self::Finished => "finished",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Debug)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub hand: Vec<Card>,
    pub alive: bool,
    pub revolver: Revolver,
    /// Free-text notes this player keeps about others. No effect on rules.
    pub opinions: HashMap<PlayerId, String>,
}

impl Player {
    #[must_use]
    pub fn new(id: PlayerId, name: String, revolver: Revolver) -> Self {
        Self {
            id,
            name,
            hand: Vec::new(),
            alive: true,
            revolver,
            opinions: HashMap::new(),
        }
    }

    /// Alive and still holding cards, i.e. able to play or decide.
    #[must_use]
    pub fn can_act(&self) -> bool {
        self.alive && !self.hand.is_empty()
    }

    /// Remove one matching card per entry of `cards`, first match in hand
    /// order. Either every card is removed or the hand is left untouched and
    /// the first missing card is returned.
    pub fn take_cards(&mut self, cards: &[Card]) -> Result<(), Card> {
        let mut remaining = self.hand.clone();
        for card in cards {
            match remaining.iter().position(|held| held == card) {
                Some(idx) => {
                    remaining.remove(idx);
                }
                None => return Err(*card),
            }
        }
        self.hand = remaining;
        Ok(())
    }
}
