//! Game session state machine.
//!
//! A [`GameSession`] owns the roster, the deck and every player's private
//! state. Each operation validates first and mutates second, so a refused
//! operation leaves the session untouched. Successful operations return an
//! [`Outbox`] of deliveries for the caller to flush in order.

use chrono::Utc;
use log::{debug, info, warn};
use rand::{Rng, SeedableRng, rngs::StdRng, seq::IndexedRandom};
use std::{collections::HashMap, time::Duration};

use super::{
    constants::{DEFAULT_REVEAL_DELAY, HAND_SIZE, MAX_PLAYERS, MIN_PLAYERS},
    entities::{Card, Deck, GameId, Player, PlayerId, Revolver, SessionState},
    errors::GameError,
    outbox::Outbox,
    record::{GameRecord, PlayAction, PlayerInitialState, RoundRecord, ShootingResult},
    views::{self, GameView},
};
use crate::net::messages::{ClientMessage, ServerMessage};

/// Per-game settings.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GameSettings {
    pub min_players: usize,
    pub max_players: usize,
    /// Pause after an elimination check or system challenge is announced.
    pub reveal_delay: Duration,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self::new(MIN_PLAYERS, MAX_PLAYERS, DEFAULT_REVEAL_DELAY)
    }
}

impl GameSettings {
    #[must_use]
    pub const fn new(min_players: usize, max_players: usize, reveal_delay: Duration) -> Self {
        Self {
            min_players,
            max_players,
            reveal_delay,
        }
    }

    /// Default player bounds with no reveal pause.
    #[must_use]
    pub const fn instant() -> Self {
        Self::new(MIN_PLAYERS, MAX_PLAYERS, Duration::ZERO)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.min_players < MIN_PLAYERS {
            return Err(format!("Min players must be at least {MIN_PLAYERS}"));
        }
        if self.max_players > MAX_PLAYERS {
            return Err(format!("Max players must be at most {MAX_PLAYERS}"));
        }
        if self.min_players > self.max_players {
            return Err("Min players can't exceed max players".to_string());
        }
        Ok(())
    }
}

/// The most recent play, held until its challenge decision arrives.
#[derive(Clone, Debug)]
struct PendingPlay {
    author: PlayerId,
    cards: Vec<Card>,
    decider: PlayerId,
}

/// Who opens a freshly dealt round.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum RoundStarter {
    LastPenalized,
    Random,
}

#[derive(Debug)]
pub struct GameSession {
    id: GameId,
    state: SessionState,
    /// Turn order. Fixed once the game starts.
    player_order: Vec<PlayerId>,
    players: HashMap<PlayerId, Player>,
    deck: Deck,
    target_card: Option<Card>,
    current_player_idx: usize,
    last_penalized: Option<PlayerId>,
    round_count: u32,
    game_over: bool,
    pending_play: Option<PendingPlay>,
    record: GameRecord,
    settings: GameSettings,
    rng: StdRng,
}

impl GameSession {
    #[must_use]
    pub fn new(id: GameId, settings: GameSettings) -> Self {
        Self::with_rng(id, settings, StdRng::from_os_rng())
    }

    /// Build a session drawing all randomness from `rng`.
    #[must_use]
    pub fn with_rng(id: GameId, settings: GameSettings, rng: StdRng) -> Self {
        Self {
            id,
            state: SessionState::Waiting,
            player_order: Vec::new(),
            players: HashMap::new(),
            deck: Deck::default(),
            target_card: None,
            current_player_idx: 0,
            last_penalized: None,
            round_count: 0,
            game_over: false,
            pending_play: None,
            record: GameRecord::new(id),
            settings,
            rng,
        }
    }

    #[must_use]
    pub fn id(&self) -> GameId {
        self.id
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    #[must_use]
    pub fn player_order(&self) -> &[PlayerId] {
        &self.player_order
    }

    /// Players in turn order.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.player_order
            .iter()
            .filter_map(|id| self.players.get(id))
    }

    #[must_use]
    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    #[must_use]
    pub fn player_count(&self) -> usize {
        self.player_order.len()
    }

    #[must_use]
    pub fn target_card(&self) -> Option<Card> {
        self.target_card
    }

    #[must_use]
    pub fn current_player_idx(&self) -> usize {
        self.current_player_idx
    }

    #[must_use]
    pub fn current_player_id(&self) -> Option<PlayerId> {
        self.player_order.get(self.current_player_idx).copied()
    }

    #[must_use]
    pub fn last_penalized(&self) -> Option<PlayerId> {
        self.last_penalized
    }

    #[must_use]
    pub fn round_count(&self) -> u32 {
        self.round_count
    }

    #[must_use]
    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    #[must_use]
    pub fn deck_remaining(&self) -> usize {
        self.deck.remaining()
    }

    /// The player who must accept or challenge the pending play, if any.
    #[must_use]
    pub fn awaiting_decision_from(&self) -> Option<PlayerId> {
        self.pending_play.as_ref().map(|pending| pending.decider)
    }

    #[must_use]
    pub fn winner(&self) -> Option<&Player> {
        if !self.game_over {
            return None;
        }
        self.players().find(|player| player.alive)
    }

    #[must_use]
    pub fn record(&self) -> &GameRecord {
        &self.record
    }

    #[must_use]
    pub fn view_for(&self, viewer: &PlayerId) -> GameView {
        views::project(self, viewer)
    }

    /// Whether every card in `cards` honestly matches the round's target.
    #[must_use]
    pub fn is_valid_play(&self, cards: &[Card]) -> bool {
        self.target_card
            .is_some_and(|target| cards.iter().all(|card| card.satisfies(target)))
    }

    /// Route an inbound message from `player_id`.
    pub fn handle_message(
        &mut self,
        player_id: &PlayerId,
        message: ClientMessage,
    ) -> Result<Outbox, GameError> {
        self.ensure_member(player_id)?;
        if self.game_over {
            return Err(GameError::GameOver);
        }

        match message {
            ClientMessage::StartGame => self.start(player_id),
            ClientMessage::PlayCards { cards } => self.submit_play(player_id, cards),
            ClientMessage::Challenge { challenge, reason } => {
                self.submit_challenge(player_id, challenge, reason)
            }
            ClientMessage::Opinion { about, opinion } => {
                self.set_opinion(player_id, about, opinion)
            }
        }
    }

    /// Add a player to the roster. Only possible while waiting.
    pub fn join(&mut self, name: &str) -> Result<(PlayerId, Outbox), GameError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GameError::EmptyName);
        }
        match self.state {
            SessionState::Waiting => {}
            SessionState::Finished => return Err(GameError::GameOver),
            _ => return Err(GameError::GameAlreadyStarted),
        }
        if self.player_order.len() >= self.settings.max_players {
            return Err(GameError::CapacityReached);
        }

        let id = PlayerId::new();
        let player = Player::new(id, name.to_string(), Revolver::loaded(&mut self.rng));
        self.players.insert(id, player);
        self.player_order.push(id);
        self.record.player_names.push(name.to_string());
        info!("Game {}: {} joined ({})", self.id, name, id);

        let mut out = Outbox::new();
        self.broadcast_state(&mut out);
        Ok((id, out))
    }

    /// Lock the roster, deal the first round and hand the turn to a random
    /// player.
    pub fn start(&mut self, requester: &PlayerId) -> Result<Outbox, GameError> {
        self.ensure_member(requester)?;
        match self.state {
            SessionState::Waiting => {}
            SessionState::Finished => return Err(GameError::GameOver),
            _ => return Err(GameError::GameAlreadyStarted),
        }
        let count = self.player_order.len();
        if count < self.settings.min_players || count > self.settings.max_players {
            return Err(GameError::PlayerCountOutOfRange {
                min: self.settings.min_players,
                max: self.settings.max_players,
            });
        }

        self.state = SessionState::Playing;
        self.game_over = false;
        self.round_count = 0;
        self.last_penalized = None;
        self.current_player_idx = self.rng.random_range(0..count);
        info!("Game {}: starting with {} players", self.id, count);

        let mut out = Outbox::new();
        self.deal_cards();
        self.choose_target_card();
        self.start_round();
        self.broadcast_state(&mut out);
        self.notify_current_player(&mut out);
        Ok(out)
    }

    /// Play `cards` face down, claiming they all match the target.
    pub fn submit_play(
        &mut self,
        player_id: &PlayerId,
        cards: Vec<Card>,
    ) -> Result<Outbox, GameError> {
        self.ensure_playing()?;
        if self.current_player_id() != Some(*player_id) {
            return Err(GameError::OutOfTurnAction);
        }
        if self.pending_play.is_some() {
            return Err(GameError::AwaitingChallenge);
        }
        if cards.is_empty() {
            return Err(GameError::NoCardsPlayed);
        }
        let target = self.target_card.ok_or(GameError::NotPlaying)?;

        let player = self
            .players
            .get_mut(player_id)
            .ok_or(GameError::UnknownPlayer)?;
        if let Err(missing) = player.take_cards(&cards) {
            warn!(
                "Game {}: {} tried to play a {} they don't hold",
                self.id, player.name, missing
            );
            return Err(GameError::CardNotInHand(missing));
        }
        let player_name = player.name.clone();
        let remaining_cards = player.hand.clone();
        let card_count = cards.len();

        let author_idx = self.current_player_idx;
        let next_idx = self.find_next_player_with_cards(author_idx);
        let decider = (next_idx != author_idx).then(|| self.player_order[next_idx]);
        let next_player = decider
            .and_then(|id| self.players.get(&id))
            .map_or_else(|| player_name.clone(), |p| p.name.clone());
        info!(
            "Game {}: {} played {} card(s), {} decides",
            self.id, player_name, card_count, next_player
        );

        if let Some(round) = self.record.current_round_mut() {
            round.play_history.push(PlayAction {
                player_id: *player_id,
                player_name: player_name.clone(),
                played_cards: cards.clone(),
                remaining_cards,
                next_player_id: decider,
                next_player_name: decider.map(|_| next_player.clone()),
                was_challenged: false,
                challenge_reason: None,
                challenge_result: None,
            });
        }

        let mut out = Outbox::new();
        for id in &self.player_order {
            out.to(
                *id,
                ServerMessage::PlayAction {
                    player_name: player_name.clone(),
                    card_count,
                    target_card: target,
                    next_player: next_player.clone(),
                    played_cards: (id == player_id).then(|| cards.clone()),
                },
            );
        }

        match decider {
            // Nobody else holds cards, so nobody can call the bluff.
            None => self.run_system_challenge(*player_id, cards, &mut out)?,
            Some(decider) => {
                self.current_player_idx = next_idx;
                self.pending_play = Some(PendingPlay {
                    author: *player_id,
                    cards,
                    decider,
                });
                self.broadcast_state(&mut out);
                out.to(
                    decider,
                    ServerMessage::ChallengeRequest {
                        player_name,
                        card_count,
                        target_card: target,
                    },
                );
            }
        }
        Ok(out)
    }

    /// Accept (`challenge == false`) or call out the pending play.
    pub fn submit_challenge(
        &mut self,
        challenger: &PlayerId,
        challenge: bool,
        reason: String,
    ) -> Result<Outbox, GameError> {
        self.ensure_playing()?;
        let target = self.target_card.ok_or(GameError::NotPlaying)?;
        let (author, decider) = match &self.pending_play {
            Some(pending) => (pending.author, pending.decider),
            None => return Err(GameError::NoPendingPlay),
        };
        if decider != *challenger {
            return Err(GameError::OutOfTurnAction);
        }
        let challenger_idx = self.index_of(challenger).ok_or(GameError::UnknownPlayer)?;
        let accused_idx = self
            .find_previous_player(challenger_idx, &author)
            .ok_or(GameError::NoPreviousPlayer)?;
        let accused = self.player_order[accused_idx];
        let author_idx = self.index_of(&author).ok_or(GameError::UnknownPlayer)?;
        let challenger_name = self.name_of(challenger)?;
        let Some(pending) = self.pending_play.take() else {
            return Err(GameError::NoPendingPlay);
        };

        let mut out = Outbox::new();
        if !challenge {
            info!("Game {}: {} let the play stand", self.id, challenger_name);
            if let Some(play) = self.record.last_play_mut() {
                play.challenge_reason = Some(reason.clone()).filter(|r| !r.is_empty());
            }
            out.all(ServerMessage::ChallengeResult {
                challenger_name,
                was_challenged: false,
                challenge_reason: reason,
                challenge_success: None,
            });
            self.current_player_idx = self.find_next_player_with_cards(author_idx);
            self.broadcast_state(&mut out);
            self.notify_current_player(&mut out);
            return Ok(out);
        }

        let valid = pending.cards.iter().all(|card| card.satisfies(target));
        info!(
            "Game {}: {} challenged, play was {}",
            self.id,
            challenger_name,
            if valid { "honest" } else { "a bluff" }
        );
        if let Some(play) = self.record.last_play_mut() {
            play.was_challenged = true;
            play.challenge_reason = Some(reason.clone()).filter(|r| !r.is_empty());
            play.challenge_result = Some(!valid);
        }
        out.all(ServerMessage::ChallengeResult {
            challenger_name,
            was_challenged: true,
            challenge_reason: reason,
            challenge_success: Some(!valid),
        });

        let penalized = if valid { *challenger } else { accused };
        self.last_penalized = Some(penalized);
        self.penalize(penalized, &mut out)?;
        Ok(out)
    }

    /// Check `cards` on the system's behalf because nobody else can.
    pub fn force_system_challenge(
        &mut self,
        player_id: &PlayerId,
        cards: Vec<Card>,
    ) -> Result<Outbox, GameError> {
        self.ensure_playing()?;
        self.ensure_member(player_id)?;
        let mut out = Outbox::new();
        self.run_system_challenge(*player_id, cards, &mut out)?;
        Ok(out)
    }

    /// Run the elimination mechanism against `player_id` and record them as
    /// the last penalized player.
    pub fn apply_penalty(&mut self, player_id: &PlayerId) -> Result<Outbox, GameError> {
        self.ensure_playing()?;
        let player = self
            .players
            .get(player_id)
            .ok_or(GameError::UnknownPlayer)?;
        if !player.alive {
            return Err(GameError::PlayerEliminated);
        }

        self.pending_play = None;
        self.last_penalized = Some(*player_id);
        let mut out = Outbox::new();
        self.penalize(*player_id, &mut out)?;
        Ok(out)
    }

    /// Store a private note about another player.
    pub fn set_opinion(
        &mut self,
        author: &PlayerId,
        about: PlayerId,
        opinion: String,
    ) -> Result<Outbox, GameError> {
        if self.game_over {
            return Err(GameError::GameOver);
        }
        if *author == about || !self.players.contains_key(&about) {
            return Err(GameError::UnknownPlayer);
        }
        let player = self
            .players
            .get_mut(author)
            .ok_or(GameError::UnknownPlayer)?;
        player.opinions.insert(about, opinion);

        let mut out = Outbox::new();
        out.to(
            *author,
            ServerMessage::GameState {
                state: Box::new(self.view_for(author)),
            },
        );
        Ok(out)
    }

    fn run_system_challenge(
        &mut self,
        player_id: PlayerId,
        cards: Vec<Card>,
        out: &mut Outbox,
    ) -> Result<(), GameError> {
        let player_name = self.name_of(&player_id)?;
        let valid = self.is_valid_play(&cards);
        info!(
            "Game {}: system challenges {}, play was {}",
            self.id,
            player_name,
            if valid { "honest" } else { "a bluff" }
        );

        self.pending_play = None;
        if let Some(play) = self.record.last_play_mut() {
            play.was_challenged = true;
            play.challenge_reason = Some("system".to_string());
            play.challenge_result = Some(!valid);
        }
        out.all(ServerMessage::SystemChallenge {
            player_name,
            challenge_valid: !valid,
            played_cards: cards,
        });
        out.pause(self.settings.reveal_delay);

        if valid {
            self.reset_round(RoundStarter::Random, out);
            Ok(())
        } else {
            self.last_penalized = Some(player_id);
            self.penalize(player_id, out)
        }
    }

    fn penalize(&mut self, player_id: PlayerId, out: &mut Outbox) -> Result<(), GameError> {
        let player = self
            .players
            .get_mut(&player_id)
            .ok_or(GameError::UnknownPlayer)?;
        let bullet_hit = player.revolver.pull_trigger();
        if bullet_hit {
            player.alive = false;
            player.hand.clear();
        }
        let shooter_name = player.name.clone();
        info!(
            "Game {}: {} pulls the trigger... {}",
            self.id,
            shooter_name,
            if bullet_hit { "bang" } else { "click" }
        );

        if let Some(round) = self.record.current_round_mut() {
            round.round_result = Some(ShootingResult {
                shooter_id: player_id,
                shooter_name: shooter_name.clone(),
                bullet_hit,
            });
        }
        out.all(ServerMessage::ShootingResult {
            shooter_name,
            bullet_hit,
        });
        out.pause(self.settings.reveal_delay);

        if bullet_hit && self.check_victory(out) {
            return Ok(());
        }
        self.reset_round(RoundStarter::LastPenalized, out);
        Ok(())
    }

    /// Finish the game if exactly one player is left standing.
    fn check_victory(&mut self, out: &mut Outbox) -> bool {
        let winner_name = {
            let alive: Vec<&Player> = self.players().filter(|player| player.alive).collect();
            let [winner] = alive.as_slice() else {
                return false;
            };
            winner.name.clone()
        };

        self.state = SessionState::Finished;
        self.game_over = true;
        self.pending_play = None;
        self.record.winner = Some(winner_name.clone());
        info!("Game {}: {} wins", self.id, winner_name);

        out.all(ServerMessage::GameOver { winner_name });
        self.broadcast_state(out);
        true
    }

    fn reset_round(&mut self, starter: RoundStarter, out: &mut Outbox) {
        self.deal_cards();
        self.choose_target_card();

        let marker_idx = match starter {
            RoundStarter::LastPenalized => self.last_penalized.and_then(|id| self.index_of(&id)),
            RoundStarter::Random => None,
        };
        self.current_player_idx = match marker_idx {
            Some(idx) if self.player_at(idx).is_some_and(|p| p.alive) => idx,
            Some(idx) => self.find_next_living(idx),
            None => self
                .random_living_idx()
                .unwrap_or(self.current_player_idx),
        };

        self.start_round();
        self.broadcast_state(out);
        self.notify_current_player(out);
    }

    fn deal_cards(&mut self) {
        self.deck.shuffle(&mut self.rng);
        for player in self.players.values_mut() {
            if player.alive {
                player.hand.clear();
            }
        }

        for _ in 0..HAND_SIZE {
            for id in &self.player_order {
                let Some(player) = self.players.get_mut(id) else {
                    continue;
                };
                if !player.alive {
                    continue;
                }
                let Some(card) = self.deck.deal_card() else {
                    return;
                };
                player.hand.push(card);
            }
        }
    }

    fn choose_target_card(&mut self) {
        let target = Card::TARGETS[self.rng.random_range(0..Card::TARGETS.len())];
        self.target_card = Some(target);
        debug!("Game {}: target card is {}", self.id, target);
    }

    fn start_round(&mut self) {
        self.round_count += 1;
        self.pending_play = None;

        let (Some(target_card), Some(starter)) = (
            self.target_card,
            self.current_player_id()
                .and_then(|id| self.players.get(&id)),
        ) else {
            return;
        };
        info!(
            "Game {}: round {} begins with {}",
            self.id, self.round_count, starter.name
        );

        let round = RoundRecord {
            round_id: self.round_count,
            target_card,
            round_players: self
                .players()
                .filter(|p| p.alive)
                .map(|p| p.id)
                .collect(),
            starting_player_id: starter.id,
            starting_player_name: starter.name.clone(),
            player_initial_states: self
                .players()
                .filter(|p| p.alive)
                .map(|p| PlayerInitialState {
                    player_id: p.id,
                    player_name: p.name.clone(),
                    bullet_position: p.revolver.bullet_position(),
                    current_gun_position: p.revolver.current_position(),
                    initial_hand: p.hand.clone(),
                })
                .collect(),
            player_opinions: self
                .players
                .values()
                .map(|p| (p.id, p.opinions.clone()))
                .collect(),
            play_history: Vec::new(),
            round_result: None,
            started_at: Utc::now(),
        };
        self.record.rounds.push(round);
    }

    fn broadcast_state(&self, out: &mut Outbox) {
        for id in &self.player_order {
            out.to(
                *id,
                ServerMessage::GameState {
                    state: Box::new(self.view_for(id)),
                },
            );
        }
    }

    fn notify_current_player(&self, out: &mut Outbox) {
        if let Some(id) = self.current_player_id() {
            out.to(
                id,
                ServerMessage::YourTurn {
                    message: "It's your turn to play".to_string(),
                },
            );
        }
    }

    fn ensure_member(&self, player_id: &PlayerId) -> Result<(), GameError> {
        if self.players.contains_key(player_id) {
            Ok(())
        } else {
            Err(GameError::UnknownPlayer)
        }
    }

    fn ensure_playing(&self) -> Result<(), GameError> {
        match self.state {
            SessionState::Playing => Ok(()),
            SessionState::Finished => Err(GameError::GameOver),
            _ => Err(GameError::NotPlaying),
        }
    }

    fn name_of(&self, player_id: &PlayerId) -> Result<String, GameError> {
        self.players
            .get(player_id)
            .map(|p| p.name.clone())
            .ok_or(GameError::UnknownPlayer)
    }

    fn index_of(&self, player_id: &PlayerId) -> Option<usize> {
        self.player_order.iter().position(|id| id == player_id)
    }

    fn player_at(&self, idx: usize) -> Option<&Player> {
        self.player_order
            .get(idx)
            .and_then(|id| self.players.get(id))
    }

    /// Next living player holding cards after `start`, wrapping around.
    /// Falls back to `start` when there is none.
    fn find_next_player_with_cards(&self, start: usize) -> usize {
        let len = self.player_order.len();
        let mut idx = start;
        for _ in 0..len {
            idx = (idx + 1) % len;
            if self.player_at(idx).is_some_and(Player::can_act) {
                return idx;
            }
        }
        start
    }

    /// Next living player after `start` regardless of hand size.
    fn find_next_living(&self, start: usize) -> usize {
        let len = self.player_order.len();
        let mut idx = start;
        for _ in 0..len {
            idx = (idx + 1) % len;
            if self.player_at(idx).is_some_and(|p| p.alive) {
                return idx;
            }
        }
        start
    }

    /// Walk backwards from `from` to the player whose play is being judged.
    /// Empty-handed players are skipped unless they authored the play.
    fn find_previous_player(&self, from: usize, author: &PlayerId) -> Option<usize> {
        let len = self.player_order.len();
        let mut idx = from;
        for _ in 1..len {
            idx = (idx + len - 1) % len;
            if let Some(player) = self.player_at(idx)
                && player.alive
                && (!player.hand.is_empty() || player.id == *author)
            {
                return Some(idx);
            }
        }
        None
    }

    fn random_living_idx(&mut self) -> Option<usize> {
        let living: Vec<usize> = (0..self.player_order.len())
            .filter(|idx| self.player_at(*idx).is_some_and(|p| p.alive))
            .collect();
        living.choose(&mut self.rng).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{constants::DECK_SIZE, outbox::Dispatch};

    fn session_with(names: &[&str]) -> (GameSession, Vec<PlayerId>) {
        let mut session = GameSession::with_rng(
            GameId::new(),
            GameSettings::instant(),
            StdRng::seed_from_u64(42),
        );
        let ids = names
            .iter()
            .map(|name| session.join(name).unwrap().0)
            .collect();
        (session, ids)
    }

    fn started(names: &[&str]) -> (GameSession, Vec<PlayerId>) {
        let (mut session, ids) = session_with(names);
        session.start(&ids[0]).unwrap();
        (session, ids)
    }

    /// Pin down the random parts of a round: hands, target, whose turn, and
    /// every hazard slot (far enough that nobody dies unless a test says so).
    fn rig(session: &mut GameSession, hands: &[Vec<Card>], target: Card, turn: usize) {
        for (id, hand) in session.player_order.clone().iter().zip(hands) {
            let player = session.players.get_mut(id).unwrap();
            player.hand = hand.clone();
            player.revolver = Revolver::new(5);
        }
        session.target_card = Some(target);
        session.current_player_idx = turn;
        session.pending_play = None;
    }

    fn hand_of(session: &GameSession, id: &PlayerId) -> Vec<Card> {
        session.player(id).unwrap().hand.clone()
    }

    fn total_cards(session: &GameSession) -> usize {
        session.players().map(|p| p.hand.len()).sum::<usize>() + session.deck_remaining()
    }

    fn shooting_results(out: &Outbox) -> Vec<(String, bool)> {
        out.iter()
            .filter_map(|d| match d {
                Dispatch::All(ServerMessage::ShootingResult {
                    shooter_name,
                    bullet_hit,
                }) => Some((shooter_name.clone(), *bullet_hit)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_join_until_full() {
        let (mut session, ids) = session_with(&["a", "b", "c", "d"]);
        assert_eq!(ids.len(), 4);
        assert_eq!(session.join("e").unwrap_err(), GameError::CapacityReached);
        assert_eq!(session.player_order(), ids.as_slice());
    }

    #[test]
    fn test_join_rejects_blank_name() {
        let (mut session, _) = session_with(&[]);
        assert_eq!(session.join("   ").unwrap_err(), GameError::EmptyName);
    }

    #[test]
    fn test_join_after_start_is_refused() {
        let (mut session, _) = started(&["alice", "bob"]);
        assert_eq!(
            session.join("carol").unwrap_err(),
            GameError::GameAlreadyStarted
        );
        assert_eq!(session.player_count(), 2);
    }

    #[test]
    fn test_join_broadcasts_state_to_roster() {
        let (mut session, ids) = session_with(&["alice"]);
        let (bob, out) = session.join("bob").unwrap();
        for id in [ids[0], bob] {
            let msgs = out.messages_for(&id);
            assert_eq!(msgs.len(), 1);
            assert_eq!(msgs[0].kind(), "game_state");
        }
    }

    #[test]
    fn test_start_needs_two_players() {
        let (mut session, ids) = session_with(&["alice"]);
        assert_eq!(
            session.start(&ids[0]).unwrap_err(),
            GameError::PlayerCountOutOfRange { min: 2, max: 4 }
        );
        assert_eq!(session.state(), SessionState::Waiting);
    }

    #[test]
    fn test_start_requires_roster_member() {
        let (mut session, _) = session_with(&["alice", "bob"]);
        assert_eq!(
            session.start(&PlayerId::new()).unwrap_err(),
            GameError::UnknownPlayer
        );
    }

    #[test]
    fn test_start_deals_and_picks_target() {
        let (mut session, ids) = session_with(&["alice", "bob", "carol"]);
        let out = session.start(&ids[1]).unwrap();

        assert_eq!(session.state(), SessionState::Playing);
        assert_eq!(session.round_count(), 1);
        assert!(Card::TARGETS.contains(&session.target_card().unwrap()));
        for id in &ids {
            assert_eq!(hand_of(&session, id).len(), HAND_SIZE);
        }
        assert_eq!(session.deck_remaining(), DECK_SIZE - 3 * HAND_SIZE);

        let current = session.current_player_id().unwrap();
        assert!(
            out.messages_for(&current)
                .iter()
                .any(|m| m.kind() == "your_turn")
        );
        assert_eq!(session.start(&ids[0]).unwrap_err(), GameError::GameAlreadyStarted);
    }

    #[test]
    fn test_deal_conserves_cards() {
        for names in [
            &["a", "b"][..],
            &["a", "b", "c"][..],
            &["a", "b", "c", "d"][..],
        ] {
            let (mut session, _) = started(names);
            assert_eq!(total_cards(&session), DECK_SIZE);
            for _ in 0..10 {
                session.deal_cards();
                assert_eq!(total_cards(&session), DECK_SIZE);
            }
        }
    }

    #[test]
    fn test_deal_skips_dead_players() {
        let (mut session, ids) = started(&["a", "b", "c"]);
        session.players.get_mut(&ids[1]).unwrap().alive = false;
        session.players.get_mut(&ids[1]).unwrap().hand.clear();
        session.deal_cards();
        assert!(hand_of(&session, &ids[1]).is_empty());
        assert_eq!(hand_of(&session, &ids[0]).len(), HAND_SIZE);
        assert_eq!(session.deck_remaining(), DECK_SIZE - 2 * HAND_SIZE);
    }

    #[test]
    fn test_out_of_turn_play_is_ignored() {
        let (mut session, ids) = started(&["alice", "bob", "carol"]);
        rig(
            &mut session,
            &[vec![Card::Q; 5], vec![Card::K; 5], vec![Card::A; 5]],
            Card::Q,
            0,
        );
        assert_eq!(
            session.submit_play(&ids[1], vec![Card::K]).unwrap_err(),
            GameError::OutOfTurnAction
        );
        assert_eq!(hand_of(&session, &ids[1]), vec![Card::K; 5]);
    }

    #[test]
    fn test_illegal_play_leaves_hand_untouched() {
        let (mut session, ids) = started(&["alice", "bob"]);
        let hand = vec![Card::Q, Card::K, Card::Q, Card::A, Card::A];
        rig(&mut session, &[hand.clone(), vec![Card::K; 5]], Card::Q, 0);

        let err = session
            .submit_play(&ids[0], vec![Card::Q, Card::Wildcard])
            .unwrap_err();
        assert_eq!(err, GameError::CardNotInHand(Card::Wildcard));
        assert!(err.is_reported());
        assert_eq!(hand_of(&session, &ids[0]), hand);
        assert_eq!(session.awaiting_decision_from(), None);
    }

    #[test]
    fn test_empty_play_is_rejected() {
        let (mut session, ids) = started(&["alice", "bob"]);
        rig(&mut session, &[vec![Card::Q; 5], vec![Card::K; 5]], Card::Q, 0);
        assert_eq!(
            session.submit_play(&ids[0], vec![]).unwrap_err(),
            GameError::NoCardsPlayed
        );
    }

    #[test]
    fn test_play_reveals_cards_only_to_actor() {
        let (mut session, ids) = started(&["alice", "bob", "carol"]);
        rig(
            &mut session,
            &[
                vec![Card::Q, Card::K, Card::A, Card::A, Card::Wildcard],
                vec![Card::K; 5],
                vec![Card::A; 5],
            ],
            Card::A,
            0,
        );
        let out = session
            .submit_play(&ids[0], vec![Card::A, Card::Wildcard])
            .unwrap();

        assert_eq!(hand_of(&session, &ids[0]), vec![Card::Q, Card::K, Card::A]);
        assert_eq!(session.awaiting_decision_from(), Some(ids[1]));
        assert_eq!(session.current_player_id(), Some(ids[1]));

        for id in &ids {
            let action = out
                .messages_for(id)
                .into_iter()
                .find(|m| m.kind() == "play_action")
                .unwrap()
                .clone();
            let ServerMessage::PlayAction {
                player_name,
                card_count,
                target_card,
                next_player,
                played_cards,
            } = action
            else {
                unreachable!()
            };
            assert_eq!(player_name, "alice");
            assert_eq!(card_count, 2);
            assert_eq!(target_card, Card::A);
            assert_eq!(next_player, "bob");
            if *id == ids[0] {
                assert_eq!(played_cards, Some(vec![Card::A, Card::Wildcard]));
            } else {
                assert_eq!(played_cards, None);
            }
        }
        assert!(
            out.messages_for(&ids[1])
                .iter()
                .any(|m| m.kind() == "challenge_request")
        );
        assert!(
            !out.messages_for(&ids[2])
                .iter()
                .any(|m| m.kind() == "challenge_request")
        );
    }

    #[test]
    fn test_decider_skips_empty_and_dead_players() {
        let (mut session, ids) = started(&["a", "b", "c", "d"]);
        rig(
            &mut session,
            &[vec![Card::Q; 5], vec![], vec![Card::K; 5], vec![Card::A; 5]],
            Card::Q,
            0,
        );
        session.players.get_mut(&ids[2]).unwrap().alive = false;
        session.submit_play(&ids[0], vec![Card::Q]).unwrap();
        assert_eq!(session.awaiting_decision_from(), Some(ids[3]));
    }

    #[test]
    fn test_no_second_play_while_awaiting_decision() {
        let (mut session, ids) = started(&["alice", "bob"]);
        rig(&mut session, &[vec![Card::Q; 5], vec![Card::K; 5]], Card::Q, 0);
        session.submit_play(&ids[0], vec![Card::Q]).unwrap();
        assert_eq!(
            session.submit_play(&ids[1], vec![Card::K]).unwrap_err(),
            GameError::AwaitingChallenge
        );
        assert_eq!(hand_of(&session, &ids[1]), vec![Card::K; 5]);
    }

    #[test]
    fn test_pass_hands_turn_to_decider() {
        let (mut session, ids) = started(&["alice", "bob", "carol"]);
        rig(
            &mut session,
            &[vec![Card::Q; 5], vec![Card::K; 5], vec![Card::A; 5]],
            Card::K,
            0,
        );
        session.submit_play(&ids[0], vec![Card::Q, Card::Q]).unwrap();
        let out = session
            .submit_challenge(&ids[1], false, "looks fine".into())
            .unwrap();

        assert_eq!(session.current_player_id(), Some(ids[1]));
        assert_eq!(session.awaiting_decision_from(), None);
        assert!(shooting_results(&out).is_empty());
        assert_eq!(session.round_count(), 1);
        assert!(session.players().all(|p| p.revolver.current_position() == 0));
        assert!(
            out.messages_for(&ids[1])
                .iter()
                .any(|m| m.kind() == "your_turn")
        );
        assert!(out.messages_for(&ids[2]).contains(&&ServerMessage::ChallengeResult {
            challenger_name: "bob".into(),
            was_challenged: false,
            challenge_reason: "looks fine".into(),
            challenge_success: None,
        }));
    }

    #[test]
    fn test_failed_challenge_penalizes_challenger() {
        let (mut session, ids) = started(&["alice", "bob", "carol"]);
        rig(
            &mut session,
            &[
                vec![Card::K, Card::Wildcard, Card::Q, Card::A, Card::A],
                vec![Card::K; 5],
                vec![Card::A; 5],
            ],
            Card::K,
            0,
        );
        session
            .submit_play(&ids[0], vec![Card::K, Card::Wildcard])
            .unwrap();
        let out = session
            .submit_challenge(&ids[1], true, "bluff!".into())
            .unwrap();

        assert_eq!(shooting_results(&out), vec![("bob".to_string(), false)]);
        assert_eq!(session.last_penalized(), Some(ids[1]));
        assert_eq!(session.player(&ids[1]).unwrap().revolver.current_position(), 1);
        assert_eq!(session.player(&ids[0]).unwrap().revolver.current_position(), 0);
        assert!(out.messages_for(&ids[2]).contains(&&ServerMessage::ChallengeResult {
            challenger_name: "bob".into(),
            was_challenged: true,
            challenge_reason: "bluff!".into(),
            challenge_success: Some(false),
        }));

        // New round, opened by the penalized player.
        assert_eq!(session.round_count(), 2);
        assert_eq!(session.current_player_id(), Some(ids[1]));
        assert!(session.players().all(|p| p.hand.len() == HAND_SIZE));
        assert_eq!(session.deck_remaining(), DECK_SIZE - 3 * HAND_SIZE);
    }

    #[test]
    fn test_successful_challenge_penalizes_bluffer() {
        let (mut session, ids) = started(&["alice", "bob", "carol"]);
        rig(
            &mut session,
            &[vec![Card::Q; 5], vec![Card::K; 5], vec![Card::A; 5]],
            Card::K,
            0,
        );
        session.submit_play(&ids[0], vec![Card::Q]).unwrap();
        let out = session.submit_challenge(&ids[1], true, String::new()).unwrap();

        assert_eq!(shooting_results(&out), vec![("alice".to_string(), false)]);
        assert_eq!(session.last_penalized(), Some(ids[0]));
        assert_eq!(session.current_player_id(), Some(ids[0]));
    }

    #[test]
    fn test_challenge_targets_author_who_emptied_their_hand() {
        let (mut session, ids) = started(&["alice", "bob", "carol"]);
        rig(
            &mut session,
            &[vec![Card::Q, Card::A], vec![Card::K; 5], vec![Card::A; 5]],
            Card::K,
            0,
        );
        session.submit_play(&ids[0], vec![Card::Q, Card::A]).unwrap();
        assert!(hand_of(&session, &ids[0]).is_empty());

        let out = session.submit_challenge(&ids[1], true, String::new()).unwrap();
        assert_eq!(shooting_results(&out), vec![("alice".to_string(), false)]);
    }

    #[test]
    fn test_only_decider_may_challenge() {
        let (mut session, ids) = started(&["alice", "bob", "carol"]);
        rig(
            &mut session,
            &[vec![Card::Q; 5], vec![Card::K; 5], vec![Card::A; 5]],
            Card::K,
            0,
        );
        assert_eq!(
            session
                .submit_challenge(&ids[1], true, String::new())
                .unwrap_err(),
            GameError::NoPendingPlay
        );
        session.submit_play(&ids[0], vec![Card::Q]).unwrap();
        assert_eq!(
            session
                .submit_challenge(&ids[2], true, String::new())
                .unwrap_err(),
            GameError::OutOfTurnAction
        );
        assert_eq!(session.awaiting_decision_from(), Some(ids[1]));
    }

    #[test]
    fn test_challenge_before_start_is_ignored() {
        let (mut session, ids) = session_with(&["alice", "bob"]);
        assert_eq!(
            session
                .submit_challenge(&ids[0], true, String::new())
                .unwrap_err(),
            GameError::NotPlaying
        );
    }

    #[test]
    fn test_system_challenge_catches_last_bluff() {
        let (mut session, ids) = started(&["alice", "bob"]);
        rig(&mut session, &[vec![Card::Q], vec![Card::K, Card::K]], Card::Q, 0);

        session.submit_play(&ids[0], vec![Card::Q]).unwrap();
        session.submit_challenge(&ids[1], false, String::new()).unwrap();
        assert_eq!(session.current_player_id(), Some(ids[1]));

        let out = session.submit_play(&ids[1], vec![Card::K]).unwrap();
        let system = out
            .iter()
            .find_map(|d| match d {
                Dispatch::All(msg @ ServerMessage::SystemChallenge { .. }) => Some(msg.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(
            system,
            ServerMessage::SystemChallenge {
                player_name: "bob".into(),
                challenge_valid: true,
                played_cards: vec![Card::K],
            }
        );
        assert_eq!(shooting_results(&out), vec![("bob".to_string(), false)]);
        assert_eq!(session.last_penalized(), Some(ids[1]));
        assert_eq!(session.round_count(), 2);
        assert!(
            !out.iter()
                .any(|d| matches!(d, Dispatch::To(_, ServerMessage::ChallengeRequest { .. })))
        );
    }

    #[test]
    fn test_system_challenge_on_honest_play_redeals() {
        let (mut session, ids) = started(&["alice", "bob"]);
        rig(
            &mut session,
            &[vec![Card::Wildcard, Card::K], vec![]],
            Card::Q,
            0,
        );

        let out = session.submit_play(&ids[0], vec![Card::Wildcard]).unwrap();
        assert!(out.iter().any(|d| matches!(
            d,
            Dispatch::All(ServerMessage::SystemChallenge {
                challenge_valid: false,
                ..
            })
        )));
        assert!(shooting_results(&out).is_empty());
        assert_eq!(session.last_penalized(), None);
        assert_eq!(session.round_count(), 2);
        assert!(session.players().all(|p| p.hand.len() == HAND_SIZE));
    }

    #[test]
    fn test_force_system_challenge_directly() {
        let (mut session, ids) = started(&["alice", "bob"]);
        rig(&mut session, &[vec![Card::Q; 5], vec![Card::K; 5]], Card::A, 0);
        let out = session
            .force_system_challenge(&ids[0], vec![Card::A, Card::Q])
            .unwrap();
        assert_eq!(shooting_results(&out), vec![("alice".to_string(), false)]);
        assert_eq!(session.last_penalized(), Some(ids[0]));
    }

    #[test]
    fn test_penalty_hits_on_hazard_slot() {
        let (mut session, ids) = started(&["alice", "bob", "carol"]);
        for bullet in [1u8, 3] {
            session.players.get_mut(&ids[0]).unwrap().revolver = Revolver::new(bullet);
            for k in 1..=bullet {
                let out = session.apply_penalty(&ids[0]).unwrap();
                let hit = shooting_results(&out)[0].1;
                assert_eq!(hit, k == bullet);
            }
            if bullet == 1 {
                // Revive for the second run.
                session.players.get_mut(&ids[0]).unwrap().alive = true;
            }
        }
    }

    #[test]
    fn test_elimination_without_victory_redeals_living() {
        let (mut session, ids) = started(&["alice", "bob", "carol"]);
        session.players.get_mut(&ids[1]).unwrap().revolver = Revolver::new(1);
        let out = session.apply_penalty(&ids[1]).unwrap();

        assert_eq!(shooting_results(&out), vec![("bob".to_string(), true)]);
        let bob = session.player(&ids[1]).unwrap();
        assert!(!bob.alive);
        assert!(bob.hand.is_empty());
        assert_eq!(session.state(), SessionState::Playing);
        assert!(!out.iter().any(|d| matches!(d, Dispatch::All(ServerMessage::GameOver { .. }))));

        // Bob is dead, so the next living player after him opens the round.
        assert_eq!(session.current_player_id(), Some(ids[2]));
        assert_eq!(session.deck_remaining(), DECK_SIZE - 2 * HAND_SIZE);
        assert_eq!(total_cards(&session), DECK_SIZE);
        assert_eq!(
            session.apply_penalty(&ids[1]).unwrap_err(),
            GameError::PlayerEliminated
        );
    }

    #[test]
    fn test_victory_ends_game_and_freezes_session() {
        let (mut session, ids) = started(&["alice", "bob"]);
        rig(&mut session, &[vec![Card::Q; 5], vec![Card::K; 5]], Card::Q, 0);
        session.players.get_mut(&ids[1]).unwrap().revolver = Revolver::new(1);

        session.submit_play(&ids[0], vec![Card::Q, Card::Q]).unwrap();
        let out = session.submit_challenge(&ids[1], true, String::new()).unwrap();

        assert!(out.iter().any(|d| d
            == &Dispatch::All(ServerMessage::GameOver {
                winner_name: "alice".into()
            })));
        assert_eq!(session.state(), SessionState::Finished);
        assert!(session.is_game_over());
        assert_eq!(session.winner().map(|p| p.id), Some(ids[0]));
        assert_eq!(session.record().winner.as_deref(), Some("alice"));
        assert_eq!(session.round_count(), 1);

        let hand_before = hand_of(&session, &ids[0]);
        session.current_player_idx = 0;
        assert_eq!(
            session
                .handle_message(&ids[0], ClientMessage::PlayCards { cards: vec![Card::Q] })
                .unwrap_err(),
            GameError::GameOver
        );
        assert_eq!(hand_of(&session, &ids[0]), hand_before);
        assert_eq!(
            session
                .handle_message(&ids[0], ClientMessage::StartGame)
                .unwrap_err(),
            GameError::GameOver
        );
    }

    #[test]
    fn test_reveal_delay_follows_shooting_result() {
        let mut session = GameSession::with_rng(
            GameId::new(),
            GameSettings::default(),
            StdRng::seed_from_u64(3),
        );
        let alice = session.join("alice").unwrap().0;
        session.join("bob").unwrap();
        session.start(&alice).unwrap();

        let out = session.apply_penalty(&alice).unwrap();
        let dispatches: Vec<_> = out.into_iter().collect();
        let shot = dispatches
            .iter()
            .position(|d| matches!(d, Dispatch::All(ServerMessage::ShootingResult { .. })))
            .unwrap();
        assert_eq!(
            dispatches[shot + 1],
            Dispatch::Pause(DEFAULT_REVEAL_DELAY)
        );
    }

    #[test]
    fn test_round_record_tracks_plays() {
        let (mut session, ids) = started(&["alice", "bob"]);
        rig(&mut session, &[vec![Card::Q; 5], vec![Card::K; 5]], Card::K, 0);
        session.submit_play(&ids[0], vec![Card::Q]).unwrap();
        session.submit_challenge(&ids[1], true, "hmm".into()).unwrap();

        let record = session.record();
        assert_eq!(record.player_names, vec!["alice", "bob"]);
        assert_eq!(record.rounds.len(), 2);
        let first = &record.rounds[0];
        assert_eq!(first.play_history.len(), 1);
        let play = &first.play_history[0];
        assert_eq!(play.played_cards, vec![Card::Q]);
        assert!(play.was_challenged);
        assert_eq!(play.challenge_reason.as_deref(), Some("hmm"));
        assert_eq!(play.challenge_result, Some(true));
        assert_eq!(
            first.round_result.as_ref().map(|r| r.shooter_id),
            Some(ids[0])
        );
        assert!(record.to_json().unwrap().contains("playHistory"));
    }

    #[test]
    fn test_opinions_stay_private() {
        let (mut session, ids) = session_with(&["alice", "bob"]);
        let out = session
            .handle_message(
                &ids[0],
                ClientMessage::Opinion {
                    about: ids[1],
                    opinion: "bluffs a lot".into(),
                },
            )
            .unwrap();
        assert_eq!(out.messages_for(&ids[1]).len(), 0);

        let own = session.view_for(&ids[0]);
        assert_eq!(
            own.me(&ids[0]).unwrap().opinions.as_ref().unwrap()[&ids[1]],
            "bluffs a lot"
        );
        let other = session.view_for(&ids[1]);
        assert_eq!(other.me(&ids[0]).unwrap().opinions, None);

        assert_eq!(
            session
                .set_opinion(&ids[0], ids[0], "me".into())
                .unwrap_err(),
            GameError::UnknownPlayer
        );
    }

    #[test]
    fn test_unknown_sender_is_rejected() {
        let (mut session, _) = started(&["alice", "bob"]);
        assert_eq!(
            session
                .handle_message(&PlayerId::new(), ClientMessage::StartGame)
                .unwrap_err(),
            GameError::UnknownPlayer
        );
    }

    #[test]
    fn test_settings_validation() {
        assert!(GameSettings::default().validate().is_ok());
        assert!(GameSettings::new(1, 4, Duration::ZERO).validate().is_err());
        assert!(GameSettings::new(2, 5, Duration::ZERO).validate().is_err());
        assert!(GameSettings::new(3, 2, Duration::ZERO).validate().is_err());
    }
}
