//! Turn state machine.
//!
//! This module contains the `GameManager`, which owns the wall and the four
//! hands for one hand of play and advances one phase per `step`. Whenever a
//! seat has to choose, the manager files a `DecisionRequest`, parks in
//! `GamePhase::Wait` and resumes the phase that asked once a result arrives
//! or the seat's time budget runs out.

use crate::actions::{DecisionKind, DecisionProvider, DecisionRequest, DecisionResult, GameEvent, SeatView};
use crate::config::GameConfig;
use crate::player::{next_seat, Controller, Hand, MeldKind, Player, Seat, Source, SEAT_COUNT, WAITING_HAND_SIZE};
use crate::rule::{
    can_add_kong, can_claim_kong, can_pong, can_self_kong, classify_win, enumerate_waits,
    has_responsibility_pass, RuleError,
};
use crate::scoring::{score_hand, BonusReveal, ScoreSheet, ScoringError};
use crate::tags::{BonusKind, FedWin, SelfWin, TagKind};
use crate::tile::Tile;
use crate::wall::Wall;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Game phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Hand dealt, transient state not yet reset
    GameStart,
    /// The current seat draws from the wall
    DrawTile,
    /// The current seat discards, then other seats may claim the discard
    DiscardTile,
    /// A kong is being resolved (and possibly robbed)
    Kong,
    /// Replacement draw after a kong
    DrawAfterKong,
    /// The forced discard after a replacement draw
    HotDiscard,
    /// A decision request is outstanding
    Wait,
    /// The hand is finished
    GameOver,
}

/// Errors from driving the state machine
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Expected four decision providers, got {0}")]
    WrongProviderCount(usize),

    #[error("A decision request is already outstanding")]
    DecisionPending,

    #[error("No decision request is outstanding")]
    NoPendingDecision,

    #[error("A result for the outstanding request was already submitted")]
    ResultAlreadySubmitted,

    #[error("Seat {0} was not asked for a decision")]
    NotRequestedSeat(Seat),

    #[error("{0:?} does not answer the outstanding request")]
    IllegalDecision(DecisionKind),

    #[error("Seat {0} cannot declare ready")]
    CannotDeclareReady(Seat),

    #[error("Tile {0} is not where the table expects it")]
    MissingTile(Tile),

    #[error("No kong is being resolved")]
    NoKong,

    #[error("The hand is still in progress")]
    HandInProgress,

    #[error("Game is over")]
    GameOver,

    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    Scoring(#[from] ScoringError),
}

/// The outstanding decision request and its timing
#[derive(Debug, Clone)]
struct PendingDecision {
    request: DecisionRequest,
    resume: GamePhase,
    issued_at: Instant,
    recommendation: Option<DecisionResult>,
    retries: u32,
}

/// The discard other seats may currently claim
#[derive(Debug, Clone, Copy)]
struct LiveDiscard {
    seat: Seat,
    tile: Tile,
    bonus: Option<BonusKind>,
}

/// A kong waiting to be resolved
#[derive(Debug, Clone, Copy)]
struct PendingKong {
    tile: Tile,
    /// Discarder, for a kong claimed off a discard
    from: Option<Seat>,
    bonus: Option<BonusKind>,
}

/// Seats being asked, in turn order, whether they win on a tile
#[derive(Debug, Clone)]
struct WinClaims {
    tile: Tile,
    candidates: Vec<Seat>,
    next: usize,
    accepted: Vec<Seat>,
}

/// Tracking for the cross-bonus round.
///
/// The first bonus tile discarded other than as a seat's first discard opens
/// the round; it closes when any participant discards again. There is at
/// most one round per hand.
#[derive(Debug, Clone, Default)]
struct CrossRound {
    open: bool,
    seats: Vec<Seat>,
}

impl CrossRound {
    fn on_discard(&mut self, seat: Seat, bonus: bool, first_discard: bool) -> Option<BonusKind> {
        if self.open && self.seats.contains(&seat) {
            self.open = false;
        }
        if !bonus {
            return None;
        }

        if !first_discard && !self.open && self.seats.is_empty() {
            self.open = true;
            self.seats.push(seat);
        } else if self.open && !self.seats.contains(&seat) {
            self.seats.push(seat);
        }

        Some(if first_discard {
            BonusKind::Charge
        } else if self.open {
            BonusKind::Cross
        } else {
            BonusKind::Plain
        })
    }
}

/// One table of four seats playing hand after hand
pub struct GameManager {
    config: GameConfig,
    players: Vec<Player>,
    providers: Vec<Box<dyn DecisionProvider>>,
    wall: Wall,
    rng: StdRng,
    phase: GamePhase,
    current: Seat,
    dealer: Seat,
    /// Tile drawn this turn while its decision is open
    drawn: Option<Tile>,
    discard: Option<LiveDiscard>,
    kong: Option<PendingKong>,
    hot_tile: Option<Tile>,
    claims: Option<WinClaims>,
    /// Win claims on the current tile were offered and declined
    win_declined: bool,
    cross_round: CrossRound,
    pending: Option<PendingDecision>,
    result: Option<DecisionResult>,
    winners: Vec<Seat>,
    sheet: Option<ScoreSheet>,
}

impl GameManager {
    /// Seat a table and deal the first hand from a shuffled wall
    pub fn new(config: GameConfig, providers: Vec<Box<dyn DecisionProvider>>) -> Result<Self, GameError> {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let wall = Wall::shuffled(&mut rng);
        let dealer = rng.gen_range(0..SEAT_COUNT as Seat);
        Self::build(config, providers, rng, wall, dealer)
    }

    /// Seat a table and deal from a fixed wall. The dealer's 13 tiles come
    /// off the front first, then each following seat's.
    pub fn from_wall(
        config: GameConfig,
        providers: Vec<Box<dyn DecisionProvider>>,
        wall: Wall,
        dealer: Seat,
    ) -> Result<Self, GameError> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::build(config, providers, rng, wall, dealer % SEAT_COUNT as Seat)
    }

    fn build(
        config: GameConfig,
        providers: Vec<Box<dyn DecisionProvider>>,
        rng: StdRng,
        wall: Wall,
        dealer: Seat,
    ) -> Result<Self, GameError> {
        if providers.len() != SEAT_COUNT {
            return Err(GameError::WrongProviderCount(providers.len()));
        }

        let players = (0..SEAT_COUNT as Seat)
            .map(|seat| {
                let name = config
                    .names
                    .get(seat as usize)
                    .cloned()
                    .unwrap_or_else(|| format!("Seat {}", seat));
                let controller = if config.human_seat == Some(seat) {
                    Controller::Human
                } else {
                    Controller::Ai
                };
                Player::new(seat, name, controller, config.initial_score)
            })
            .collect();

        let mut game = Self {
            config,
            players,
            providers,
            wall,
            rng,
            phase: GamePhase::GameStart,
            current: dealer,
            dealer,
            drawn: None,
            discard: None,
            kong: None,
            hot_tile: None,
            claims: None,
            win_declined: false,
            cross_round: CrossRound::default(),
            pending: None,
            result: None,
            winners: Vec::new(),
            sheet: None,
        };
        game.deal();
        Ok(game)
    }

    fn deal(&mut self) {
        for player in &mut self.players {
            player.reset_for_hand();
        }
        for offset in 0..SEAT_COUNT as Seat {
            let seat = (self.dealer + offset) % SEAT_COUNT as Seat;
            let tiles = self.wall.deal(WAITING_HAND_SIZE);
            let hand = &mut self.players[seat as usize].hand;
            hand.concealed = tiles;
            hand.sort();
        }
        self.current = self.dealer;
        self.phase = GamePhase::GameStart;
        self.pending = None;
        self.result = None;
        self.winners.clear();
        self.sheet = None;
        info!(dealer = self.dealer, wall = self.wall.remaining(), "hand dealt");
    }

    /// Deal the next hand. The first winner of the last hand deals; after a
    /// drawn hand the dealer is drawn at random.
    pub fn next_hand(&mut self) -> Result<(), GameError> {
        if self.phase != GamePhase::GameOver || self.sheet.is_none() {
            return Err(GameError::HandInProgress);
        }
        self.dealer = match self.winners.first() {
            Some(&winner) => winner,
            None => self.rng.gen_range(0..SEAT_COUNT as Seat),
        };
        self.wall = Wall::shuffled(&mut self.rng);
        self.deal();
        Ok(())
    }

    // ==================== Queries ====================

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// The phase a pending decision will resume into
    pub fn resume_phase(&self) -> Option<GamePhase> {
        self.pending.as_ref().map(|p| p.resume)
    }

    pub fn current_seat(&self) -> Seat {
        self.current
    }

    pub fn dealer(&self) -> Seat {
        self.dealer
    }

    pub fn wall_remaining(&self) -> usize {
        self.wall.remaining()
    }

    pub fn pending_request(&self) -> Option<&DecisionRequest> {
        self.pending.as_ref().map(|p| &p.request)
    }

    pub fn player(&self, seat: Seat) -> Option<&Player> {
        self.players.get(seat as usize)
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn winners(&self) -> &[Seat] {
        &self.winners
    }

    pub fn score_sheet(&self) -> Option<&ScoreSheet> {
        self.sheet.as_ref()
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn is_finished(&self) -> bool {
        self.phase == GamePhase::GameOver && self.sheet.is_some()
    }

    /// What `seat` can see of the table
    pub fn seat_view(&self, seat: Seat) -> SeatView {
        let player = &self.players[seat as usize % SEAT_COUNT];
        SeatView {
            seat: player.seat,
            hand: player.hand.clone(),
            tags: player.tags.clone(),
            melds: self.players.iter().map(|p| p.hand.exposed.clone()).collect(),
            discards: self.players.iter().map(|p| p.discards.clone()).collect(),
            declared: self
                .players
                .iter()
                .filter(|p| p.declared_ready())
                .map(|p| p.seat)
                .collect(),
            wall_remaining: self.wall.remaining(),
            bonus_tile: self.config.bonus_tile,
        }
    }

    // ==================== External Input ====================

    /// Answer the outstanding request. Results naming a kind the request did
    /// not offer are refused here; a discard naming a tile the seat does not
    /// hold is caught when the result is consumed and the request re-issued.
    pub fn submit_decision(&mut self, result: DecisionResult) -> Result<(), GameError> {
        let pending = self.pending.as_ref().ok_or(GameError::NoPendingDecision)?;
        if self.result.is_some() {
            return Err(GameError::ResultAlreadySubmitted);
        }
        if result.seat != pending.request.seat {
            return Err(GameError::NotRequestedSeat(result.seat));
        }
        if !pending.request.allows(result.kind) {
            return Err(GameError::IllegalDecision(result.kind));
        }
        self.result = Some(result);
        Ok(())
    }

    /// Publicly commit to the current waiting hand. Not allowed while a
    /// decision is outstanding: declaring changes which claims a seat may
    /// make, and the open request was built before it.
    pub fn declare_ready(&mut self, seat: Seat) -> Result<Vec<GameEvent>, GameError> {
        if self.phase == GamePhase::GameOver {
            return Err(GameError::GameOver);
        }
        if self.pending.is_some() {
            return Err(GameError::DecisionPending);
        }
        let player = self
            .players
            .get_mut(seat as usize)
            .ok_or(GameError::CannotDeclareReady(seat))?;
        if player.declared_ready() || player.hand.equivalent_len() != WAITING_HAND_SIZE {
            return Err(GameError::CannotDeclareReady(seat));
        }
        if enumerate_waits(&player.hand, &[])?.is_empty() {
            return Err(GameError::CannotDeclareReady(seat));
        }
        player.add_tag(TagKind::DeclaredReady, Source::Own);
        info!(seat, "declared ready");
        Ok(vec![GameEvent::DeclaredReady { seat }])
    }

    // ==================== Stepping ====================

    /// Advance one phase using the current time
    pub fn step(&mut self) -> Result<Vec<GameEvent>, GameError> {
        self.step_at(Instant::now())
    }

    /// Advance one phase. `now` must come from a monotonic clock; decision
    /// timeouts are measured against it.
    pub fn step_at(&mut self, now: Instant) -> Result<Vec<GameEvent>, GameError> {
        let mut events = Vec::new();
        match self.phase {
            GamePhase::GameStart => self.game_start(&mut events),
            GamePhase::DrawTile => self.draw_phase(now, false, &mut events)?,
            GamePhase::DiscardTile => self.discard_phase(now, &mut events)?,
            GamePhase::Kong => self.kong_phase(now, &mut events)?,
            GamePhase::DrawAfterKong => self.draw_phase(now, true, &mut events)?,
            GamePhase::HotDiscard => self.hot_discard_phase(now, &mut events)?,
            GamePhase::Wait => self.wait_phase(now, &mut events)?,
            GamePhase::GameOver => self.game_over(&mut events)?,
        }
        Ok(events)
    }

    fn game_start(&mut self, events: &mut Vec<GameEvent>) {
        self.drawn = None;
        self.discard = None;
        self.kong = None;
        self.hot_tile = None;
        self.claims = None;
        self.win_declined = false;
        self.cross_round = CrossRound::default();
        self.current = self.dealer;
        self.phase = GamePhase::DrawTile;
        events.push(GameEvent::HandStarted {
            dealer: self.dealer,
            wall_remaining: self.wall.remaining(),
        });
    }

    /// Ordinary draw, or the replacement draw after a kong
    fn draw_phase(&mut self, now: Instant, after_kong: bool, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
        let seat = self.current;
        let tile = match self.drawn {
            Some(tile) => tile,
            None => match self.wall.draw() {
                Some(tile) => {
                    self.players[seat as usize].hand.add(tile);
                    self.drawn = Some(tile);
                    debug!(seat, tile = %tile, after_kong, "draw");
                    events.push(GameEvent::TileDrawn {
                        seat,
                        tile,
                        after_kong,
                    });
                    tile
                }
                None => {
                    info!("wall exhausted, hand drawn");
                    events.push(GameEvent::DrawnOut);
                    self.phase = GamePhase::GameOver;
                    return Ok(());
                }
            },
        };

        let hand = &self.players[seat as usize].hand;
        let before = hand.without(tile).ok_or(GameError::MissingTile(tile))?;
        let mut kinds = Vec::new();
        if !classify_win(&before, tile)?.is_empty() {
            kinds.push(DecisionKind::Win);
        }
        if (can_self_kong(hand, tile) || can_add_kong(hand, tile)) && !self.wall.is_empty() {
            kinds.push(DecisionKind::Kong);
        }

        if !kinds.is_empty() {
            let Some(result) = self.decide(now, seat, kinds, Some(tile), events)? else {
                return Ok(());
            };
            if result.takes(DecisionKind::Win) {
                self.drawn = None;
                let player = &self.players[seat as usize];
                let win = if after_kong {
                    SelfWin::KongFlower
                } else if player.first_draw {
                    SelfWin::HeavenlyHand
                } else if self.wall.is_empty() {
                    SelfWin::LastTile
                } else {
                    SelfWin::SelfDraw
                };
                return self.win_self(seat, tile, win, events);
            }
            if result.takes(DecisionKind::Kong) {
                self.drawn = None;
                self.players[seat as usize].first_draw = false;
                self.kong = Some(PendingKong {
                    tile,
                    from: None,
                    bonus: None,
                });
                self.phase = GamePhase::Kong;
                return Ok(());
            }
        }

        self.drawn = None;
        self.players[seat as usize].first_draw = false;
        self.phase = if after_kong {
            GamePhase::HotDiscard
        } else {
            GamePhase::DiscardTile
        };
        Ok(())
    }

    fn discard_phase(&mut self, now: Instant, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
        if self.discard.is_none() {
            let seat = self.current;
            let Some(result) = self.decide(now, seat, vec![DecisionKind::Discard], None, events)? else {
                return Ok(());
            };
            let tile = result.tile.ok_or(GameError::IllegalDecision(result.kind))?;
            self.commit_discard(seat, tile, false, events)?;
            self.win_declined = false;
        }
        let discard = self.discard.ok_or(GameError::NoPendingDecision)?;

        if !self.win_declined {
            if self.claims.is_none() {
                let require_pass = !self.wall.is_empty();
                let candidates = self.win_candidates(discard.seat, discard.tile, require_pass)?;
                self.open_claims(discard.tile, candidates);
            }
            if self.claims.is_some() {
                let Some(accepted) = self.collect_win_claims(now, events)? else {
                    return Ok(());
                };
                if !accepted.is_empty() {
                    return self.win_fed(discard.seat, discard.tile, &accepted, FedWin::Discard, events);
                }
            }
            self.win_declined = true;
        }

        let kong_seat = self.claimant(discard, |hand, tile| can_claim_kong(hand, tile) && !self.wall.is_empty());
        let pong_seat = self.claimant(discard, can_pong);
        if let Some(seat) = kong_seat.or(pong_seat) {
            let mut kinds = Vec::new();
            if kong_seat == Some(seat) {
                kinds.push(DecisionKind::Kong);
            }
            if pong_seat == Some(seat) {
                kinds.push(DecisionKind::Pong);
            }
            let Some(result) = self.decide(now, seat, kinds, Some(discard.tile), events)? else {
                return Ok(());
            };
            if result.takes(DecisionKind::Kong) {
                return self.claim_kong(seat, discard);
            }
            if result.takes(DecisionKind::Pong) {
                return self.claim_pong(seat, discard, events);
            }
        }

        self.discard = None;
        self.win_declined = false;
        self.current = next_seat(discard.seat);
        self.phase = GamePhase::DrawTile;
        Ok(())
    }

    fn kong_phase(&mut self, now: Instant, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
        let seat = self.current;
        let kong = self.kong.ok_or(GameError::NoKong)?;
        let hand = &self.players[seat as usize].hand;
        let kind = match kong.from {
            Some(_) => MeldKind::ExposedKong,
            None if can_self_kong(hand, kong.tile) => MeldKind::ConcealedKong,
            None if can_add_kong(hand, kong.tile) => MeldKind::AddedKong,
            None => return Err(GameError::MissingTile(kong.tile)),
        };

        if kind == MeldKind::AddedKong && !self.win_declined {
            if self.claims.is_none() {
                let candidates = self.win_candidates(seat, kong.tile, false)?;
                self.open_claims(kong.tile, candidates);
            }
            if self.claims.is_some() {
                let Some(accepted) = self.collect_win_claims(now, events)? else {
                    return Ok(());
                };
                if !accepted.is_empty() {
                    if !self.players[seat as usize].hand.remove(kong.tile) {
                        return Err(GameError::MissingTile(kong.tile));
                    }
                    self.kong = None;
                    return self.win_fed(seat, kong.tile, &accepted, FedWin::RobKong, events);
                }
            }
        }

        let source = kong.from.map(Source::Seat).unwrap_or(Source::Own);
        let bonus = match (kong.bonus, kong.tile == self.config.bonus_tile) {
            (Some(b), _) => Some(b),
            (None, true) => Some(BonusKind::Plain),
            (None, false) => None,
        };
        if !self.players[seat as usize].hand.kong(kong.tile, kind, source, bonus) {
            return Err(GameError::MissingTile(kong.tile));
        }
        info!(seat, tile = %kong.tile, ?kind, "kong");
        events.push(GameEvent::Konged {
            seat,
            tile: kong.tile,
            kind,
        });

        self.kong = None;
        self.win_declined = false;
        self.phase = GamePhase::DrawAfterKong;
        Ok(())
    }

    fn hot_discard_phase(&mut self, now: Instant, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
        let seat = self.current;
        let tile = match self.hot_tile {
            Some(tile) => tile,
            None => {
                let Some(result) = self.decide(now, seat, vec![DecisionKind::Discard], None, events)? else {
                    return Ok(());
                };
                let tile = result.tile.ok_or(GameError::IllegalDecision(result.kind))?;
                self.hot_tile = Some(tile);
                tile
            }
        };

        if !self.win_declined {
            if self.claims.is_none() {
                let candidates = self.win_candidates(seat, tile, false)?;
                self.open_claims(tile, candidates);
            }
            if self.claims.is_some() {
                let Some(accepted) = self.collect_win_claims(now, events)? else {
                    return Ok(());
                };
                if !accepted.is_empty() {
                    if !self.players[seat as usize].hand.remove(tile) {
                        return Err(GameError::MissingTile(tile));
                    }
                    self.hot_tile = None;
                    return self.win_fed(seat, tile, &accepted, FedWin::HotDiscard, events);
                }
            }
        }

        // Every seat able to win on this tile has already been asked
        self.hot_tile = None;
        self.commit_discard(seat, tile, true, events)?;
        self.win_declined = true;
        self.phase = GamePhase::DiscardTile;
        Ok(())
    }

    fn wait_phase(&mut self, now: Instant, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
        let pending = self.pending.as_ref().ok_or(GameError::NoPendingDecision)?;
        if self.result.is_some() {
            self.phase = pending.resume;
            return Ok(());
        }

        let seat = pending.request.seat;
        let request = pending.request.clone();
        let elapsed = now.saturating_duration_since(pending.issued_at);

        match self.players[seat as usize].controller {
            Controller::Ai => {
                if elapsed >= self.config.ai_time_limit() {
                    let view = self.seat_view(seat);
                    let result = self.providers[seat as usize].decide(&view, &request);
                    self.result = Some(result);
                    self.phase = pending.resume;
                }
            }
            Controller::Human => {
                let limit = self.config.human_time_limit();
                if elapsed >= limit {
                    let result = self.fallback(pending);
                    warn!(seat, ?result.kind, "decision timed out");
                    events.push(GameEvent::DecisionTimedOut(result.clone()));
                    self.result = Some(result);
                    self.phase = pending.resume;
                } else if elapsed >= limit / 2 && pending.recommendation.is_none() {
                    let view = self.seat_view(seat);
                    let suggestion = self.providers[seat as usize].decide(&view, &request);
                    events.push(GameEvent::Recommended(suggestion.clone()));
                    if let Some(pending) = self.pending.as_mut() {
                        pending.recommendation = Some(suggestion);
                    }
                }
            }
        }
        Ok(())
    }

    fn game_over(&mut self, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
        if self.sheet.is_some() {
            return Ok(());
        }

        let reveal = if !self.winners.is_empty() && self.config.flip_bonus {
            self.wall
                .draw()
                .map(|t| BonusReveal::new(t, self.config.bonus_tile, self.config.two_sided_flip))
        } else {
            None
        };
        if let Some(reveal) = &reveal {
            info!(flipped = %reveal.flipped, golden = reveal.golden, "bonus reveal");
            events.push(GameEvent::BonusRevealed(reveal.clone()));
        }

        let sheet = score_hand(
            &self.players,
            self.config.bonus_tile,
            reveal.as_ref(),
            &self.config.scores,
        )?;
        for record in &sheet.records {
            let player = &mut self.players[record.seat as usize];
            player.score += record.total;
            if record.bonus_penalty {
                player.add_tag(TagKind::BonusPenalty, Source::Own);
            }
            info!(seat = record.seat, total = record.total, score = player.score, "hand scored");
        }

        events.push(GameEvent::HandScored(sheet.clone()));
        self.sheet = Some(sheet);
        Ok(())
    }

    // ==================== Decisions ====================

    /// Ask `seat` for a decision, or collect the answer to the request made
    /// on an earlier step. Returns `None` while the answer is outstanding.
    fn decide(
        &mut self,
        now: Instant,
        seat: Seat,
        kinds: Vec<DecisionKind>,
        tile: Option<Tile>,
        events: &mut Vec<GameEvent>,
    ) -> Result<Option<DecisionResult>, GameError> {
        let request = DecisionRequest::new(seat, kinds, tile);

        if self.pending.is_none() {
            self.pending = Some(PendingDecision {
                request: request.clone(),
                resume: self.phase,
                issued_at: now,
                recommendation: None,
                retries: 0,
            });
            self.phase = GamePhase::Wait;
            debug!(seat, kinds = ?request.kinds, "decision requested");
            events.push(GameEvent::DecisionRequested(request));
            return Ok(None);
        }
        if self.pending.as_ref().is_some_and(|p| p.request != request) {
            return Err(GameError::DecisionPending);
        }
        let Some(result) = self.result.take() else {
            return Err(GameError::DecisionPending);
        };

        if let Err(reason) = self.validate(&request, &result) {
            let pending = self.pending.as_mut().ok_or(GameError::NoPendingDecision)?;
            pending.retries += 1;
            if pending.retries > self.config.max_decision_retries {
                let pending = self.pending.take().ok_or(GameError::NoPendingDecision)?;
                warn!(seat, %reason, "retries exhausted, using default decision");
                return Ok(Some(self.fallback(&pending)));
            }
            pending.issued_at = now;
            warn!(seat, %reason, "malformed decision rejected");
            self.phase = GamePhase::Wait;
            events.push(GameEvent::DecisionRejected { seat, reason });
            events.push(GameEvent::DecisionRequested(request));
            return Ok(None);
        }

        self.pending = None;
        Ok(Some(result))
    }

    fn validate(&self, request: &DecisionRequest, result: &DecisionResult) -> Result<(), String> {
        if result.seat != request.seat {
            return Err(format!("answer from seat {} to seat {}", result.seat, request.seat));
        }
        if !request.allows(result.kind) {
            return Err(format!("{:?} was not offered", result.kind));
        }
        if request.is_discard() {
            if !result.takes(DecisionKind::Discard) {
                return Err("a discard is required".to_string());
            }
            let hand = &self.players[request.seat as usize].hand;
            match result.tile {
                Some(tile) if hand.contains(tile) => {}
                Some(tile) => return Err(format!("{} is not in hand", tile)),
                None => return Err("discard without a tile".to_string()),
            }
        }
        Ok(())
    }

    /// The decision used when a seat runs out of time or retries
    fn fallback(&self, pending: &PendingDecision) -> DecisionResult {
        let request = &pending.request;
        let seat = request.seat;
        let recommended = pending.recommendation.as_ref();

        if request.is_discard() {
            let hand = &self.players[seat as usize].hand;
            let tile = recommended
                .and_then(|r| r.tile)
                .filter(|&t| hand.contains(t))
                .or_else(|| hand.last_tile());
            return match tile {
                Some(tile) => DecisionResult::discard(seat, tile, "timeout"),
                None => DecisionResult::decline(seat, "timeout, nothing to discard"),
            };
        }

        match recommended {
            Some(r) if r.accepted && request.allows(r.kind) => DecisionResult {
                reason: "timeout, recommended".to_string(),
                ..r.clone()
            },
            _ => DecisionResult::decline(seat, "timeout"),
        }
    }

    // ==================== Claims ====================

    /// Seats after `from` that win on `tile`, in turn order
    fn win_candidates(&self, from: Seat, tile: Tile, require_pass: bool) -> Result<Vec<Seat>, GameError> {
        let mut seats = Vec::new();
        for offset in 1..SEAT_COUNT as Seat {
            let seat = (from + offset) % SEAT_COUNT as Seat;
            let player = &self.players[seat as usize];
            if classify_win(&player.hand, tile)?.is_empty() {
                continue;
            }
            if require_pass {
                let pass = has_responsibility_pass(&player.hand, &player.tags)?;
                if !pass.covers(tile) {
                    debug!(seat, tile = %tile, reason = %pass.reason, "no responsibility pass");
                    continue;
                }
            }
            seats.push(seat);
        }
        Ok(seats)
    }

    fn open_claims(&mut self, tile: Tile, candidates: Vec<Seat>) {
        if !candidates.is_empty() {
            self.claims = Some(WinClaims {
                tile,
                candidates,
                next: 0,
                accepted: Vec::new(),
            });
        }
    }

    /// Ask every candidate in turn. Returns the seats that accepted once all
    /// have answered.
    fn collect_win_claims(&mut self, now: Instant, events: &mut Vec<GameEvent>) -> Result<Option<Vec<Seat>>, GameError> {
        loop {
            let claims = self.claims.as_ref().ok_or(GameError::NoPendingDecision)?;
            let Some(&seat) = claims.candidates.get(claims.next) else {
                let accepted = self.claims.take().map(|c| c.accepted).unwrap_or_default();
                return Ok(Some(accepted));
            };
            let tile = claims.tile;

            let Some(result) = self.decide(now, seat, vec![DecisionKind::Win], Some(tile), events)? else {
                return Ok(None);
            };
            let claims = self.claims.as_mut().ok_or(GameError::NoPendingDecision)?;
            if result.takes(DecisionKind::Win) {
                claims.accepted.push(seat);
            } else {
                debug!(seat, tile = %tile, "win declined");
                events.push(GameEvent::WinDeclined { seat, tile });
            }
            claims.next += 1;
        }
    }

    /// First seat after the discarder, not declared ready, passing `check`
    fn claimant<F>(&self, discard: LiveDiscard, check: F) -> Option<Seat>
    where
        F: Fn(&Hand, Tile) -> bool,
    {
        (1..SEAT_COUNT as Seat)
            .map(|offset| (discard.seat + offset) % SEAT_COUNT as Seat)
            .find(|&seat| {
                let player = &self.players[seat as usize];
                !player.declared_ready() && check(&player.hand, discard.tile)
            })
    }

    /// Charge the discarder for a claimed bonus tile
    fn bonus_responsibility(&mut self, discard: LiveDiscard, claimer: Seat) -> Option<BonusKind> {
        let kind = discard.bonus?;
        let feeder = &mut self.players[discard.seat as usize];
        feeder.add_tag(TagKind::ResponsibleBonus, Source::Seat(claimer));
        feeder.tags.reassign(TagKind::Bonus(kind), Source::Seat(claimer));
        Some(kind)
    }

    fn claim_pong(&mut self, seat: Seat, discard: LiveDiscard, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
        if !self.players[discard.seat as usize].take_last_discard(discard.tile) {
            return Err(GameError::MissingTile(discard.tile));
        }
        let bonus = self.bonus_responsibility(discard, seat);
        let player = &mut self.players[seat as usize];
        if !player.hand.pong(discard.tile, discard.seat, bonus) {
            return Err(GameError::MissingTile(discard.tile));
        }
        // A ponger's next throw is never a charging bonus tile
        player.first_draw = false;
        player.first_discard = false;
        info!(seat, from = discard.seat, tile = %discard.tile, "pong");
        events.push(GameEvent::Ponged {
            seat,
            from: discard.seat,
            tile: discard.tile,
        });

        self.discard = None;
        self.win_declined = false;
        self.current = seat;
        self.phase = GamePhase::DiscardTile;
        Ok(())
    }

    fn claim_kong(&mut self, seat: Seat, discard: LiveDiscard) -> Result<(), GameError> {
        if !self.players[discard.seat as usize].take_last_discard(discard.tile) {
            return Err(GameError::MissingTile(discard.tile));
        }
        let bonus = self.bonus_responsibility(discard, seat);
        self.players[seat as usize].first_draw = false;
        self.kong = Some(PendingKong {
            tile: discard.tile,
            from: Some(discard.seat),
            bonus,
        });

        self.discard = None;
        self.win_declined = false;
        self.current = seat;
        self.phase = GamePhase::Kong;
        Ok(())
    }

    // ==================== Discards and Wins ====================

    fn commit_discard(&mut self, seat: Seat, tile: Tile, hot: bool, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
        let is_bonus = tile == self.config.bonus_tile;
        let player = &mut self.players[seat as usize];
        if !player.discard(tile) {
            return Err(GameError::MissingTile(tile));
        }

        let bonus = self.cross_round.on_discard(seat, is_bonus, player.first_discard);
        player.first_discard = false;
        if let Some(kind) = bonus {
            player.add_tag(TagKind::Bonus(kind), Source::Own);
            debug!(seat, ?kind, "bonus tile discarded");
            events.push(GameEvent::BonusTagged { seat, kind });
        }

        debug!(seat, tile = %tile, hot, "discard");
        events.push(GameEvent::TileDiscarded { seat, tile, hot });
        self.discard = Some(LiveDiscard { seat, tile, bonus });
        Ok(())
    }

    fn win_self(&mut self, seat: Seat, tile: Tile, win: SelfWin, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
        let player = &mut self.players[seat as usize];
        let before = player.hand.without(tile).ok_or(GameError::MissingTile(tile))?;
        let shapes = classify_win(&before, tile)?;

        player.add_tag(TagKind::SelfWin(win), Source::Own);
        for shape in shapes.iter() {
            player.add_tag(TagKind::Shape(shape), Source::Own);
        }
        player.first_draw = false;

        let tags: Vec<TagKind> = player.tags.iter().map(|t| t.kind).collect();
        info!(seat, tile = %tile, ?tags, "self-drawn win");
        events.push(GameEvent::Won {
            seat,
            tile,
            from: None,
            tags,
        });

        self.winners = vec![seat];
        self.phase = GamePhase::GameOver;
        Ok(())
    }

    /// Settle a win by one or more seats on a tile `from` gave up. The tile
    /// must already be out of `from`'s hand (discard row or removed).
    fn win_fed(
        &mut self,
        from: Seat,
        tile: Tile,
        winners: &[Seat],
        win: FedWin,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        let last_tile = self.wall.is_empty();
        for &seat in winners {
            let player = &mut self.players[seat as usize];
            let shapes = classify_win(&player.hand, tile)?;
            player.hand.add(tile);
            player.add_tag(TagKind::FedWin(win), Source::Seat(from));
            if win == FedWin::Discard && last_tile {
                player.add_tag(TagKind::FedWin(FedWin::LastDiscard), Source::Seat(from));
            }
            for shape in shapes.iter() {
                player.add_tag(TagKind::Shape(shape), Source::Seat(from));
            }

            let tags: Vec<TagKind> = player.tags.iter().map(|t| t.kind).collect();
            info!(seat, from, tile = %tile, ?tags, "won on discard");
            events.push(GameEvent::Won {
                seat,
                tile,
                from: Some(from),
                tags,
            });
        }

        let first = Source::Seat(winners[0]);
        let feeder = &mut self.players[from as usize];
        match win {
            FedWin::Discard | FedWin::LastDiscard => {
                feeder.take_last_discard(tile);
                feeder.add_tag(TagKind::FedDiscard, first);
            }
            FedWin::HotDiscard => {
                feeder.add_tag(TagKind::FedHotDiscard, first);
                feeder.add_tag(TagKind::AllBurn, first);
            }
            FedWin::RobKong => {
                feeder.add_tag(TagKind::AllBurn, first);
            }
        }
        // Unique per kind: an earlier pong of a bonus tile keeps its source.
        // Only the Bonus tags carry points.
        if tile == self.config.bonus_tile {
            feeder.add_tag(TagKind::ResponsibleBonus, first);
        }
        match winners.len() {
            2 => {
                feeder.add_tag(TagKind::DoubleWin, first);
            }
            3 => {
                feeder.add_tag(TagKind::TripleWin, first);
            }
            _ => {}
        }

        self.discard = None;
        self.claims = None;
        self.winners = winners.to_vec();
        self.phase = GamePhase::GameOver;
        Ok(())
    }
}
