//! Decisions players make and the events the table emits.
//!
//! The state machine asks one seat at a time for a decision through a
//! `DecisionRequest` and consumes the matching `DecisionResult`. Who computes
//! the result (a person, a bot) is hidden behind `DecisionProvider`.

use crate::player::{Hand, Meld, MeldKind, Seat};
use crate::scoring::{BonusReveal, ScoreSheet};
use crate::tags::{BonusKind, TagKind, TagList};
use crate::tile::Tile;
use serde::{Deserialize, Serialize};

/// Kinds of decision a seat can be asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecisionKind {
    Win,
    Kong,
    Pong,
    Discard,
    /// Decline every offered option
    Cancel,
}

/// An outstanding question to one seat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub seat: Seat,
    /// Legal answers besides `Cancel`
    pub kinds: Vec<DecisionKind>,
    /// The tile in question; empty for a plain discard request
    pub tile: Option<Tile>,
}

impl DecisionRequest {
    pub fn new(seat: Seat, kinds: Vec<DecisionKind>, tile: Option<Tile>) -> Self {
        Self { seat, kinds, tile }
    }

    /// Whether `kind` answers this request
    pub fn allows(&self, kind: DecisionKind) -> bool {
        kind == DecisionKind::Cancel || self.kinds.contains(&kind)
    }

    pub fn is_discard(&self) -> bool {
        self.kinds.contains(&DecisionKind::Discard)
    }
}

/// A seat's answer to a `DecisionRequest`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionResult {
    pub seat: Seat,
    pub kind: DecisionKind,
    pub accepted: bool,
    /// The discarded tile for a discard decision
    pub tile: Option<Tile>,
    /// Free text for logs and display
    pub reason: String,
}

impl DecisionResult {
    pub fn accept(seat: Seat, kind: DecisionKind, reason: impl Into<String>) -> Self {
        Self {
            seat,
            kind,
            accepted: true,
            tile: None,
            reason: reason.into(),
        }
    }

    pub fn discard(seat: Seat, tile: Tile, reason: impl Into<String>) -> Self {
        Self {
            seat,
            kind: DecisionKind::Discard,
            accepted: true,
            tile: Some(tile),
            reason: reason.into(),
        }
    }

    pub fn decline(seat: Seat, reason: impl Into<String>) -> Self {
        Self {
            seat,
            kind: DecisionKind::Cancel,
            accepted: false,
            tile: None,
            reason: reason.into(),
        }
    }

    /// Whether this result takes the `kind` option
    pub fn takes(&self, kind: DecisionKind) -> bool {
        self.accepted && self.kind == kind
    }
}

/// What one seat can see of the table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatView {
    pub seat: Seat,
    pub hand: Hand,
    pub tags: TagList,
    /// Exposed melds of every seat, by seat
    pub melds: Vec<Vec<Meld>>,
    /// Discard rows of every seat, by seat
    pub discards: Vec<Vec<Tile>>,
    /// Seats that declared ready
    pub declared: Vec<Seat>,
    pub wall_remaining: usize,
    pub bonus_tile: Tile,
}

impl SeatView {
    /// Every tile this seat can see: its own concealed tiles, all melds and discards
    pub fn visible_tiles(&self) -> Vec<Tile> {
        let mut tiles = self.hand.concealed.clone();
        tiles.extend(self.melds.iter().flatten().flat_map(|m| m.tiles()));
        tiles.extend(self.discards.iter().flatten().copied());
        tiles
    }
}

/// Anything that can answer decision requests for a seat
pub trait DecisionProvider {
    fn decide(&mut self, view: &SeatView, request: &DecisionRequest) -> DecisionResult;
}

impl<F> DecisionProvider for F
where
    F: FnMut(&SeatView, &DecisionRequest) -> DecisionResult,
{
    fn decide(&mut self, view: &SeatView, request: &DecisionRequest) -> DecisionResult {
        self(view, request)
    }
}

/// Events that result from advancing the table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    HandStarted {
        dealer: Seat,
        wall_remaining: usize,
    },
    TileDrawn {
        seat: Seat,
        tile: Tile,
        after_kong: bool,
    },
    TileDiscarded {
        seat: Seat,
        tile: Tile,
        hot: bool,
    },
    BonusTagged {
        seat: Seat,
        kind: BonusKind,
    },
    Ponged {
        seat: Seat,
        from: Seat,
        tile: Tile,
    },
    Konged {
        seat: Seat,
        tile: Tile,
        kind: MeldKind,
    },
    DeclaredReady {
        seat: Seat,
    },
    DecisionRequested(DecisionRequest),
    /// A result was malformed and the request was issued again
    DecisionRejected {
        seat: Seat,
        reason: String,
    },
    /// The seat's budget ran out and a result was synthesized
    DecisionTimedOut(DecisionResult),
    /// Suggestion for the human seat at half budget
    Recommended(DecisionResult),
    WinDeclined {
        seat: Seat,
        tile: Tile,
    },
    Won {
        seat: Seat,
        tile: Tile,
        from: Option<Seat>,
        tags: Vec<TagKind>,
    },
    DrawnOut,
    BonusRevealed(BonusReveal),
    HandScored(ScoreSheet),
}
