//! Player state and hands.
//!
//! This module contains:
//! - Seat identifiers and tag/meld attribution (`Source`)
//! - Melds (pongs and the three kinds of kong)
//! - `Hand`: concealed tiles plus exposed melds
//! - `Player`: hand, discards, tags and running score for one seat

use crate::tags::{BonusKind, Tag, TagKind, TagList};
use crate::tile::{Tile, TileCounts};
use serde::{Deserialize, Serialize};

/// Seat index (0-3)
pub type Seat = u8;

/// Seats at the table
pub const SEAT_COUNT: usize = 4;

/// Concealed-equivalent tile count of a hand waiting for its 14th tile
pub const WAITING_HAND_SIZE: usize = 13;

/// The seat after `seat` in turn order
pub fn next_seat(seat: Seat) -> Seat {
    (seat + 1) % SEAT_COUNT as Seat
}

/// Who a meld or tag is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    /// The player themself
    Own,
    /// Another seat
    Seat(Seat),
}

impl Source {
    /// Whether this attribution points at `seat`
    pub fn is_seat(&self, seat: Seat) -> bool {
        *self == Source::Seat(seat)
    }
}

/// Meld subtypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeldKind {
    /// Triplet claimed from a discard
    Pong,
    /// Quad claimed from a discard
    ExposedKong,
    /// Pong upgraded with the fourth tile
    AddedKong,
    /// Four tiles drawn by the player
    ConcealedKong,
}

impl MeldKind {
    pub fn is_kong(&self) -> bool {
        !matches!(self, MeldKind::Pong)
    }

    /// Physical tile count: 3 for a pong, 4 for any kong
    pub fn tile_count(&self) -> usize {
        if self.is_kong() {
            4
        } else {
            3
        }
    }
}

/// An exposed meld. All tiles of a meld share one face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meld {
    pub tile: Tile,
    pub kind: MeldKind,
    pub source: Source,
    /// Role of the bonus tile this meld was built from, if any
    pub bonus: Option<BonusKind>,
}

impl Meld {
    pub fn is_kong(&self) -> bool {
        self.kind.is_kong()
    }

    pub fn tiles(&self) -> impl Iterator<Item = Tile> {
        std::iter::repeat(self.tile).take(self.kind.tile_count())
    }
}

/// A player's tiles
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hand {
    /// Tiles only this player sees; the last entry is the most recent draw
    pub concealed: Vec<Tile>,
    pub exposed: Vec<Meld>,
}

impl Hand {
    pub fn new(concealed: Vec<Tile>) -> Self {
        Self {
            concealed,
            exposed: Vec::new(),
        }
    }

    pub fn with_melds(concealed: Vec<Tile>, exposed: Vec<Meld>) -> Self {
        Self { concealed, exposed }
    }

    /// Concealed copies of `tile`
    pub fn count(&self, tile: Tile) -> u8 {
        self.concealed.iter().filter(|&&t| t == tile).count() as u8
    }

    pub fn contains(&self, tile: Tile) -> bool {
        self.concealed.contains(&tile)
    }

    /// Concealed tiles plus three per meld
    pub fn equivalent_len(&self) -> usize {
        self.concealed.len() + 3 * self.exposed.len()
    }

    /// Histogram of concealed tiles plus three per meld
    pub fn equivalent_counts(&self) -> TileCounts {
        let mut counts = TileCounts::from_tiles(&self.concealed);
        for meld in &self.exposed {
            counts.add(meld.tile, 3);
        }
        counts
    }

    /// Every physical tile the player holds, kongs counted as four
    pub fn all_tiles(&self) -> Vec<Tile> {
        let mut tiles = self.concealed.clone();
        tiles.extend(self.exposed.iter().flat_map(|m| m.tiles()));
        tiles
    }

    pub fn last_tile(&self) -> Option<Tile> {
        self.concealed.last().copied()
    }

    pub fn add(&mut self, tile: Tile) {
        self.concealed.push(tile);
    }

    /// Remove one concealed copy, preferring the most recently added
    pub fn remove(&mut self, tile: Tile) -> bool {
        match self.concealed.iter().rposition(|&t| t == tile) {
            Some(i) => {
                self.concealed.remove(i);
                true
            }
            None => false,
        }
    }

    fn remove_n(&mut self, tile: Tile, n: u8) -> bool {
        if self.count(tile) < n {
            return false;
        }
        for _ in 0..n {
            self.remove(tile);
        }
        true
    }

    /// A copy of this hand without one copy of `tile`
    pub fn without(&self, tile: Tile) -> Option<Hand> {
        let mut hand = self.clone();
        hand.remove(tile).then_some(hand)
    }

    pub fn sort(&mut self) {
        self.concealed.sort();
    }

    pub fn has_kong(&self) -> bool {
        self.exposed.iter().any(|m| m.is_kong())
    }

    pub fn kongs(&self) -> impl Iterator<Item = &Meld> {
        self.exposed.iter().filter(|m| m.is_kong())
    }

    /// The exposed pong of `tile`, if any
    pub fn pong_of(&self, tile: Tile) -> Option<&Meld> {
        self.exposed
            .iter()
            .find(|m| m.tile == tile && m.kind == MeldKind::Pong)
    }

    /// Expose two concealed copies plus the claimed discard as a pong
    pub fn pong(&mut self, tile: Tile, from: Seat, bonus: Option<BonusKind>) -> bool {
        if !self.remove_n(tile, 2) {
            return false;
        }
        self.exposed.push(Meld {
            tile,
            kind: MeldKind::Pong,
            source: Source::Seat(from),
            bonus,
        });
        true
    }

    /// Form a kong of `kind`. The tiles it consumes must already be concealed:
    /// four for a concealed kong, three for an exposed kong (plus the claimed
    /// discard), one for an added kong.
    pub fn kong(&mut self, tile: Tile, kind: MeldKind, source: Source, bonus: Option<BonusKind>) -> bool {
        match kind {
            MeldKind::Pong => false,
            MeldKind::ConcealedKong | MeldKind::ExposedKong => {
                let needed = if kind == MeldKind::ConcealedKong { 4 } else { 3 };
                if !self.remove_n(tile, needed) {
                    return false;
                }
                self.exposed.push(Meld {
                    tile,
                    kind,
                    source,
                    bonus,
                });
                true
            }
            MeldKind::AddedKong => {
                let Some(index) = self
                    .exposed
                    .iter()
                    .position(|m| m.tile == tile && m.kind == MeldKind::Pong)
                else {
                    return false;
                };
                if !self.remove(tile) {
                    return false;
                }
                let meld = &mut self.exposed[index];
                meld.kind = MeldKind::AddedKong;
                // A bonus-tile meld stays charged to whoever fed the pong
                if meld.bonus.is_none() {
                    meld.source = Source::Own;
                }
                true
            }
        }
    }
}

/// Who answers decisions for a seat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Controller {
    /// Answers arrive through `GameManager::submit_decision`; the seat's
    /// provider is only consulted for recommendations and timeouts
    Human,
    /// The seat's provider answers when the AI budget elapses
    Ai,
}

/// Per-seat state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub seat: Seat,
    pub name: String,
    pub controller: Controller,
    pub hand: Hand,
    /// Discards still lying in front of this player
    pub discards: Vec<Tile>,
    pub tags: TagList,
    /// Set until the player's first draw of the hand
    pub first_draw: bool,
    /// Set until the player's first discard of the hand
    pub first_discard: bool,
    /// Running score across hands
    pub score: i32,
}

impl Player {
    pub fn new(seat: Seat, name: String, controller: Controller, score: i32) -> Self {
        Self {
            seat,
            name,
            controller,
            hand: Hand::default(),
            discards: Vec::new(),
            tags: TagList::new(),
            first_draw: true,
            first_discard: true,
            score,
        }
    }

    /// Clear everything except identity and running score
    pub fn reset_for_hand(&mut self) {
        self.hand = Hand::default();
        self.discards.clear();
        self.tags.clear();
        self.first_draw = true;
        self.first_discard = true;
    }

    pub fn add_tag(&mut self, kind: TagKind, source: Source) -> bool {
        self.tags.add(Tag::new(kind, source))
    }

    pub fn declared_ready(&self) -> bool {
        self.tags.contains(TagKind::DeclaredReady)
    }

    pub fn is_human(&self) -> bool {
        self.controller == Controller::Human
    }

    /// Move a concealed tile to the discard row
    pub fn discard(&mut self, tile: Tile) -> bool {
        if !self.hand.remove(tile) {
            return false;
        }
        self.discards.push(tile);
        true
    }

    /// Take back the most recent discard when another seat claims it
    pub fn take_last_discard(&mut self, tile: Tile) -> bool {
        if self.discards.last() == Some(&tile) {
            self.discards.pop();
            true
        } else {
            false
        }
    }
}
