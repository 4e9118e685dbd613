//! Tile faces and suits.
//!
//! This module contains:
//! - The three suits (wan, tiao, tong) and the 27 tile faces
//! - The compact tile notation used in tests and configuration (`"123w55t"`)
//! - `TileCounts`, a fixed per-face histogram used by the rule engine

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of distinct tile faces (3 suits x 9 ranks)
pub const FACE_COUNT: usize = 27;

/// Copies of each face in a full set
pub const COPIES_PER_FACE: u8 = 4;

/// Tile suits.
///
/// Ordering follows the traditional layout: wan, tiao, tong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Suit {
    /// Characters (万)
    Wan,
    /// Bamboo (条)
    Tiao,
    /// Dots (筒)
    Tong,
}

impl Suit {
    /// All suits, in tile order
    pub const ALL: [Suit; 3] = [Suit::Wan, Suit::Tiao, Suit::Tong];

    /// Letter used in compact notation
    pub fn letter(&self) -> char {
        match self {
            Suit::Wan => 'w',
            Suit::Tiao => 't',
            Suit::Tong => 'd',
        }
    }

    pub fn from_letter(c: char) -> Option<Suit> {
        match c.to_ascii_lowercase() {
            'w' => Some(Suit::Wan),
            't' => Some(Suit::Tiao),
            'd' => Some(Suit::Tong),
            _ => None,
        }
    }

    fn index(&self) -> usize {
        match self {
            Suit::Wan => 0,
            Suit::Tiao => 1,
            Suit::Tong => 2,
        }
    }
}

/// Errors from parsing tile notation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TileParseError {
    #[error("Invalid rank '{0}'")]
    InvalidRank(char),

    #[error("Unknown suit letter '{0}'")]
    UnknownSuit(char),

    #[error("Ranks without a suit letter: {0}")]
    MissingSuit(String),

    #[error("Expected exactly one tile, found {0}")]
    NotSingleTile(usize),
}

/// A single tile face. Equality and ordering are by (suit, rank).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Tile {
    suit: Suit,
    rank: u8,
}

impl Tile {
    /// Build a tile. Panics on a rank outside 1..=9, which is a programmer error.
    pub const fn new(suit: Suit, rank: u8) -> Self {
        assert!(rank >= 1 && rank <= 9, "tile rank must be within 1..=9");
        Self { suit, rank }
    }

    pub fn try_new(suit: Suit, rank: u8) -> Option<Self> {
        (1..=9).contains(&rank).then_some(Self { suit, rank })
    }

    pub fn suit(&self) -> Suit {
        self.suit
    }

    pub fn rank(&self) -> u8 {
        self.rank
    }

    /// Dense index in `0..FACE_COUNT`
    pub fn index(&self) -> usize {
        self.suit.index() * 9 + (self.rank as usize - 1)
    }

    pub fn from_index(index: usize) -> Option<Self> {
        let suit = *Suit::ALL.get(index / 9)?;
        Self::try_new(suit, (index % 9) as u8 + 1)
    }

    /// All 27 faces in (suit, rank) order
    pub fn all() -> impl Iterator<Item = Tile> {
        Suit::ALL
            .into_iter()
            .flat_map(|suit| (1..=9).map(move |rank| Tile { suit, rank }))
    }

    /// The next rank in the same suit, wrapping 9 to 1
    pub fn next_cyclic(&self) -> Tile {
        Tile {
            suit: self.suit,
            rank: self.rank % 9 + 1,
        }
    }

    /// The previous rank in the same suit, wrapping 1 to 9
    pub fn prev_cyclic(&self) -> Tile {
        Tile {
            suit: self.suit,
            rank: (self.rank + 7) % 9 + 1,
        }
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank, self.suit.letter())
    }
}

impl std::str::FromStr for Tile {
    type Err = TileParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tiles = parse_tiles(s)?;
        match tiles.as_slice() {
            [tile] => Ok(*tile),
            other => Err(TileParseError::NotSingleTile(other.len())),
        }
    }
}

impl TryFrom<String> for Tile {
    type Error = TileParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Tile> for String {
    fn from(tile: Tile) -> Self {
        tile.to_string()
    }
}

/// Parse compact notation: ranks followed by their suit letter.
///
/// `"444w 66w 123t"` yields three 4w, two 6w, then 1t 2t 3t. Whitespace is ignored.
pub fn parse_tiles(s: &str) -> Result<Vec<Tile>, TileParseError> {
    let mut tiles = Vec::new();
    let mut ranks = String::new();

    for c in s.chars().filter(|c| !c.is_whitespace()) {
        if c.is_ascii_digit() {
            ranks.push(c);
            continue;
        }
        let suit = Suit::from_letter(c).ok_or(TileParseError::UnknownSuit(c))?;
        for r in ranks.drain(..) {
            let rank = r.to_digit(10).unwrap_or(0) as u8;
            tiles.push(Tile::try_new(suit, rank).ok_or(TileParseError::InvalidRank(r))?);
        }
    }

    if !ranks.is_empty() {
        return Err(TileParseError::MissingSuit(ranks));
    }
    Ok(tiles)
}

/// Format tiles in display order, space separated
pub fn format_tiles(tiles: &[Tile]) -> String {
    tiles
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Per-face tile histogram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TileCounts([u8; FACE_COUNT]);

impl TileCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tiles<'a>(tiles: impl IntoIterator<Item = &'a Tile>) -> Self {
        let mut counts = Self::new();
        for tile in tiles {
            counts.add(*tile, 1);
        }
        counts
    }

    pub fn get(&self, tile: Tile) -> u8 {
        self.0[tile.index()]
    }

    pub fn add(&mut self, tile: Tile, n: u8) {
        self.0[tile.index()] += n;
    }

    /// Remove `n` copies; returns false (and changes nothing) if not enough are held
    pub fn remove(&mut self, tile: Tile, n: u8) -> bool {
        let slot = &mut self.0[tile.index()];
        if *slot < n {
            return false;
        }
        *slot -= n;
        true
    }

    pub fn total(&self) -> usize {
        self.0.iter().map(|&c| c as usize).sum()
    }

    /// Faces with a non-zero count, paired with the count
    pub fn iter(&self) -> impl Iterator<Item = (Tile, u8)> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, c)| **c > 0)
            .filter_map(|(i, c)| Tile::from_index(i).map(|t| (t, *c)))
    }

    /// Lowest face with a non-zero count
    pub fn first(&self) -> Option<Tile> {
        self.iter().next().map(|(t, _)| t)
    }
}
