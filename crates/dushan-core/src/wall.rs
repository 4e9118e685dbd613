//! The face-down tile supply.

use crate::tile::{Tile, COPIES_PER_FACE, FACE_COUNT};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Tiles in a full set
pub const WALL_SIZE: usize = FACE_COUNT * COPIES_PER_FACE as usize;

/// The wall, consumed front to back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wall {
    tiles: VecDeque<Tile>,
}

impl Wall {
    /// All 108 tiles in face order, unshuffled
    pub fn full_set() -> Vec<Tile> {
        Tile::all()
            .flat_map(|t| std::iter::repeat(t).take(COPIES_PER_FACE as usize))
            .collect()
    }

    /// A freshly shuffled full wall
    pub fn shuffled<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut tiles = Self::full_set();
        tiles.shuffle(rng);
        Self {
            tiles: tiles.into(),
        }
    }

    /// A wall with a fixed draw order (front of the vector is drawn first)
    pub fn stacked(tiles: Vec<Tile>) -> Self {
        Self {
            tiles: tiles.into(),
        }
    }

    pub fn draw(&mut self) -> Option<Tile> {
        self.tiles.pop_front()
    }

    /// Deal `n` tiles, or fewer if the wall runs out
    pub fn deal(&mut self, n: usize) -> Vec<Tile> {
        let n = n.min(self.tiles.len());
        self.tiles.drain(..n).collect()
    }

    pub fn remaining(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}
