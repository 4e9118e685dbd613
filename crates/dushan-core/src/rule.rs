//! Hand evaluation rules.
//!
//! Pure functions over a hand snapshot:
//! - Claim eligibility: pong, the three kong kinds
//! - Win classification into shape tags
//! - Waiting-tile enumeration
//! - The responsibility pass required to win off another seat's discard
//!
//! Nothing here knows whose turn it is. Hand sizes that cannot occur at the
//! point a check is made are reported as `RuleError`, never as "no".

use crate::player::{Hand, WAITING_HAND_SIZE};
use crate::tags::{TagKind, TagList, WinShape};
use crate::tile::{format_tiles, Tile, TileCounts, COPIES_PER_FACE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Melds in a complete hand
const MELDS_PER_HAND: usize = 4;

/// Pairs in a seven-pairs hand
const SEVEN_PAIRS: u8 = 7;

/// Errors from calling a rule with a hand in the wrong state
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum RuleError {
    #[error("Win check needs {expected} equivalent tiles, found {found}")]
    InvalidHandSize { expected: usize, found: usize },

    #[error("Waiting check needs 1, 4, 7, 10 or 13 concealed tiles and 13 equivalent, found {concealed} concealed and {equivalent} equivalent")]
    InvalidWaitSize { concealed: usize, equivalent: usize },
}

/// The set of shapes a completed hand satisfies
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinShapes(Vec<WinShape>);

impl WinShapes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, shape: WinShape) {
        if let Err(i) = self.0.binary_search(&shape) {
            self.0.insert(i, shape);
        }
    }

    pub fn remove(&mut self, shape: WinShape) {
        self.0.retain(|&s| s != shape);
    }

    pub fn contains(&self, shape: WinShape) -> bool {
        self.0.contains(&shape)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = WinShape> + '_ {
        self.0.iter().copied()
    }

    /// Shapes other than the plain normal hand
    pub fn special(&self) -> impl Iterator<Item = WinShape> + '_ {
        self.iter().filter(|&s| s != WinShape::Normal)
    }

    pub fn describe(&self) -> String {
        self.iter()
            .map(|s| TagKind::Shape(s).label())
            .collect::<Vec<_>>()
            .join("+")
    }
}

impl FromIterator<WinShape> for WinShapes {
    fn from_iter<I: IntoIterator<Item = WinShape>>(iter: I) -> Self {
        let mut shapes = Self::new();
        for shape in iter {
            shapes.insert(shape);
        }
        shapes
    }
}

/// One tile a hand is waiting on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wait {
    pub tile: Tile,
    pub shapes: WinShapes,
    /// Copies not yet visible to the caller
    pub remaining: u8,
}

/// What a responsibility pass lets the holder win on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassScope {
    Denied,
    /// Declared ready or holding a kong
    AnyTile,
    /// Only the tiles that complete a special shape
    Tiles(Vec<Tile>),
}

/// Result of the responsibility-pass check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsibilityPass {
    pub scope: PassScope,
    /// Human-readable justification for display
    pub reason: String,
}

impl ResponsibilityPass {
    pub fn granted(&self) -> bool {
        self.scope != PassScope::Denied
    }

    /// Whether the pass allows winning on `tile`
    pub fn covers(&self, tile: Tile) -> bool {
        match &self.scope {
            PassScope::Denied => false,
            PassScope::AnyTile => true,
            PassScope::Tiles(tiles) => tiles.contains(&tile),
        }
    }
}

// ==================== Claim Eligibility ====================

/// At least two concealed copies of a discarded tile
pub fn can_pong(hand: &Hand, tile: Tile) -> bool {
    hand.count(tile) >= 2
}

/// All four copies concealed, the last one just drawn
pub fn can_self_kong(hand: &Hand, tile: Tile) -> bool {
    hand.count(tile) == COPIES_PER_FACE
}

/// An exposed pong of the tile plus a concealed copy
pub fn can_add_kong(hand: &Hand, tile: Tile) -> bool {
    hand.pong_of(tile).is_some() && hand.count(tile) >= 1
}

/// Exactly three concealed copies of a tile another seat discarded
pub fn can_claim_kong(hand: &Hand, tile: Tile) -> bool {
    hand.count(tile) == COPIES_PER_FACE - 1
}

// ==================== Win Classification ====================

/// Classify `hand` completed by `tile`.
///
/// `hand` must hold exactly 13 equivalent tiles (concealed plus three per
/// meld). Returns every shape the 14 tiles satisfy; empty means no win.
pub fn classify_win(hand: &Hand, tile: Tile) -> Result<WinShapes, RuleError> {
    let found = hand.equivalent_len();
    if found != WAITING_HAND_SIZE {
        return Err(RuleError::InvalidHandSize {
            expected: WAITING_HAND_SIZE,
            found,
        });
    }

    let mut all = hand.equivalent_counts();
    all.add(tile, 1);

    let mut shapes = WinShapes::new();
    if is_big_pairs(hand, &all) {
        shapes.insert(WinShape::BigPairs);
    }
    if is_lone_pair(hand, tile) {
        shapes.insert(WinShape::LonePair);
    }
    if hand.exposed.is_empty() && is_seven_pairs(&all) {
        if all.get(tile) == COPIES_PER_FACE {
            shapes.insert(WinShape::DragonSevens);
        } else {
            shapes.insert(WinShape::SmallSevens);
        }
    }
    if shapes.is_empty() && is_normal(hand, tile) {
        shapes.insert(WinShape::Normal);
    }

    if !shapes.is_empty() && is_single_suit(&all) {
        shapes.remove(WinShape::Normal);
        shapes.insert(WinShape::Flush);
    }

    Ok(shapes)
}

/// One pair, every other face a triplet, at least one triplet still concealed
fn is_big_pairs(hand: &Hand, all: &TileCounts) -> bool {
    if hand.exposed.len() >= MELDS_PER_HAND || hand.concealed.len() == 1 {
        return false;
    }
    let mut pairs = 0;
    for (_, count) in all.iter() {
        match count {
            2 => pairs += 1,
            3 => {}
            _ => return false,
        }
    }
    pairs == 1
}

fn is_lone_pair(hand: &Hand, tile: Tile) -> bool {
    hand.exposed.len() == MELDS_PER_HAND && hand.concealed == [tile]
}

fn is_seven_pairs(all: &TileCounts) -> bool {
    all.iter().map(|(_, c)| c / 2).sum::<u8>() == SEVEN_PAIRS
}

fn is_single_suit(all: &TileCounts) -> bool {
    let mut suits = all.iter().map(|(t, _)| t.suit());
    match suits.next() {
        Some(first) => suits.all(|s| s == first),
        None => false,
    }
}

/// Pair plus melds over the concealed tiles and the winning tile.
///
/// Every face is tried as the pair, and for each the remainder is searched
/// over all triplet/run decompositions rather than a single greedy pass.
fn is_normal(hand: &Hand, tile: Tile) -> bool {
    let needed = MELDS_PER_HAND.saturating_sub(hand.exposed.len());
    if hand.concealed.len() + 1 != needed * 3 + 2 {
        return false;
    }

    let mut counts = TileCounts::from_tiles(&hand.concealed);
    counts.add(tile, 1);

    let candidates: Vec<Tile> = counts
        .iter()
        .filter(|&(_, c)| c >= 2)
        .map(|(t, _)| t)
        .collect();
    candidates.into_iter().any(|pair| {
        let mut rest = counts;
        rest.remove(pair, 2) && decomposes(&mut rest)
    })
}

/// Whether the counts split entirely into triplets and runs
fn decomposes(counts: &mut TileCounts) -> bool {
    let Some(low) = counts.first() else {
        return true;
    };

    if counts.get(low) >= 3 {
        counts.remove(low, 3);
        let ok = decomposes(counts);
        counts.add(low, 3);
        if ok {
            return true;
        }
    }

    if low.rank() <= 7 {
        let mid = low.next_cyclic();
        let high = mid.next_cyclic();
        if counts.get(mid) > 0 && counts.get(high) > 0 {
            counts.remove(low, 1);
            counts.remove(mid, 1);
            counts.remove(high, 1);
            let ok = decomposes(counts);
            counts.add(low, 1);
            counts.add(mid, 1);
            counts.add(high, 1);
            return ok;
        }
    }

    false
}

// ==================== Waits ====================

/// Every tile that would complete `hand`.
///
/// `seen` is every tile visible to the caller (their own hand, all melds and
/// discards); `remaining` on each wait is four minus the copies in `seen`.
pub fn enumerate_waits(hand: &Hand, seen: &[Tile]) -> Result<Vec<Wait>, RuleError> {
    let concealed = hand.concealed.len();
    let equivalent = hand.equivalent_len();
    if concealed % 3 != 1 || concealed > WAITING_HAND_SIZE || equivalent != WAITING_HAND_SIZE {
        return Err(RuleError::InvalidWaitSize {
            concealed,
            equivalent,
        });
    }

    let seen = TileCounts::from_tiles(seen);
    let mut waits = Vec::new();
    for tile in Tile::all() {
        let shapes = classify_win(hand, tile)?;
        if !shapes.is_empty() {
            waits.push(Wait {
                tile,
                shapes,
                remaining: COPIES_PER_FACE.saturating_sub(seen.get(tile)),
            });
        }
    }
    Ok(waits)
}

// ==================== Responsibility Pass ====================

/// Whether the holder may win off another seat's discard.
///
/// Granted for any tile after declaring ready or while holding a kong;
/// otherwise only for the tiles that complete a shape better than a plain
/// normal hand.
pub fn has_responsibility_pass(hand: &Hand, tags: &TagList) -> Result<ResponsibilityPass, RuleError> {
    if tags.contains(TagKind::DeclaredReady) {
        return Ok(ResponsibilityPass {
            scope: PassScope::AnyTile,
            reason: TagKind::DeclaredReady.label().to_string(),
        });
    }

    let kongs: Vec<Tile> = hand.kongs().map(|m| m.tile).collect();
    if !kongs.is_empty() {
        return Ok(ResponsibilityPass {
            scope: PassScope::AnyTile,
            reason: format!("kong {}", format_tiles(&kongs)),
        });
    }

    let special: Vec<Wait> = enumerate_waits(hand, &[])?
        .into_iter()
        .filter(|w| w.shapes.special().next().is_some())
        .collect();
    if special.is_empty() {
        return Ok(ResponsibilityPass {
            scope: PassScope::Denied,
            reason: "no kong, not declared, no special wait".to_string(),
        });
    }

    let reason = special
        .iter()
        .map(|w| format!("{} {}", w.tile, w.shapes.describe()))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(ResponsibilityPass {
        scope: PassScope::Tiles(special.iter().map(|w| w.tile).collect()),
        reason,
    })
}
