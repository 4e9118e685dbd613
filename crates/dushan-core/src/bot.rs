//! AI Bot players for Dushan.
//!
//! This module provides different difficulty levels of AI players:
//! - Easy: Random discards, coin-flip claims
//! - Medium: Shape heuristics (keep waits, throw isolated tiles)
//! - Hard: Medium plus claim judgement and bonus-tile caution

use crate::actions::{DecisionKind, DecisionProvider, DecisionRequest, DecisionResult, SeatView};
use crate::player::{Hand, Seat};
use crate::rule::enumerate_waits;
use crate::tags::TagKind;
use crate::tile::Tile;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Bot difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BotDifficulty {
    Easy,
    Medium,
    Hard,
}

impl std::str::FromStr for BotDifficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(BotDifficulty::Easy),
            "medium" => Ok(BotDifficulty::Medium),
            "hard" => Ok(BotDifficulty::Hard),
            other => Err(format!("unknown difficulty: {}", other)),
        }
    }
}

/// A bot player that answers decision requests
pub struct Bot {
    pub seat: Seat,
    pub difficulty: BotDifficulty,
    rng: StdRng,
}

impl Bot {
    pub fn new(seat: Seat, difficulty: BotDifficulty) -> Self {
        Self {
            seat,
            difficulty,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seat: Seat, difficulty: BotDifficulty, seed: u64) -> Self {
        Self {
            seat,
            difficulty,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Answer a request for the seat described by `view`
    pub fn choose(&mut self, view: &SeatView, request: &DecisionRequest) -> DecisionResult {
        let seat = view.seat;

        if request.kinds.contains(&DecisionKind::Win) {
            return DecisionResult::accept(seat, DecisionKind::Win, "win");
        }

        if request.is_discard() {
            let tile = match self.difficulty {
                BotDifficulty::Easy => view.hand.concealed.choose(&mut self.rng).copied(),
                BotDifficulty::Medium => best_discard(view, false),
                BotDifficulty::Hard => best_discard(view, true),
            };
            return match tile {
                Some(tile) => DecisionResult::discard(seat, tile, format!("{:?} discard", self.difficulty)),
                None => DecisionResult::decline(seat, "empty hand"),
            };
        }

        if request.kinds.contains(&DecisionKind::Kong) && self.wants_kong(view) {
            return DecisionResult::accept(seat, DecisionKind::Kong, "kong");
        }
        if request.kinds.contains(&DecisionKind::Pong) {
            if let Some(tile) = request.tile {
                if self.wants_pong(view, tile) {
                    return DecisionResult::accept(seat, DecisionKind::Pong, "pong");
                }
            }
        }

        DecisionResult::decline(seat, "pass")
    }

    fn wants_kong(&mut self, view: &SeatView) -> bool {
        match self.difficulty {
            BotDifficulty::Easy => self.rng.gen_bool(0.5),
            BotDifficulty::Medium => true,
            // A declared hand is committed to its wait
            BotDifficulty::Hard => !view.tags.contains(TagKind::DeclaredReady),
        }
    }

    fn wants_pong(&mut self, view: &SeatView, tile: Tile) -> bool {
        match self.difficulty {
            BotDifficulty::Easy => self.rng.gen_bool(0.5),
            BotDifficulty::Medium => true,
            BotDifficulty::Hard => {
                if tile == view.bonus_tile {
                    return true;
                }
                let mut hand = view.hand.clone();
                if !hand.pong(tile, view.seat, None) {
                    return false;
                }
                let seen = view.visible_tiles();
                let after = wait_value(&view.hand, &seen).unwrap_or(0);
                let with_pong = distinct(&hand)
                    .into_iter()
                    .filter_map(|t| hand.without(t).and_then(|h| wait_value(&h, &seen)))
                    .max();
                match with_pong {
                    Some(value) => value >= after,
                    None => after == 0 && self.rng.gen_bool(0.5),
                }
            }
        }
    }
}

impl DecisionProvider for Bot {
    fn decide(&mut self, view: &SeatView, request: &DecisionRequest) -> DecisionResult {
        self.choose(view, request)
    }
}

fn distinct(hand: &Hand) -> Vec<Tile> {
    let mut tiles = hand.concealed.clone();
    tiles.sort();
    tiles.dedup();
    tiles
}

/// Live copies of every tile a 13-equivalent hand waits on, or `None` when
/// it is not waiting
fn wait_value(hand: &Hand, seen: &[Tile]) -> Option<u32> {
    let waits = enumerate_waits(hand, seen).ok()?;
    if waits.is_empty() {
        return None;
    }
    Some(waits.iter().map(|w| w.remaining as u32).sum())
}

/// How much a tile contributes to partial melds
fn usefulness(hand: &Hand, tile: Tile) -> i32 {
    let mut score = 3 * (hand.count(tile) as i32 - 1);
    for other in &hand.concealed {
        if other.suit() != tile.suit() {
            continue;
        }
        match (other.rank() as i32 - tile.rank() as i32).abs() {
            1 => score += 2,
            2 => score += 1,
            _ => {}
        }
    }
    if tile.rank() == 1 || tile.rank() == 9 {
        score -= 1;
    }
    score
}

/// Pick a discard: one that leaves the most live waits, else the least
/// connected tile.
fn best_discard(view: &SeatView, cautious: bool) -> Option<Tile> {
    let hand = &view.hand;
    let seen = view.visible_tiles();
    let danger = cautious && !view.declared.is_empty();

    distinct(hand).into_iter().max_by_key(|&tile| {
        let waits = hand
            .without(tile)
            .and_then(|h| wait_value(&h, &seen))
            .map(|v| 100 + v as i32)
            .unwrap_or(0);
        let mut score = waits - usefulness(hand, tile);
        if cautious && tile == view.bonus_tile {
            score -= 5;
        }
        // Tiles a declared seat has already let pass are safer
        if danger && view.declared.iter().any(|&s| view.discards[s as usize].contains(&tile)) {
            score += 3;
        }
        (score, tile)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::TagList;
    use crate::tile::parse_tiles;

    fn view(hand: &str) -> SeatView {
        SeatView {
            seat: 0,
            hand: Hand::new(parse_tiles(hand).unwrap()),
            tags: TagList::new(),
            melds: vec![vec![]; 4],
            discards: vec![vec![]; 4],
            declared: vec![],
            wall_remaining: 40,
            bonus_tile: "1t".parse().unwrap(),
        }
    }

    #[test]
    fn test_bot_creation() {
        let bot = Bot::new(2, BotDifficulty::Easy);
        assert_eq!(bot.seat, 2);
        assert_eq!(bot.difficulty, BotDifficulty::Easy);
        assert_eq!("HARD".parse::<BotDifficulty>(), Ok(BotDifficulty::Hard));
        assert!("expert".parse::<BotDifficulty>().is_err());
    }

    #[test]
    fn test_easy_bot_discards_from_hand() {
        let mut bot = Bot::with_seed(0, BotDifficulty::Easy, 7);
        let view = view("123w456w789w11t78d1d");
        let request = DecisionRequest::new(0, vec![DecisionKind::Discard], None);
        let result = bot.decide(&view, &request);
        assert!(result.takes(DecisionKind::Discard));
        assert!(view.hand.contains(result.tile.unwrap()));
    }

    #[test]
    fn test_medium_bot_keeps_wait() {
        let mut bot = Bot::with_seed(0, BotDifficulty::Medium, 7);
        let view = view("123w456w789w11t78d1d");
        let request = DecisionRequest::new(0, vec![DecisionKind::Discard], None);
        let result = bot.decide(&view, &request);
        assert_eq!(result.tile, Some("1d".parse().unwrap()));
    }

    #[test]
    fn test_every_bot_takes_a_win() {
        for difficulty in [BotDifficulty::Easy, BotDifficulty::Medium, BotDifficulty::Hard] {
            let mut bot = Bot::with_seed(0, difficulty, 1);
            let view = view("123w456w789w11t78d");
            let request = DecisionRequest::new(0, vec![DecisionKind::Win], "9d".parse().ok());
            assert!(bot.decide(&view, &request).takes(DecisionKind::Win));
        }
    }

    #[test]
    fn test_hard_bot_pongs_bonus_tile() {
        let mut bot = Bot::with_seed(0, BotDifficulty::Hard, 1);
        let view = view("11t3w5w7w9w2d4d6d8d3t5t7t");
        let request = DecisionRequest::new(0, vec![DecisionKind::Pong], "1t".parse().ok());
        assert!(bot.decide(&view, &request).takes(DecisionKind::Pong));
    }
}
