//! Engine configuration.
//!
//! Everything that used to be a table-wide setting (time budgets, the bonus
//! tile, the point table) lives here and is handed to `GameManager::new`.

use crate::player::Seat;
use crate::tags::{BonusKind, FedWin, SelfWin, WinShape};
use crate::tile::{Suit, Tile};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Point values for every scored tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreTable {
    pub self_draw: i32,
    pub heavenly_hand: i32,
    pub kong_flower: i32,
    pub last_tile: i32,

    pub catch_discard: i32,
    pub catch_hot_discard: i32,
    pub rob_kong: i32,
    pub last_discard: i32,

    pub declared_ready: i32,
    pub dragon_sevens: i32,
    pub flush: i32,
    pub lone_pair: i32,
    pub small_sevens: i32,
    pub big_pairs: i32,
    pub normal: i32,

    pub charge_bonus: i32,
    pub cross_bonus: i32,
    pub plain_bonus: i32,

    /// Per non-bonus kong
    pub kong: i32,
    /// Flat charge an all-burned player pays to the seat that burned them
    pub all_burn: i32,
}

impl ScoreTable {
    pub fn self_win(&self, win: SelfWin) -> i32 {
        match win {
            SelfWin::SelfDraw => self.self_draw,
            SelfWin::HeavenlyHand => self.heavenly_hand,
            SelfWin::KongFlower => self.kong_flower,
            SelfWin::LastTile => self.last_tile,
        }
    }

    pub fn fed_win(&self, win: FedWin) -> i32 {
        match win {
            FedWin::Discard => self.catch_discard,
            FedWin::HotDiscard => self.catch_hot_discard,
            FedWin::RobKong => self.rob_kong,
            FedWin::LastDiscard => self.last_discard,
        }
    }

    pub fn shape(&self, shape: WinShape) -> i32 {
        match shape {
            WinShape::BigPairs => self.big_pairs,
            WinShape::LonePair => self.lone_pair,
            WinShape::SmallSevens => self.small_sevens,
            WinShape::DragonSevens => self.dragon_sevens,
            WinShape::Normal => self.normal,
            WinShape::Flush => self.flush,
        }
    }

    pub fn bonus(&self, kind: BonusKind) -> i32 {
        match kind {
            BonusKind::Charge => self.charge_bonus,
            BonusKind::Cross => self.cross_bonus,
            BonusKind::Plain => self.plain_bonus,
        }
    }
}

impl Default for ScoreTable {
    fn default() -> Self {
        Self {
            self_draw: 3,
            heavenly_hand: 23,
            kong_flower: 3,
            last_tile: 3,
            catch_discard: 3,
            catch_hot_discard: 3,
            rob_kong: 3,
            last_discard: 3,
            declared_ready: 10,
            dragon_sevens: 23,
            flush: 10,
            lone_pair: 10,
            small_sevens: 10,
            big_pairs: 5,
            normal: 0,
            charge_bonus: 3,
            cross_bonus: 2,
            plain_bonus: 1,
            kong: 3,
            all_burn: 3,
        }
    }
}

/// Table configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Seat names, in seat order
    pub names: Vec<String>,
    /// Seat driven by a person; every other seat is an AI
    pub human_seat: Option<Seat>,
    pub human_time_limit_ms: u64,
    pub ai_time_limit_ms: u64,
    /// The chicken tile
    pub bonus_tile: Tile,
    /// Reveal a wall tile after a won hand
    pub flip_bonus: bool,
    /// The reveal counts the ranks on both sides of the flipped tile
    pub two_sided_flip: bool,
    pub initial_score: i32,
    /// Fixed seed for the wall shuffle and dealer draw
    pub seed: Option<u64>,
    /// Malformed results tolerated per request before the timeout default applies
    pub max_decision_retries: u32,
    pub scores: ScoreTable,
}

impl GameConfig {
    /// Load a config from JSON; missing fields keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn human_time_limit(&self) -> Duration {
        Duration::from_millis(self.human_time_limit_ms)
    }

    pub fn ai_time_limit(&self) -> Duration {
        Duration::from_millis(self.ai_time_limit_ms)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// All four seats played by AI
    pub fn all_ai(mut self) -> Self {
        self.human_seat = None;
        self
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            names: ["East", "South", "West", "North"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            human_seat: Some(0),
            human_time_limit_ms: 15_000,
            ai_time_limit_ms: 2_000,
            bonus_tile: Tile::new(Suit::Tiao, 1),
            flip_bonus: true,
            two_sided_flip: true,
            initial_score: 100,
            seed: None,
            max_decision_retries: 3,
            scores: ScoreTable::default(),
        }
    }
}
