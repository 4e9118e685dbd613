//! Dushan - a Guizhou chicken mahjong engine
//!
//! This crate provides the core game logic for four-seat chicken mahjong:
//! - Tile model, wall and compact tile notation
//! - Hand evaluation: claim eligibility, win shapes, waiting tiles
//! - Turn state machine with a decision request/result protocol
//! - End-of-hand scoring, including the chicken (bonus tile) mini-game
//!
//! # Architecture
//!
//! The engine holds no I/O. A `GameManager` is advanced by calling `step`;
//! every choice a seat makes goes through a `DecisionProvider`, so people,
//! bots and scripted test players all plug in at the same seam.
//!
//! # Modules
//!
//! - [`tile`]: Tiles, suits and tile strings like `"444w66w"`
//! - [`wall`]: The 108-tile supply
//! - [`tags`]: Attributed labels that drive scoring
//! - [`player`]: Hands, melds and per-seat state
//! - [`rule`]: Pure hand evaluation
//! - [`scoring`]: End-of-hand settlement
//! - [`config`]: Table configuration and the point table
//! - [`actions`]: Decisions and events
//! - [`game`]: The turn state machine
//! - [`bot`]: AI decision providers

pub mod actions;
pub mod bot;
pub mod config;
pub mod game;
pub mod player;
pub mod rule;
pub mod scoring;
pub mod tags;
pub mod tile;
pub mod wall;

// Re-export commonly used types
pub use actions::{DecisionKind, DecisionProvider, DecisionRequest, DecisionResult, GameEvent, SeatView};
pub use bot::{Bot, BotDifficulty};
pub use config::{GameConfig, ScoreTable};
pub use game::{GameError, GameManager, GamePhase};
pub use player::{Controller, Hand, Meld, MeldKind, Player, Seat, Source};
pub use rule::{
    can_add_kong, can_claim_kong, can_pong, can_self_kong, classify_win, enumerate_waits,
    has_responsibility_pass, PassScope, ResponsibilityPass, RuleError, Wait, WinShapes,
};
pub use scoring::{score_hand, BonusReveal, PlayerRecord, ScoreSheet, ScoringError};
pub use tags::{BonusKind, FedWin, SelfWin, Tag, TagKind, TagList, WinShape};
pub use tile::{format_tiles, parse_tiles, Suit, Tile, TileCounts, TileParseError};
pub use wall::Wall;
