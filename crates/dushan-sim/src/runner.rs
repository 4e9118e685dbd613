//! Table runner for headless play.
//!
//! Drives a `GameManager` with a simulated clock: every step advances the
//! clock by the AI time budget, so bots answer on their first poll and no
//! real time passes.

use dushan_core::{Bot, BotDifficulty, DecisionProvider, GameConfig, GameError, GameManager, ScoreSheet};
use std::io::Write;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

/// Steps allowed for one hand before the runner gives up
const MAX_STEPS_PER_HAND: u32 = 50_000;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("Game error: {0}")]
    Game(#[from] GameError),

    #[error("Hand {hand} did not finish within {steps} steps")]
    Stalled { hand: u32, steps: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Four bots at one table
pub struct Runner {
    game: GameManager,
    clock: Instant,
    tick: Duration,
    hands_played: u32,
}

impl Runner {
    pub fn new(config: GameConfig, difficulty: BotDifficulty) -> Result<Self, SimError> {
        let config = config.all_ai();
        let providers = (0..4)
            .map(|seat| {
                let bot = match config.seed {
                    Some(seed) => Bot::with_seed(seat, difficulty, seed.wrapping_add(seat as u64)),
                    None => Bot::new(seat, difficulty),
                };
                Box::new(bot) as Box<dyn DecisionProvider>
            })
            .collect();
        let tick = config.ai_time_limit().max(Duration::from_millis(1));
        Ok(Self {
            game: GameManager::new(config, providers)?,
            clock: Instant::now(),
            tick,
            hands_played: 0,
        })
    }

    pub fn game(&self) -> &GameManager {
        &self.game
    }

    /// Play one hand to its score sheet
    pub fn play_hand(&mut self) -> Result<ScoreSheet, SimError> {
        if self.hands_played > 0 {
            self.game.next_hand()?;
        }
        self.hands_played += 1;

        let mut steps = 0;
        while !self.game.is_finished() {
            if steps >= MAX_STEPS_PER_HAND {
                return Err(SimError::Stalled {
                    hand: self.hands_played,
                    steps,
                });
            }
            self.clock += self.tick;
            for event in self.game.step_at(self.clock)? {
                debug!(?event, "event");
            }
            steps += 1;
        }

        let sheet = self.game.score_sheet().cloned().ok_or(GameError::HandInProgress)?;
        info!(
            hand = self.hands_played,
            steps,
            winners = ?sheet.winners,
            "hand finished"
        );
        Ok(sheet)
    }

    /// Play `hands` hands, writing each score sheet to `out` as one JSON line
    pub fn run<W: Write>(&mut self, hands: u32, out: &mut W) -> Result<(), SimError> {
        for _ in 0..hands {
            let sheet = self.play_hand()?;
            serde_json::to_writer(&mut *out, &sheet)?;
            writeln!(out)?;
        }
        out.flush()?;

        for player in self.game.players() {
            info!(seat = player.seat, name = %player.name, score = player.score, "final score");
        }
        Ok(())
    }
}
