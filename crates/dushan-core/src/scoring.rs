//! End-of-hand scoring.
//!
//! Scoring reads only the players' tags and final hands. Every pair of seats
//! is settled independently: each side's claim on the other is computed, and
//! the delta between the two claims is what changes hands. This keeps every
//! sheet zero-sum with mirror-image pairwise deltas.

use crate::config::ScoreTable;
use crate::player::{Player, Seat, Source};
use crate::rule::{enumerate_waits, RuleError};
use crate::tags::{BonusKind, Tag, TagKind};
use crate::tile::Tile;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bonus-tile value multiplier on a golden reveal
const GOLDEN_MULTIPLIER: i32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ScoringError {
    #[error("Seat {0} holds both self-drawn and fed win tags")]
    ConflictingWinTags(Seat),

    #[error("Seat {0} holds a fed win tag without a feeder")]
    MissingFeeder(Seat),

    #[error(transparent)]
    Rule(#[from] RuleError),
}

/// The wall tile flipped after a won hand and the faces it scores
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusReveal {
    pub flipped: Tile,
    /// Faces worth a point each to the winners
    pub tiles: Vec<Tile>,
    /// The revealed faces include the bonus tile
    pub golden: bool,
}

impl BonusReveal {
    pub fn new(flipped: Tile, bonus_tile: Tile, two_sided: bool) -> Self {
        let mut tiles = vec![flipped.next_cyclic()];
        if two_sided {
            tiles.push(flipped.prev_cyclic());
        }
        let golden = tiles.contains(&bonus_tile);
        Self {
            flipped,
            tiles,
            golden,
        }
    }

    pub fn multiplier(&self) -> i32 {
        if self.golden {
            GOLDEN_MULTIPLIER
        } else {
            1
        }
    }
}

/// Points one player claims from one opponent, by category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub win: i32,
    pub kong: i32,
    pub bonus: i32,
}

impl Claim {
    pub fn total(&self) -> i32 {
        self.win + self.kong + self.bonus
    }

    fn minus(self, other: Claim) -> Claim {
        Claim {
            win: self.win - other.win,
            kong: self.kong - other.kong,
            bonus: self.bonus - other.bonus,
        }
    }

    fn plus(self, other: Claim) -> Claim {
        Claim {
            win: self.win + other.win,
            kong: self.kong + other.kong,
            bonus: self.bonus + other.bonus,
        }
    }
}

/// Net settlement between a player and one opponent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairScore {
    pub opponent: Seat,
    /// Net points, by category, this player receives from the opponent
    pub net: Claim,
}

/// Score record for one seat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub seat: Seat,
    pub name: String,
    pub winner: bool,
    /// Won, or held a waiting hand at the end
    pub waiting: bool,
    /// Exposed bonus tiles without reaching a wait
    pub bonus_penalty: bool,
    pub tags: Vec<Tag>,
    /// Net by category, summed over opponents
    pub categories: Claim,
    pub versus: Vec<PairScore>,
    pub total: i32,
}

/// The result of one finished hand
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSheet {
    pub records: Vec<PlayerRecord>,
    pub winners: Vec<Seat>,
    pub reveal: Option<BonusReveal>,
}

impl ScoreSheet {
    pub fn record(&self, seat: Seat) -> Option<&PlayerRecord> {
        self.records.iter().find(|r| r.seat == seat)
    }

    /// Net points `seat` receives from `opponent`
    pub fn pairwise(&self, seat: Seat, opponent: Seat) -> i32 {
        self.record(seat)
            .and_then(|r| r.versus.iter().find(|p| p.opponent == opponent))
            .map(|p| p.net.total())
            .unwrap_or(0)
    }

    pub fn total(&self, seat: Seat) -> i32 {
        self.record(seat).map(|r| r.total).unwrap_or(0)
    }
}

/// Per-player facts the pairwise claims depend on
struct Standing {
    winner: bool,
    waiting: bool,
}

struct Scorer<'a> {
    players: &'a [Player],
    standings: Vec<Standing>,
    bonus_tile: Tile,
    reveal: Option<&'a BonusReveal>,
    table: &'a ScoreTable,
    anyone_won: bool,
}

/// Score a finished hand.
///
/// Non-winning hands must hold 13 equivalent tiles so their waits can be
/// evaluated.
pub fn score_hand(
    players: &[Player],
    bonus_tile: Tile,
    reveal: Option<&BonusReveal>,
    table: &ScoreTable,
) -> Result<ScoreSheet, ScoringError> {
    let mut standings = Vec::with_capacity(players.len());
    for player in players {
        let self_won = player.tags.self_wins().next().is_some();
        let fed_won = player.tags.fed_wins().next().is_some();
        if self_won && fed_won {
            return Err(ScoringError::ConflictingWinTags(player.seat));
        }
        let winner = self_won || fed_won;
        let waiting = winner || !enumerate_waits(&player.hand, &[])?.is_empty();
        standings.push(Standing { winner, waiting });
    }

    let scorer = Scorer {
        players,
        anyone_won: standings.iter().any(|s| s.winner),
        standings,
        bonus_tile,
        reveal,
        table,
    };

    let mut records = Vec::with_capacity(players.len());
    for (i, player) in players.iter().enumerate() {
        let mut versus = Vec::new();
        let mut categories = Claim::default();
        for (j, opponent) in players.iter().enumerate() {
            if i == j {
                continue;
            }
            let net = scorer.claim(i, j)?.minus(scorer.claim(j, i)?);
            categories = categories.plus(net);
            versus.push(PairScore {
                opponent: opponent.seat,
                net,
            });
        }

        let standing = &scorer.standings[i];
        records.push(PlayerRecord {
            seat: player.seat,
            name: player.name.clone(),
            winner: standing.winner,
            waiting: standing.waiting,
            bonus_penalty: !standing.waiting && scorer.has_bonus_exposure(player),
            tags: player.tags.iter().copied().collect(),
            total: categories.total(),
            categories,
            versus,
        });
    }

    Ok(ScoreSheet {
        winners: records.iter().filter(|r| r.winner).map(|r| r.seat).collect(),
        records,
        reveal: reveal.cloned(),
    })
}

impl Scorer<'_> {
    fn multiplier(&self) -> i32 {
        self.reveal.map(|r| r.multiplier()).unwrap_or(1)
    }

    /// What player `p` claims from opponent `o`
    fn claim(&self, p: usize, o: usize) -> Result<Claim, ScoringError> {
        let player = &self.players[p];
        let opponent = self.players[o].seat;

        if let Some(burn) = player.tags.get(TagKind::AllBurn) {
            let bonus = if burn.source.is_seat(opponent) {
                -self.table.all_burn
            } else {
                0
            };
            return Ok(Claim {
                bonus,
                ..Claim::default()
            });
        }

        if !self.standings[p].waiting {
            return Ok(Claim {
                bonus: -self.exposed_bonus(player, opponent),
                ..Claim::default()
            });
        }

        if !self.anyone_won {
            return Ok(Claim::default());
        }

        Ok(Claim {
            win: self.win_bonus(player, opponent)?,
            kong: self.kong_bonus(player, opponent),
            bonus: self.exposed_bonus(player, opponent)
                + self.concealed_bonus(player)
                + self.reveal_bonus(p),
        })
    }

    fn win_bonus(&self, player: &Player, opponent: Seat) -> Result<i32, ScoringError> {
        let tags = &player.tags;
        let shapes: i32 = tags.shapes().map(|(s, _)| self.table.shape(s)).sum();
        let ready = if tags.contains(TagKind::DeclaredReady) {
            self.table.declared_ready
        } else {
            0
        };

        let self_wins: i32 = tags.self_wins().map(|(w, _)| self.table.self_win(w)).sum();
        if tags.self_wins().next().is_some() {
            return Ok(self_wins + shapes + ready);
        }

        if tags.fed_wins().next().is_none() {
            return Ok(0);
        }
        let feeder = tags
            .fed_wins()
            .find_map(|(_, source)| match source {
                Source::Seat(seat) => Some(seat),
                Source::Own => None,
            })
            .ok_or(ScoringError::MissingFeeder(player.seat))?;
        if feeder != opponent {
            return Ok(0);
        }
        let fed: i32 = tags.fed_wins().map(|(w, _)| self.table.fed_win(w)).sum();
        Ok(fed + shapes + ready)
    }

    fn kong_bonus(&self, player: &Player, opponent: Seat) -> i32 {
        player
            .hand
            .kongs()
            .filter(|m| m.tile != self.bonus_tile)
            .filter(|m| m.source == Source::Own || m.source.is_seat(opponent))
            .count() as i32
            * self.table.kong
    }

    /// Bonus-tile melds plus bonus tiles discarded and still attributed to the player
    fn exposed_bonus(&self, player: &Player, opponent: Seat) -> i32 {
        let g = self.multiplier();
        let plain = self.table.plain_bonus;
        let mut total = 0;

        for meld in player.hand.exposed.iter().filter(|m| m.tile == self.bonus_tile) {
            let count = meld.kind.tile_count() as i32;
            let tiles = if meld.source.is_seat(opponent) {
                let role = self.table.bonus(meld.bonus.unwrap_or(BonusKind::Plain));
                (count - 1) * plain + role
            } else {
                count * plain
            };
            total += tiles * g;
            if meld.is_kong() {
                total += self.table.kong;
            }
        }

        total += player.tags.own_bonus().map(|b| self.table.bonus(b) * g).sum::<i32>();
        total
    }

    fn concealed_bonus(&self, player: &Player) -> i32 {
        player.hand.count(self.bonus_tile) as i32 * self.table.plain_bonus * self.multiplier()
    }

    fn reveal_bonus(&self, p: usize) -> i32 {
        match self.reveal {
            Some(reveal) if self.standings[p].winner => self.players[p]
                .hand
                .all_tiles()
                .iter()
                .filter(|t| reveal.tiles.contains(t))
                .count() as i32,
            _ => 0,
        }
    }

    fn has_bonus_exposure(&self, player: &Player) -> bool {
        player.hand.exposed.iter().any(|m| m.tile == self.bonus_tile)
            || player.tags.own_bonus().next().is_some()
    }
}
