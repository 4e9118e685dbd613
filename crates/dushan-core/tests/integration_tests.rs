//! Integration tests for dushan-core
//!
//! These play whole hands through `GameManager` with stacked walls and
//! scripted seats, then check the tags and the score sheet.

use dushan_core::*;
use pretty_assertions::assert_eq;
use std::time::{Duration, Instant};

// ==================== Helpers ====================

/// Junk hands: three tiles per suit spaced three ranks apart, so no run can
/// form and no single tile completes them.
const JUNK_A: &str = "447w225588t3369d";
const JUNK_B: &str = "258w336699t1147d";
const JUNK_C: &str = "369w14477t22588d";

fn t(s: &str) -> Tile {
    s.parse().unwrap()
}

/// The dealt hands (dealer's first, then in seat order) followed by `draws`
fn dealt_tiles(dealt: [&str; 4], draws: &str) -> Vec<Tile> {
    let mut tiles = Vec::new();
    for hand in dealt {
        let hand = parse_tiles(hand).unwrap();
        assert_eq!(hand.len(), 13);
        tiles.extend(hand);
    }
    tiles.extend(parse_tiles(draws).unwrap());

    let counts = TileCounts::from_tiles(&tiles);
    for tile in Tile::all() {
        let used = counts.get(tile);
        assert!(used <= 4, "{} used {} times", tile, used);
    }
    tiles
}

/// A wall that deals `dealt` and then draws `draws` in order. Unused tiles
/// follow in face order.
fn stacked_wall(dealt: [&str; 4], draws: &str) -> Wall {
    let mut tiles = dealt_tiles(dealt, draws);
    let counts = TileCounts::from_tiles(&tiles);
    for tile in Tile::all() {
        tiles.extend(std::iter::repeat(tile).take(4 - counts.get(tile) as usize));
    }
    Wall::stacked(tiles)
}

/// A wall that runs out right after `draws`
fn short_wall(dealt: [&str; 4], draws: &str) -> Wall {
    Wall::stacked(dealt_tiles(dealt, draws))
}

/// A seat that throws whatever it holds last and takes the listed options
fn scripted(accept: &[DecisionKind]) -> Box<dyn DecisionProvider> {
    let accept = accept.to_vec();
    Box::new(move |view: &SeatView, request: &DecisionRequest| {
        if request.is_discard() {
            let tile = view.hand.last_tile().unwrap();
            return DecisionResult::discard(view.seat, tile, "last tile");
        }
        match request.kinds.iter().find(|k| accept.contains(k)) {
            Some(&kind) => DecisionResult::accept(view.seat, kind, "scripted"),
            None => DecisionResult::decline(view.seat, "scripted"),
        }
    })
}

fn config() -> GameConfig {
    GameConfig {
        ai_time_limit_ms: 0,
        ..GameConfig::default()
    }
    .all_ai()
    .with_seed(11)
}

fn table(
    dealt: [&str; 4],
    draws: &str,
    dealer: Seat,
    accept: [&[DecisionKind]; 4],
) -> GameManager {
    table_on(config(), stacked_wall(dealt, draws), dealer, accept)
}

fn table_on(config: GameConfig, wall: Wall, dealer: Seat, accept: [&[DecisionKind]; 4]) -> GameManager {
    let providers = accept.iter().map(|a| scripted(a)).collect();
    GameManager::from_wall(config, providers, wall, dealer).unwrap()
}

/// Seat 1 is a person with a one second budget; the rest answer at once
fn human_config() -> GameConfig {
    GameConfig {
        human_seat: Some(1),
        human_time_limit_ms: 1_000,
        ai_time_limit_ms: 0,
        ..GameConfig::default()
    }
    .with_seed(11)
}

/// Step at a frozen clock until `seat` is asked something
fn step_to_request(game: &mut GameManager, now: Instant, seat: Seat) -> DecisionRequest {
    for _ in 0..1_000 {
        if let Some(request) = game.pending_request().filter(|r| r.seat == seat) {
            return request.clone();
        }
        game.step_at(now).unwrap();
    }
    panic!("seat {} was never asked", seat);
}

/// Step until the hand is scored
fn play(game: &mut GameManager) -> Vec<GameEvent> {
    let mut events = Vec::new();
    for _ in 0..20_000 {
        if game.is_finished() {
            return events;
        }
        events.extend(game.step().unwrap());
    }
    panic!("hand did not finish");
}

/// Step until an event matches
fn play_until(game: &mut GameManager, done: impl Fn(&GameEvent) -> bool) -> Vec<GameEvent> {
    let mut events = Vec::new();
    for _ in 0..20_000 {
        let step = game.step().unwrap();
        let found = step.iter().any(&done);
        events.extend(step);
        if found {
            return events;
        }
    }
    panic!("event never happened");
}

fn assert_zero_sum(sheet: &ScoreSheet) {
    let sum: i32 = sheet.records.iter().map(|r| r.total).sum();
    assert_eq!(sum, 0);
    for a in 0..4 {
        for b in 0..4 {
            if a != b {
                assert_eq!(sheet.pairwise(a, b), -sheet.pairwise(b, a));
            }
        }
    }
}

const WIN: &[DecisionKind] = &[DecisionKind::Win];
const NONE: &[DecisionKind] = &[];

// ==================== Self-drawn Wins ====================

#[test]
fn test_self_draw_win() {
    let mut game = table(
        ["123w456w789w11t78d", JUNK_A, JUNK_B, JUNK_C],
        "4d5w3w2w9d",
        0,
        [WIN, NONE, NONE, NONE],
    );
    let events = play(&mut game);

    assert_eq!(game.winners(), &[0]);
    let tags = &game.player(0).unwrap().tags;
    assert!(tags.contains(TagKind::SelfWin(SelfWin::SelfDraw)));
    assert!(tags.contains(TagKind::Shape(WinShape::Normal)));
    assert!(!tags.contains(TagKind::SelfWin(SelfWin::HeavenlyHand)));
    assert!(events
        .iter()
        .any(|e| matches!(e, GameEvent::Won { seat: 0, from: None, .. })));

    let sheet = game.score_sheet().unwrap();
    assert_zero_sum(sheet);
    assert!(sheet.total(0) >= 9);
    assert_eq!(game.player(0).unwrap().score, 100 + sheet.total(0));
}

#[test]
fn test_heavenly_hand() {
    let mut game = table(
        ["123w456w789w11t78d", JUNK_A, JUNK_B, JUNK_C],
        "9d",
        0,
        [WIN, NONE, NONE, NONE],
    );
    play(&mut game);

    let tags = &game.player(0).unwrap().tags;
    assert!(tags.contains(TagKind::SelfWin(SelfWin::HeavenlyHand)));
    assert!(!tags.contains(TagKind::SelfWin(SelfWin::SelfDraw)));
}

#[test]
fn test_last_tile_self_draw() {
    let wall = short_wall(["123w456w789w11t78d", JUNK_A, JUNK_B, JUNK_C], "4d5w3w2w9d");
    let mut game = table_on(config(), wall, 0, [WIN, NONE, NONE, NONE]);
    let events = play(&mut game);

    assert_eq!(game.winners(), &[0]);
    assert_eq!(game.wall_remaining(), 0);
    let tags = &game.player(0).unwrap().tags;
    assert!(tags.contains(TagKind::SelfWin(SelfWin::LastTile)));
    assert!(!tags.contains(TagKind::SelfWin(SelfWin::SelfDraw)));
    // Nothing left to flip
    assert!(!events.iter().any(|e| matches!(e, GameEvent::BonusRevealed(_))));
    assert_zero_sum(game.score_sheet().unwrap());
}

#[test]
fn test_kong_flower() {
    let mut game = table(
        ["111w234w567w11t78d", JUNK_A, JUNK_B, JUNK_C],
        "1w9d",
        0,
        [&[DecisionKind::Win, DecisionKind::Kong], NONE, NONE, NONE],
    );
    let events = play(&mut game);

    assert!(events.iter().any(|e| matches!(
        e,
        GameEvent::Konged {
            seat: 0,
            kind: MeldKind::ConcealedKong,
            ..
        }
    )));
    let player = game.player(0).unwrap();
    assert!(player.tags.contains(TagKind::SelfWin(SelfWin::KongFlower)));
    assert!(!player.tags.contains(TagKind::SelfWin(SelfWin::SelfDraw)));
    assert_eq!(player.hand.kongs().count(), 1);

    let sheet = game.score_sheet().unwrap();
    assert_zero_sum(sheet);
    assert_eq!(sheet.record(0).unwrap().categories.kong, 9);
}

// ==================== Fed Wins ====================

#[test]
fn test_double_win_on_discard() {
    let mut game = table(
        [JUNK_A, "123w456w789w99w46d", "123t456t789t46d55d", JUNK_C],
        "5d",
        0,
        [NONE, WIN, WIN, NONE],
    );
    game.declare_ready(1).unwrap();
    game.declare_ready(2).unwrap();
    play(&mut game);

    assert_eq!(game.winners(), &[1, 2]);
    for seat in [1, 2] {
        let tags = &game.player(seat).unwrap().tags;
        let fed = tags.get(TagKind::FedWin(FedWin::Discard)).unwrap();
        assert_eq!(fed.source, Source::Seat(0));
    }
    let feeder = &game.player(0).unwrap().tags;
    assert!(feeder.contains(TagKind::FedDiscard));
    assert!(feeder.contains(TagKind::DoubleWin));
    assert!(game.player(0).unwrap().discards.is_empty());

    let sheet = game.score_sheet().unwrap();
    assert_zero_sum(sheet);
    assert!(sheet.total(0) < 0);
}

#[test]
fn test_triple_win_on_discard() {
    let mut game = table(
        [
            "114477w5588t137d",
            "123w456w789w99w46d",
            "123t456t789t46d55d",
            "234t234t789d99d46d",
        ],
        "5d",
        0,
        [NONE, WIN, WIN, WIN],
    );
    for seat in 1..4 {
        game.declare_ready(seat).unwrap();
    }
    play(&mut game);

    assert_eq!(game.winners(), &[1, 2, 3]);
    for seat in 1..4 {
        let fed = game.player(seat).unwrap().tags.get(TagKind::FedWin(FedWin::Discard)).copied();
        assert_eq!(fed.map(|t| t.source), Some(Source::Seat(0)));
    }
    let feeder = &game.player(0).unwrap().tags;
    assert_eq!(feeder.get(TagKind::TripleWin).unwrap().source, Source::Seat(1));
    assert!(!feeder.contains(TagKind::DoubleWin));
    assert!(feeder.contains(TagKind::FedDiscard));

    let sheet = game.score_sheet().unwrap();
    assert_zero_sum(sheet);
    assert!(sheet.total(0) < 0);
    for seat in 1..4 {
        assert!(sheet.pairwise(seat, 0) > 0);
    }
}

#[test]
fn test_last_discard_needs_no_pass() {
    // Same plain wait that gets no pass mid-hand, but the 5d is the last tile
    let wall = short_wall([JUNK_A, "123w456w789w99w46d", JUNK_B, JUNK_C], "5d");
    let mut game = table_on(config(), wall, 0, [NONE, WIN, NONE, NONE]);
    play(&mut game);

    assert_eq!(game.winners(), &[1]);
    let winner = &game.player(1).unwrap();
    assert!(!winner.declared_ready());
    for win in [FedWin::Discard, FedWin::LastDiscard] {
        assert_eq!(winner.tags.get(TagKind::FedWin(win)).unwrap().source, Source::Seat(0));
    }
    assert!(game.player(0).unwrap().tags.contains(TagKind::FedDiscard));

    let sheet = game.score_sheet().unwrap();
    assert_zero_sum(sheet);
    assert!(sheet.total(1) > 0);
    assert!(sheet.total(0) < 0);
}

#[test]
fn test_declined_win_not_offered_again() {
    let mut game = table(
        [JUNK_A, "123w456w789w99w46d", "123t456t789t46d55d", JUNK_C],
        "5d",
        0,
        [NONE, NONE, NONE, NONE],
    );
    game.declare_ready(1).unwrap();
    game.declare_ready(2).unwrap();
    let events = play_until(&mut game, |e| matches!(e, GameEvent::TileDrawn { seat: 1, .. }));

    let declined: Vec<Seat> = events
        .iter()
        .filter_map(|e| match e {
            GameEvent::WinDeclined { seat, tile } if *tile == t("5d") => Some(*seat),
            _ => None,
        })
        .collect();
    assert_eq!(declined, vec![1, 2]);
    // Seat 2 holds a pair of 5d but is declared and may not pong
    assert!(!events.iter().any(|e| matches!(e, GameEvent::Ponged { .. })));
    assert!(game.winners().is_empty());
    assert_eq!(game.player(0).unwrap().discards, vec![t("5d")]);
}

#[test]
fn test_no_pass_no_win_on_discard() {
    // Seat 1 waits on 5d with a plain normal hand and never declared
    let mut game = table(
        [JUNK_A, "123w456w789w99w46d", JUNK_B, JUNK_C],
        "5d",
        0,
        [NONE, WIN, NONE, NONE],
    );
    let events = play_until(&mut game, |e| matches!(e, GameEvent::TileDrawn { seat: 1, .. }));

    assert!(!events
        .iter()
        .any(|e| matches!(e, GameEvent::DecisionRequested(r) if r.seat == 1)));
    assert!(game.winners().is_empty());
}

#[test]
fn test_hot_discard_burns_konger() {
    let mut game = table(
        ["111w225588t3369d", "234w567w888w99w46d", JUNK_B, JUNK_C],
        "1w5d",
        0,
        [&[DecisionKind::Kong], WIN, NONE, NONE],
    );
    let events = play(&mut game);

    assert!(events.iter().any(|e| matches!(
        e,
        GameEvent::Won {
            seat: 1,
            from: Some(0),
            ..
        }
    )));
    let winner = &game.player(1).unwrap().tags;
    assert!(winner.contains(TagKind::FedWin(FedWin::HotDiscard)));
    let feeder = &game.player(0).unwrap().tags;
    assert!(feeder.contains(TagKind::FedHotDiscard));
    assert_eq!(feeder.get(TagKind::AllBurn).unwrap().source, Source::Seat(1));
    assert!(!game.player(0).unwrap().hand.contains(t("5d")));

    let sheet = game.score_sheet().unwrap();
    assert_zero_sum(sheet);
    assert!(sheet.total(1) > 0);
}

#[test]
fn test_rob_kong() {
    // Dealer is seat 3; seat 0 pongs 5d, later draws the fourth and adds it
    let mut game = table(
        ["3669w14477t2288d", "47w225588t339d55d", "234w567w888w99w46d", JUNK_B],
        "5d1w5w2w5d",
        3,
        [&[DecisionKind::Kong, DecisionKind::Pong], WIN, NONE, NONE],
    );
    let events = play(&mut game);

    assert!(events.iter().any(|e| matches!(
        e,
        GameEvent::Ponged {
            seat: 0,
            from: 3,
            ..
        }
    )));
    assert!(!events.iter().any(|e| matches!(e, GameEvent::Konged { .. })));
    assert_eq!(game.winners(), &[1]);
    assert!(game
        .player(1)
        .unwrap()
        .tags
        .contains(TagKind::FedWin(FedWin::RobKong)));

    let konger = game.player(0).unwrap();
    assert!(konger.tags.contains(TagKind::AllBurn));
    assert_eq!(konger.hand.pong_of(t("5d")).map(|m| m.kind), Some(MeldKind::Pong));
    assert_eq!(konger.hand.equivalent_len(), 13);
    assert_zero_sum(game.score_sheet().unwrap());
}

// ==================== Bonus Tile ====================

#[test]
fn test_ponged_bonus_tile_charges_discarder() {
    let mut game = table(
        [JUNK_A, "369w114477t2258d", JUNK_B, JUNK_A],
        "1t",
        0,
        [NONE, &[DecisionKind::Pong], NONE, NONE],
    );
    let events = play_until(&mut game, |e| matches!(e, GameEvent::Ponged { .. }));

    assert!(events.contains(&GameEvent::BonusTagged {
        seat: 0,
        kind: BonusKind::Charge,
    }));
    let feeder = &game.player(0).unwrap().tags;
    assert_eq!(feeder.get(TagKind::ResponsibleBonus).unwrap().source, Source::Seat(1));
    assert_eq!(
        feeder.get(TagKind::Bonus(BonusKind::Charge)).unwrap().source,
        Source::Seat(1)
    );
    let meld = game.player(1).unwrap().hand.pong_of(t("1t")).copied().unwrap();
    assert_eq!(meld.bonus, Some(BonusKind::Charge));
    assert_eq!(meld.source, Source::Seat(0));
}

#[test]
fn test_ponger_bonus_discard_is_not_charge() {
    // Seat 1 pongs the dealer's 5w, then throws 1t as its first discard
    let mut game = table(
        [JUNK_A, "551234678999w1t", JUNK_B, JUNK_C],
        "5w",
        0,
        [NONE, &[DecisionKind::Pong], NONE, NONE],
    );
    let events = play_until(&mut game, |e| matches!(e, GameEvent::TileDiscarded { seat: 1, .. }));

    assert!(events.iter().any(|e| matches!(e, GameEvent::Ponged { seat: 1, from: 0, .. })));
    assert!(events.contains(&GameEvent::TileDiscarded {
        seat: 1,
        tile: t("1t"),
        hot: false,
    }));
    assert!(events.contains(&GameEvent::BonusTagged {
        seat: 1,
        kind: BonusKind::Cross,
    }));
    let tags = &game.player(1).unwrap().tags;
    assert!(!tags.contains(TagKind::Bonus(BonusKind::Charge)));
}

// ==================== Decisions ====================

#[test]
fn test_declare_ready_refused_while_claim_open() {
    let mut game = table(
        [JUNK_A, "123w456w789w11t99d", JUNK_B, JUNK_C],
        "1t",
        0,
        [NONE, &[DecisionKind::Pong], NONE, NONE],
    );
    let request = step_to_request(&mut game, Instant::now(), 1);
    assert_eq!(request.kinds, vec![DecisionKind::Pong]);

    assert_eq!(game.declare_ready(1), Err(GameError::DecisionPending));
    assert!(!game.player(1).unwrap().declared_ready());

    // The open pong still resolves and the hand runs to the end
    let events = play(&mut game);
    assert!(events.iter().any(|e| matches!(e, GameEvent::Ponged { seat: 1, from: 0, .. })));
    assert_zero_sum(game.score_sheet().unwrap());
}

#[test]
fn test_human_claim_timeout_uses_recommendation() {
    let wall = stacked_wall([JUNK_A, "123w456w789w11t99d", JUNK_B, JUNK_C], "1t");
    let mut game = table_on(human_config(), wall, 0, [NONE, &[DecisionKind::Pong], NONE, NONE]);
    let start = Instant::now();
    step_to_request(&mut game, start, 1);

    let events = game.step_at(start + Duration::from_millis(500)).unwrap();
    assert!(events
        .iter()
        .any(|e| matches!(e, GameEvent::Recommended(r) if r.takes(DecisionKind::Pong))));

    let events = game.step_at(start + Duration::from_millis(1_000)).unwrap();
    assert!(events
        .iter()
        .any(|e| matches!(e, GameEvent::DecisionTimedOut(r) if r.takes(DecisionKind::Pong))));

    let events = game.step_at(start + Duration::from_millis(1_000)).unwrap();
    assert!(events.iter().any(|e| matches!(e, GameEvent::Ponged { seat: 1, from: 0, .. })));
    assert!(game.player(1).unwrap().hand.pong_of(t("1t")).is_some());
}

#[test]
fn test_human_claim_timeout_declines() {
    // No recommendation was asked for before the budget ran out
    let wall = stacked_wall([JUNK_A, "123w456w789w11t99d", JUNK_B, JUNK_C], "1t");
    let mut game = table_on(human_config(), wall, 0, [NONE, &[DecisionKind::Pong], NONE, NONE]);
    let start = Instant::now();
    step_to_request(&mut game, start, 1);

    let events = game.step_at(start + Duration::from_millis(1_000)).unwrap();
    assert!(!events.iter().any(|e| matches!(e, GameEvent::Recommended(_))));
    let timed_out = events.iter().find_map(|e| match e {
        GameEvent::DecisionTimedOut(r) => Some(r.clone()),
        _ => None,
    });
    assert_eq!(timed_out.map(|r| r.accepted), Some(false));

    game.step_at(start + Duration::from_millis(1_000)).unwrap();
    assert!(game.player(1).unwrap().hand.pong_of(t("1t")).is_none());
    assert_eq!(game.player(0).unwrap().discards, vec![t("1t")]);
    assert_eq!(game.phase(), GamePhase::DrawTile);
    assert_eq!(game.current_seat(), 1);
}

// ==================== Whole Hands ====================

#[test]
fn test_drawn_out_hand() {
    let mut game = table([JUNK_A, JUNK_B, JUNK_C, JUNK_B], "", 0, [NONE; 4]);
    let events = play(&mut game);

    assert!(events.contains(&GameEvent::DrawnOut));
    assert!(!events.iter().any(|e| matches!(e, GameEvent::BonusRevealed(_))));
    assert_eq!(game.wall_remaining(), 0);
    assert!(game.winners().is_empty());
    // Nobody waits, so only discarded bonus tiles move points
    let sheet = game.score_sheet().unwrap();
    assert_zero_sum(sheet);
    for record in &sheet.records {
        assert!(!record.waiting);
        if record.total < 0 {
            assert!(record.bonus_penalty);
        }
    }
}

#[test]
fn test_seeded_bot_table() {
    let providers: Vec<Box<dyn DecisionProvider>> = (0..4)
        .map(|seat| Box::new(Bot::with_seed(seat, BotDifficulty::Medium, seat as u64)) as Box<dyn DecisionProvider>)
        .collect();
    let mut game = GameManager::new(config(), providers).unwrap();

    for _ in 0..3 {
        play(&mut game);
        assert_zero_sum(game.score_sheet().unwrap());
        let scores: i32 = game.players().iter().map(|p| p.score).sum();
        assert_eq!(scores, 400);
        game.next_hand().unwrap();
        assert_eq!(game.phase(), GamePhase::GameStart);
    }
}

#[test]
fn test_next_hand_requires_finished_hand() {
    let mut game = table([JUNK_A, JUNK_B, JUNK_C, JUNK_B], "", 0, [NONE; 4]);
    assert_eq!(game.next_hand(), Err(GameError::HandInProgress));
}
