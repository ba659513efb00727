// Integration tests for the weekly decision engine.
//
// These tests exercise the full pipeline end-to-end through the library
// crate's public API: free-transfer derivation, context enrichment, the
// heuristic strategy, and the recorder-backed feed/decision queries, over
// both the in-memory store and the SQLite database.

use std::sync::Arc;

use fpl_advisor::config::{StrategyConfig, StrategyMode};
use fpl_advisor::db::Database;
use fpl_advisor::engine::{Engine, EngineContext};
use fpl_advisor::model::{
    Availability, Chip, Confidence, EventCategory, Fixture, GameweekHistoryEntry,
    Player, Position, SquadSlot,
};
use fpl_advisor::store::{DecisionStore, MemoryStore, ReasoningStore};
use fpl_advisor::strategy::HeuristicStrategy;
use fpl_advisor::{available_chips, compute_entitlement};

// ===========================================================================
// Test helpers
// ===========================================================================

fn make_player(id: u32, name: &str, position: Position, form: f64) -> Player {
    Player {
        id,
        name: name.to_string(),
        team: "TST".to_string(),
        team_id: 1 + id % 20,
        position,
        price: 5.5,
        form,
        total_points: (form * 12.0) as i32,
        status: Availability::Available,
        news: String::new(),
        chance_of_playing: None,
        expected_goal_involvements: 3.1,
    }
}

/// A legal 15-player squad: 2 GKP, 5 DEF, 5 MID, 3 FWD. Player ids 1-15.
/// Every player sits at a healthy form of 5.0 except player 8 (MID) who has
/// slumped to 2.0.
fn squad_players() -> Vec<Player> {
    let mut players = Vec::new();
    let positions = [
        Position::Gkp,
        Position::Gkp,
        Position::Def,
        Position::Def,
        Position::Def,
        Position::Def,
        Position::Def,
        Position::Mid,
        Position::Mid,
        Position::Mid,
        Position::Mid,
        Position::Mid,
        Position::Fwd,
        Position::Fwd,
        Position::Fwd,
    ];
    for (i, position) in positions.iter().enumerate() {
        let id = i as u32 + 1;
        let form = if id == 8 { 2.0 } else { 5.0 };
        players.push(make_player(id, &format!("Squad {id}"), *position, form));
    }
    players
}

fn squad_slots() -> Vec<SquadSlot> {
    (1..=15)
        .map(|i| SquadSlot {
            position_index: i as u8,
            player_id: i,
            is_captain: i == 13,
            is_vice_captain: i == 9,
        })
        .collect()
}

/// One full round of fixtures for gameweek `gw`: teams 1..=20 paired off.
fn full_round(gw: u32) -> Vec<Fixture> {
    (0..10)
        .map(|i| Fixture {
            gameweek: gw,
            home_team: 2 * i + 1,
            away_team: 2 * i + 2,
            home_difficulty: 3,
            away_difficulty: 3,
        })
        .collect()
}

fn strategy_config() -> StrategyConfig {
    StrategyConfig {
        mode: StrategyMode::Heuristic,
        fallback_to_heuristic: false,
        weak_form_threshold: 4.0,
        market_min_form: 4.0,
        market_limit: 30,
        form_margin: 1.0,
        max_hit_budget: -8,
    }
}

fn heuristic_engine(
    reasoning: Arc<dyn ReasoningStore>,
    decisions: Arc<dyn DecisionStore>,
) -> Engine {
    let config = strategy_config();
    Engine::new(
        Box::new(HeuristicStrategy::from_config(&config)),
        None,
        reasoning,
        decisions,
        &config,
    )
}

fn base_context() -> EngineContext {
    let mut all_players = squad_players();
    // The market: one in-form midfielder clearly better than the slumping
    // squad MID, plus assorted players who must not be proposed.
    all_players.push(make_player(100, "Hotshot", Position::Mid, 5.0));
    all_players.push(make_player(101, "Fullback", Position::Def, 4.2));
    all_players.push(make_player(102, "Benchwarmer", Position::Fwd, 1.0));

    EngineContext {
        squad: squad_slots(),
        all_players,
        fixtures: full_round(10),
        budget: 1.5,
        free_transfers: 1,
        gameweek: 10,
        max_penalty: -8,
        chips_available: Chip::ALL.to_vec(),
        chips_used: vec![],
    }
}

// ===========================================================================
// End-to-end scenarios
// ===========================================================================

#[tokio::test]
async fn one_weak_link_one_free_transfer_yields_exactly_that_pair() {
    let store = Arc::new(MemoryStore::new());
    let engine = heuristic_engine(store.clone(), store.clone());

    let rec = engine.produce_recommendation(&base_context()).await.unwrap();

    assert_eq!(rec.transfers.len(), 1);
    assert_eq!(rec.transfers[0].player_out, 8);
    assert_eq!(rec.transfers[0].player_out_name, "Squad 8");
    assert_eq!(rec.transfers[0].player_in, 100);
    assert_eq!(rec.transfers[0].player_in_name, "Hotshot");
    assert_eq!(rec.confidence, Confidence::Medium);

    // Captaincy invariant holds and points at real squad members.
    let captain = rec.captain.as_ref().unwrap();
    let vice = rec.vice_captain.as_ref().unwrap();
    assert_ne!(captain.id, vice.id);
    assert!((1..=15).contains(&captain.id));
}

#[tokio::test]
async fn healthy_squad_yields_no_transfers_and_high_confidence() {
    let store = Arc::new(MemoryStore::new());
    let engine = heuristic_engine(store.clone(), store.clone());

    let mut ctx = base_context();
    for player in &mut ctx.all_players {
        if player.id <= 15 {
            player.form = 6.0;
        }
    }

    let rec = engine.produce_recommendation(&ctx).await.unwrap();
    assert!(rec.transfers.is_empty());
    assert_eq!(rec.confidence, Confidence::High);
    assert!(rec.summary.contains("good shape"));
}

#[tokio::test]
async fn entitlement_from_history_caps_proposals() {
    // Two quiet weeks bank an entitlement of 3.
    let history = vec![
        GameweekHistoryEntry {
            transfers_made: 0,
            took_hit: false,
        };
        2
    ];
    let free_transfers = compute_entitlement(&history);
    assert_eq!(free_transfers, 3);

    let store = Arc::new(MemoryStore::new());
    let engine = heuristic_engine(store.clone(), store.clone());

    let mut ctx = base_context();
    ctx.free_transfers = free_transfers;
    // Three weak squad players but only two worthwhile market upgrades.
    ctx.all_players[7].form = 2.0; // Squad 8, MID
    ctx.all_players[13].form = 2.5; // Squad 14, FWD
    ctx.all_players[3].form = 3.5; // Squad 4, DEF
    ctx.all_players.push(make_player(103, "Targetman", Position::Fwd, 5.5));

    let rec = engine.produce_recommendation(&ctx).await.unwrap();

    assert!(rec.transfers.len() <= free_transfers as usize);
    // Squad 4 (DEF, form 3.5) has no market DEF beating 4.5: Fullback at
    // 4.2 misses the 1.0 margin. So exactly two proposals.
    assert_eq!(rec.transfers.len(), 2);
    let outs: Vec<u32> = rec.transfers.iter().map(|t| t.player_out).collect();
    assert!(outs.contains(&8));
    assert!(outs.contains(&14));
}

#[tokio::test]
async fn special_gameweeks_surface_in_chip_advice() {
    let store = Arc::new(MemoryStore::new());
    let engine = heuristic_engine(store.clone(), store.clone());

    let mut ctx = base_context();
    // Gameweek 12 is a blank for teams 1 and 2.
    ctx.fixtures
        .extend(full_round(12).into_iter().filter(|f| f.home_team != 1));

    let rec = engine.produce_recommendation(&ctx).await.unwrap();

    // Detection only: the heuristic names the special gameweek but still
    // holds every chip.
    assert_eq!(rec.chip_advice.use_this_week, None);
    assert!(rec.chip_advice.reasoning.contains("GW12"));
}

#[tokio::test]
async fn feed_narrates_run_in_order_and_is_idempotent() {
    let store = Arc::new(MemoryStore::new());
    let engine = heuristic_engine(store.clone(), store.clone());
    let ctx = base_context();

    engine.produce_recommendation(&ctx).await.unwrap();
    let first_feed: Vec<String> = store
        .events_in_order(10)
        .into_iter()
        .map(|e| e.message)
        .collect();

    // A second run replaces the feed rather than appending to it.
    engine.produce_recommendation(&ctx).await.unwrap();
    let second_feed: Vec<String> = store
        .events_in_order(10)
        .into_iter()
        .map(|e| e.message)
        .collect();

    assert_eq!(first_feed, second_feed);
    assert_eq!(second_feed.first().unwrap(), "Starting team analysis...");
    assert_eq!(
        second_feed
            .iter()
            .filter(|m| *m == "Analysis complete!")
            .count(),
        1
    );
}

// ===========================================================================
// SQLite-backed engine
// ===========================================================================

#[tokio::test]
async fn sqlite_backed_run_persists_decision_and_feed() {
    let db = Arc::new(Database::open(":memory:").unwrap());
    let engine = heuristic_engine(db.clone(), db.clone());

    let rec = engine.produce_recommendation(&base_context()).await.unwrap();

    let decision = engine.recorder().latest_decision(10).unwrap().unwrap();
    assert_eq!(decision.gameweek, 10);
    assert_eq!(
        decision.captain,
        rec.captain.as_ref().map(|c| c.id)
    );
    let proposals = decision.transfer_proposals().unwrap();
    assert_eq!(proposals.len(), 1);
    assert_eq!(proposals[0].player_in_name, "Hotshot");

    // Feed query: newest-first, with the opening line last.
    let feed = engine.recorder().reasoning_log(10, 100).unwrap();
    assert_eq!(feed.last().unwrap().message, "Starting team analysis...");
    assert_eq!(feed.last().unwrap().category, EventCategory::Start);

    // Queries for an untouched gameweek are explicitly empty, not errors.
    assert!(engine.recorder().latest_decision(11).unwrap().is_none());
    assert!(engine.recorder().reasoning_log(11, 100).unwrap().is_empty());
}

#[tokio::test]
async fn sqlite_rerun_supersedes_decision() {
    let db = Arc::new(Database::open(":memory:").unwrap());
    let engine = heuristic_engine(db.clone(), db.clone());
    let ctx = base_context();

    engine.produce_recommendation(&ctx).await.unwrap();

    let mut improved = ctx.clone();
    for player in &mut improved.all_players {
        if player.id <= 15 {
            player.form = 6.5;
        }
    }
    engine.produce_recommendation(&improved).await.unwrap();

    let decision = engine.recorder().latest_decision(10).unwrap().unwrap();
    assert!(decision.transfer_proposals().unwrap().is_empty());
    assert_eq!(decision.confidence, Confidence::High);

    // Both runs remain queryable in decision history.
    assert_eq!(engine.recorder().recent_decisions(10).unwrap().len(), 2);
}

// ===========================================================================
// Chip availability policy
// ===========================================================================

#[test]
fn chip_availability_feeds_engine_context() {
    let used = vec![Chip::Wildcard, Chip::FreeHit];
    let available = available_chips(&used, 2);

    assert!(available.contains(&Chip::Wildcard)); // second wildcard remains
    assert!(!available.contains(&Chip::FreeHit));
    assert!(available.contains(&Chip::BenchBoost));
    assert!(available.contains(&Chip::TripleCaptain));
}
