//! Integration tests for parallel root fan-out and iterative deepening.
//!
//! Verifies correctness (legal moves, mate detection), determinism across
//! worker counts, and stop-flag handling.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use shakmaty::Chess;
use tandem_core::{GameState, from_fen, move_to_uci, starting_position};
use tandem_engine::{
    Minimax, PieceSquareEval, SearchControl, SearchResult, SearchTask, StopReason,
    TranspositionTable,
};

const SCHOLARS_MATE_FEN: &str =
    "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4";

const SICILIAN_FEN: &str = "rnbqkbnr/pp1ppppp/8/2p5/4P3/8/PPPP1PPP/RNBQKBNR w KQkq c6 0 2";

const RUY_LOPEZ_FEN: &str = "r1bqkbnr/pppp1ppp/2n5/1B2p3/4P3/5N2/PPPP1PPP/RNBQK2R b KQkq - 3 3";

const ENDGAME_FEN: &str = "8/8/8/3k4/8/3K4/4P3/8 w - - 0 1";

/// Helper: a minimax engine with a fresh table and `workers` root workers.
fn minimax(workers: usize) -> Minimax<PieceSquareEval> {
    Minimax::new(
        Arc::new(TranspositionTable::default()),
        Arc::new(PieceSquareEval),
    )
    .with_workers(workers)
    .with_time_ceiling(Duration::from_secs(600))
}

fn iddfs(pos: &Chess, depth: u8, workers: usize) -> SearchResult<shakmaty::Move> {
    minimax(workers).search_best_move_iddfs(pos, depth).unwrap()
}

// ── Basic correctness ─────────────────────────────────────────────────────────

#[test]
fn single_worker_returns_legal_move() {
    let pos = starting_position();
    let result = iddfs(&pos, 3, 1);
    assert!(pos.legal_moves().contains(&result.best_move));
}

#[test]
fn single_worker_finds_mate_in_one() {
    let pos = from_fen(SCHOLARS_MATE_FEN).unwrap();
    let result = iddfs(&pos, 3, 1);
    assert_eq!(
        move_to_uci(&result.best_move),
        "h5f7",
        "single worker should find Qxf7# (h5f7) in Scholar's mate position"
    );
    assert!(
        result.score > 28_000,
        "score {} should indicate mate (> 28000)",
        result.score
    );
}

// ── Multi-worker correctness ──────────────────────────────────────────────────

#[test]
fn four_workers_find_mate_in_one() {
    let pos = from_fen(SCHOLARS_MATE_FEN).unwrap();
    let result = iddfs(&pos, 3, 4);
    assert_eq!(move_to_uci(&result.best_move), "h5f7");
    assert!(result.score > 28_000);
}

#[test]
fn four_workers_various_positions() {
    let positions = [
        ("Sicilian Defence", SICILIAN_FEN),
        ("Ruy Lopez", RUY_LOPEZ_FEN),
        ("King+pawn endgame", ENDGAME_FEN),
    ];

    for (name, fen) in positions {
        let pos = from_fen(fen).unwrap_or_else(|_| panic!("invalid FEN for {name}"));
        let result = iddfs(&pos, 3, 4);
        assert!(
            pos.legal_moves().contains(&result.best_move),
            "4-worker search on {name} ({fen}) returned an illegal move"
        );
    }
}

#[test]
fn worker_count_does_not_change_the_answer() {
    for fen in [SICILIAN_FEN, RUY_LOPEZ_FEN, ENDGAME_FEN] {
        let pos = from_fen(fen).unwrap();
        let moves = pos.legal_moves();
        let single = minimax(1).search_best_move(&pos, 3, &moves, true).unwrap();
        for workers in [2, 4, 8] {
            let fanned = minimax(workers).search_best_move(&pos, 3, &moves, true).unwrap();
            assert_eq!(
                single, fanned,
                "{workers} workers disagree with one worker on {fen}"
            );
        }
    }
}

#[test]
fn root_position_is_not_mutated() {
    let pos = from_fen(RUY_LOPEZ_FEN).unwrap();
    let key = pos.key();
    let _ = iddfs(&pos, 3, 4);
    assert_eq!(pos.key(), key);
}

// ── Stop-flag behaviour ───────────────────────────────────────────────────────

#[test]
fn pre_set_stop_completes_only_depth_one() {
    let pos = starting_position();
    let control = SearchControl::unbounded();
    control.stop();

    let result = minimax(4)
        .search_best_move_iddfs_with(&pos, 9, &control, |_| {})
        .unwrap();

    assert_eq!(result.depth, 1, "depth 1 always completes");
    assert_eq!(result.stop, StopReason::Stopped);
}

#[test]
fn background_search_can_be_cancelled() {
    let task = SearchTask::spawn(|control| {
        minimax(4)
            .search_best_move_iddfs_with(&from_fen(SICILIAN_FEN).unwrap(), 9, control, |_| {})
            .map(|r| r.depth)
    });
    thread::sleep(Duration::from_millis(20));
    task.cancel();

    let depth = task.join().unwrap().unwrap();
    assert!(depth < 9, "cancelled search should stop before depth 9, got {depth}");
}

// ── Node counting ─────────────────────────────────────────────────────────────

#[test]
fn reports_total_nodes() {
    let pos = starting_position();
    let single = iddfs(&pos, 3, 1);
    let quad = iddfs(&pos, 3, 4);
    assert!(single.nodes > 0, "single-worker search should report > 0 nodes");
    assert_eq!(single.nodes, quad.nodes, "fan-out visits the same tree");
}

// ── Callback behaviour ────────────────────────────────────────────────────────

#[test]
fn on_depth_callback_fires_per_adopted_depth() {
    let pos = starting_position();
    let mut depths_seen: Vec<u8> = Vec::new();
    let result = minimax(4)
        .search_best_move_iddfs_with(&pos, 3, &SearchControl::default(), |report| {
            depths_seen.push(report.depth)
        })
        .unwrap();

    assert_eq!(depths_seen, vec![1, 3], "odd depths only, up to the maximum");
    assert_eq!(result.depth, 3);
}
