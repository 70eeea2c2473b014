//! Negamax alpha-beta search backed by the transposition table.

use tandem_core::GameState;

use crate::eval::Evaluator;
use crate::search::quiescence::quiescence;
use crate::search::tt::{Bound, TranspositionTable, TtProbe, score_from_tt, score_to_tt};

/// Score representing an unreachable upper/lower bound.
pub const INF: i32 = 30_000;

/// Base score for checkmate (adjusted by ply for mate distance).
pub const MATE_SCORE: i32 = 29_000;

/// Scores above this threshold indicate a forced mate.
pub const MATE_THRESHOLD: i32 = 28_000;

/// Search state threaded through negamax calls.
pub(crate) struct SearchContext<'a, E> {
    /// Nodes visited, quiescence included.
    pub nodes: u64,
    /// Transposition table (shared between workers).
    pub tt: &'a TranspositionTable,
    /// Static evaluator for frontier nodes.
    pub evaluator: &'a E,
}

impl<'a, E> SearchContext<'a, E> {
    pub fn new(tt: &'a TranspositionTable, evaluator: &'a E) -> Self {
        Self {
            nodes: 0,
            tt,
            evaluator,
        }
    }
}

/// Move a mate score `ply` plies further from the root.
#[inline]
pub(crate) fn mate_adjusted(score: i32, ply: u8) -> i32 {
    if score >= MATE_THRESHOLD {
        score - ply as i32
    } else if score <= -MATE_THRESHOLD {
        score + ply as i32
    } else {
        score
    }
}

/// Negamax alpha-beta search.
///
/// Returns the score for the side to move at `state`. Frontier nodes
/// (depth exhausted, game over, or nothing to play) are resolved by
/// quiescence. Completed nodes are recorded in the transposition table.
pub(crate) fn negamax<S, E>(
    state: &S,
    depth: u8,
    ply: u8,
    mut alpha: i32,
    beta: i32,
    ctx: &mut SearchContext<'_, E>,
) -> i32
where
    S: GameState,
    E: Evaluator<S>,
{
    if depth == 0 || state.is_terminal() {
        return quiescence(state, ply, 0, alpha, beta, ctx);
    }

    ctx.nodes += 1;
    let key = state.key();

    if let TtProbe::Hit(entry) = ctx.tt.probe(depth, key) {
        let score = score_from_tt(entry.evaluation, ply);
        let cutoff = match entry.bound {
            Bound::Exact => true,
            Bound::Lower => score >= beta,
            Bound::Upper => score <= alpha,
        };
        if cutoff {
            return score;
        }
    }

    let moves = state.legal_moves();
    if moves.is_empty() {
        return quiescence(state, ply, 0, alpha, beta, ctx);
    }

    let original_alpha = alpha;
    let mut best_score = -INF;

    for mv in &moves {
        let child = state.play(mv);
        let score = -negamax(&child, depth - 1, ply + 1, -beta, -alpha, ctx);

        if score > best_score {
            best_score = score;
            if score > alpha {
                alpha = score;
            }
        }

        if alpha >= beta {
            break;
        }
    }

    let bound = if best_score <= original_alpha {
        Bound::Upper
    } else if best_score >= beta {
        Bound::Lower
    } else {
        Bound::Exact
    };
    ctx.tt.record(key, depth, score_to_tt(best_score, ply), bound);

    best_score
}
