//! Quiescence search: resolve captures and checks before trusting a score.

use tandem_core::GameState;

use crate::eval::Evaluator;
use crate::search::negamax::{SearchContext, mate_adjusted};

/// Hard cap on quiescence depth below the frontier.
const MAX_QS_PLY: u8 = 16;

/// Fail-hard quiescence search.
///
/// `ply` is the distance from the root (used for mate distance) and
/// `qs_ply` the distance from the frontier. Returns a value clamped to
/// `[alpha, beta]` from the side to move's point of view.
pub(crate) fn quiescence<S, E>(
    state: &S,
    ply: u8,
    qs_ply: u8,
    mut alpha: i32,
    beta: i32,
    ctx: &mut SearchContext<'_, E>,
) -> i32
where
    S: GameState,
    E: Evaluator<S>,
{
    ctx.nodes += 1;

    // Stand-pat: the side to move may decline every tactical continuation.
    let stand_pat = mate_adjusted(ctx.evaluator.evaluate(state), ply);
    if stand_pat >= beta {
        return beta;
    }
    if stand_pat > alpha {
        alpha = stand_pat;
    }

    if qs_ply >= MAX_QS_PLY || state.is_terminal() {
        return alpha;
    }

    for mv in &state.tactical_moves() {
        let child = state.play(mv);
        let score = -quiescence(&child, ply + 1, qs_ply + 1, -beta, -alpha, ctx);

        if score >= beta {
            return beta;
        }
        if score > alpha {
            alpha = score;
        }
    }

    alpha
}
