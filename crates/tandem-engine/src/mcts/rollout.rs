//! Random playouts.

use rand::Rng;
use rand::seq::IndexedRandom;
use tandem_core::{GameState, Side, Status};

use crate::eval::Evaluator;

/// Reward for a playout that ends in checkmate.
pub const MATE_REWARD: f64 = 1000.0;

/// Play uniformly random legal moves from `start` for at most `ply_cap`
/// plies or until the game ends, and score the final position for the side
/// to move at `start`.
pub fn random_playout<S, E, R>(start: &S, ply_cap: u32, evaluator: &E, rng: &mut R) -> f64
where
    S: GameState,
    E: Evaluator<S>,
    R: Rng + ?Sized,
{
    let perspective = start.side_to_move();
    let mut current = start.clone();

    for _ in 0..ply_cap {
        if current.is_terminal() {
            break;
        }
        let moves = current.legal_moves();
        let Some(mv) = moves.choose(rng) else {
            break;
        };
        current = current.play(mv);
    }

    score_final(&current, perspective, evaluator)
}

/// `+MATE_REWARD` if `perspective` delivered mate, `-MATE_REWARD` if it was
/// mated, otherwise its material balance in pawn units.
pub fn score_final<S, E>(end: &S, perspective: Side, evaluator: &E) -> f64
where
    S: GameState,
    E: Evaluator<S>,
{
    if end.status() == Status::Checkmate {
        if end.side_to_move() == perspective {
            -MATE_REWARD
        } else {
            MATE_REWARD
        }
    } else {
        evaluator.material_balance(end, perspective) as f64
    }
}
