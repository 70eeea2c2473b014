//! Static evaluation.
//!
//! The search only talks to an [`Evaluator`]; [`PieceSquareEval`] is the
//! chess implementation (material plus piece-square placement).

pub mod material;
pub mod pst;

use shakmaty::{Chess, Color, Position};
use tandem_core::{GameState, Side, Status};

use crate::search::negamax::MATE_SCORE;

/// Scores positions for the search.
pub trait Evaluator<S: GameState>: Send + Sync {
    /// Centipawn score from the side to move's point of view.
    ///
    /// A checkmated side to move scores `-MATE_SCORE`; any draw scores 0.
    fn evaluate(&self, state: &S) -> i32;

    /// Material difference in pawn units, positive when `side` is ahead.
    fn material_balance(&self, state: &S, side: Side) -> i32;
}

/// Material plus piece-square evaluation for standard chess.
#[derive(Debug, Clone, Copy, Default)]
pub struct PieceSquareEval;

impl Evaluator<Chess> for PieceSquareEval {
    fn evaluate(&self, pos: &Chess) -> i32 {
        match pos.status() {
            Status::Checkmate => -MATE_SCORE,
            status if status.is_draw() => 0,
            _ => {
                let board = pos.board();
                let white = material::material(board) + pst::placement(board);
                match pos.turn() {
                    Color::White => white,
                    Color::Black => -white,
                }
            }
        }
    }

    fn material_balance(&self, pos: &Chess, side: Side) -> i32 {
        material::pawn_balance(pos.board(), side.into())
    }
}
