//! The rules-engine contract consumed by the search.
//!
//! The search never looks inside a position. Legal moves, successors,
//! terminal status, the transposition key and the tactical predicates used
//! by quiescence all go through [`GameState`].

use std::fmt;
use std::ops::Not;

/// The side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The side that moves first.
    White,
    /// The side that moves second.
    Black,
}

impl Side {
    /// The other side.
    #[inline]
    pub const fn opposite(self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }
}

impl Not for Side {
    type Output = Side;

    #[inline]
    fn not(self) -> Side {
        self.opposite()
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::White => f.write_str("white"),
            Side::Black => f.write_str("black"),
        }
    }
}

/// Terminal status of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The game goes on.
    Ongoing,
    /// The side to move is checkmated.
    Checkmate,
    /// The side to move has no legal move and is not in check.
    Stalemate,
    /// Neither side can deliver mate.
    InsufficientMaterial,
    /// Any other rules draw (fifty-move rule and similar).
    Draw,
}

impl Status {
    /// Whether the game is over.
    #[inline]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Status::Ongoing)
    }

    /// Whether the game ended without a winner.
    #[inline]
    pub const fn is_draw(self) -> bool {
        matches!(
            self,
            Status::Stalemate | Status::InsufficientMaterial | Status::Draw
        )
    }
}

/// A game position as seen by the search.
///
/// Positions are copy-make: [`play`](GameState::play) returns an
/// independent successor and never mutates `self`, so a position handed to
/// one worker thread can never be observed half-updated by another.
pub trait GameState: Clone + Send + Sync {
    /// A move in this game.
    type Move: Clone + PartialEq + fmt::Debug + Send + Sync;

    /// Every legal move, in the rules engine's enumeration order.
    fn legal_moves(&self) -> Vec<Self::Move>;

    /// The position after `mv`. `mv` must be legal in `self`.
    fn play(&self, mv: &Self::Move) -> Self;

    /// Terminal status of this position.
    fn status(&self) -> Status;

    /// The side to move.
    fn side_to_move(&self) -> Side;

    /// Canonical identity used as the transposition key.
    fn key(&self) -> u64;

    /// Whether `mv` captures a piece.
    fn is_capture(&self, mv: &Self::Move) -> bool;

    /// Whether `mv` leaves the opponent in check.
    fn gives_check(&self, mv: &Self::Move) -> bool;

    /// Moves that capture or give check, in the order quiescence should try them.
    fn tactical_moves(&self) -> Vec<Self::Move> {
        self.legal_moves()
            .into_iter()
            .filter(|mv| self.is_capture(mv) || self.gives_check(mv))
            .collect()
    }

    /// Shorthand for `self.status().is_terminal()`.
    fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_opposite_round_trips() {
        assert_eq!(Side::White.opposite(), Side::Black);
        assert_eq!(!Side::Black, Side::White);
        assert_eq!(!!Side::White, Side::White);
    }

    #[test]
    fn ongoing_is_not_terminal() {
        assert!(!Status::Ongoing.is_terminal());
        assert!(!Status::Ongoing.is_draw());
    }

    #[test]
    fn checkmate_is_terminal_but_not_draw() {
        assert!(Status::Checkmate.is_terminal());
        assert!(!Status::Checkmate.is_draw());
    }

    #[test]
    fn draws_are_terminal() {
        for status in [Status::Stalemate, Status::InsufficientMaterial, Status::Draw] {
            assert!(status.is_terminal(), "{status:?} should be terminal");
            assert!(status.is_draw(), "{status:?} should be a draw");
        }
    }
}
