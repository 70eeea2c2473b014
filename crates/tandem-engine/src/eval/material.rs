//! Material counting.
//!
//! Centipawn values feed the static evaluation; pawn-unit values score the
//! end of a random playout.

use shakmaty::{Board, Color, Role};

/// Centipawn value of a piece kind.
///
/// | Piece  | cp  |
/// |--------|-----|
/// | Pawn   | 100 |
/// | Knight | 300 |
/// | Bishop | 300 |
/// | Rook   | 500 |
/// | Queen  | 900 |
/// | King   |   0 |
pub const fn centipawns(role: Role) -> i32 {
    match role {
        Role::Pawn => 100,
        Role::Knight | Role::Bishop => 300,
        Role::Rook => 500,
        Role::Queen => 900,
        Role::King => 0,
    }
}

/// Pawn-unit value of a piece kind (1/3/3/5/9, king 0).
pub const fn pawn_units(role: Role) -> i32 {
    centipawns(role) / 100
}

fn count(board: &Board, role: Role, color: Color) -> i32 {
    (board.by_role(role) & board.by_color(color)).count() as i32
}

fn weighted(board: &Board, value: fn(Role) -> i32, us: Color) -> i32 {
    Role::ALL
        .into_iter()
        .map(|role| value(role) * (count(board, role, us) - count(board, role, us.other())))
        .sum()
}

/// Material balance in centipawns from White's perspective.
pub fn material(board: &Board) -> i32 {
    weighted(board, centipawns, Color::White)
}

/// Material balance in pawn units from `us`'s perspective.
pub fn pawn_balance(board: &Board, us: Color) -> i32 {
    weighted(board, pawn_units, us)
}
