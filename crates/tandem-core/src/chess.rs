//! [`GameState`] for standard chess, backed by `shakmaty`.

use shakmaty::fen::Fen;
use shakmaty::zobrist::Zobrist64;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Move, Position, Role};

use crate::error::CoreError;
use crate::state::{GameState, Side, Status};

/// FEN of the standard starting position.
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Halfmove clock value at which the fifty-move rule draws the game.
const FIFTY_MOVE_PLIES: u32 = 100;

/// Ordering weight of a piece kind for MVV-LVA.
///
/// Pawn=1, Knight=3, Bishop=3, Rook=5, Queen=9, King=0.
const fn role_weight(role: Role) -> i32 {
    match role {
        Role::Pawn => 1,
        Role::Knight | Role::Bishop => 3,
        Role::Rook => 5,
        Role::Queen => 9,
        Role::King => 0,
    }
}

/// MVV-LVA key: `victim_weight * 16 - attacker_weight`.
fn mvv_lva(mv: &Move) -> i32 {
    let victim = mv.capture().map_or(0, role_weight);
    victim * 16 - role_weight(mv.role())
}

impl From<Color> for Side {
    fn from(color: Color) -> Side {
        match color {
            Color::White => Side::White,
            Color::Black => Side::Black,
        }
    }
}

impl From<Side> for Color {
    fn from(side: Side) -> Color {
        match side {
            Side::White => Color::White,
            Side::Black => Color::Black,
        }
    }
}

impl GameState for Chess {
    type Move = Move;

    fn legal_moves(&self) -> Vec<Move> {
        Position::legal_moves(self).into_iter().collect()
    }

    fn play(&self, mv: &Move) -> Chess {
        let mut next = self.clone();
        next.play_unchecked(*mv);
        next
    }

    fn status(&self) -> Status {
        if Position::legal_moves(self).is_empty() {
            if self.is_check() {
                Status::Checkmate
            } else {
                Status::Stalemate
            }
        } else if self.is_insufficient_material() {
            Status::InsufficientMaterial
        } else if self.halfmoves() >= FIFTY_MOVE_PLIES {
            Status::Draw
        } else {
            Status::Ongoing
        }
    }

    fn side_to_move(&self) -> Side {
        self.turn().into()
    }

    fn key(&self) -> u64 {
        self.zobrist_hash::<Zobrist64>(EnPassantMode::Legal).0
    }

    fn is_capture(&self, mv: &Move) -> bool {
        mv.is_capture()
    }

    fn gives_check(&self, mv: &Move) -> bool {
        GameState::play(self, mv).is_check()
    }

    /// Captures first, most valuable victim / least valuable attacker
    /// leading, then quiet checks in generation order.
    fn tactical_moves(&self) -> Vec<Move> {
        let (mut captures, quiet): (Vec<Move>, Vec<Move>) = Position::legal_moves(self)
            .into_iter()
            .partition(|mv| mv.is_capture());
        captures.sort_by_key(|mv| std::cmp::Reverse(mvv_lva(mv)));
        captures.extend(quiet.into_iter().filter(|mv| self.gives_check(mv)));
        captures
    }
}

/// The standard starting position.
pub fn starting_position() -> Chess {
    Chess::default()
}

/// Parse a FEN string into a playable position.
pub fn from_fen(fen: &str) -> Result<Chess, CoreError> {
    let setup: Fen = fen.trim().parse().map_err(|e: shakmaty::fen::ParseFenError| {
        CoreError::InvalidFen {
            fen: fen.to_string(),
            reason: e.to_string(),
        }
    })?;
    setup
        .into_position(CastlingMode::Standard)
        .map_err(|e| CoreError::InvalidFen {
            fen: fen.to_string(),
            reason: e.to_string(),
        })
}

/// Long-algebraic (UCI) text of a move, e.g. `e2e4`, `e1g1`, `e7e8q`.
pub fn move_to_uci(mv: &Move) -> String {
    mv.to_uci(CastlingMode::Standard).to_string()
}

/// Find the legal move in `pos` whose UCI text is `uci`.
pub fn parse_uci_move(pos: &Chess, uci: &str) -> Result<Move, CoreError> {
    Position::legal_moves(pos)
        .into_iter()
        .find(|mv| move_to_uci(mv) == uci)
        .ok_or_else(|| CoreError::IllegalMove {
            uci: uci.to_string(),
        })
}

/// Apply a sequence of UCI moves to `pos`.
pub fn play_uci_line<'a, I>(pos: &Chess, moves: I) -> Result<Chess, CoreError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut current = pos.clone();
    for uci in moves {
        let mv = parse_uci_move(&current, uci)?;
        current = GameState::play(&current, &mv);
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHOLARS_MATE_FEN: &str =
        "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4";

    #[test]
    fn starting_position_has_twenty_moves() {
        let pos = starting_position();
        assert_eq!(GameState::legal_moves(&pos).len(), 20);
        assert_eq!(pos.status(), Status::Ongoing);
        assert_eq!(pos.side_to_move(), Side::White);
    }

    #[test]
    fn starting_fen_matches_default() {
        let parsed = from_fen(STARTING_FEN).unwrap();
        assert_eq!(parsed.key(), starting_position().key());
    }

    #[test]
    fn invalid_fen_is_rejected() {
        let err = from_fen("not a fen").unwrap_err();
        assert!(matches!(err, CoreError::InvalidFen { .. }));
    }

    #[test]
    fn play_does_not_mutate_parent() {
        let pos = starting_position();
        let before = pos.key();
        let mv = parse_uci_move(&pos, "e2e4").unwrap();
        let child = GameState::play(&pos, &mv);
        assert_eq!(pos.key(), before, "parent must be unchanged");
        assert_ne!(child.key(), before);
        assert_eq!(child.side_to_move(), Side::Black);
    }

    #[test]
    fn transposed_move_orders_share_a_key() {
        let pos = starting_position();
        let a = play_uci_line(&pos, ["g1f3", "g8f6", "b1c3"]).unwrap();
        let b = play_uci_line(&pos, ["b1c3", "g8f6", "g1f3"]).unwrap();
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn checkmate_status() {
        let pos = from_fen("7k/6Q1/5K2/8/8/8/8/8 b - - 0 1").unwrap();
        assert_eq!(pos.status(), Status::Checkmate);
        assert!(GameState::legal_moves(&pos).is_empty());
    }

    #[test]
    fn stalemate_status() {
        let pos = from_fen("k7/2K5/1Q6/8/8/8/8/8 b - - 0 1").unwrap();
        assert_eq!(pos.status(), Status::Stalemate);
    }

    #[test]
    fn bare_kings_are_insufficient() {
        let pos = from_fen("8/8/4k3/8/8/3K4/8/8 w - - 0 1").unwrap();
        assert_eq!(pos.status(), Status::InsufficientMaterial);
    }

    #[test]
    fn fifty_move_rule_is_a_draw() {
        let pos = from_fen("8/8/4k3/8/8/3K4/R7/8 w - - 100 80").unwrap();
        assert_eq!(pos.status(), Status::Draw);
    }

    #[test]
    fn gives_check_detects_mating_move() {
        let pos = from_fen(SCHOLARS_MATE_FEN).unwrap();
        let mv = parse_uci_move(&pos, "h5f7").unwrap();
        assert!(pos.is_capture(&mv));
        assert!(pos.gives_check(&mv));
    }

    #[test]
    fn quiet_opening_has_no_tactical_moves() {
        let pos = starting_position();
        assert!(pos.tactical_moves().is_empty());
    }

    #[test]
    fn tactical_moves_put_biggest_capture_first() {
        // White knight on d5 can take a queen on c7 or a pawn on e7.
        let pos = from_fen("4k3/2q1p3/8/3N4/8/8/8/4K3 w - - 0 1").unwrap();
        let tactical = pos.tactical_moves();
        assert!(!tactical.is_empty());
        assert_eq!(move_to_uci(&tactical[0]), "d5c7");
        assert!(tactical.iter().all(|mv| pos.is_capture(mv) || pos.gives_check(mv)));
    }

    #[test]
    fn illegal_uci_move_is_rejected() {
        let pos = starting_position();
        let err = parse_uci_move(&pos, "e2e5").unwrap_err();
        assert!(matches!(err, CoreError::IllegalMove { .. }));
    }

    #[test]
    fn castling_uses_king_destination() {
        let pos = from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let mv = parse_uci_move(&pos, "e1g1").unwrap();
        assert_eq!(move_to_uci(&mv), "e1g1");
    }
}
