//! Rules-engine contract for tandem, and its chess implementation.

pub mod chess;
mod error;
mod state;

pub use chess::{
    STARTING_FEN, from_fen, move_to_uci, parse_uci_move, play_uci_line, starting_position,
};
pub use error::CoreError;
pub use state::{GameState, Side, Status};

pub use shakmaty::{Chess, Move};
