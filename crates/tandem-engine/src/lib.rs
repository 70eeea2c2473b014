//! Move selection for tandem: Monte Carlo tree search and alpha-beta
//! minimax working over one shared transposition table.

pub mod config;
pub mod engine;
pub mod error;
pub mod eval;
pub mod hybrid;
pub mod mcts;
pub mod search;
pub mod task;

pub use config::{Propagation, SearchBudget};
pub use engine::{ChessEngine, HybridEngine, MoveReport};
pub use error::SearchError;
pub use eval::{Evaluator, PieceSquareEval};
pub use hybrid::{ChoiceSource, HybridChoice, HybridSelector};
pub use mcts::Mcts;
pub use mcts::tree::{NodeId, SearchTree};
pub use search::control::SearchControl;
pub use search::negamax::{INF, MATE_SCORE, MATE_THRESHOLD};
pub use search::tt::{Bound, Orientation, TranspositionTable, TtEntry, TtProbe};
pub use search::{DepthReport, Minimax, SearchResult, StopReason};
pub use task::{SearchSlot, SearchTask};
