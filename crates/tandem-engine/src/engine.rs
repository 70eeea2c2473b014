//! The move-selection facade tying MCTS, minimax and the hybrid step together.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tandem_core::GameState;
use tracing::info;

use crate::config::SearchBudget;
use crate::error::SearchError;
use crate::eval::{Evaluator, PieceSquareEval};
use crate::hybrid::{ChoiceSource, HybridSelector};
use crate::mcts::Mcts;
use crate::mcts::tree::SearchTree;
use crate::search::control::SearchControl;
use crate::search::tt::TranspositionTable;
use crate::search::{DepthReport, Minimax, SearchResult};

/// What a move request produced.
#[derive(Debug, Clone)]
pub struct MoveReport<M> {
    /// The move to play.
    pub best_move: M,
    /// MCTS iterations completed.
    pub iterations: u32,
    /// Nodes in the MCTS tree when the move was chosen.
    pub tree_size: usize,
    /// Which search the move came from.
    pub source: ChoiceSource,
    /// Minimax score of the reconciling search, when it ran.
    pub minimax_score: Option<i32>,
    /// Depth that score comes from.
    pub minimax_depth: Option<u8>,
    /// Wall-clock time of the request.
    pub elapsed: Duration,
}

/// Hybrid MCTS/minimax move selector.
///
/// Owns one transposition table shared by every search it runs. Each move
/// request starts a new table generation. Requests take `&mut self`, so a
/// single engine never runs two searches at once.
pub struct HybridEngine<E> {
    budget: SearchBudget,
    evaluator: Arc<E>,
    minimax: Minimax<E>,
    mcts: Mcts,
    hybrid: HybridSelector,
}

/// The engine for standard chess.
pub type ChessEngine = HybridEngine<PieceSquareEval>;

impl<E> HybridEngine<E> {
    /// An engine with its own transposition table sized from `budget`.
    pub fn new(evaluator: E, budget: SearchBudget) -> Self {
        let tt = Arc::new(TranspositionTable::new(
            budget.tt_capacity,
            budget.tt_retain_generations,
        ));
        Self::with_table(evaluator, budget, tt)
    }

    /// An engine sharing an existing transposition table.
    pub fn with_table(evaluator: E, budget: SearchBudget, tt: Arc<TranspositionTable>) -> Self {
        let evaluator = Arc::new(evaluator);
        Self {
            minimax: Minimax::from_budget(tt, Arc::clone(&evaluator), &budget),
            mcts: Mcts::new(&budget),
            hybrid: HybridSelector::new(budget.max_depth),
            evaluator,
            budget,
        }
    }

    pub fn budget(&self) -> &SearchBudget {
        &self.budget
    }

    /// Replace the budget. The table is reallocated only when its size or
    /// retention changed; the playout RNG is reseeded.
    pub fn set_budget(&mut self, budget: SearchBudget) {
        let tt = if budget.tt_capacity != self.budget.tt_capacity
            || budget.tt_retain_generations != self.budget.tt_retain_generations
        {
            Arc::new(TranspositionTable::new(
                budget.tt_capacity,
                budget.tt_retain_generations,
            ))
        } else {
            Arc::clone(self.minimax.table())
        };
        self.minimax = Minimax::from_budget(tt, Arc::clone(&self.evaluator), &budget);
        self.mcts = Mcts::new(&budget);
        self.hybrid = HybridSelector::new(budget.max_depth);
        self.budget = budget;
    }

    /// The shared transposition table.
    pub fn table(&self) -> &Arc<TranspositionTable> {
        self.minimax.table()
    }

    /// Forget everything learned so far (new game).
    pub fn clear(&self) {
        self.minimax.table().clear();
    }

    pub fn minimax(&self) -> &Minimax<E> {
        &self.minimax
    }
}

impl<E> HybridEngine<E> {
    /// Pick a move for `state` with `iterations` MCTS iterations.
    ///
    /// `use_minimax_probe` scores MCTS leaves with a shallow alpha-beta
    /// search instead of random playouts. When the budget enables it the
    /// MCTS choice is then reconciled with iterative deepening.
    pub fn select_move<S>(
        &mut self,
        state: &S,
        iterations: u32,
        use_minimax_probe: bool,
    ) -> Result<S::Move, SearchError>
    where
        S: GameState,
        E: Evaluator<S>,
    {
        self.select_move_with(state, iterations, use_minimax_probe, &SearchControl::default())
            .map(|report| report.best_move)
    }

    /// Pick a move using the budget's iteration count and probe setting.
    pub fn best_move<S>(&mut self, state: &S, control: &SearchControl) -> Result<MoveReport<S::Move>, SearchError>
    where
        S: GameState,
        E: Evaluator<S>,
    {
        let iterations = self.budget.iterations;
        let use_probe = self.budget.use_minimax_probe;
        self.select_move_with(state, iterations, use_probe, control)
    }

    /// [`select_move`](Self::select_move) with a stop flag and a full report.
    ///
    /// A raised stop flag ends MCTS early and skips reconciliation.
    pub fn select_move_with<S>(
        &mut self,
        state: &S,
        iterations: u32,
        use_minimax_probe: bool,
        control: &SearchControl,
    ) -> Result<MoveReport<S::Move>, SearchError>
    where
        S: GameState,
        E: Evaluator<S>,
    {
        let started = Instant::now();
        self.minimax.table().new_generation();

        let mut tree = self.mcts.search(
            state,
            iterations,
            &self.minimax,
            use_minimax_probe,
            control,
        )?;
        let done = tree.root().visits();

        let (best_move, source, minimax) =
            if self.budget.hybrid_select && !control.is_stopped() {
                let choice = self.hybrid.select(&mut tree, &self.mcts, &self.minimax, control)?;
                (choice.mv, choice.source, Some((choice.minimax_score, choice.depth)))
            } else {
                let best = Mcts::best_child(&tree, SearchTree::<S>::ROOT)?;
                let mv = tree.get(best).mv().cloned().ok_or(SearchError::EmptyTree)?;
                (mv, ChoiceSource::Mcts, None)
            };
        let minimax_score = minimax.map(|(score, _)| score);
        let minimax_depth = minimax.map(|(_, depth)| depth);

        let elapsed = started.elapsed();
        info!(
            iterations = done,
            tree = tree.node_count(),
            ?source,
            ?minimax_score,
            ?minimax_depth,
            ms = elapsed.as_millis() as u64,
            "move selected"
        );

        Ok(MoveReport {
            best_move,
            iterations: done,
            tree_size: tree.node_count(),
            source,
            minimax_score,
            minimax_depth,
            elapsed,
        })
    }

    /// Standalone iterative deepening to the budget's `max_depth`.
    pub fn best_move_iddfs<S>(
        &self,
        state: &S,
        control: &SearchControl,
    ) -> Result<SearchResult<S::Move>, SearchError>
    where
        S: GameState,
        E: Evaluator<S>,
    {
        let max_depth = self.budget.max_depth;
        self.search_best_move_iddfs_with(state, max_depth, control, |_| {})
    }

    /// Standalone iterative deepening for the side to move.
    pub fn search_best_move_iddfs<S>(
        &self,
        state: &S,
        max_depth: u8,
    ) -> Result<SearchResult<S::Move>, SearchError>
    where
        S: GameState,
        E: Evaluator<S>,
    {
        self.search_best_move_iddfs_with(state, max_depth, &SearchControl::default(), |_| {})
    }

    /// Iterative deepening with a stop flag and per-depth progress.
    pub fn search_best_move_iddfs_with<S, F>(
        &self,
        state: &S,
        max_depth: u8,
        control: &SearchControl,
        on_depth: F,
    ) -> Result<SearchResult<S::Move>, SearchError>
    where
        S: GameState,
        E: Evaluator<S>,
        F: FnMut(&DepthReport<S::Move>),
    {
        self.minimax.table().new_generation();
        self.minimax
            .search_best_move_iddfs_with(state, max_depth, control, on_depth)
    }
}

impl Default for ChessEngine {
    fn default() -> Self {
        Self::new(PieceSquareEval, SearchBudget::default())
    }
}

impl<E> std::fmt::Debug for HybridEngine<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridEngine")
            .field("budget", &self.budget)
            .field("minimax", &self.minimax)
            .finish()
    }
}
