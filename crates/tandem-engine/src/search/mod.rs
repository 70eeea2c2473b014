//! Minimax search: negamax with quiescence, parallel root fan-out and
//! iterative deepening.

pub mod control;
pub mod negamax;
pub mod pool;
pub mod quiescence;
pub mod tt;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tandem_core::GameState;
use tracing::{debug, trace};

use crate::config::SearchBudget;
use crate::error::SearchError;
use crate::eval::Evaluator;
use control::SearchControl;
use negamax::{INF, SearchContext, negamax};
use pool::WorkerPool;
use tt::TranspositionTable;

/// Why iterative deepening stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every scheduled depth completed.
    MaxDepth,
    /// The best move did not change between two completed depths.
    Stable,
    /// A depth took at least the per-depth time ceiling.
    TimeCeiling,
    /// The stop flag was raised.
    Stopped,
}

/// Progress emitted after each adopted depth.
#[derive(Debug, Clone)]
pub struct DepthReport<M> {
    /// Depth just completed.
    pub depth: u8,
    /// Best root move at this depth.
    pub best_move: M,
    /// Its score in centipawns.
    pub score: i32,
    /// Nodes searched so far across all depths.
    pub nodes: u64,
    /// Time since the search started.
    pub elapsed: Duration,
}

/// Result of a completed iterative-deepening search.
#[derive(Debug, Clone)]
pub struct SearchResult<M> {
    /// Best move found at the deepest adopted depth.
    pub best_move: M,
    /// Score of `best_move` in centipawns.
    pub score: i32,
    /// Depth the result comes from.
    pub depth: u8,
    /// Total nodes visited during the search.
    pub nodes: u64,
    /// Wall-clock time of the whole search.
    pub elapsed: Duration,
    /// Why the search ended.
    pub stop: StopReason,
}

struct RootOutcome<M> {
    best_move: M,
    score: i32,
    nodes: u64,
}

/// Alpha-beta engine sharing one transposition table across its workers.
///
/// Scores are centipawns. With `maximizing = true` a score is from the
/// point of view of the side to move at the searched position; with
/// `maximizing = false` it is from the opponent's.
pub struct Minimax<E> {
    tt: Arc<TranspositionTable>,
    evaluator: Arc<E>,
    pool: WorkerPool,
    time_ceiling: Duration,
}

impl<E> Minimax<E> {
    /// An engine with one worker and a five second per-depth ceiling.
    pub fn new(tt: Arc<TranspositionTable>, evaluator: Arc<E>) -> Self {
        Self {
            tt,
            evaluator,
            pool: WorkerPool::default(),
            time_ceiling: Duration::from_secs(5),
        }
    }

    /// An engine configured from `budget`.
    pub fn from_budget(
        tt: Arc<TranspositionTable>,
        evaluator: Arc<E>,
        budget: &SearchBudget,
    ) -> Self {
        Self::new(tt, evaluator)
            .with_workers(budget.workers)
            .with_time_ceiling(budget.time_ceiling)
    }

    /// Set the root fan-out width.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.pool = WorkerPool::new(workers);
        self
    }

    /// Set the per-depth ceiling used by iterative deepening.
    pub fn with_time_ceiling(mut self, ceiling: Duration) -> Self {
        self.time_ceiling = ceiling;
        self
    }

    /// The shared transposition table.
    pub fn table(&self) -> &Arc<TranspositionTable> {
        &self.tt
    }

    /// The static evaluator.
    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    /// Root fan-out width.
    pub fn workers(&self) -> usize {
        self.pool.workers()
    }

    /// Per-depth time ceiling.
    pub fn time_ceiling(&self) -> Duration {
        self.time_ceiling
    }
}

impl<E> Minimax<E> {
    /// Alpha-beta value of `state` searched `depth` plies deep.
    ///
    /// `maximizing` says whether the side to move at `state` is the side the
    /// score is reported for.
    pub fn evaluate_depth<S>(
        &self,
        state: &S,
        depth: u8,
        alpha: i32,
        beta: i32,
        maximizing: bool,
    ) -> i32
    where
        S: GameState,
        E: Evaluator<S>,
    {
        let mut ctx = SearchContext::new(&self.tt, &*self.evaluator);
        if maximizing {
            negamax(state, depth, 0, alpha, beta, &mut ctx)
        } else {
            -negamax(state, depth, 0, -beta, -alpha, &mut ctx)
        }
    }

    /// Quiescence value of `state` for the side to move, clamped to `[alpha, beta]`.
    pub fn quiescence<S>(&self, state: &S, alpha: i32, beta: i32) -> i32
    where
        S: GameState,
        E: Evaluator<S>,
    {
        let mut ctx = SearchContext::new(&self.tt, &*self.evaluator);
        quiescence::quiescence(state, 0, 0, alpha, beta, &mut ctx)
    }

    /// Pick the best of `moves` by searching every child `depth - 1` plies
    /// with a full window, fanned out over the worker pool.
    ///
    /// Ties keep the earliest move in `moves`.
    pub fn search_best_move<S>(
        &self,
        state: &S,
        depth: u8,
        moves: &[S::Move],
        maximizing: bool,
    ) -> Result<(S::Move, i32), SearchError>
    where
        S: GameState,
        E: Evaluator<S>,
    {
        let outcome = self.search_root(state, depth, moves, maximizing)?;
        Ok((outcome.best_move, outcome.score))
    }

    fn search_root<S>(
        &self,
        state: &S,
        depth: u8,
        moves: &[S::Move],
        maximizing: bool,
    ) -> Result<RootOutcome<S::Move>, SearchError>
    where
        S: GameState,
        E: Evaluator<S>,
    {
        if moves.is_empty() {
            return Err(SearchError::NoLegalMoves);
        }

        let child_depth = depth.saturating_sub(1);
        let tt: &TranspositionTable = &self.tt;
        let evaluator: &E = &self.evaluator;

        let scored = self.pool.map_children(state, moves, |child| {
            let mut ctx = SearchContext::new(tt, evaluator);
            let score = negamax(child, child_depth, 1, -INF, INF, &mut ctx);
            // `score` is for the child's mover, i.e. the opponent.
            let score = if maximizing { -score } else { score };
            (score, ctx.nodes)
        });

        let mut nodes = 0;
        let mut best: Option<(usize, i32)> = None;
        for (idx, &(score, visited)) in scored.iter().enumerate() {
            nodes += visited;
            let better = match best {
                None => true,
                Some((_, best_score)) if maximizing => score > best_score,
                Some((_, best_score)) => score < best_score,
            };
            if better {
                best = Some((idx, score));
            }
        }

        let (idx, score) = best.ok_or(SearchError::NoLegalMoves)?;
        trace!(depth, idx, score, nodes, "root search done");
        Ok(RootOutcome {
            best_move: moves[idx].clone(),
            score,
            nodes,
        })
    }

    /// Iterative deepening over every legal move of `state`, for its side to move.
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

    /// [`search_best_move_iddfs`](Self::search_best_move_iddfs) with a stop
    /// flag and a per-depth progress callback.
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
        let moves = state.legal_moves();
        self.iddfs_over(state, &moves, max_depth, true, control, on_depth)
    }

    /// Iterative deepening restricted to `moves`.
    ///
    /// Searches depths 1, 3, 5, ... up to `max_depth` (0 is treated as 1).
    /// Stops after a depth whose best move matches the previous depth's, once
    /// the stop flag is raised, or when a depth takes at least the time
    /// ceiling. A depth that hits the ceiling is discarded unless it is the
    /// first one.
    pub fn iddfs_over<S, F>(
        &self,
        state: &S,
        moves: &[S::Move],
        max_depth: u8,
        maximizing: bool,
        control: &SearchControl,
        mut on_depth: F,
    ) -> Result<SearchResult<S::Move>, SearchError>
    where
        S: GameState,
        E: Evaluator<S>,
        F: FnMut(&DepthReport<S::Move>),
    {
        if moves.is_empty() {
            return Err(SearchError::NoLegalMoves);
        }

        let started = Instant::now();
        let mut nodes = 0u64;
        let mut stop = StopReason::MaxDepth;
        let mut completed: Option<SearchResult<S::Move>> = None;

        for depth in (1..=max_depth.max(1)).step_by(2) {
            let depth_start = Instant::now();
            let outcome = self.search_root(state, depth, moves, maximizing)?;
            let took = depth_start.elapsed();
            nodes += outcome.nodes;

            let over_budget = took >= self.time_ceiling;
            if over_budget && completed.is_some() {
                debug!(depth, ?took, "depth exceeded time ceiling, discarded");
                stop = StopReason::TimeCeiling;
                break;
            }

            let stable = completed
                .as_ref()
                .is_some_and(|prev| prev.best_move == outcome.best_move);

            on_depth(&DepthReport {
                depth,
                best_move: outcome.best_move.clone(),
                score: outcome.score,
                nodes,
                elapsed: started.elapsed(),
            });
            completed = Some(SearchResult {
                best_move: outcome.best_move,
                score: outcome.score,
                depth,
                nodes,
                elapsed: took,
                stop,
            });

            if over_budget {
                stop = StopReason::TimeCeiling;
                break;
            }
            if stable {
                stop = StopReason::Stable;
                break;
            }
            if control.is_stopped() {
                stop = StopReason::Stopped;
                break;
            }
        }

        let mut result = completed.ok_or(SearchError::NoLegalMoves)?;
        result.nodes = nodes;
        result.elapsed = started.elapsed();
        result.stop = stop;
        debug!(
            depth = result.depth,
            score = result.score,
            nodes,
            ?stop,
            "iterative deepening finished"
        );
        Ok(result)
    }
}

impl<E> std::fmt::Debug for Minimax<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Minimax")
            .field("tt", &self.tt)
            .field("workers", &self.pool.workers())
            .field("time_ceiling", &self.time_ceiling)
            .finish()
    }
}
