//! Search budget and tuning knobs.

use std::time::Duration;

/// How a simulation reward is credited to the nodes on the selection path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Propagation {
    /// Each node is credited from the perspective of the side that moved
    /// into it, so the sign flips at every level.
    #[default]
    Alternating,
    /// Every node on the path receives the reward unchanged.
    Uniform,
}

impl Propagation {
    /// Value credited to the node a simulation started from, given a reward
    /// measured for that node's side to move.
    #[inline]
    pub fn leaf_credit(self, reward: f64) -> f64 {
        match self {
            Propagation::Alternating => -reward,
            Propagation::Uniform => reward,
        }
    }

    /// Value credited to a node's parent, given the value credited to the node.
    #[inline]
    pub fn parent_credit(self, credit: f64) -> f64 {
        match self {
            Propagation::Alternating => -credit,
            Propagation::Uniform => credit,
        }
    }
}

/// Everything the engine needs to know about how hard to think.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchBudget {
    /// MCTS iterations per move request.
    pub iterations: u32,
    /// Deepest iteration of iterative deepening, both when reconciling the
    /// MCTS choice and for a standalone minimax request.
    pub max_depth: u8,
    /// Per-depth wall-clock ceiling for iterative deepening.
    pub time_ceiling: Duration,
    /// Exploration constant `C` in the UCT formula.
    pub exploration: f64,
    /// Worker threads used for root fan-out.
    pub workers: usize,
    /// Fixed depth of the minimax probe that replaces random rollouts.
    pub probe_depth: u8,
    /// Maximum plies in a random playout.
    pub rollout_ply_cap: u32,
    /// Score leaves with a shallow minimax probe instead of a random playout.
    pub use_minimax_probe: bool,
    /// Reconcile the MCTS choice with a minimax search before answering.
    pub hybrid_select: bool,
    /// Reward credit rule for backpropagation.
    pub propagation: Propagation,
    /// RNG seed for playouts. `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Maximum number of transposition entries kept.
    pub tt_capacity: usize,
    /// Generations an entry survives after its last write.
    pub tt_retain_generations: u32,
}

impl SearchBudget {
    /// Default MCTS iterations per request.
    pub const DEFAULT_ITERATIONS: u32 = 1000;
    /// Default iterative-deepening depth.
    pub const DEFAULT_MAX_DEPTH: u8 = 3;
    /// Default UCT exploration constant.
    pub const DEFAULT_EXPLORATION: f64 = 2.0;
    /// Default worker count.
    pub const DEFAULT_WORKERS: usize = 4;
    /// Default transposition capacity in entries.
    pub const DEFAULT_TT_CAPACITY: usize = 1 << 20;

    /// Fix the RNG seed, for reproducible playouts.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the worker count (clamped to at least one).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }
}

impl Default for SearchBudget {
    fn default() -> Self {
        Self {
            iterations: Self::DEFAULT_ITERATIONS,
            max_depth: Self::DEFAULT_MAX_DEPTH,
            time_ceiling: Duration::from_secs(5),
            exploration: Self::DEFAULT_EXPLORATION,
            workers: Self::DEFAULT_WORKERS,
            probe_depth: 1,
            rollout_ply_cap: 50,
            use_minimax_probe: true,
            hybrid_select: true,
            propagation: Propagation::default(),
            seed: None,
            tt_capacity: Self::DEFAULT_TT_CAPACITY,
            tt_retain_generations: 2,
        }
    }
}
