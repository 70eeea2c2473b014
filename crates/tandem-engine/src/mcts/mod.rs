//! Monte Carlo tree search with UCT selection.
//!
//! One iteration walks the tree by maximum UCT score, expands the leaf it
//! lands on, scores one of the new children (random playout or a shallow
//! minimax probe) and credits the result to every node on the way back up.

pub mod rollout;
pub mod tree;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use tandem_core::GameState;
use tracing::debug;

use crate::config::{Propagation, SearchBudget};
use crate::error::SearchError;
use crate::eval::Evaluator;
use crate::search::Minimax;
use crate::search::control::SearchControl;
use crate::search::negamax::INF;
use tree::{Node, NodeId, SearchTree};

/// Whether `a` is preferred over `b` as the move to play.
///
/// Visited beats unvisited; then higher win ratio; then more visits.
pub fn ranks_above<S: GameState>(a: &Node<S>, b: &Node<S>) -> bool {
    match (a.win_ratio(), b.win_ratio()) {
        (Some(ra), Some(rb)) => ra > rb || (ra == rb && a.visits() > b.visits()),
        (Some(_), None) => true,
        (None, _) => false,
    }
}

/// UCT search driver. Owns its RNG; the tree is passed in.
#[derive(Debug, Clone)]
pub struct Mcts {
    exploration: f64,
    probe_depth: u8,
    rollout_ply_cap: u32,
    propagation: Propagation,
    rng: StdRng,
}

impl Mcts {
    pub fn new(budget: &SearchBudget) -> Self {
        let rng = match budget.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            exploration: budget.exploration,
            probe_depth: budget.probe_depth,
            rollout_ply_cap: budget.rollout_ply_cap,
            propagation: budget.propagation,
            rng,
        }
    }

    pub fn propagation(&self) -> Propagation {
        self.propagation
    }

    pub fn exploration(&self) -> f64 {
        self.exploration
    }

    /// Descend from `from` by maximum UCT score until a childless node.
    ///
    /// Ties go to the earliest child.
    pub fn select_leaf<S: GameState>(&self, tree: &SearchTree<S>, from: NodeId) -> NodeId {
        let mut current = from;
        loop {
            let mut best: Option<(NodeId, f64)> = None;
            for &child in tree.get(current).children() {
                let score = tree.uct(child, self.exploration);
                if best.is_none_or(|(_, top)| score > top) {
                    best = Some((child, score));
                }
            }
            match best {
                Some((child, _)) => current = child,
                None => return current,
            }
        }
    }

    /// Expand `leaf` and return one of its new children at random, or
    /// `leaf` itself when it has none.
    pub fn expand<S: GameState>(&mut self, tree: &mut SearchTree<S>, leaf: NodeId) -> NodeId {
        tree.expand(leaf)
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(leaf)
    }

    /// Score `state` for its side to move.
    ///
    /// With `use_probe` this is a fixed-depth alpha-beta search in
    /// centipawns; otherwise a random playout.
    pub fn simulate<S, E>(&mut self, state: &S, minimax: &Minimax<E>, use_probe: bool) -> f64
    where
        S: GameState,
        E: Evaluator<S>,
    {
        if use_probe {
            minimax.evaluate_depth(state, self.probe_depth, -INF, INF, true) as f64
        } else {
            rollout::random_playout(
                state,
                self.rollout_ply_cap,
                minimax.evaluator(),
                &mut self.rng,
            )
        }
    }

    /// Credit `reward` (measured for the side to move at `node`) to `node`
    /// and all of its ancestors.
    pub fn backpropagate<S: GameState>(&self, tree: &mut SearchTree<S>, node: NodeId, reward: f64) {
        self.credit_path(tree, node, self.propagation.leaf_credit(reward));
    }

    /// Record `credit` at `node` and walk it up to the root under the
    /// propagation rule.
    pub fn credit_path<S: GameState>(&self, tree: &mut SearchTree<S>, node: NodeId, credit: f64) {
        let mut credit = credit;
        let mut current = Some(node);
        while let Some(id) = current {
            tree.record(id, credit);
            credit = self.propagation.parent_credit(credit);
            current = tree.get(id).parent();
        }
    }

    /// Run up to `iterations` select/expand/simulate/backpropagate rounds
    /// from the root, stopping early when `control` is stopped.
    ///
    /// Returns the number of completed iterations.
    pub fn run<S, E>(
        &mut self,
        tree: &mut SearchTree<S>,
        iterations: u32,
        minimax: &Minimax<E>,
        use_probe: bool,
        control: &SearchControl,
    ) -> u32
    where
        S: GameState,
        E: Evaluator<S>,
    {
        let mut done = 0;
        while done < iterations && !control.is_stopped() {
            let leaf = self.select_leaf(tree, SearchTree::<S>::ROOT);
            let node = self.expand(tree, leaf);
            let reward = self.simulate(tree.get(node).state(), minimax, use_probe);
            self.backpropagate(tree, node, reward);
            done += 1;
        }
        done
    }

    /// Build a tree for `root`, expand the root and run the iterations.
    pub fn search<S, E>(
        &mut self,
        root: &S,
        iterations: u32,
        minimax: &Minimax<E>,
        use_probe: bool,
        control: &SearchControl,
    ) -> Result<SearchTree<S>, SearchError>
    where
        S: GameState,
        E: Evaluator<S>,
    {
        let mut tree = SearchTree::new(root.clone());
        if tree.expand(SearchTree::<S>::ROOT).is_empty() {
            return Err(SearchError::NoLegalMoves);
        }

        let done = self.run(&mut tree, iterations, minimax, use_probe, control);
        debug!(
            iterations = done,
            nodes = tree.node_count(),
            root_visits = tree.root().visits(),
            use_probe,
            "mcts finished"
        );
        Ok(tree)
    }

    /// The child of `parent` to play, by [`ranks_above`]. Ties go to the
    /// earliest child.
    pub fn best_child<S: GameState>(
        tree: &SearchTree<S>,
        parent: NodeId,
    ) -> Result<NodeId, SearchError> {
        let mut best: Option<NodeId> = None;
        for &child in tree.get(parent).children() {
            if best.is_none_or(|top| ranks_above(tree.get(child), tree.get(top))) {
                best = Some(child);
            }
        }
        best.ok_or(SearchError::EmptyTree)
    }

    /// Pure MCTS move choice for `root`.
    pub fn select_move<S, E>(
        &mut self,
        root: &S,
        iterations: u32,
        minimax: &Minimax<E>,
        use_probe: bool,
    ) -> Result<S::Move, SearchError>
    where
        S: GameState,
        E: Evaluator<S>,
    {
        let tree = self.search(root, iterations, minimax, use_probe, &SearchControl::default())?;
        let best = Self::best_child(&tree, SearchTree::<S>::ROOT)?;
        tree.get(best).mv().cloned().ok_or(SearchError::EmptyTree)
    }
}
