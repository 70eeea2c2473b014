//! Reconciling the MCTS choice with a minimax search over the same moves.

use tandem_core::GameState;
use tracing::debug;

use crate::error::SearchError;
use crate::eval::Evaluator;
use crate::mcts::tree::{NodeId, SearchTree};
use crate::mcts::{Mcts, ranks_above};
use crate::search::Minimax;
use crate::search::control::SearchControl;

/// Which search the final move came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceSource {
    /// MCTS's own best child was kept.
    Mcts,
    /// The minimax move, already present in the tree, ranked higher.
    Minimax,
    /// The minimax move had no node in the tree and was grafted in.
    Grafted,
}

/// Outcome of a reconciliation.
#[derive(Debug, Clone)]
pub struct HybridChoice<M> {
    /// Move to play.
    pub mv: M,
    /// Where it came from.
    pub source: ChoiceSource,
    /// Minimax score of the minimax move, for the side to move at the parent.
    pub minimax_score: i32,
    /// Deepest iteration the minimax score comes from.
    pub depth: u8,
}

/// Cross-checks MCTS against iterative deepening.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HybridSelector {
    depth: u8,
}

impl HybridSelector {
    /// A selector running iterative deepening up to `depth`.
    pub fn new(depth: u8) -> Self {
        Self { depth }
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Reconcile `candidate` (normally MCTS's best child) with minimax.
    ///
    /// Minimax runs over the moves of `candidate`'s siblings (the parent's
    /// children). Its score is fed back into the tree, then the better of
    /// the two nodes by [`ranks_above`] is returned, with ties going to
    /// `candidate`.
    pub fn reconcile<S, E>(
        &self,
        tree: &mut SearchTree<S>,
        candidate: NodeId,
        mcts: &Mcts,
        minimax: &Minimax<E>,
        control: &SearchControl,
    ) -> Result<HybridChoice<S::Move>, SearchError>
    where
        S: GameState,
        E: Evaluator<S>,
    {
        let parent = tree.get(candidate).parent().unwrap_or(SearchTree::<S>::ROOT);
        let siblings: Vec<S::Move> = tree
            .get(parent)
            .children()
            .iter()
            .filter_map(|&id| tree.get(id).mv().cloned())
            .collect();
        self.reconcile_over(tree, candidate, &siblings, mcts, minimax, control)
    }

    /// [`reconcile`](Self::reconcile) with minimax restricted to `moves`,
    /// which must be legal at `candidate`'s parent.
    ///
    /// A minimax move with no node under the parent is grafted in as a new
    /// child, credited, and returned directly.
    pub fn reconcile_over<S, E>(
        &self,
        tree: &mut SearchTree<S>,
        candidate: NodeId,
        moves: &[S::Move],
        mcts: &Mcts,
        minimax: &Minimax<E>,
        control: &SearchControl,
    ) -> Result<HybridChoice<S::Move>, SearchError>
    where
        S: GameState,
        E: Evaluator<S>,
    {
        let parent = tree.get(candidate).parent().unwrap_or(SearchTree::<S>::ROOT);
        let result = minimax.iddfs_over(
            tree.get(parent).state(),
            moves,
            self.depth,
            true,
            control,
            |_| {},
        )?;
        // A child's statistics are kept for the side that moved into it,
        // which is who minimax scored.
        let credit = result.score as f64;

        match tree.child_with_move(parent, &result.best_move) {
            Some(mm_child) => {
                mcts.credit_path(tree, mm_child, credit);
                let (chosen, source) = if ranks_above(tree.get(mm_child), tree.get(candidate)) {
                    (mm_child, ChoiceSource::Minimax)
                } else {
                    (candidate, ChoiceSource::Mcts)
                };
                let mv = tree.get(chosen).mv().cloned().ok_or(SearchError::EmptyTree)?;
                debug!(?source, score = result.score, depth = result.depth, "hybrid choice");
                Ok(HybridChoice {
                    mv,
                    source,
                    minimax_score: result.score,
                    depth: result.depth,
                })
            }
            None => {
                let grafted = tree.add_child(parent, result.best_move.clone());
                mcts.credit_path(tree, grafted, credit);
                debug!(score = result.score, "minimax move grafted into tree");
                Ok(HybridChoice {
                    mv: result.best_move,
                    source: ChoiceSource::Grafted,
                    minimax_score: result.score,
                    depth: result.depth,
                })
            }
        }
    }

    /// Reconcile MCTS's best root child.
    pub fn select<S, E>(
        &self,
        tree: &mut SearchTree<S>,
        mcts: &Mcts,
        minimax: &Minimax<E>,
        control: &SearchControl,
    ) -> Result<HybridChoice<S::Move>, SearchError>
    where
        S: GameState,
        E: Evaluator<S>,
    {
        let candidate = Mcts::best_child(tree, SearchTree::<S>::ROOT)?;
        self.reconcile(tree, candidate, mcts, minimax, control)
    }
}

impl Default for HybridSelector {
    fn default() -> Self {
        Self::new(3)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::SearchBudget;
    use crate::eval::PieceSquareEval;
    use crate::search::tt::TranspositionTable;
    use tandem_core::{from_fen, move_to_uci, parse_uci_move};

    const SCHOLARS_MATE_FEN: &str =
        "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4";

    fn parts() -> (Mcts, Minimax<PieceSquareEval>) {
        let budget = SearchBudget::default().with_seed(3);
        let minimax = Minimax::new(
            Arc::new(TranspositionTable::default()),
            Arc::new(PieceSquareEval),
        )
        .with_time_ceiling(std::time::Duration::from_secs(600));
        (Mcts::new(&budget), minimax)
    }

    #[test]
    fn minimax_overrides_unvisited_candidate() {
        let (mcts, minimax) = parts();
        let pos = from_fen(SCHOLARS_MATE_FEN).unwrap();
        let quiet = parse_uci_move(&pos, "a2a3").unwrap();
        let mut tree = SearchTree::new(pos);
        tree.expand(0);
        let candidate = tree.child_with_move(0, &quiet).unwrap();

        // Nothing visited yet, so the credited mate outranks the candidate.
        let choice = HybridSelector::new(1)
            .reconcile(&mut tree, candidate, &mcts, &minimax, &SearchControl::default())
            .unwrap();
        assert_eq!(move_to_uci(&choice.mv), "h5f7");
        assert_eq!(choice.source, ChoiceSource::Minimax);
        assert!(choice.minimax_score > 28_000);

        let mate = tree.child_with_move(0, &choice.mv).unwrap();
        assert_eq!(tree.get(mate).visits(), 1);
        assert!(tree.get(mate).wins() > 28_000.0);
    }

    #[test]
    fn agreement_keeps_candidate() {
        let (mcts, minimax) = parts();
        let pos = from_fen(SCHOLARS_MATE_FEN).unwrap();
        let mut tree = SearchTree::new(pos);
        tree.expand(0);
        let mv = parse_uci_move(tree.root().state(), "h5f7").unwrap();
        let mate = tree.child_with_move(0, &mv).unwrap();

        let choice = HybridSelector::new(1)
            .reconcile(&mut tree, mate, &mcts, &minimax, &SearchControl::default())
            .unwrap();
        assert_eq!(choice.mv, mv);
        assert_eq!(choice.source, ChoiceSource::Mcts);
    }

    #[test]
    fn missing_minimax_move_is_grafted() {
        let (mcts, minimax) = parts();
        let pos = from_fen(SCHOLARS_MATE_FEN).unwrap();
        let legal = pos.legal_moves();
        let quiet = parse_uci_move(&pos, "a2a3").unwrap();
        let other = parse_uci_move(&pos, "h2h3").unwrap();

        // The tree only knows two quiet moves; the mate is missing.
        let mut tree = SearchTree::new(pos);
        let a3 = tree.add_child(0, quiet);
        tree.add_child(0, other);

        let choice = HybridSelector::new(1)
            .reconcile_over(&mut tree, a3, &legal, &mcts, &minimax, &SearchControl::default())
            .unwrap();
        assert_eq!(move_to_uci(&choice.mv), "h5f7");
        assert_eq!(choice.source, ChoiceSource::Grafted);
        assert_eq!(tree.root().children().len(), 3);

        let grafted = tree.child_with_move(0, &choice.mv).unwrap();
        assert_eq!(tree.get(grafted).visits(), 1);
        assert_eq!(tree.root().visits(), 1);
    }

    #[test]
    fn sibling_search_never_grafts() {
        let (mcts, minimax) = parts();
        let pos = from_fen(SCHOLARS_MATE_FEN).unwrap();
        let quiet = parse_uci_move(&pos, "a2a3").unwrap();
        let other = parse_uci_move(&pos, "h2h3").unwrap();

        let mut tree = SearchTree::new(pos);
        let a3 = tree.add_child(0, quiet);
        tree.add_child(0, other);

        let choice = HybridSelector::new(1)
            .reconcile(&mut tree, a3, &mcts, &minimax, &SearchControl::default())
            .unwrap();
        assert_ne!(choice.source, ChoiceSource::Grafted);
        assert_eq!(tree.root().children().len(), 2);
    }
}
