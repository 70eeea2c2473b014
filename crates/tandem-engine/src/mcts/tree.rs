//! Arena-backed search tree.
//!
//! Nodes live in one `Vec` and refer to each other by [`NodeId`]. A node
//! owns its children through the id list; the parent link is a plain id.

use tandem_core::GameState;

/// Index of a node in its [`SearchTree`].
pub type NodeId = u32;

/// UCT score of a child.
///
/// Unvisited children score `+inf` so each is tried once before any is
/// revisited. Otherwise `wins / visits + sqrt(c * ln(parent_visits) / visits)`.
pub fn uct_score(wins: f64, visits: u32, parent_visits: u32, exploration: f64) -> f64 {
    if visits == 0 {
        return f64::INFINITY;
    }
    let n = visits as f64;
    let parent = (parent_visits.max(1)) as f64;
    wins / n + (exploration * parent.ln() / n).sqrt()
}

/// One position in the tree with its visit statistics.
#[derive(Debug, Clone)]
pub struct Node<S: GameState> {
    state: S,
    mv: Option<S::Move>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    expanded: bool,
    visits: u32,
    wins: f64,
}

impl<S: GameState> Node<S> {
    fn new(state: S, mv: Option<S::Move>, parent: Option<NodeId>) -> Self {
        Self {
            state,
            mv,
            parent,
            children: Vec::new(),
            expanded: false,
            visits: 0,
            wins: 0.0,
        }
    }

    /// Position at this node.
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Move that led here from the parent; `None` at the root.
    pub fn mv(&self) -> Option<&S::Move> {
        self.mv.as_ref()
    }

    /// Id of the parent node; `None` at the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child ids, in the order they were added.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Whether children were materialized (a terminal node is expanded with none).
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    /// Number of rewards credited to this node.
    pub fn visits(&self) -> u32 {
        self.visits
    }

    /// Accumulated reward.
    pub fn wins(&self) -> f64 {
        self.wins
    }

    /// `wins / visits`, or `None` for an unvisited node.
    pub fn win_ratio(&self) -> Option<f64> {
        (self.visits > 0).then(|| self.wins / self.visits as f64)
    }
}

/// A tree of positions rooted at the position being decided.
#[derive(Debug, Clone)]
pub struct SearchTree<S: GameState> {
    nodes: Vec<Node<S>>,
}

impl<S: GameState> SearchTree<S> {
    /// Id of the root node.
    pub const ROOT: NodeId = 0;

    /// A single-node tree for `root`.
    pub fn new(root: S) -> Self {
        Self {
            nodes: vec![Node::new(root, None, None)],
        }
    }

    /// Nodes in the tree, root included, so never zero.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The root node.
    pub fn root(&self) -> &Node<S> {
        self.get(Self::ROOT)
    }

    /// The node with id `id`. Panics if `id` was not issued by this tree.
    pub fn get(&self, id: NodeId) -> &Node<S> {
        &self.nodes[id as usize]
    }

    fn get_mut(&mut self, id: NodeId) -> &mut Node<S> {
        &mut self.nodes[id as usize]
    }

    /// Append a child of `parent` reached by `mv`. `mv` must be legal there.
    pub fn add_child(&mut self, parent: NodeId, mv: S::Move) -> NodeId {
        let state = self.get(parent).state.play(&mv);
        let id = self.nodes.len() as NodeId;
        self.nodes.push(Node::new(state, Some(mv), Some(parent)));
        self.get_mut(parent).children.push(id);
        id
    }

    /// Materialize one child per legal move, all at once.
    ///
    /// Terminal positions get no children. Calling this on an already
    /// expanded node does nothing. Returns the node's children.
    pub fn expand(&mut self, id: NodeId) -> &[NodeId] {
        if !self.get(id).expanded {
            let node = self.get(id);
            let moves = if node.state.is_terminal() {
                Vec::new()
            } else {
                node.state.legal_moves()
            };
            for mv in moves {
                self.add_child(id, mv);
            }
            self.get_mut(id).expanded = true;
        }
        &self.get(id).children
    }

    /// Child of `parent` reached by `mv`, if one exists.
    pub fn child_with_move(&self, parent: NodeId, mv: &S::Move) -> Option<NodeId> {
        self.get(parent)
            .children
            .iter()
            .copied()
            .find(|&child| self.get(child).mv.as_ref() == Some(mv))
    }

    /// Record one visit worth `reward` at `id`.
    pub fn record(&mut self, id: NodeId, reward: f64) {
        let node = self.get_mut(id);
        node.visits += 1;
        node.wins += reward;
    }

    /// UCT score of `child` as seen from its parent.
    pub fn uct(&self, child: NodeId, exploration: f64) -> f64 {
        let node = self.get(child);
        let parent_visits = node.parent.map_or(0, |p| self.get(p).visits);
        uct_score(node.wins, node.visits, parent_visits, exploration)
    }
}
