//! Search tree node representation.
//!
//! Each node owns the position reached by its incoming move, the queue of
//! moves not yet materialized as children, and the visit statistics the
//! PUCT rule reads. Nodes live in an arena and refer to each other by
//! [`NodeId`]; the parent link is relational only.

use std::collections::VecDeque;

use chess_game::GameAdapter;

use crate::evaluator::EvalResult;

/// Index into the node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    pub fn is_some(self) -> bool {
        !self.is_none()
    }
}

/// A node in the search tree.
#[derive(Debug)]
pub struct SearchNode<G: GameAdapter> {
    /// Parent node index (`NONE` for the root).
    pub parent: NodeId,

    /// Move that produced this position from the parent (`None` at root).
    pub incoming_move: Option<G::Move>,

    /// Position owned by this node.
    pub position: G::Position,

    /// Legal moves not yet materialized as children, expanded FIFO.
    pub untried: VecDeque<G::Move>,

    /// Child node indices, in expansion order.
    pub children: Vec<NodeId>,

    /// Simulations that passed through this node.
    pub visits: u32,

    /// Accumulated value over those visits, always in `Player::One`'s
    /// frame; `score / visits` is the reference-side winrate estimate.
    pub score: f64,

    /// Nodes in this subtree, including self.
    pub subtree_size: u32,

    /// Cached evaluation, set exactly once.
    pub evaluation: Option<EvalResult>,
}

impl<G: GameAdapter> SearchNode<G> {
    pub fn new_root(game: &G, position: G::Position) -> Self {
        Self::with_parent(game, NodeId::NONE, None, position)
    }

    pub fn new_child(
        game: &G,
        parent: NodeId,
        incoming_move: G::Move,
        position: G::Position,
    ) -> Self {
        Self::with_parent(game, parent, Some(incoming_move), position)
    }

    fn with_parent(
        game: &G,
        parent: NodeId,
        incoming_move: Option<G::Move>,
        position: G::Position,
    ) -> Self {
        let mut untried: VecDeque<G::Move> = game.legal_moves(&position).into();
        // Drawn positions can still have legal moves (bare kings); a
        // terminal node must never expand.
        if !untried.is_empty() && game.is_terminal(&position) {
            untried.clear();
        }
        Self {
            parent,
            incoming_move,
            position,
            untried,
            children: Vec::new(),
            visits: 0,
            score: 0.0,
            subtree_size: 1,
            evaluation: None,
        }
    }

    /// Terminal positions have neither untried moves nor children.
    pub fn is_terminal(&self) -> bool {
        self.untried.is_empty() && self.children.is_empty()
    }

    pub fn is_fully_expanded(&self) -> bool {
        self.untried.is_empty()
    }

    pub fn is_evaluated(&self) -> bool {
        self.evaluation.is_some()
    }

    /// Mean score in `Player::One`'s frame; 0.5 when unvisited.
    pub fn mean_score(&self) -> f64 {
        if self.visits == 0 {
            0.5
        } else {
            self.score / self.visits as f64
        }
    }

    /// Prior this node assigns to the edge `uci`, if it was evaluated with
    /// a policy. Priors live on the node whose position the move is legal
    /// in, not on the child.
    pub fn prior(&self, uci: &str) -> Option<f64> {
        self.evaluation
            .as_ref()
            .and_then(|eval| eval.priors.get(uci).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_game::ChessGame;

    #[test]
    fn node_id_sentinel() {
        assert!(NodeId::NONE.is_none());
        assert!(!NodeId::NONE.is_some());
        assert!(NodeId(0).is_some());
    }

    #[test]
    fn fresh_root_has_empty_statistics() {
        let game = ChessGame::new();
        let root = SearchNode::new_root(&game, ChessGame::starting_position());

        assert!(root.parent.is_none());
        assert!(root.incoming_move.is_none());
        assert_eq!(root.visits, 0);
        assert_eq!(root.score, 0.0);
        assert_eq!(root.subtree_size, 1);
        assert_eq!(root.untried.len(), 20);
        assert!(!root.is_terminal());
        assert!(!root.is_fully_expanded());
        assert!(!root.is_evaluated());
    }

    #[test]
    fn terminal_positions_seed_no_untried_moves() {
        let game = ChessGame::new();
        let stalemate = ChessGame::position_from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        let node = SearchNode::new_root(&game, stalemate);
        assert!(node.is_terminal());
        assert!(node.is_fully_expanded());

        // Bare kings: moves exist, but the position is a dead draw.
        let bare = ChessGame::position_from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let node = SearchNode::new_root(&game, bare);
        assert!(node.is_terminal());
    }

    #[test]
    fn mean_score_is_neutral_when_unvisited() {
        let game = ChessGame::new();
        let mut node = SearchNode::new_root(&game, ChessGame::starting_position());
        assert_eq!(node.mean_score(), 0.5);

        node.visits = 4;
        node.score = 3.0;
        assert_eq!(node.mean_score(), 0.75);
    }

    #[test]
    fn prior_lookup_requires_an_evaluation() {
        let game = ChessGame::new();
        let mut node = SearchNode::new_root(&game, ChessGame::starting_position());
        assert_eq!(node.prior("e2e4"), None);

        let mut eval = EvalResult::from_value(0.5);
        eval.priors.insert("e2e4".to_string(), 0.9);
        node.evaluation = Some(eval);
        assert_eq!(node.prior("e2e4"), Some(0.9));
        assert_eq!(node.prior("d2d4"), None);
    }
}
