//! Arena-backed search tree and the four search primitives: expand,
//! evaluate, select, backpropagate, plus the root surgery for tree reuse.
//!
//! Nodes are stored in a contiguous `Vec` and referenced by [`NodeId`].
//! Ownership is strictly parent → child; [`SearchTree::advance`] compacts
//! the arena around the kept child so dropped sibling subtrees are
//! reclaimed immediately.

use std::collections::VecDeque;

use rand_chacha::ChaCha20Rng;
use tracing::warn;

use chess_game::{GameAdapter, Player};

use crate::evaluator::{EvalResult, Evaluator};
use crate::node::{NodeId, SearchNode};

pub struct SearchTree<G: GameAdapter> {
    nodes: Vec<SearchNode<G>>,
    root: NodeId,
}

impl<G: GameAdapter> SearchTree<G> {
    pub fn new(game: &G, position: G::Position) -> Self {
        Self {
            nodes: vec![SearchNode::new_root(game, position)],
            root: NodeId(0),
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &SearchNode<G> {
        &self.nodes[id.0 as usize]
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut SearchNode<G> {
        &mut self.nodes[id.0 as usize]
    }

    /// Total number of nodes in the tree.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn allocate(&mut self, node: SearchNode<G>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Materialize one untried move of `id` as a new child.
    ///
    /// Pops the queue front, applies it to a copy of the node's position
    /// and appends a child with empty statistics. The child is not
    /// evaluated here; selection reaches it on a later iteration.
    pub fn expand(&mut self, game: &G, id: NodeId) -> NodeId {
        let mv = self
            .get_mut(id)
            .untried
            .pop_front()
            .expect("expand called on a fully expanded node");
        let position = game.apply(&self.get(id).position, &mv);
        let child = SearchNode::new_child(game, id, mv, position);
        let child_id = self.allocate(child);
        self.get_mut(id).children.push(child_id);
        child_id
    }

    /// Value of `id` in `Player::One`'s frame, evaluating on first touch.
    ///
    /// Terminal nodes get their exact terminal score and keep returning it.
    /// Non-terminal nodes consult the evaluator when one is configured,
    /// falling back to a random rollout if inference fails (or when running
    /// without a network). The cached evaluation is never overwritten.
    pub fn evaluate<E: Evaluator<G>>(
        &mut self,
        game: &G,
        id: NodeId,
        evaluator: Option<&E>,
        rng: &mut ChaCha20Rng,
    ) -> f64 {
        if let Some(eval) = &self.get(id).evaluation {
            return eval.value;
        }

        let node = self.get(id);
        let result = if node.is_terminal() {
            let outcome = game
                .terminal_outcome(&node.position)
                .expect("terminal node without an outcome");
            EvalResult::from_value(outcome.score())
        } else if let Some(evaluator) = evaluator {
            match evaluator.evaluate(game, &node.position) {
                Ok(result) => result,
                Err(err) => {
                    warn!(error = %err, "evaluation failed, falling back to rollout");
                    EvalResult::from_value(game.rollout(&node.position, rng))
                }
            }
        } else {
            EvalResult::from_value(game.rollout(&node.position, rng))
        };

        let value = result.value;
        self.get_mut(id).evaluation = Some(result);
        value
    }

    /// Pick the most promising child of `id` by the PUCT rule.
    ///
    /// The exploitation term reads the child's mean score from the
    /// perspective of the side to move at `id` (the only place a value is
    /// ever flipped). The exploration term uses the prior this node holds
    /// for the edge when one exists, and plain UCT when it does not
    /// (rollout-evaluated nodes carry no priors at all). Ties keep the
    /// first-enumerated child.
    pub fn select_best_child(&self, game: &G, id: NodeId, cpuct: f64) -> NodeId {
        let node = self.get(id);
        assert!(node.is_evaluated(), "selection from an unevaluated node");
        assert!(!node.children.is_empty(), "selection from a childless node");

        let mover = game.side_to_move(&node.position);
        let parent_visits = node.visits as f64;

        let mut best = node.children[0];
        let mut best_score = f64::NEG_INFINITY;
        for &child_id in &node.children {
            let child = self.get(child_id);
            let child_visits = child.visits as f64;

            let q = if child.visits == 0 {
                0.5
            } else {
                let mean = child.score / child_visits;
                match mover {
                    Player::One => mean,
                    Player::Two => 1.0 - mean,
                }
            };

            let mv = child
                .incoming_move
                .as_ref()
                .expect("non-root node without an incoming move");
            let u = match node.prior(&game.move_to_uci(mv)) {
                Some(p) if p > 0.0 => cpuct * p * parent_visits.sqrt() / (1.0 + child_visits),
                _ => cpuct * ((parent_visits + 1.0).ln() / (1.0 + child_visits)).sqrt(),
            };

            let score = q + u;
            if score > best_score {
                best_score = score;
                best = child_id;
            }
        }
        best
    }

    /// Add a simulation result along the parent chain starting at `from`.
    ///
    /// `value` is in `Player::One`'s frame throughout; no sign flipping
    /// happens here. `new_nodes` is 1 when this iteration expanded a child
    /// under `from` and bumps every subtree size on the path.
    pub fn backpropagate(&mut self, from: NodeId, value: f64, delta_visits: u32, new_nodes: u32) {
        let mut current = from;
        while current.is_some() {
            let node = self.get_mut(current);
            node.score += value;
            node.visits += delta_visits;
            node.subtree_size += new_nodes;
            current = node.parent;
        }
    }

    /// Reroot the tree at the child reached by `mv`, keeping its subtree
    /// and statistics. If the move was never explored, rebuild a fresh
    /// root from the post-move position instead. Returns the new root.
    pub fn advance(&mut self, game: &G, mv: &G::Move) -> NodeId {
        let root = self.get(self.root);
        let chosen = root.children.iter().copied().find(|&child_id| {
            self.get(child_id)
                .incoming_move
                .as_ref()
                .is_some_and(|m| game.move_equals(m, mv))
        });

        match chosen {
            Some(child_id) => self.reroot(child_id),
            None => {
                let position = game.apply(&self.get(self.root).position, mv);
                *self = SearchTree::new(game, position);
                self.root
            }
        }
    }

    /// Compact the arena to the subtree under `new_root`. Everything
    /// outside that subtree is dropped before this returns.
    fn reroot(&mut self, new_root: NodeId) -> NodeId {
        let old = std::mem::take(&mut self.nodes);
        let mut slots: Vec<Option<SearchNode<G>>> = old.into_iter().map(Some).collect();

        let mut root_node = slots[new_root.0 as usize]
            .take()
            .expect("advance target not in arena");
        root_node.parent = NodeId::NONE;
        root_node.incoming_move = None;

        let mut nodes = vec![root_node];
        let mut queue = VecDeque::from([NodeId(0)]);
        while let Some(new_id) = queue.pop_front() {
            let children = std::mem::take(&mut nodes[new_id.0 as usize].children);
            let mut remapped = Vec::with_capacity(children.len());
            for old_child in children {
                let mut child = slots[old_child.0 as usize]
                    .take()
                    .expect("child missing during reroot");
                child.parent = new_id;
                let assigned = NodeId(nodes.len() as u32);
                nodes.push(child);
                remapped.push(assigned);
                queue.push_back(assigned);
            }
            nodes[new_id.0 as usize].children = remapped;
        }

        self.nodes = nodes;
        self.root = NodeId(0);
        self.root
    }
}
