//! The search driver: runs select/evaluate/expand/backpropagate iterations
//! under iteration and wall-clock budgets, then picks the most-visited
//! root move.

use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use thiserror::Error;
use tracing::{debug, trace};

use chess_game::{GameAdapter, Player};

use crate::config::SearchConfig;
use crate::evaluator::{Evaluator, EvaluatorError};
use crate::node::NodeId;
use crate::tree::SearchTree;

/// Errors that can occur building or running a search.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid FEN: {0}")]
    InvalidFen(String),

    #[error("no legal moves in this position")]
    NoLegalMoves,

    #[error("move {0:?} is not legal in the current position")]
    IllegalMove(String),

    #[error("evaluator error: {0}")]
    Evaluator(#[from] EvaluatorError),
}

/// Outcome of one search: the chosen move plus a debug summary.
#[derive(Debug, Clone)]
pub struct SearchResult<M> {
    pub best_move: M,
    pub uci: String,
    pub summary: SearchSummary,
}

/// Per-search diagnostics.
#[derive(Debug, Clone)]
pub struct SearchSummary {
    pub iterations: u32,
    pub elapsed: Duration,
    pub tree_size: usize,
    pub root_visits: u32,
    /// Top root children by visits, with Q from the root mover's
    /// perspective and the root prior when one exists.
    pub top_moves: Vec<MoveStat>,
}

#[derive(Debug, Clone)]
pub struct MoveStat {
    pub uci: String,
    pub visits: u32,
    pub q: f64,
    pub prior: Option<f64>,
}

/// How many root children the summary reports.
const SUMMARY_TOP_K: usize = 5;

/// Monte Carlo tree search over a [`GameAdapter`].
///
/// Owns the tree for one game; [`advance`](Self::advance) reuses the
/// relevant subtree when the game moves on.
pub struct MctsSearch<G: GameAdapter, E: Evaluator<G>> {
    game: G,
    tree: SearchTree<G>,
    evaluator: Option<E>,
    config: SearchConfig,
    rng: ChaCha20Rng,
}

impl<G: GameAdapter, E: Evaluator<G>> MctsSearch<G, E> {
    pub fn new(
        game: G,
        position: G::Position,
        evaluator: Option<E>,
        config: SearchConfig,
    ) -> Result<Self, SearchError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => ChaCha20Rng::from_entropy(),
        };
        let tree = SearchTree::new(&game, position);
        Ok(Self {
            game,
            tree,
            evaluator,
            config,
            rng,
        })
    }

    pub fn tree(&self) -> &SearchTree<G> {
        &self.tree
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    /// Run the budgeted iteration loop and pick the best root move.
    ///
    /// Both budgets are soft: they are checked between iterations, and an
    /// in-progress iteration always completes. The final choice is the
    /// most-visited root child, ties broken by Q and then by enumeration
    /// order.
    pub fn run(&mut self) -> Result<SearchResult<G::Move>, SearchError> {
        let start = Instant::now();

        if self.tree.get(self.tree.root()).is_terminal() {
            return Err(SearchError::NoLegalMoves);
        }

        let mut iterations = 0u32;
        while iterations < self.config.max_iterations && start.elapsed() < self.config.max_time {
            self.simulate();
            iterations += 1;
        }

        let best = self.best_child().ok_or(SearchError::NoLegalMoves)?;
        let best_node = self.tree.get(best);
        let best_move = best_node
            .incoming_move
            .clone()
            .expect("root child without an incoming move");
        let uci = self.game.move_to_uci(&best_move);

        let summary = self.summarize(iterations, start.elapsed());
        debug!(
            best = %uci,
            iterations = summary.iterations,
            tree_size = summary.tree_size,
            root_visits = summary.root_visits,
            "search complete"
        );

        Ok(SearchResult {
            best_move,
            uci,
            summary,
        })
    }

    /// One iteration: PUCT descent, evaluation, one-child expansion,
    /// backpropagation.
    fn simulate(&mut self) {
        // Selection: descend while nodes are evaluated, fully expanded and
        // non-terminal. The stop node is the iteration's pivot.
        let mut node = self.tree.root();
        loop {
            let current = self.tree.get(node);
            if current.is_evaluated() && current.is_fully_expanded() && !current.is_terminal() {
                node = self.tree.select_best_child(&self.game, node, self.config.cpuct);
            } else {
                break;
            }
        }

        // Evaluation: fresh for a first touch, cached otherwise (terminal
        // nodes keep returning their fixed score).
        let value = self
            .tree
            .evaluate(&self.game, node, self.evaluator.as_ref(), &mut self.rng);

        // Expansion: materialize one child; it is evaluated only when
        // selection reaches it on a later iteration.
        let stop = self.tree.get(node);
        let new_nodes = if !stop.is_terminal() && !stop.is_fully_expanded() {
            self.tree.expand(&self.game, node);
            1
        } else {
            0
        };

        // Backpropagation starts at the evaluated node, not the new child.
        self.tree.backpropagate(node, value, 1, new_nodes);

        trace!(node = node.0, value, new_nodes, "iteration complete");
    }

    /// Most-visited root child; ties by Q from the root mover's
    /// perspective, then by enumeration order.
    fn best_child(&self) -> Option<NodeId> {
        let root = self.tree.get(self.tree.root());
        let mover = self.game.side_to_move(&root.position);

        let mut best: Option<(NodeId, u32, f64)> = None;
        for &child_id in &root.children {
            let child = self.tree.get(child_id);
            let q = self.mover_q(mover, child_id);
            match best {
                Some((_, visits, best_q))
                    if child.visits < visits || (child.visits == visits && q <= best_q) => {}
                _ => best = Some((child_id, child.visits, q)),
            }
        }
        best.map(|(id, _, _)| id)
    }

    /// Child mean score seen from `mover`'s side; neutral when unvisited.
    fn mover_q(&self, mover: Player, child_id: NodeId) -> f64 {
        let child = self.tree.get(child_id);
        if child.visits == 0 {
            return 0.5;
        }
        let mean = child.score / child.visits as f64;
        match mover {
            Player::One => mean,
            Player::Two => 1.0 - mean,
        }
    }

    fn summarize(&self, iterations: u32, elapsed: Duration) -> SearchSummary {
        let root = self.tree.get(self.tree.root());
        let mover = self.game.side_to_move(&root.position);

        let mut stats: Vec<MoveStat> = root
            .children
            .iter()
            .map(|&child_id| {
                let child = self.tree.get(child_id);
                let mv = child
                    .incoming_move
                    .as_ref()
                    .expect("root child without an incoming move");
                let uci = self.game.move_to_uci(mv);
                MoveStat {
                    prior: root.prior(&uci),
                    q: self.mover_q(mover, child_id),
                    visits: child.visits,
                    uci,
                }
            })
            .collect();
        stats.sort_by(|a, b| b.visits.cmp(&a.visits));
        stats.truncate(SUMMARY_TOP_K);

        SearchSummary {
            iterations,
            elapsed,
            tree_size: self.tree.len(),
            root_visits: root.visits,
            top_moves: stats,
        }
    }

    /// Advance the tree by an externally observed move (tree reuse). The
    /// kept subtree retains its statistics; an unexplored move rebuilds a
    /// fresh root.
    pub fn advance(&mut self, mv: &G::Move) {
        self.tree.advance(&self.game, mv);
    }

    /// [`advance`](Self::advance) by UCI string, validating it against the
    /// legal moves of the current root position.
    pub fn advance_uci(&mut self, uci: &str) -> Result<(), SearchError> {
        let root_position = &self.tree.get(self.tree.root()).position;
        let mv = self
            .game
            .legal_moves(root_position)
            .into_iter()
            .find(|m| self.game.move_to_uci(m) == uci)
            .ok_or_else(|| SearchError::IllegalMove(uci.to_string()))?;
        self.tree.advance(&self.game, &mv);
        Ok(())
    }
}
