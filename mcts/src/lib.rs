//! AlphaZero-style Monte Carlo Tree Search for chess.
//!
//! The search combines a policy-and-value evaluator with selective tree
//! search. Each iteration runs four phases:
//!
//! 1. **Selection**: descend from the root by the PUCT rule while nodes are
//!    evaluated, fully expanded and non-terminal
//! 2. **Evaluation**: score the stopping node with the network (or a random
//!    rollout when no network is configured)
//! 3. **Expansion**: materialize one untried move of the stopping node as a
//!    fresh child
//! 4. **Backpropagation**: add the value along the parent chain
//!
//! Values are probabilities in `[0, 1]` that White wins, everywhere; the
//! only perspective flip happens inside child selection, where the score is
//! read from the selecting side's point of view.
//!
//! # Usage
//!
//! ```rust,ignore
//! use mcts::{Search, SearchConfig};
//!
//! let mut search = Search::from_fen(
//!     "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
//!     SearchConfig::default(),
//!     None, // rollout mode; pass an OnnxEvaluator to use a network
//! )?;
//! let best = search.best_move()?;
//! search.advance(&best)?; // keep the subtree for the next turn
//! ```

pub mod config;
pub mod encoder;
pub mod evaluator;
pub mod node;
pub mod search;
pub mod session;
pub mod tree;

#[cfg(feature = "onnx")]
pub mod onnx;

pub use config::SearchConfig;
pub use evaluator::{EvalResult, Evaluator, EvaluatorError, UniformEvaluator, ValueConvention};
pub use node::{NodeId, SearchNode};
pub use search::{MctsSearch, MoveStat, SearchError, SearchResult, SearchSummary};
pub use session::{Search, SharedEvaluator};
pub use tree::SearchTree;

#[cfg(feature = "onnx")]
pub use onnx::OnnxEvaluator;
