//! Position evaluation: the policy-and-value interface used by the search.
//!
//! An evaluator maps a position to priors over its legal moves (keyed by
//! UCI string) and a scalar value. In play this is a neural network; tests
//! use [`UniformEvaluator`].

use std::collections::HashMap;
use std::sync::Arc;

use chess_game::{GameAdapter, Player};
use thiserror::Error;

/// Errors from building or invoking an evaluator. Model errors are fatal at
/// construction; per-call inference errors are recovered by the tree, which
/// falls back to a rollout for that node.
#[derive(Debug, Error)]
pub enum EvaluatorError {
    #[error("model error: {0}")]
    Model(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Result of evaluating a position.
///
/// `priors` is defined over the legal moves of the evaluated position and
/// sums to ≈1 after normalization; `value` is in `[0, 1]` from
/// [`Player::One`]'s perspective. Terminal and rollout evaluations carry no
/// priors.
#[derive(Debug, Clone, Default)]
pub struct EvalResult {
    pub priors: HashMap<String, f64>,
    pub value: f64,
}

impl EvalResult {
    /// An evaluation carrying only a value (terminal score or rollout).
    pub fn from_value(value: f64) -> Self {
        Self {
            priors: HashMap::new(),
            value,
        }
    }
}

/// How the model's scalar value head is to be interpreted.
///
/// The conversion to the reference frame happens exactly once, here at the
/// model boundary; the search never flips values per node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueConvention {
    /// Tanh-range output in `[-1, 1]` scored from the side to move. This is
    /// the training-label convention and the default.
    #[default]
    TanhSideToMove,

    /// Probability in `[0, 1]` that `Player::One` wins; passed through.
    ReferenceWinProbability,
}

impl ValueConvention {
    /// Convert a raw value-head output into `[0, 1]` from
    /// [`Player::One`]'s perspective.
    pub fn to_reference(self, raw: f64, side_to_move: Player) -> f64 {
        match self {
            ValueConvention::TanhSideToMove => {
                let p = (raw.clamp(-1.0, 1.0) + 1.0) / 2.0;
                match side_to_move {
                    Player::One => p,
                    Player::Two => 1.0 - p,
                }
            }
            ValueConvention::ReferenceWinProbability => raw.clamp(0.0, 1.0),
        }
    }
}

/// Trait for position evaluators.
pub trait Evaluator<G: GameAdapter> {
    fn evaluate(&self, game: &G, position: &G::Position)
        -> Result<EvalResult, EvaluatorError>;
}

impl<G: GameAdapter, E: Evaluator<G> + ?Sized> Evaluator<G> for Box<E> {
    fn evaluate(
        &self,
        game: &G,
        position: &G::Position,
    ) -> Result<EvalResult, EvaluatorError> {
        (**self).evaluate(game, position)
    }
}

impl<G: GameAdapter, E: Evaluator<G> + ?Sized> Evaluator<G> for Arc<E> {
    fn evaluate(
        &self,
        game: &G,
        position: &G::Position,
    ) -> Result<EvalResult, EvaluatorError> {
        (**self).evaluate(game, position)
    }
}

/// Assigns equal priors to every legal move and a neutral value. Stands in
/// for the network in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformEvaluator;

impl UniformEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl<G: GameAdapter> Evaluator<G> for UniformEvaluator {
    fn evaluate(
        &self,
        game: &G,
        position: &G::Position,
    ) -> Result<EvalResult, EvaluatorError> {
        let moves = game.legal_moves(position);
        if moves.is_empty() {
            return Ok(EvalResult::from_value(0.5));
        }
        let p = 1.0 / moves.len() as f64;
        let priors = moves
            .iter()
            .map(|mv| (game.move_to_uci(mv), p))
            .collect();
        Ok(EvalResult { priors, value: 0.5 })
    }
}
