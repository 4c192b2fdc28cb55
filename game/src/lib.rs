//! Game abstraction consumed by the search kernel.
//!
//! The search never talks to a rules library directly; it goes through the
//! [`GameAdapter`] trait, which presents positions and moves as opaque
//! associated types. The chess implementation over `shakmaty` lives in
//! [`chess`].
//!
//! All value scalars produced by this crate (terminal scores, rollout
//! results) are expressed from [`Player::One`]'s perspective, the fixed
//! reference frame shared with the search and the evaluator.

pub mod chess;

pub use chess::{ChessGame, GameError};

use rand_chacha::ChaCha20Rng;

/// The two players of a zero-sum, perfect-information game.
///
/// `Player::One` is the fixed reference side: every value scalar in the
/// engine is the estimated probability that `Player::One` wins. For chess,
/// `Player::One` is White.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Player {
    One,
    Two,
}

impl Player {
    pub fn other(self) -> Player {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }
}

/// Result of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win(Player),
    Draw,
}

impl Outcome {
    /// Score in `[0, 1]` from `Player::One`'s perspective.
    pub fn score(self) -> f64 {
        match self {
            Outcome::Win(Player::One) => 1.0,
            Outcome::Win(Player::Two) => 0.0,
            Outcome::Draw => 0.5,
        }
    }
}

/// Rules interface for a two-player, perfect-information, zero-sum game.
///
/// Implementations must be deterministic: for a given position,
/// `legal_moves` always enumerates the same moves in the same order. That
/// order fixes the expansion order of the search tree.
///
/// All operations are total for valid inputs; applying an illegal move is a
/// caller bug, not a runtime condition.
pub trait GameAdapter {
    type Position: Clone + std::fmt::Debug;
    type Move: Clone + PartialEq + std::fmt::Debug;

    /// Enumerate the legal moves of `pos` in a deterministic order.
    fn legal_moves(&self, pos: &Self::Position) -> Vec<Self::Move>;

    /// Apply `mv` to a copy of `pos`; the input is not mutated.
    fn apply(&self, pos: &Self::Position, mv: &Self::Move) -> Self::Position;

    /// Whether the game is over in `pos`.
    fn is_terminal(&self, pos: &Self::Position) -> bool;

    /// The game result, defined only when `pos` is terminal.
    fn terminal_outcome(&self, pos: &Self::Position) -> Option<Outcome>;

    /// Which player moves next in `pos`.
    fn side_to_move(&self, pos: &Self::Position) -> Player;

    /// Play bounded random moves from `pos` and score the end state in
    /// `[0, 1]` from `Player::One`'s perspective. Used when no evaluator is
    /// available, or as a fallback when inference fails.
    fn rollout(&self, pos: &Self::Position, rng: &mut ChaCha20Rng) -> f64;

    /// Canonical UCI string of `mv` (e.g. `"e2e4"`, `"e7e8q"`). This is the
    /// key the evaluator uses for priors; the two must agree exactly.
    fn move_to_uci(&self, mv: &Self::Move) -> String;

    fn move_equals(&self, a: &Self::Move, b: &Self::Move) -> bool {
        a == b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_scores_are_reference_framed() {
        assert_eq!(Outcome::Win(Player::One).score(), 1.0);
        assert_eq!(Outcome::Win(Player::Two).score(), 0.0);
        assert_eq!(Outcome::Draw.score(), 0.5);
    }

    #[test]
    fn player_other_flips() {
        assert_eq!(Player::One.other(), Player::Two);
        assert_eq!(Player::Two.other(), Player::One);
    }
}
