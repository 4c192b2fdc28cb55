//! Chess rules adapter over `shakmaty`.
//!
//! Positions are `shakmaty::Chess` and moves are `shakmaty::Move`; this
//! module only bridges them to the [`GameAdapter`] contract and adds the
//! random-rollout scoring used in network-free mode.

use rand::Rng;
use rand_chacha::ChaCha20Rng;
use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess, Color, Move, Position, Role};
use thiserror::Error;

use crate::{GameAdapter, Outcome, Player};

/// Default cap on random rollout length, in plies.
pub const DEFAULT_ROLLOUT_DEPTH: usize = 500;

/// Material difference (in pawns) treated as decisive by the rollout
/// heuristic. Larger differences saturate.
const MATERIAL_CAP: f64 = 15.0;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("invalid FEN {fen:?}: {reason}")]
    InvalidFen { fen: String, reason: String },
}

/// Chess rules behind the [`GameAdapter`] interface.
#[derive(Debug, Clone)]
pub struct ChessGame {
    rollout_depth: usize,
}

impl Default for ChessGame {
    fn default() -> Self {
        Self::new()
    }
}

impl ChessGame {
    pub fn new() -> Self {
        Self {
            rollout_depth: DEFAULT_ROLLOUT_DEPTH,
        }
    }

    /// Override the rollout ply cap. Short caps lean on the material
    /// heuristic sooner; tests use them to keep rollouts cheap.
    pub fn with_rollout_depth(rollout_depth: usize) -> Self {
        Self { rollout_depth }
    }

    /// Parse a FEN string into a playable position.
    pub fn position_from_fen(fen: &str) -> Result<Chess, GameError> {
        let parsed: Fen = fen.parse().map_err(|err: shakmaty::fen::ParseFenError| {
            GameError::InvalidFen {
                fen: fen.to_string(),
                reason: err.to_string(),
            }
        })?;
        parsed
            .into_position(CastlingMode::Standard)
            .map_err(|err| GameError::InvalidFen {
                fen: fen.to_string(),
                reason: err.to_string(),
            })
    }

    /// The standard starting position.
    pub fn starting_position() -> Chess {
        Chess::default()
    }

    /// Static material estimate in `[0, 1]` from White's perspective.
    ///
    /// Piece values 1/3/3/5/9, difference clamped to `MATERIAL_CAP` pawns
    /// and mapped linearly onto the unit interval (equal material = 0.5).
    fn material_estimate(pos: &Chess) -> f64 {
        const VALUES: [(Role, f64); 5] = [
            (Role::Pawn, 1.0),
            (Role::Knight, 3.0),
            (Role::Bishop, 3.0),
            (Role::Rook, 5.0),
            (Role::Queen, 9.0),
        ];
        let board = pos.board();
        let mut diff = 0.0;
        for (role, value) in VALUES {
            let white = (board.by_color(Color::White) & board.by_role(role)).count() as f64;
            let black = (board.by_color(Color::Black) & board.by_role(role)).count() as f64;
            diff += value * (white - black);
        }
        0.5 + diff.clamp(-MATERIAL_CAP, MATERIAL_CAP) / (2.0 * MATERIAL_CAP)
    }
}

fn color_player(color: Color) -> Player {
    match color {
        Color::White => Player::One,
        Color::Black => Player::Two,
    }
}

impl GameAdapter for ChessGame {
    type Position = Chess;
    type Move = Move;

    fn legal_moves(&self, pos: &Chess) -> Vec<Move> {
        pos.legal_moves().to_vec()
    }

    fn apply(&self, pos: &Chess, mv: &Move) -> Chess {
        let mut next = pos.clone();
        // Legality is the caller's contract; every move we apply came out
        // of legal_moves on this same position.
        next.play_unchecked(mv);
        next
    }

    fn is_terminal(&self, pos: &Chess) -> bool {
        pos.is_game_over()
    }

    fn terminal_outcome(&self, pos: &Chess) -> Option<Outcome> {
        if pos.is_checkmate() {
            Some(Outcome::Win(color_player(!pos.turn())))
        } else if pos.is_game_over() {
            // Stalemate or insufficient material.
            Some(Outcome::Draw)
        } else {
            None
        }
    }

    fn side_to_move(&self, pos: &Chess) -> Player {
        color_player(pos.turn())
    }

    fn rollout(&self, pos: &Chess, rng: &mut ChaCha20Rng) -> f64 {
        let mut current = pos.clone();
        for _ in 0..self.rollout_depth {
            if current.is_game_over() {
                break;
            }
            let moves = current.legal_moves();
            let pick = rng.gen_range(0..moves.len());
            current.play_unchecked(&moves[pick]);
        }
        match self.terminal_outcome(&current) {
            Some(outcome) => outcome.score(),
            None => Self::material_estimate(&current),
        }
    }

    fn move_to_uci(&self, mv: &Move) -> String {
        mv.to_uci(CastlingMode::Standard).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    const MATE_IN_ONE: &str = "6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1";
    const STALEMATE: &str = "7k/5Q2/6K1/8/8/8/8/8 b - - 0 1";

    #[test]
    fn starting_position_has_twenty_moves() {
        let game = ChessGame::new();
        let pos = ChessGame::starting_position();
        assert_eq!(game.legal_moves(&pos).len(), 20);
        assert_eq!(game.side_to_move(&pos), Player::One);
        assert!(!game.is_terminal(&pos));
    }

    #[test]
    fn apply_returns_fresh_position() {
        let game = ChessGame::new();
        let pos = ChessGame::starting_position();
        let mv = game
            .legal_moves(&pos)
            .into_iter()
            .find(|m| game.move_to_uci(m) == "e2e4")
            .unwrap();
        let next = game.apply(&pos, &mv);
        assert_eq!(game.side_to_move(&next), Player::Two);
        // The original is untouched.
        assert_eq!(game.side_to_move(&pos), Player::One);
        assert_eq!(game.legal_moves(&pos).len(), 20);
    }

    #[test]
    fn checkmate_is_a_win_for_the_mating_side() {
        let game = ChessGame::new();
        let pos = ChessGame::position_from_fen(MATE_IN_ONE).unwrap();
        let mate = game
            .legal_moves(&pos)
            .into_iter()
            .find(|m| game.move_to_uci(m) == "a1a8")
            .unwrap();
        let after = game.apply(&pos, &mate);
        assert!(game.is_terminal(&after));
        assert_eq!(game.terminal_outcome(&after), Some(Outcome::Win(Player::One)));
        assert_eq!(game.terminal_outcome(&after).unwrap().score(), 1.0);
    }

    #[test]
    fn stalemate_is_a_draw() {
        let game = ChessGame::new();
        let pos = ChessGame::position_from_fen(STALEMATE).unwrap();
        assert!(game.is_terminal(&pos));
        assert!(game.legal_moves(&pos).is_empty());
        assert_eq!(game.terminal_outcome(&pos), Some(Outcome::Draw));
    }

    #[test]
    fn non_terminal_position_has_no_outcome() {
        let game = ChessGame::new();
        assert_eq!(game.terminal_outcome(&ChessGame::starting_position()), None);
    }

    #[test]
    fn invalid_fen_is_rejected() {
        assert!(matches!(
            ChessGame::position_from_fen("not a fen"),
            Err(GameError::InvalidFen { .. })
        ));
        // Structurally valid FEN grammar but illegal position (no kings).
        assert!(ChessGame::position_from_fen("8/8/8/8/8/8/8/8 w - - 0 1").is_err());
    }

    #[test]
    fn uci_strings_cover_castling_and_promotion() {
        let game = ChessGame::new();
        let castle_pos =
            ChessGame::position_from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let ucis: Vec<String> = game
            .legal_moves(&castle_pos)
            .iter()
            .map(|m| game.move_to_uci(m))
            .collect();
        assert!(ucis.contains(&"e1g1".to_string()));
        assert!(ucis.contains(&"e1c1".to_string()));

        let promo_pos = ChessGame::position_from_fen("4k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let promo_ucis: Vec<String> = game
            .legal_moves(&promo_pos)
            .iter()
            .map(|m| game.move_to_uci(m))
            .collect();
        for uci in ["a7a8q", "a7a8r", "a7a8b", "a7a8n"] {
            assert!(promo_ucis.contains(&uci.to_string()), "missing {uci}");
        }
    }

    #[test]
    fn rollout_is_bounded_and_seeded() {
        let game = ChessGame::with_rollout_depth(40);
        let pos = ChessGame::starting_position();

        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let first = game.rollout(&pos, &mut rng);
        assert!((0.0..=1.0).contains(&first));

        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let second = game.rollout(&pos, &mut rng);
        assert_eq!(first, second);
    }

    #[test]
    fn rollout_scores_terminal_positions_exactly() {
        let game = ChessGame::new();
        let pos = ChessGame::position_from_fen(STALEMATE).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        assert_eq!(game.rollout(&pos, &mut rng), 0.5);
    }

    #[test]
    fn material_estimate_is_balanced_at_start() {
        assert_eq!(
            ChessGame::material_estimate(&ChessGame::starting_position()),
            0.5
        );
        // White up a queen leans toward 1.0.
        let up_queen =
            ChessGame::position_from_fen("4k3/8/8/8/8/8/8/3QK3 w - - 0 1").unwrap();
        assert!(ChessGame::material_estimate(&up_queen) > 0.7);
    }
}
