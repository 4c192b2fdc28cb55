//! Board encoding and dense-policy mapping for the chess network.
//!
//! The network consumes 12 binary planes of shape 8×8, one per (piece type,
//! color) pair, and emits 4096 policy logits indexed by
//! `from_square * 64 + to_square`. Square order is a1=0 … h8=63 with no
//! vertical flip - the same order the move enumerator and the training
//! pipeline use. A mismatch here corrupts policy alignment silently, so the
//! indexing is pinned down by tests.

use std::collections::HashMap;

use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Color, Move, Position, Role};

/// Input planes: six piece types for White, then six for Black.
pub const PLANES: usize = 12;
pub const BOARD_SQUARES: usize = 64;
/// Flattened input length, plane-major: `12 * 64`.
pub const INPUT_LEN: usize = PLANES * BOARD_SQUARES;
/// Dense policy length: `64 * 64` from/to pairs.
pub const POLICY_LEN: usize = BOARD_SQUARES * BOARD_SQUARES;

fn plane_index(color: Color, role: Role) -> usize {
    let piece = match role {
        Role::Pawn => 0,
        Role::Knight => 1,
        Role::Bishop => 2,
        Role::Rook => 3,
        Role::Queen => 4,
        Role::King => 5,
    };
    match color {
        Color::White => piece,
        Color::Black => piece + 6,
    }
}

/// Encode a position into the network's flattened 12×8×8 input.
pub fn encode_position(pos: &Chess) -> Vec<f32> {
    let mut planes = vec![0.0f32; INPUT_LEN];
    let board = pos.board();
    for square in board.occupied() {
        if let Some(piece) = board.piece_at(square) {
            let plane = plane_index(piece.color, piece.role);
            planes[plane * BOARD_SQUARES + u32::from(square) as usize] = 1.0;
        }
    }
    planes
}

/// Dense policy index of a move: UCI from-square × 64 + to-square.
///
/// Castling indexes the king's two-square hop (e1g1, not the rook square).
/// Promotions carry no piece information in this encoding, so all four
/// promotions of a (from, to) pair share one index.
pub fn policy_index(mv: &Move) -> usize {
    match mv.to_uci(CastlingMode::Standard) {
        UciMove::Normal { from, to, .. } => {
            u32::from(from) as usize * BOARD_SQUARES + u32::from(to) as usize
        }
        // Legal chess moves always have from and to squares.
        _ => unreachable!("move without from/to squares: {mv:?}"),
    }
}

/// Build priors over the legal moves of `pos` from dense policy logits.
///
/// Exponentiates the logit at each legal move's index (max-subtracted for
/// stability) and normalizes over the legal set only. A degenerate sum
/// falls back to uniform. Promotions of the same (from, to) pair share a
/// logit and so end up with equal priors under their distinct UCI keys.
pub fn priors_from_logits(pos: &Chess, logits: &[f32]) -> HashMap<String, f64> {
    let moves = pos.legal_moves();
    if moves.is_empty() {
        return HashMap::new();
    }

    let mut keyed: Vec<(String, f64)> = Vec::with_capacity(moves.len());
    let mut max_logit = f64::NEG_INFINITY;
    for mv in &moves {
        let logit = logits.get(policy_index(mv)).copied().unwrap_or(0.0) as f64;
        if logit > max_logit {
            max_logit = logit;
        }
        keyed.push((mv.to_uci(CastlingMode::Standard).to_string(), logit));
    }

    let mut sum = 0.0;
    for entry in &mut keyed {
        entry.1 = (entry.1 - max_logit).exp();
        sum += entry.1;
    }

    if sum > 0.0 && sum.is_finite() {
        keyed.into_iter().map(|(uci, w)| (uci, w / sum)).collect()
    } else {
        let uniform = 1.0 / moves.len() as f64;
        keyed.into_iter().map(|(uci, _)| (uci, uniform)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_game::{ChessGame, GameAdapter};

    fn find_move(pos: &Chess, uci: &str) -> Move {
        let game = ChessGame::new();
        game.legal_moves(pos)
            .into_iter()
            .find(|m| game.move_to_uci(m) == uci)
            .unwrap_or_else(|| panic!("no move {uci}"))
    }

    #[test]
    fn starting_position_planes() {
        let planes = encode_position(&ChessGame::starting_position());
        assert_eq!(planes.len(), INPUT_LEN);

        // White pawns on rank 2 (squares 8..16), plane 0.
        for square in 8..16 {
            assert_eq!(planes[square], 1.0);
        }
        // White king on e1 (square 4), plane 5.
        assert_eq!(planes[5 * BOARD_SQUARES + 4], 1.0);
        // Black king on e8 (square 60), plane 11.
        assert_eq!(planes[11 * BOARD_SQUARES + 60], 1.0);
        // Total occupancy: 32 pieces.
        let ones = planes.iter().filter(|&&v| v == 1.0).count();
        assert_eq!(ones, 32);
    }

    #[test]
    fn policy_index_uses_from_times_64_plus_to() {
        let start = ChessGame::starting_position();
        // e2=12, e4=28.
        assert_eq!(policy_index(&find_move(&start, "e2e4")), 12 * 64 + 28);
        // g1=6, f3=21.
        assert_eq!(policy_index(&find_move(&start, "g1f3")), 6 * 64 + 21);
    }

    #[test]
    fn castling_indexes_the_king_hop() {
        let pos = ChessGame::position_from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        // e1=4, g1=6.
        assert_eq!(policy_index(&find_move(&pos, "e1g1")), 4 * 64 + 6);
        // e1=4, c1=2.
        assert_eq!(policy_index(&find_move(&pos, "e1c1")), 4 * 64 + 2);
    }

    #[test]
    fn promotions_share_an_index() {
        let pos = ChessGame::position_from_fen("4k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let queen = policy_index(&find_move(&pos, "a7a8q"));
        let knight = policy_index(&find_move(&pos, "a7a8n"));
        // a7=48, a8=56.
        assert_eq!(queen, 48 * 64 + 56);
        assert_eq!(queen, knight);
    }

    #[test]
    fn priors_normalize_over_the_legal_set() {
        let start = ChessGame::starting_position();
        let mut logits = vec![0.0f32; POLICY_LEN];
        logits[12 * 64 + 28] = 3.0; // e2e4

        let priors = priors_from_logits(&start, &logits);
        assert_eq!(priors.len(), 20);

        let sum: f64 = priors.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);

        // exp(3) against nineteen exp(0) entries.
        let expected = 3f64.exp() / (3f64.exp() + 19.0);
        assert!((priors["e2e4"] - expected).abs() < 1e-9);
        assert!(priors["e2e4"] > priors["d2d4"]);
    }

    #[test]
    fn promotion_priors_are_equal_under_distinct_keys() {
        let pos = ChessGame::position_from_fen("4k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let mut logits = vec![0.0f32; POLICY_LEN];
        logits[48 * 64 + 56] = 2.0;

        let priors = priors_from_logits(&pos, &logits);
        assert_eq!(priors["a7a8q"], priors["a7a8n"]);
        assert_eq!(priors["a7a8q"], priors["a7a8r"]);
        let sum: f64 = priors.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_logits_fall_back_to_uniform() {
        let start = ChessGame::starting_position();
        let logits = vec![f32::NAN; POLICY_LEN];
        let priors = priors_from_logits(&start, &logits);
        assert_eq!(priors.len(), 20);
        for &p in priors.values() {
            assert_eq!(p, 1.0 / 20.0);
        }
    }

    #[test]
    fn terminal_position_has_no_priors() {
        let pos = ChessGame::position_from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        assert!(priors_from_logits(&pos, &vec![0.0; POLICY_LEN]).is_empty());
    }
}
