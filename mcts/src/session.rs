//! Chess-facing search session: FEN in, UCI out, tree reuse between moves.

use std::sync::Arc;

use tracing::info;

use chess_game::ChessGame;

use crate::config::SearchConfig;
use crate::evaluator::Evaluator;
use crate::search::{MctsSearch, SearchError, SearchSummary};

/// Evaluator handle shared across the searches of a daemon process: the
/// model is loaded once and cloned cheaply per game.
pub type SharedEvaluator = Arc<dyn Evaluator<ChessGame> + Send + Sync>;

/// One game's worth of search state.
pub struct Search {
    inner: MctsSearch<ChessGame, SharedEvaluator>,
    last_summary: Option<SearchSummary>,
}

impl Search {
    /// Build a session from a FEN string. `evaluator` is `None` for
    /// rollout-only mode.
    pub fn from_fen(
        fen: &str,
        config: SearchConfig,
        evaluator: Option<SharedEvaluator>,
    ) -> Result<Self, SearchError> {
        let position = ChessGame::position_from_fen(fen)
            .map_err(|err| SearchError::InvalidFen(err.to_string()))?;
        Ok(Self {
            inner: MctsSearch::new(ChessGame::new(), position, evaluator, config)?,
            last_summary: None,
        })
    }

    /// Build a session from the standard starting position.
    pub fn from_start(
        config: SearchConfig,
        evaluator: Option<SharedEvaluator>,
    ) -> Result<Self, SearchError> {
        Ok(Self {
            inner: MctsSearch::new(
                ChessGame::new(),
                ChessGame::starting_position(),
                evaluator,
                config,
            )?,
            last_summary: None,
        })
    }

    /// Run a full search and return the chosen move in UCI notation.
    pub fn best_move(&mut self) -> Result<String, SearchError> {
        let result = self.inner.run()?;
        info!(
            best = %result.uci,
            iterations = result.summary.iterations,
            elapsed_ms = result.summary.elapsed.as_millis() as u64,
            tree_size = result.summary.tree_size,
            root_visits = result.summary.root_visits,
            "search finished"
        );
        self.last_summary = Some(result.summary);
        Ok(result.uci)
    }

    /// Advance the tree by an externally observed move (our own or the
    /// opponent's). The explored subtree keeps its statistics; an
    /// unexplored move starts over from the resulting position.
    pub fn advance(&mut self, uci: &str) -> Result<(), SearchError> {
        self.inner.advance_uci(uci)
    }

    /// Diagnostics of the most recent [`best_move`](Self::best_move) call.
    pub fn last_summary(&self) -> Option<&SearchSummary> {
        self.last_summary.as_ref()
    }

    /// Current root position as seen by the search.
    pub fn position(&self) -> &shakmaty::Chess {
        &self.inner.tree().get(self.inner.tree().root()).position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_game::GameAdapter;

    fn testing_config() -> SearchConfig {
        SearchConfig::for_testing().with_iterations(100)
    }

    #[test]
    fn rejects_invalid_fen() {
        let result = Search::from_fen("definitely not chess", testing_config(), None);
        assert!(matches!(result, Err(SearchError::InvalidFen(_))));
    }

    #[test]
    fn stalemate_has_no_best_move() {
        let mut search =
            Search::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1", testing_config(), None).unwrap();
        assert!(matches!(search.best_move(), Err(SearchError::NoLegalMoves)));
        assert!(search.last_summary().is_none());
    }

    #[test]
    fn plays_a_move_and_reuses_the_tree() {
        let mut search = Search::from_start(testing_config(), None).unwrap();
        let first = search.best_move().unwrap();
        assert_eq!(first.len(), 4);

        let summary = search.last_summary().unwrap();
        assert_eq!(summary.iterations, 100);
        assert!(summary.tree_size > 1);

        // Advance by our own move, then by an opponent reply.
        search.advance(&first).unwrap();
        let game = ChessGame::new();
        let reply = game
            .legal_moves(search.position())
            .first()
            .map(|m| game.move_to_uci(m))
            .unwrap();
        search.advance(&reply).unwrap();

        let second = search.best_move().unwrap();
        assert!(game
            .legal_moves(search.position())
            .iter()
            .any(|m| game.move_to_uci(m) == second));
    }

    #[test]
    fn advance_rejects_moves_that_are_not_legal() {
        let mut search = Search::from_start(testing_config(), None).unwrap();
        assert!(matches!(
            search.advance("a1h8"),
            Err(SearchError::IllegalMove(_))
        ));
    }

    #[test]
    fn shared_evaluator_mode_runs() {
        use crate::evaluator::UniformEvaluator;

        let evaluator: SharedEvaluator = Arc::new(UniformEvaluator::new());
        let mut search =
            Search::from_fen(
                "6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1",
                testing_config().with_iterations(800),
                Some(evaluator),
            )
            .unwrap();
        assert_eq!(search.best_move().unwrap(), "a1a8");
    }
}
