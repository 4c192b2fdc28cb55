use criterion::{criterion_group, criterion_main, Criterion};
use std::time::Duration;

use chess_game::ChessGame;
use mcts::{MctsSearch, SearchConfig, UniformEvaluator};

fn bench_rollout_search(c: &mut Criterion) {
    c.bench_function("rollout_search_200", |b| {
        b.iter(|| {
            let config = SearchConfig::for_testing()
                .with_iterations(200)
                .with_time(Duration::from_secs(600));
            let game = ChessGame::with_rollout_depth(20);
            let mut search: MctsSearch<ChessGame, UniformEvaluator> =
                MctsSearch::new(game, ChessGame::starting_position(), None, config).unwrap();
            search.run().unwrap()
        })
    });
}

fn bench_uniform_search(c: &mut Criterion) {
    c.bench_function("uniform_search_500", |b| {
        b.iter(|| {
            let config = SearchConfig::for_testing()
                .with_iterations(500)
                .with_time(Duration::from_secs(600));
            let mut search = MctsSearch::new(
                ChessGame::new(),
                ChessGame::starting_position(),
                Some(UniformEvaluator::new()),
                config,
            )
            .unwrap();
            search.run().unwrap()
        })
    });
}

criterion_group!(benches, bench_rollout_search, bench_uniform_search);
criterion_main!(benches);
