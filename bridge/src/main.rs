//! Bridge daemon: a persistent process that keeps the model loaded and
//! answers positions read from stdin with UCI moves on stdout.
//!
//! Protocol, one command per line:
//! - a FEN string starts a new game and searches that position;
//! - `move <uci>` advances the current game by an externally observed move
//!   (tree reuse) and searches the resulting position.
//!
//! After answering, the daemon advances its own tree by the emitted move,
//! so a sequence of `move` lines plays out a game. Moves go to stdout,
//! flushed immediately; all diagnostics go to stderr.

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use mcts::{OnnxEvaluator, Search, SearchConfig, SharedEvaluator, ValueConvention};

#[derive(Parser, Debug)]
#[command(
    name = "mcts_bridge",
    about = "Persistent MCTS engine: reads FEN strings from stdin, writes UCI moves to stdout"
)]
struct Args {
    /// Path to the ONNX model, or "none" for rollout-only mode.
    model: String,

    /// Iteration budget per search.
    #[arg(default_value_t = 15_000)]
    max_iterations: u32,

    /// Wall-clock budget per search, in seconds.
    #[arg(default_value_t = 5.0)]
    max_seconds: f64,

    /// PUCT exploration constant.
    #[arg(default_value_t = 2.0)]
    cpuct: f64,

    /// Interpret the model's value head as a White win probability instead
    /// of a tanh output from the side to move.
    #[arg(long)]
    value_as_probability: bool,
}

fn init_tracing() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{fmt, EnvFilter};

    // stdout carries moves; everything else must stay on stderr.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive("ort=warn".parse().expect("static directive"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

fn load_evaluator(args: &Args) -> Result<Option<SharedEvaluator>> {
    if args.model == "none" {
        info!("no model given, searching with random rollouts");
        return Ok(None);
    }

    let convention = if args.value_as_probability {
        ValueConvention::ReferenceWinProbability
    } else {
        ValueConvention::TanhSideToMove
    };

    let start = Instant::now();
    let evaluator = OnnxEvaluator::load(&args.model, convention)
        .with_context(|| format!("loading model from {}", args.model))?;
    info!(
        elapsed_s = start.elapsed().as_secs_f64(),
        model = %args.model,
        "model loaded"
    );
    let shared: SharedEvaluator = Arc::new(evaluator);
    Ok(Some(shared))
}

/// Search the session's current position, emit the move, and keep our own
/// tree in sync with it.
fn respond(search: &mut Search, stdout: &mut impl Write) -> Result<()> {
    let start = Instant::now();
    match search.best_move() {
        Ok(uci) => {
            writeln!(stdout, "{uci}").context("writing move")?;
            stdout.flush().context("flushing stdout")?;
            info!(elapsed_s = start.elapsed().as_secs_f64(), best = %uci, "search");
            if let Err(err) = search.advance(&uci) {
                warn!(error = %err, "failed to advance own tree");
            }
        }
        Err(err) => error!(error = %err, "no move available"),
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let config = SearchConfig::from_budgets(args.max_iterations, args.max_seconds, args.cpuct)?;
    let evaluator = load_evaluator(&args)?;
    info!("ready for input (FEN or `move <uci>` per line)");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut session: Option<Search> = None;

    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(uci) = line.strip_prefix("move ") {
            match session.as_mut() {
                Some(search) => {
                    if let Err(err) = search.advance(uci.trim()) {
                        error!(error = %err, "cannot apply move");
                        continue;
                    }
                    respond(search, &mut stdout)?;
                }
                None => error!("`move` before any position; send a FEN first"),
            }
            continue;
        }

        match Search::from_fen(line, config.clone(), evaluator.clone()) {
            Ok(fresh) => {
                session = Some(fresh);
                respond(session.as_mut().expect("just assigned"), &mut stdout)?;
            }
            Err(err) => error!(error = %err, input = line, "rejected position"),
        }
    }

    Ok(())
}
