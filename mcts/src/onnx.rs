//! ONNX Runtime evaluator for the chess network.
//!
//! The model is expected to have:
//! - Input: `"board"` - shape (batch, 12, 8, 8) float32, the planes
//!   produced by [`crate::encoder::encode_position`]
//! - Output: `"policy_logits"` - shape (batch, 4096) float32
//! - Output: `"value"` - shape (batch, 1) float32, interpreted per the
//!   configured [`ValueConvention`]

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use ort::session::Session;
use ort::value::Value;
use tracing::debug;

use chess_game::{ChessGame, GameAdapter};

use crate::encoder::{self, PLANES, POLICY_LEN};
use crate::evaluator::{EvalResult, Evaluator, EvaluatorError, ValueConvention};

/// Neural evaluator backed by an ONNX Runtime session.
///
/// Holds the session behind a `Mutex` because `Session::run` takes
/// `&mut self` while the `Evaluator` trait is `&self` for sharing.
pub struct OnnxEvaluator {
    session: Mutex<Session>,
    convention: ValueConvention,
    /// Inference call count, for periodic throughput logging.
    inference_count: AtomicU64,
    total_inference_time_us: AtomicU64,
}

impl std::fmt::Debug for OnnxEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEvaluator")
            .field("convention", &self.convention)
            .finish_non_exhaustive()
    }
}

impl OnnxEvaluator {
    /// Load an ONNX model from disk. Failure here is fatal to the caller;
    /// there is no degraded mode with a half-loaded model.
    pub fn load<P: AsRef<Path>>(
        model_path: P,
        convention: ValueConvention,
    ) -> Result<Self, EvaluatorError> {
        let session = Session::builder()
            .map_err(|e| EvaluatorError::Model(format!("failed to create session builder: {e}")))?
            .with_intra_threads(4)
            .map_err(|e| EvaluatorError::Model(format!("failed to set intra threads: {e}")))?
            .commit_from_file(model_path)
            .map_err(|e| EvaluatorError::Model(format!("failed to load model: {e}")))?;

        Ok(Self {
            session: Mutex::new(session),
            convention,
            inference_count: AtomicU64::new(0),
            total_inference_time_us: AtomicU64::new(0),
        })
    }
}

impl Evaluator<ChessGame> for OnnxEvaluator {
    fn evaluate(
        &self,
        game: &ChessGame,
        position: &shakmaty::Chess,
    ) -> Result<EvalResult, EvaluatorError> {
        let planes = encoder::encode_position(position);
        let input_array = ndarray::Array4::from_shape_vec((1, PLANES, 8, 8), planes)
            .map_err(|e| EvaluatorError::InvalidInput(format!("bad input shape: {e}")))?;
        let input_value = Value::from_array(input_array)
            .map_err(|e| EvaluatorError::Model(format!("failed to create input tensor: {e}")))?;

        let inference_start = Instant::now();
        let (logits, raw_value) = {
            let mut session = self.session.lock().map_err(|e| {
                EvaluatorError::Inference(format!("failed to acquire session lock: {e}"))
            })?;
            let outputs = session
                .run(ort::inputs!["board" => input_value])
                .map_err(|e| EvaluatorError::Inference(format!("inference failed: {e}")))?;

            let policy_output = outputs
                .get("policy_logits")
                .ok_or_else(|| EvaluatorError::Model("missing policy_logits output".to_string()))?;
            let (_shape, policy_data) = policy_output.try_extract_tensor::<f32>().map_err(|e| {
                EvaluatorError::Model(format!("failed to extract policy tensor: {e}"))
            })?;
            if policy_data.len() < POLICY_LEN {
                return Err(EvaluatorError::Model(format!(
                    "policy output has {} logits, expected {}",
                    policy_data.len(),
                    POLICY_LEN
                )));
            }
            let logits: Vec<f32> = policy_data.to_vec();

            let value_output = outputs
                .get("value")
                .ok_or_else(|| EvaluatorError::Model("missing value output".to_string()))?;
            let (_shape, value_data) = value_output.try_extract_tensor::<f32>().map_err(|e| {
                EvaluatorError::Model(format!("failed to extract value tensor: {e}"))
            })?;
            let raw_value = value_data.first().copied().unwrap_or(0.0);

            (logits, raw_value)
        };

        let inference_time_us = inference_start.elapsed().as_micros() as u64;
        self.total_inference_time_us
            .fetch_add(inference_time_us, Ordering::Relaxed);
        let count = self.inference_count.fetch_add(1, Ordering::Relaxed) + 1;
        if count % 10_000 == 0 {
            let total_us = self.total_inference_time_us.load(Ordering::Relaxed);
            debug!(
                calls = count,
                avg_ms = (total_us / count) as f64 / 1000.0,
                "inference stats"
            );
        }

        let priors = encoder::priors_from_logits(position, &logits);
        let value = self
            .convention
            .to_reference(raw_value as f64, game.side_to_move(position));

        Ok(EvalResult { priors, value })
    }
}
