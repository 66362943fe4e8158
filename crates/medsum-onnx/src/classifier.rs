//! Token classification (NER) over arbitrarily long text.
//!
//! Expects a model directory containing `model.onnx`, `tokenizer.json` and
//! `config.json` (with `id2label`). Text longer than the model's window is
//! split into consecutive windows by the tokenizer's overflow handling;
//! every window keeps offsets into the original text, so predictions from
//! all windows aggregate as one sequence.

use std::path::Path;
use std::sync::Mutex;

use ndarray::Array2;
use ort::session::Session;
use ort::value::TensorRef;
use tokenizers::{Encoding, Tokenizer, TruncationParams};
use tracing::info;

use medsum_core::aggregation::{TokenPrediction, aggregate};
use medsum_core::{AggregationStrategy, EntityAnnotation, ModelError, TokenClassifier};

use crate::config::{ModelConfig, require_file};
use crate::session::{argmax, build_session, has_input, inference_err, load_tokenizer, softmax};

/// Tokens per window, special tokens included.
pub const WINDOW_TOKENS: usize = 512;

/// ONNX Runtime-backed token classifier.
pub struct OnnxTokenClassifier {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    labels: Vec<String>,
    token_type_ids: bool,
}

impl std::fmt::Debug for OnnxTokenClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxTokenClassifier")
            .field("labels", &self.labels.len())
            .field("token_type_ids", &self.token_type_ids)
            .finish()
    }
}

impl OnnxTokenClassifier {
    pub fn from_directory(model_dir: &Path, intra_threads: usize) -> Result<Self, ModelError> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let config_path = model_dir.join("config.json");
        for path in [&model_path, &tokenizer_path, &config_path] {
            require_file(path)?;
        }

        let labels = ModelConfig::from_file(&config_path)?.labels()?;
        let session = build_session(&model_path, intra_threads)?;
        let token_type_ids = has_input(&session, "token_type_ids");

        let mut tokenizer = load_tokenizer(&tokenizer_path)?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: WINDOW_TOKENS,
                stride: 0,
                ..Default::default()
            }))
            .map_err(|e| ModelError::Load(format!("tokenizer truncation: {}", e)))?;
        tokenizer.with_padding(None);

        info!(
            model = %model_dir.display(),
            labels = labels.len(),
            "Loaded ONNX token classification model"
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            labels,
            token_type_ids,
        })
    }

    /// Per-token predictions for one window.
    fn predict_window(&self, window: &Encoding) -> Result<Vec<TokenPrediction>, ModelError> {
        let seq_len = window.get_ids().len();
        if seq_len == 0 {
            return Ok(Vec::new());
        }

        let to_i64 = |v: &[u32]| v.iter().map(|&x| x as i64).collect::<Vec<i64>>();
        let ids_array = Array2::from_shape_vec((1, seq_len), to_i64(window.get_ids()))
            .map_err(inference_err)?;
        let mask_array = Array2::from_shape_vec((1, seq_len), to_i64(window.get_attention_mask()))
            .map_err(inference_err)?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| ModelError::Inference(format!("session lock poisoned: {}", e)))?;

        let ids_ref = TensorRef::from_array_view(&ids_array).map_err(inference_err)?;
        let mask_ref = TensorRef::from_array_view(&mask_array).map_err(inference_err)?;
        let outputs = if self.token_type_ids {
            let type_array = Array2::from_shape_vec((1, seq_len), to_i64(window.get_type_ids()))
                .map_err(inference_err)?;
            let type_ref = TensorRef::from_array_view(&type_array).map_err(inference_err)?;
            session
                .run(ort::inputs![
                    "input_ids" => ids_ref,
                    "attention_mask" => mask_ref,
                    "token_type_ids" => type_ref
                ])
                .map_err(inference_err)?
        } else {
            session
                .run(ort::inputs![
                    "input_ids" => ids_ref,
                    "attention_mask" => mask_ref
                ])
                .map_err(inference_err)?
        };

        // logits: [1, seq_len, num_labels]
        let (_, logits) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(inference_err)?;

        label_tokens(
            logits,
            &self.labels,
            window.get_offsets(),
            window.get_special_tokens_mask(),
        )
    }
}

/// Pick the most probable label for each token.
pub fn label_tokens(
    logits: &[f32],
    labels: &[String],
    offsets: &[(usize, usize)],
    special_mask: &[u32],
) -> Result<Vec<TokenPrediction>, ModelError> {
    let num_labels = labels.len();
    if num_labels == 0 || logits.len() != offsets.len() * num_labels {
        return Err(ModelError::Inference(format!(
            "expected {} logits for {} tokens and {} labels, got {}",
            offsets.len() * num_labels,
            offsets.len(),
            num_labels,
            logits.len()
        )));
    }

    logits
        .chunks(num_labels)
        .zip(offsets)
        .enumerate()
        .map(|(i, (row, &(start, end)))| {
            let probs = softmax(row);
            let (best, score) = argmax(&probs)
                .ok_or_else(|| ModelError::Inference(format!("no score for token {}", i)))?;
            Ok(TokenPrediction {
                label: labels[best].clone(),
                score,
                start,
                end,
                special: special_mask.get(i).is_some_and(|&m| m == 1),
            })
        })
        .collect()
}

impl TokenClassifier for OnnxTokenClassifier {
    fn classify(
        &self,
        text: &str,
        aggregation: AggregationStrategy,
    ) -> Result<Vec<EntityAnnotation>, ModelError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| ModelError::Tokenize(e.to_string()))?;

        let mut predictions = self.predict_window(&encoding)?;
        for window in encoding.get_overflowing() {
            predictions.extend(self.predict_window(window)?);
        }
        tracing::debug!(
            windows = 1 + encoding.get_overflowing().len(),
            tokens = predictions.len(),
            "token classification complete"
        );

        Ok(aggregate(&predictions, text, aggregation))
    }
}
