//! Encoder-decoder summarization with greedy decoding.
//!
//! Expects an Optimum-style export directory containing:
//! - `encoder_model.onnx`: `input_ids`, `attention_mask` (and optionally
//!   `global_attention_mask` for Longformer-style encoders) ->
//!   `last_hidden_state`
//! - `decoder_model.onnx`: `input_ids`, `encoder_attention_mask`,
//!   `encoder_hidden_states` -> `logits`
//! - `tokenizer.json` and `config.json`

use std::path::Path;
use std::sync::Mutex;

use ndarray::{Array2, Array3};
use ort::session::Session;
use ort::value::TensorRef;
use tokenizers::Tokenizer;
use tracing::info;

use medsum_core::{GenerationParams, ModelError, SummarizationModel};

use crate::config::{ModelConfig, require_file};
use crate::session::{argmax, build_session, has_input, inference_err, load_tokenizer};

/// Token ids that steer greedy decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeSettings {
    pub decoder_start_token_id: i64,
    pub eos_token_id: i64,
    pub forced_bos_token_id: Option<i64>,
    /// `0` disables the n-gram ban.
    pub no_repeat_ngram_size: usize,
}

impl DecodeSettings {
    fn from_config(config: &ModelConfig) -> Result<Self, ModelError> {
        let eos_token_id = config
            .eos_token_id
            .ok_or_else(|| ModelError::Load("config.json has no eos_token_id".into()))?;
        Ok(Self {
            decoder_start_token_id: config.decoder_start_token_id.unwrap_or(eos_token_id),
            eos_token_id,
            forced_bos_token_id: config.forced_bos_token_id,
            no_repeat_ngram_size: config.no_repeat_ngram_size.unwrap_or(0),
        })
    }
}

/// Greedy decode loop.
///
/// `step` maps the decoder ids so far to logits for the next token. Length
/// limits count the start token, so `max_length` bounds the returned
/// sequence. End-of-sequence is masked until `min_length` is reached.
pub fn greedy_decode(
    settings: &DecodeSettings,
    params: &GenerationParams,
    mut step: impl FnMut(&[i64]) -> Result<Vec<f32>, ModelError>,
) -> Result<Vec<i64>, ModelError> {
    if params.do_sample {
        return Err(ModelError::Unsupported(
            "sampling is not supported; only greedy decoding".into(),
        ));
    }

    let mut ids = vec![settings.decoder_start_token_id];

    while ids.len() < params.max_length {
        if ids.len() == 1
            && let Some(bos) = settings.forced_bos_token_id
        {
            ids.push(bos);
            continue;
        }

        let mut logits = step(&ids)?;
        if ids.len() < params.min_length {
            ban(&mut logits, settings.eos_token_id);
        }
        for token in banned_ngram_tokens(&ids, settings.no_repeat_ngram_size) {
            ban(&mut logits, token);
        }

        let next = argmax(&logits)
            .filter(|(_, score)| score.is_finite())
            .map(|(idx, _)| idx as i64)
            .ok_or_else(|| ModelError::Inference("decoder produced no usable logits".into()))?;
        ids.push(next);

        if next == settings.eos_token_id {
            break;
        }
    }

    Ok(ids)
}

fn ban(logits: &mut [f32], token: i64) {
    if let Some(slot) = usize::try_from(token).ok().and_then(|t| logits.get_mut(t)) {
        *slot = f32::NEG_INFINITY;
    }
}

/// Tokens that would complete an n-gram already present in `ids`.
fn banned_ngram_tokens(ids: &[i64], n: usize) -> Vec<i64> {
    if n == 0 || ids.len() + 1 < n {
        return Vec::new();
    }
    let prefix = &ids[ids.len() + 1 - n..];
    ids.windows(n)
        .filter(|w| &w[..n - 1] == prefix)
        .map(|w| w[n - 1])
        .collect()
}

/// ONNX Runtime-backed encoder-decoder summarizer.
pub struct OnnxSummarizer {
    encoder: Mutex<Session>,
    decoder: Mutex<Session>,
    tokenizer: Tokenizer,
    settings: DecodeSettings,
    global_attention: bool,
}

impl std::fmt::Debug for OnnxSummarizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxSummarizer")
            .field("settings", &self.settings)
            .field("global_attention", &self.global_attention)
            .finish()
    }
}

impl OnnxSummarizer {
    /// Load an encoder-decoder export from `model_dir`.
    pub fn from_directory(model_dir: &Path, intra_threads: usize) -> Result<Self, ModelError> {
        let encoder_path = model_dir.join("encoder_model.onnx");
        let decoder_path = model_dir.join("decoder_model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let config_path = model_dir.join("config.json");
        for path in [&encoder_path, &decoder_path, &tokenizer_path, &config_path] {
            require_file(path)?;
        }

        let settings = DecodeSettings::from_config(&ModelConfig::from_file(&config_path)?)?;
        let encoder = build_session(&encoder_path, intra_threads)?;
        let decoder = build_session(&decoder_path, intra_threads)?;
        let global_attention = has_input(&encoder, "global_attention_mask");
        let tokenizer = load_tokenizer(&tokenizer_path)?;

        info!(
            model = %model_dir.display(),
            global_attention,
            "Loaded ONNX summarization model"
        );

        Ok(Self {
            encoder: Mutex::new(encoder),
            decoder: Mutex::new(decoder),
            tokenizer,
            settings,
            global_attention,
        })
    }

    /// Run the encoder once; returns hidden states and the attention mask.
    fn encode(&self, text: &str) -> Result<(Array3<f32>, Array2<i64>), ModelError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| ModelError::Tokenize(e.to_string()))?;

        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();
        let seq_len = input_ids.len();

        let ids_array = Array2::from_shape_vec((1, seq_len), input_ids).map_err(inference_err)?;
        let mask_array =
            Array2::from_shape_vec((1, seq_len), attention_mask).map_err(inference_err)?;

        let mut encoder = self
            .encoder
            .lock()
            .map_err(|e| ModelError::Inference(format!("encoder lock poisoned: {}", e)))?;

        let ids_ref = TensorRef::from_array_view(&ids_array).map_err(inference_err)?;
        let mask_ref = TensorRef::from_array_view(&mask_array).map_err(inference_err)?;
        let outputs = if self.global_attention {
            // Global attention on the first token only.
            let mut global = Array2::<i64>::zeros((1, seq_len));
            if seq_len > 0 {
                global[[0, 0]] = 1;
            }
            let global_ref = TensorRef::from_array_view(&global).map_err(inference_err)?;
            encoder
                .run(ort::inputs![
                    "input_ids" => ids_ref,
                    "attention_mask" => mask_ref,
                    "global_attention_mask" => global_ref
                ])
                .map_err(inference_err)?
        } else {
            encoder
                .run(ort::inputs![
                    "input_ids" => ids_ref,
                    "attention_mask" => mask_ref
                ])
                .map_err(inference_err)?
        };

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(inference_err)?;
        let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
        if dims.len() != 3 {
            return Err(ModelError::Inference(format!(
                "unexpected encoder output shape: {:?}",
                dims
            )));
        }
        let hidden = Array3::from_shape_vec((dims[0], dims[1], dims[2]), data.to_vec())
            .map_err(inference_err)?;

        Ok((hidden, mask_array))
    }

    /// Logits for the token after `decoder_ids`.
    fn decode_step(
        &self,
        decoder_ids: &[i64],
        hidden: &Array3<f32>,
        encoder_mask: &Array2<i64>,
    ) -> Result<Vec<f32>, ModelError> {
        let ids_array = Array2::from_shape_vec((1, decoder_ids.len()), decoder_ids.to_vec())
            .map_err(inference_err)?;

        let mut decoder = self
            .decoder
            .lock()
            .map_err(|e| ModelError::Inference(format!("decoder lock poisoned: {}", e)))?;
        let outputs = decoder
            .run(ort::inputs![
                "input_ids" => TensorRef::from_array_view(&ids_array).map_err(inference_err)?,
                "encoder_attention_mask" => TensorRef::from_array_view(encoder_mask).map_err(inference_err)?,
                "encoder_hidden_states" => TensorRef::from_array_view(hidden).map_err(inference_err)?
            ])
            .map_err(inference_err)?;

        // logits: [1, decoder_len, vocab]
        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(inference_err)?;
        let vocab = shape
            .last()
            .map(|&v| v as usize)
            .filter(|&v| v > 0 && data.len() >= v)
            .ok_or_else(|| ModelError::Inference(format!("unexpected logits shape: {:?}", shape)))?;

        Ok(data[data.len() - vocab..].to_vec())
    }
}

impl SummarizationModel for OnnxSummarizer {
    fn generate(&self, text: &str, params: &GenerationParams) -> Result<String, ModelError> {
        let (hidden, mask) = self.encode(text)?;
        let ids = greedy_decode(&self.settings, params, |ids| {
            self.decode_step(ids, &hidden, &mask)
        })?;

        let ids: Vec<u32> = ids.iter().map(|&id| id as u32).collect();
        let summary = self
            .tokenizer
            .decode(&ids, true)
            .map_err(|e| ModelError::Tokenize(e.to_string()))?;
        Ok(summary.trim().to_string())
    }
}
