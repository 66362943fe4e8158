use std::path::Path;

use ort::session::Session;
use tokenizers::Tokenizer;

use medsum_core::ModelError;

pub(crate) fn build_session(model_path: &Path, intra_threads: usize) -> Result<Session, ModelError> {
    Session::builder()
        .map_err(|e| ModelError::Load(format!("ONNX session builder: {}", e)))?
        .with_intra_threads(intra_threads)
        .map_err(|e| ModelError::Load(format!("ONNX set threads: {}", e)))?
        .commit_from_file(model_path)
        .map_err(|e| ModelError::Load(format!("ONNX load {}: {}", model_path.display(), e)))
}

pub(crate) fn load_tokenizer(path: &Path) -> Result<Tokenizer, ModelError> {
    Tokenizer::from_file(path)
        .map_err(|e| ModelError::Load(format!("failed to load tokenizer: {}", e)))
}

pub(crate) fn has_input(session: &Session, name: &str) -> bool {
    session.inputs().iter().any(|input| input.name() == name)
}

pub(crate) fn inference_err(e: impl std::fmt::Display) -> ModelError {
    ModelError::Inference(e.to_string())
}

/// Index and value of the largest element; first wins on ties.
pub(crate) fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    values
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, v)| match best {
            Some((_, b)) if v <= b => best,
            _ if v.is_nan() => best,
            _ => Some((i, v)),
        })
}

/// Numerically stable softmax.
pub(crate) fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
