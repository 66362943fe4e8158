//! Model collaborator traits.
//!
//! The pipeline talks to pretrained models only through these traits so
//! that the inference runtime (ONNX in `medsum-onnx`, mocks in tests) can
//! be swapped without touching pipeline code.

use std::sync::Arc;

use thiserror::Error;

use crate::EntityAnnotation;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("failed to load model: {0}")]
    Load(String),
    #[error("tokenization failed: {0}")]
    Tokenize(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("unsupported model option: {0}")]
    Unsupported(String),
}

/// Fixed generation parameters passed to the summarization model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationParams {
    /// Maximum length of the generated sequence, in tokens.
    pub max_length: usize,
    /// Minimum length of the generated sequence, in tokens.
    pub min_length: usize,
    /// Sampling decode when `true`; greedy arg-max decode when `false`.
    pub do_sample: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_length: 500,
            min_length: 50,
            do_sample: false,
        }
    }
}

/// How per-token predictions are merged into entity spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationStrategy {
    /// One annotation per token, labels kept as emitted (`B-X`, `I-X`).
    None,
    /// Contiguous tokens sharing a tag are merged into one span.
    Simple,
}

/// A sequence-to-sequence model that produces an abstractive summary.
pub trait SummarizationModel: Send + Sync {
    fn generate(&self, text: &str, params: &GenerationParams) -> Result<String, ModelError>;
}

/// A sequence-labeling model that tags named entities.
pub trait TokenClassifier: Send + Sync {
    fn classify(
        &self,
        text: &str,
        aggregation: AggregationStrategy,
    ) -> Result<Vec<EntityAnnotation>, ModelError>;
}

/// Constructs the two pretrained models.
///
/// Loading is expensive; [`crate::AppContext`] guarantees each method is
/// called at most once per context.
pub trait ModelProvider: Send + Sync {
    fn load_summarizer(&self) -> Result<Arc<dyn SummarizationModel>, ModelError>;
    fn load_token_classifier(&self) -> Result<Arc<dyn TokenClassifier>, ModelError>;
}
