use serde::{Deserialize, Serialize};

pub mod aggregation;
pub mod backend;
pub mod config_file;
pub mod context;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod render;
pub mod summarize;
pub mod tagger;

// Re-export for convenience
pub use backend::{BackendError, PdfBackend};
pub use context::AppContext;
pub use model::{
    AggregationStrategy, GenerationParams, ModelError, ModelProvider, SummarizationModel,
    TokenClassifier,
};
pub use normalize::normalize;
pub use pipeline::{Analysis, AnalysisRequest, PipelineError, analyze, prepare_text};
pub use summarize::{NOT_ENOUGH_TEXT, Summary, summarize};
pub use tagger::tag_entities;

/// A labeled span of text with the model's confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityAnnotation {
    /// Entity group, e.g. `Disease_disorder` or `Sign_symptom`.
    pub label: String,
    /// Surface text of the span as it appears in the document.
    pub text: String,
    /// Confidence in `[0, 1]`.
    pub score: f32,
}

impl EntityAnnotation {
    pub fn new(label: impl Into<String>, text: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
            score,
        }
    }
}
