//! ONNX Runtime model backends.
//!
//! - [`OnnxSummarizer`] runs an encoder-decoder export (e.g. an LED book
//!   summarizer) with greedy decoding.
//! - [`OnnxTokenClassifier`] runs a token-classification export (e.g. a
//!   biomedical NER model) and aggregates its BIO output into spans.
//! - [`OnnxModelProvider`] builds both from model directories for
//!   [`medsum_core::AppContext`].

use std::path::PathBuf;
use std::sync::Arc;

use medsum_core::config_file::Settings;
use medsum_core::{ModelError, ModelProvider, SummarizationModel, TokenClassifier};

pub mod classifier;
pub mod config;
mod session;
pub mod summarizer;

pub use classifier::OnnxTokenClassifier;
pub use config::ModelConfig;
pub use summarizer::OnnxSummarizer;

/// Loads both models from directories on disk.
#[derive(Debug, Clone)]
pub struct OnnxModelProvider {
    pub summarizer_dir: PathBuf,
    pub ner_dir: PathBuf,
    pub intra_threads: usize,
}

impl OnnxModelProvider {
    pub fn new(summarizer_dir: PathBuf, ner_dir: PathBuf, intra_threads: usize) -> Self {
        Self {
            summarizer_dir,
            ner_dir,
            intra_threads,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.summarizer_dir.clone(),
            settings.ner_dir.clone(),
            settings.intra_threads,
        )
    }
}

impl ModelProvider for OnnxModelProvider {
    fn load_summarizer(&self) -> Result<Arc<dyn SummarizationModel>, ModelError> {
        let model = OnnxSummarizer::from_directory(&self.summarizer_dir, self.intra_threads)?;
        Ok(Arc::new(model))
    }

    fn load_token_classifier(&self) -> Result<Arc<dyn TokenClassifier>, ModelError> {
        let model = OnnxTokenClassifier::from_directory(&self.ner_dir, self.intra_threads)?;
        Ok(Arc::new(model))
    }
}
