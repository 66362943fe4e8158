use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::backend::PdfBackend;
use crate::model::{ModelError, ModelProvider, SummarizationModel, TokenClassifier};

/// Process-wide state shared by every request.
///
/// Holds the PDF backend and lazily loaded model handles. Each model is
/// built on first use through the [`ModelProvider`]; concurrent first
/// callers block on the same initialization, so a model is constructed at
/// most once. A failed load leaves the slot empty and the next caller
/// tries again.
pub struct AppContext {
    pdf: Arc<dyn PdfBackend>,
    provider: Arc<dyn ModelProvider>,
    summarizer: OnceCell<Arc<dyn SummarizationModel>>,
    token_classifier: OnceCell<Arc<dyn TokenClassifier>>,
}

impl AppContext {
    pub fn new(pdf: Arc<dyn PdfBackend>, provider: Arc<dyn ModelProvider>) -> Self {
        Self {
            pdf,
            provider,
            summarizer: OnceCell::new(),
            token_classifier: OnceCell::new(),
        }
    }

    pub fn pdf_backend(&self) -> &dyn PdfBackend {
        self.pdf.as_ref()
    }

    /// The summarization model, loading it on first access.
    pub fn summarizer(&self) -> Result<Arc<dyn SummarizationModel>, ModelError> {
        self.summarizer
            .get_or_try_init(|| {
                tracing::info!("loading summarization model");
                self.provider.load_summarizer()
            })
            .cloned()
    }

    /// The entity-recognition model, loading it on first access.
    pub fn token_classifier(&self) -> Result<Arc<dyn TokenClassifier>, ModelError> {
        self.token_classifier
            .get_or_try_init(|| {
                tracing::info!("loading entity recognition model");
                self.provider.load_token_classifier()
            })
            .cloned()
    }

    /// Load both models now instead of on the first request.
    pub fn preload(&self) -> Result<(), ModelError> {
        self.summarizer()?;
        self.token_classifier()?;
        Ok(())
    }

    pub fn models_loaded(&self) -> (bool, bool) {
        (
            self.summarizer.get().is_some(),
            self.token_classifier.get().is_some(),
        )
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (summarizer, classifier) = self.models_loaded();
        f.debug_struct("AppContext")
            .field("summarizer", &if summarizer { "<loaded>" } else { "<pending>" })
            .field(
                "token_classifier",
                &if classifier { "<loaded>" } else { "<pending>" },
            )
            .finish()
    }
}
