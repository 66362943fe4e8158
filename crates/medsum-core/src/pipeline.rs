use serde::Serialize;
use thiserror::Error;

use crate::backend::{BackendError, PdfBackend};
use crate::context::AppContext;
use crate::model::ModelError;
use crate::normalize::normalize;
use crate::render::EMPTY_CONTENT_WARNING;
use crate::summarize::{Summary, summarize};
use crate::tagger::tag_entities;
use crate::EntityAnnotation;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// The upload is not a readable PDF.
    #[error("invalid PDF document: {0}")]
    DocumentFormat(#[source] BackendError),
    /// Nothing left after normalization; neither model was invoked.
    #[error("{}", EMPTY_CONTENT_WARNING)]
    EmptyContent,
    /// Model loading or inference failed.
    #[error("model invocation failed: {0}")]
    ModelInvocation(#[from] ModelError),
}

impl PipelineError {
    /// Whether this is the expected empty-document path rather than a failure.
    pub fn is_warning(&self) -> bool {
        matches!(self, PipelineError::EmptyContent)
    }
}

/// One user interaction: a PDF and the disease it is about.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisRequest<'a> {
    pub document: &'a [u8],
    /// Display label only; not used by any pipeline stage.
    pub disease_name: &'a str,
}

/// Everything produced for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub disease_name: String,
    /// Length of the normalized text, in characters.
    pub text_chars: usize,
    pub summary: Summary,
    pub entities: Vec<EntityAnnotation>,
}

/// Extract and normalize a document's text.
///
/// Fails with [`PipelineError::EmptyContent`] when nothing usable remains.
pub fn prepare_text(backend: &dyn PdfBackend, document: &[u8]) -> Result<String, PipelineError> {
    let raw = backend
        .extract_text(document)
        .map_err(PipelineError::DocumentFormat)?;
    let text = normalize(&raw);
    tracing::debug!(raw_len = raw.len(), normalized_len = text.len(), "normalized text");

    if text.is_empty() {
        return Err(PipelineError::EmptyContent);
    }
    Ok(text)
}

/// Run the whole pipeline for one request.
///
/// Extraction, then normalization, then summarization and entity tagging
/// of the same text. Models load on first use through `ctx`.
pub fn analyze(ctx: &AppContext, request: AnalysisRequest<'_>) -> Result<Analysis, PipelineError> {
    tracing::info!(
        disease = request.disease_name,
        bytes = request.document.len(),
        "analyzing document"
    );

    let text = prepare_text(ctx.pdf_backend(), request.document)?;

    let summarizer = ctx.summarizer()?;
    let summary = summarize(summarizer.as_ref(), &text)?;

    let classifier = ctx.token_classifier()?;
    let entities = tag_entities(classifier.as_ref(), &text)?;

    Ok(Analysis {
        disease_name: request.disease_name.to_string(),
        text_chars: text.chars().count(),
        summary,
        entities,
    })
}
