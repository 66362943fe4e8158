use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open PDF: {0}")]
    OpenError(String),
    #[error("failed to extract text: {0}")]
    ExtractionError(String),
}

/// Trait for PDF text extraction backends.
///
/// Implementors open an in-memory document and return the plain text of
/// each page in document order. Cleanup of that text lives in
/// [`crate::normalize`].
pub trait PdfBackend: Send + Sync {
    /// Extract the plain text of every page, in page order.
    fn extract_pages(&self, data: &[u8]) -> Result<Vec<String>, BackendError>;

    /// Extract the full text of a document by concatenating its pages.
    ///
    /// No separator is inserted between pages; backends that want one
    /// should end each page's text with it.
    fn extract_text(&self, data: &[u8]) -> Result<String, BackendError> {
        let pages = self.extract_pages(data)?;
        let mut text = String::with_capacity(pages.iter().map(String::len).sum());
        for page in &pages {
            text.push_str(page);
        }
        Ok(text)
    }
}
