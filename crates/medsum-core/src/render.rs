//! Text shown to the user, shared by every front end.

use std::fmt::Write;

use crate::EntityAnnotation;
use crate::pipeline::Analysis;

/// Shown instead of results when the document has no usable text.
pub const EMPTY_CONTENT_WARNING: &str = "No valid text found in the PDF.";

pub fn status_message(disease_name: &str) -> String {
    format!("Processing file for disease: {}", disease_name)
}

/// `- **{label}**: {text} (score: {score:.2})`
pub fn entity_line(entity: &EntityAnnotation) -> String {
    format!(
        "- **{}**: {} (score: {:.2})",
        entity.label, entity.text, entity.score
    )
}

/// Full Markdown report for one analysis.
pub fn markdown_report(analysis: &Analysis) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Disease Research Paper Summarizer");
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", status_message(&analysis.disease_name));
    let _ = writeln!(out);
    let _ = writeln!(out, "## Summary");
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", analysis.summary);
    let _ = writeln!(out);
    let _ = writeln!(out, "## Biomedical Named Entities");
    let _ = writeln!(out);
    for entity in &analysis.entities {
        let _ = writeln!(out, "{}", entity_line(entity));
    }
    out
}

/// Markdown report for a document with no usable text.
pub fn markdown_warning(disease_name: &str) -> String {
    format!(
        "# Disease Research Paper Summarizer\n\n{}\n\n> {}\n",
        status_message(disease_name),
        EMPTY_CONTENT_WARNING
    )
}
