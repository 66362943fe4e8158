use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::model::{GenerationParams, ModelError, SummarizationModel};

/// Returned instead of a generated summary when the input is too short.
pub const NOT_ENOUGH_TEXT: &str = "Not enough text to summarize.";

/// Inputs with fewer characters than this are not sent to the model.
pub const MIN_INPUT_CHARS: usize = 10;

/// Only this many leading characters are summarized; the rest is dropped.
pub const MAX_INPUT_CHARS: usize = 4000;

/// Outcome of summarization.
///
/// Serializes as `{"kind": "generated" | "not_enough_text", "text": ...}`;
/// `text` always carries what the user is shown, placeholder included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Summary {
    Generated(String),
    NotEnoughText,
}

impl Summary {
    pub fn as_str(&self) -> &str {
        match self {
            Summary::Generated(text) => text,
            Summary::NotEnoughText => NOT_ENOUGH_TEXT,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, Summary::NotEnoughText)
    }

    fn kind(&self) -> &'static str {
        match self {
            Summary::Generated(_) => "generated",
            Summary::NotEnoughText => "not_enough_text",
        }
    }
}

impl Serialize for Summary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Summary", 2)?;
        state.serialize_field("kind", self.kind())?;
        state.serialize_field("text", self.as_str())?;
        state.end()
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summarize normalized text with fixed generation parameters.
///
/// Text shorter than [`MIN_INPUT_CHARS`] yields [`Summary::NotEnoughText`]
/// without touching the model. Longer text is cut at [`MAX_INPUT_CHARS`]
/// characters. Model errors are returned as-is.
pub fn summarize(model: &dyn SummarizationModel, text: &str) -> Result<Summary, ModelError> {
    if text.chars().count() < MIN_INPUT_CHARS {
        return Ok(Summary::NotEnoughText);
    }

    let input = truncate_chars(text, MAX_INPUT_CHARS);
    tracing::debug!(
        input_chars = input.chars().count(),
        dropped_bytes = text.len() - input.len(),
        "summarizing"
    );

    let generated = model.generate(input, &GenerationParams::default())?;
    Ok(Summary::Generated(generated))
}

/// First `max` characters of `text`, cut on a char boundary.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
