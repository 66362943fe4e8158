//! Merge per-token classifier output into entity spans.
//!
//! Token classifiers emit one label per sub-word token using the BIO
//! scheme (`B-Disease_disorder`, `I-Disease_disorder`, `O`). Simple
//! aggregation groups contiguous tokens of the same tag, averages their
//! scores, and takes the covered slice of the source text as the span.

use crate::EntityAnnotation;
use crate::model::AggregationStrategy;

/// The "outside" label; groups with this tag are not entities.
pub const OUTSIDE_LABEL: &str = "O";

/// One token's prediction, with byte offsets into the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenPrediction {
    pub label: String,
    pub score: f32,
    pub start: usize,
    pub end: usize,
    /// `[CLS]`, `[SEP]`, padding and friends.
    pub special: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Begin,
    Inside,
}

/// Split a BIO label into its position marker and entity tag.
///
/// Labels without a `B-`/`I-` prefix count as inside-tokens of themselves.
fn split_tag(label: &str) -> (Position, &str) {
    if let Some(tag) = label.strip_prefix("B-") {
        (Position::Begin, tag)
    } else if let Some(tag) = label.strip_prefix("I-") {
        (Position::Inside, tag)
    } else {
        (Position::Inside, label)
    }
}

/// Turn token predictions into annotations, in token order.
pub fn aggregate(
    tokens: &[TokenPrediction],
    text: &str,
    strategy: AggregationStrategy,
) -> Vec<EntityAnnotation> {
    match strategy {
        AggregationStrategy::None => tokens
            .iter()
            .filter(|t| !t.special && t.label != OUTSIDE_LABEL)
            .map(|t| EntityAnnotation::new(t.label.clone(), span(text, t.start, t.end), t.score))
            .collect(),
        AggregationStrategy::Simple => aggregate_simple(tokens, text),
    }
}

fn aggregate_simple(tokens: &[TokenPrediction], text: &str) -> Vec<EntityAnnotation> {
    let mut entities = Vec::new();
    let mut group: Vec<&TokenPrediction> = Vec::new();

    for token in tokens.iter().filter(|t| !t.special) {
        if let Some(last) = group.last() {
            let (position, tag) = split_tag(&token.label);
            let (_, last_tag) = split_tag(&last.label);
            if tag != last_tag || position == Position::Begin {
                entities.extend(close_group(&group, text));
                group.clear();
            }
        }
        group.push(token);
    }
    entities.extend(close_group(&group, text));

    entities
}

fn close_group(group: &[&TokenPrediction], text: &str) -> Option<EntityAnnotation> {
    let first = group.first()?;
    let last = group.last()?;
    let (_, tag) = split_tag(&first.label);
    if tag == OUTSIDE_LABEL {
        return None;
    }

    let score = group.iter().map(|t| t.score).sum::<f32>() / group.len() as f32;
    Some(EntityAnnotation::new(
        tag,
        span(text, first.start, last.end),
        score,
    ))
}

/// Slice `text[start..end]`, tolerating offsets that fall outside it.
fn span(text: &str, start: usize, end: usize) -> String {
    text.get(start..end)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}
